//! Limited-use resource pools.
//!
//! Classes, subclasses, feats, and races grant resource pools ("Rage",
//! "Second Wind", "Psionic Energy") whose size scales with the level the
//! character has in the granting source. The counter engine derives one
//! [`CharacterCounter`] per `(source, pool name)` pair, keeps maximums in
//! sync as the character levels, and applies use/restore/reset mutations.
//! Pools from different sources are never merged, even when their names
//! collide under multiclassing.

use crate::catalog::Owner;
use crate::character::{Character, CharacterId};
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Sentinel maximum for pools with no usage limit.
pub const UNLIMITED: i16 = -1;

/// Unique identifier for counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CounterId(pub Uuid);

impl CounterId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CounterId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CounterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for counter operations.
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("No counter with id {0} on this character")]
    UnknownCounter(CounterId),
}

// ============================================================================
// Reset timing
// ============================================================================

/// Which rest event restores a pool to full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResetTiming {
    ShortRest,
    LongRest,
    Dawn,
    Manual,
}

impl ResetTiming {
    pub fn name(&self) -> &'static str {
        match self {
            ResetTiming::ShortRest => "short rest",
            ResetTiming::LongRest => "long rest",
            ResetTiming::Dawn => "dawn",
            ResetTiming::Manual => "manual",
        }
    }
}

impl fmt::Display for ResetTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Pool definitions
// ============================================================================

/// One row of a pool's level-scaling table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLevel {
    pub level: u8,
    pub maximum: i16,
}

/// A resource pool granted by a class, subclass, feat, or race.
///
/// The scaling table holds `(level, maximum)` rows; the pool exists once the
/// source reaches the lowest row and its maximum is the value of the highest
/// row at-or-below the source's level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourcePoolDef {
    pub name: String,
    pub reset: ResetTiming,
    pub levels: Vec<PoolLevel>,
}

impl ResourcePoolDef {
    pub fn new(name: impl Into<String>, reset: ResetTiming) -> Self {
        Self {
            name: name.into(),
            reset,
            levels: Vec::new(),
        }
    }

    /// Add a scaling row.
    pub fn at(mut self, level: u8, maximum: i16) -> Self {
        self.levels.push(PoolLevel { level, maximum });
        self
    }

    /// The pool maximum at the given source level, or `None` if the pool is
    /// not yet granted.
    pub fn max_at(&self, level: u8) -> Option<i16> {
        self.levels
            .iter()
            .filter(|row| row.level <= level)
            .max_by_key(|row| row.level)
            .map(|row| row.maximum)
    }
}

// ============================================================================
// Counters
// ============================================================================

/// One resource pool instance on a character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCounter {
    pub id: CounterId,
    pub character: CharacterId,
    /// The class/subclass/feat/race that granted this pool. Disambiguates
    /// same-named pools under multiclassing.
    pub source: Owner,
    pub name: String,
    /// Remaining uses; `None` means the pool is untouched (full).
    pub remaining: Option<i16>,
    /// Maximum uses; [`UNLIMITED`] (-1) means no limit.
    pub maximum: i16,
    pub reset: ResetTiming,
}

impl CharacterCounter {
    pub fn is_unlimited(&self) -> bool {
        self.maximum == UNLIMITED
    }

    /// Effective remaining uses. Meaningless for unlimited pools.
    pub fn current(&self) -> i16 {
        self.remaining.unwrap_or(self.maximum)
    }

    pub fn is_full(&self) -> bool {
        self.is_unlimited() || self.current() >= self.maximum
    }
}

/// Read-model row for the counter listing exposed to collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterView {
    pub id: CounterId,
    pub source: Owner,
    pub source_name: String,
    pub name: String,
    /// -1 for unlimited pools.
    pub current: i16,
    pub maximum: i16,
    pub reset: ResetTiming,
    pub unlimited: bool,
}

impl CounterView {
    pub fn new(counter: &CharacterCounter, source_name: String) -> Self {
        Self {
            id: counter.id,
            source: counter.source.clone(),
            source_name,
            name: counter.name.clone(),
            current: if counter.is_unlimited() {
                UNLIMITED
            } else {
                counter.current()
            },
            maximum: counter.maximum,
            reset: counter.reset,
            unlimited: counter.is_unlimited(),
        }
    }
}

// ============================================================================
// Sync
// ============================================================================

/// Every pool-granting source the character currently has, with the level
/// that scales its pools: classes at their class level, subclasses at the
/// owning class's level, feats and races at the total character level.
fn pool_sources<'a>(
    entities: &'a dyn EntityStore,
    character: &Character,
) -> Vec<(Owner, u8, &'a [ResourcePoolDef])> {
    let total = character.total_level();
    let mut sources = Vec::new();

    if let Some(race_id) = character.race {
        if let Some(race) = entities.race(race_id) {
            sources.push((Owner::race(race_id), total, race.pools.as_slice()));
            if let Some(parent_id) = race.parent {
                if let Some(parent) = entities.race(parent_id) {
                    sources.push((Owner::race(parent_id), total, parent.pools.as_slice()));
                }
            }
        }
    }

    for entry in &character.classes {
        if let Some(class) = entities.class(entry.class) {
            sources.push((Owner::class(entry.class), entry.level, class.pools.as_slice()));
        }
        if let Some(subclass_id) = entry.subclass {
            if let Some(subclass) = entities.subclass(subclass_id) {
                sources.push((
                    Owner::subclass(subclass_id),
                    entry.level,
                    subclass.pools.as_slice(),
                ));
            }
        }
    }

    for &feat_id in &character.feats {
        if let Some(feat) = entities.feat(feat_id) {
            sources.push((Owner::feat(feat_id), total, feat.pools.as_slice()));
        }
    }

    sources
}

/// Recompute the character's counter set from its current sources.
///
/// Existing counters keep their `remaining`; maximums are refreshed to the
/// level-scaled value; new pools start full; counters whose granting source
/// is gone are dropped. Idempotent — safe to call after every level-up,
/// class addition, or feat grant.
pub fn sync_counters(
    entities: &dyn EntityStore,
    character: &Character,
    existing: &[CharacterCounter],
) -> Vec<CharacterCounter> {
    let mut synced = Vec::new();

    for (source, level, pools) in pool_sources(entities, character) {
        for pool in pools {
            let Some(maximum) = pool.max_at(level) else {
                continue;
            };
            match existing
                .iter()
                .find(|c| c.source == source && c.name == pool.name)
            {
                Some(counter) => {
                    let mut counter = counter.clone();
                    counter.maximum = maximum;
                    counter.reset = pool.reset;
                    synced.push(counter);
                }
                None => {
                    tracing::debug!(pool = %pool.name, source = %source, "granting resource pool");
                    synced.push(CharacterCounter {
                        id: CounterId::new(),
                        character: character.id,
                        source: source.clone(),
                        name: pool.name.clone(),
                        remaining: None,
                        maximum,
                        reset: pool.reset,
                    });
                }
            }
        }
    }

    synced
}

// ============================================================================
// Mutations
// ============================================================================

/// Spend one use. Returns `false` when the pool is empty; unlimited pools
/// always succeed without decrementing.
pub fn use_counter(counter: &mut CharacterCounter) -> bool {
    if counter.is_unlimited() {
        return true;
    }
    let current = counter.current();
    if current <= 0 {
        return false;
    }
    counter.remaining = Some(current - 1);
    true
}

/// Restore one use, capped at the maximum. No-op on unlimited pools.
pub fn restore_counter(counter: &mut CharacterCounter) {
    if counter.is_unlimited() {
        return;
    }
    let current = counter.current();
    counter.remaining = Some((current + 1).min(counter.maximum));
}

/// Restore the pool to full.
pub fn reset_counter(counter: &mut CharacterCounter) {
    counter.remaining = None;
}

/// Reset every counter whose timing is in `timings`; returns the names of
/// the pools that were reset. The caller persists the whole batch as one
/// write so a rest never half-applies.
pub fn reset_by_timing(counters: &mut [CharacterCounter], timings: &[ResetTiming]) -> Vec<String> {
    let mut reset = Vec::new();
    for counter in counters.iter_mut() {
        if timings.contains(&counter.reset) {
            reset_counter(counter);
            reset.push(counter.name.clone());
        }
    }
    reset
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::EntityId;

    fn counter(maximum: i16, reset: ResetTiming) -> CharacterCounter {
        CharacterCounter {
            id: CounterId::new(),
            character: CharacterId::new(),
            source: Owner::class(EntityId::new()),
            name: "Test Pool".to_string(),
            remaining: None,
            maximum,
            reset,
        }
    }

    #[test]
    fn test_max_at_scaling() {
        let pool = ResourcePoolDef::new("Psionic Energy", ResetTiming::LongRest)
            .at(3, 4)
            .at(5, 6)
            .at(9, 8);
        assert_eq!(pool.max_at(1), None);
        assert_eq!(pool.max_at(3), Some(4));
        assert_eq!(pool.max_at(4), Some(4));
        assert_eq!(pool.max_at(5), Some(6));
        assert_eq!(pool.max_at(20), Some(8));
    }

    #[test]
    fn test_use_floors_at_zero() {
        let mut c = counter(2, ResetTiming::ShortRest);
        assert!(use_counter(&mut c));
        assert!(use_counter(&mut c));
        assert_eq!(c.current(), 0);
        assert!(!use_counter(&mut c));
        assert_eq!(c.current(), 0);
    }

    #[test]
    fn test_unlimited_never_decrements() {
        let mut c = counter(UNLIMITED, ResetTiming::Manual);
        for _ in 0..10 {
            assert!(use_counter(&mut c));
        }
        assert!(c.remaining.is_none());
        restore_counter(&mut c);
        assert!(c.remaining.is_none());
    }

    #[test]
    fn test_restore_caps_at_maximum() {
        let mut c = counter(3, ResetTiming::LongRest);
        assert!(use_counter(&mut c));
        restore_counter(&mut c);
        assert_eq!(c.current(), 3);
        restore_counter(&mut c);
        assert_eq!(c.current(), 3);
    }

    #[test]
    fn test_reset_by_timing_matches_exactly() {
        let mut counters = vec![
            counter(2, ResetTiming::ShortRest),
            counter(3, ResetTiming::LongRest),
            counter(1, ResetTiming::Dawn),
        ];
        for c in counters.iter_mut() {
            use_counter(c);
        }

        let reset = reset_by_timing(&mut counters, &[ResetTiming::LongRest]);
        assert_eq!(reset.len(), 1);
        assert!(counters[1].is_full());
        assert!(!counters[0].is_full());
        assert!(!counters[2].is_full());

        let reset = reset_by_timing(
            &mut counters,
            &[ResetTiming::ShortRest, ResetTiming::LongRest],
        );
        assert_eq!(reset.len(), 2);
        assert!(counters[0].is_full());
        assert!(!counters[2].is_full());
    }
}
