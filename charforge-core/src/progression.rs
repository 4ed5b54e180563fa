//! Hit-point progression.
//!
//! Starting HP is applied exactly once, when the character's first class is
//! assigned; taking a second class later never reopens it. Every level
//! after the first exposes a pending gain — fixed average or a submitted
//! roll — resolved exactly once per character level. Constitution changes
//! re-derive maximum HP retroactively across the whole level range while
//! preserving current HP wherever possible.

use crate::character::{Character, HitPoints, HpGainRecord, HpMethod};
use crate::choice::{SelectionError, StateError};
use crate::content::{ClassDef, EntityId};
use crate::dice::DieType;
use crate::store::EntityStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for hit-point resolution.
#[derive(Debug, Error)]
pub enum HpError {
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
}

/// The caller's pick for one level's hit-point gain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HpGainChoice {
    Average,
    Rolled { roll: u8 },
}

/// One still-unresolved level-up hit-point decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HpPendingChoice {
    pub level: u8,
    pub class: EntityId,
    pub class_name: String,
    pub hit_die: DieType,
    /// What [`HpGainChoice::Average`] would grant right now.
    pub average: i32,
}

/// Starting hit points: hit-die maximum plus Constitution modifier,
/// minimum 1.
pub fn starting_hp(class: &ClassDef, character: &Character) -> i32 {
    (class.hit_die.sides() as i32 + character.constitution_modifier() as i32).max(1)
}

/// The fixed average gain for one level: `floor(die/2) + 1 + CON`,
/// minimum 1.
pub fn average_gain(die: DieType, con_modifier: i8) -> i32 {
    (die.sides() as i32 / 2 + 1 + con_modifier as i32).max(1)
}

/// A rolled gain, minimum 1. The roll must be within the die's range.
pub fn rolled_gain(die: DieType, roll: u8, con_modifier: i8) -> Result<i32, SelectionError> {
    if roll < 1 || roll > die.sides() {
        return Err(SelectionError::RollOutOfRange {
            roll,
            sides: die.sides(),
        });
    }
    Ok((roll as i32 + con_modifier as i32).max(1))
}

/// Apply starting HP for the character's first class. Called once, by the
/// class-assignment flow; multiclassing never re-applies it.
pub fn apply_starting_hp(character: &mut Character, class: &ClassDef) {
    let hp = starting_hp(class, character);
    character.hit_points = HitPoints::new(hp);
    character.hp_gains.push(HpGainRecord {
        level: 1,
        class: class.id,
        method: HpMethod::Starting,
        gain: hp,
    });
}

/// Every level whose hit-point gain has not been resolved yet.
pub fn pending_hp_gains(
    entities: &dyn EntityStore,
    character: &Character,
) -> Vec<HpPendingChoice> {
    let con = character.constitution_modifier();
    let mut pending = Vec::new();

    for level in 2..=character.total_level() {
        if character.hp_gain_at(level).is_some() {
            continue;
        }
        let Some(&class_id) = character.advancement.get(level as usize - 1) else {
            continue;
        };
        let Some(class) = entities.class(class_id) else {
            tracing::warn!(%class_id, "advancement references a class missing from the entity store");
            continue;
        };
        pending.push(HpPendingChoice {
            level,
            class: class_id,
            class_name: class.name.clone(),
            hit_die: class.hit_die,
            average: average_gain(class.hit_die, con),
        });
    }

    pending
}

/// Resolve one level's gain. Exactly once per level; the gain raises both
/// maximum and current HP.
pub fn resolve_hp_gain(
    entities: &dyn EntityStore,
    character: &mut Character,
    level: u8,
    choice: HpGainChoice,
) -> Result<i32, HpError> {
    let total = character.total_level();
    if level < 2 || level > total {
        return Err(StateError::HpLevelOutOfRange { level, total }.into());
    }
    if character.hp_gain_at(level).is_some() {
        return Err(StateError::HpGainAlreadyResolved(level).into());
    }

    let class_id = *character
        .advancement
        .get(level as usize - 1)
        .ok_or(StateError::HpLevelOutOfRange { level, total })?;
    let class = entities
        .class(class_id)
        .ok_or(StateError::UnknownEntity(class_id))?;

    let con = character.constitution_modifier();
    let (method, gain) = match choice {
        HpGainChoice::Average => (HpMethod::Average, average_gain(class.hit_die, con)),
        HpGainChoice::Rolled { roll } => (
            HpMethod::Rolled { roll },
            rolled_gain(class.hit_die, roll, con)?,
        ),
    };

    character.hit_points.maximum += gain;
    character.hit_points.current += gain;
    character.hp_gains.push(HpGainRecord {
        level,
        class: class_id,
        method,
        gain,
    });

    Ok(gain)
}

/// Re-derive HP after the Constitution modifier changed: the maximum shifts
/// by `delta = (new - old) * total level`; current HP follows positive
/// deltas, and on negative deltas is clamped to the new maximum (never
/// below 1) but otherwise preserved.
pub fn apply_constitution_change(character: &mut Character, old_modifier: i8, new_modifier: i8) {
    let delta = (new_modifier as i32 - old_modifier as i32) * character.total_level() as i32;
    if delta == 0 {
        return;
    }

    character.hit_points.maximum += delta;
    if delta > 0 {
        character.hit_points.current += delta;
    } else {
        character.hit_points.current = character
            .hit_points
            .current
            .min(character.hit_points.maximum)
            .max(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AbilityScores, ClassLevel};

    fn fighter() -> ClassDef {
        ClassDef::new(EntityId::new(), "Fighter", DieType::D10)
    }

    fn character_with(con: u8, class: &ClassDef, level: u8) -> Character {
        let mut character = Character::new("Test");
        character.ability_scores = AbilityScores::new(10, 10, con, 10, 10, 10);
        character.classes.push(ClassLevel {
            class: class.id,
            level,
            subclass: None,
        });
        for _ in 0..level {
            character.advancement.push(class.id);
        }
        character
    }

    #[test]
    fn test_starting_hp_d10_con_2() {
        let class = fighter();
        let character = character_with(14, &class, 1);
        assert_eq!(starting_hp(&class, &character), 12);
    }

    #[test]
    fn test_starting_hp_minimum_1() {
        let class = ClassDef::new(EntityId::new(), "Frail", DieType::D4);
        let character = character_with(1, &class, 1); // -5 modifier
        assert_eq!(starting_hp(&class, &character), 1);
    }

    #[test]
    fn test_average_gain_d10_con_2() {
        assert_eq!(average_gain(DieType::D10, 2), 8);
    }

    #[test]
    fn test_rolled_gain_rejects_out_of_range() {
        assert!(matches!(
            rolled_gain(DieType::D10, 11, 2),
            Err(SelectionError::RollOutOfRange { roll: 11, sides: 10 })
        ));
        assert!(matches!(
            rolled_gain(DieType::D10, 0, 2),
            Err(SelectionError::RollOutOfRange { .. })
        ));
    }

    #[test]
    fn test_rolled_gain_minimum_1() {
        assert_eq!(rolled_gain(DieType::D6, 1, -3).unwrap(), 1);
        assert_eq!(rolled_gain(DieType::D6, 4, 1).unwrap(), 5);
    }

    #[test]
    fn test_constitution_drop_clamps_current_at_new_max() {
        let class = fighter();
        let mut character = character_with(14, &class, 5);
        character.hit_points = HitPoints::new(40);

        apply_constitution_change(&mut character, 2, 1);
        assert_eq!(character.hit_points.maximum, 35);
        assert_eq!(character.hit_points.current, 35);
    }

    #[test]
    fn test_constitution_drop_preserves_lower_current() {
        let class = fighter();
        let mut character = character_with(14, &class, 5);
        character.hit_points = HitPoints::new(40);
        character.hit_points.current = 20;

        apply_constitution_change(&mut character, 2, 1);
        assert_eq!(character.hit_points.maximum, 35);
        assert_eq!(character.hit_points.current, 20);
    }

    #[test]
    fn test_constitution_raise_lifts_current() {
        let class = fighter();
        let mut character = character_with(14, &class, 5);
        character.hit_points = HitPoints::new(40);
        character.hit_points.current = 20;

        apply_constitution_change(&mut character, 2, 3);
        assert_eq!(character.hit_points.maximum, 45);
        assert_eq!(character.hit_points.current, 25);
    }
}
