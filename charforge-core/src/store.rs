//! Storage contracts the engine consumes.
//!
//! The engine owns no persistence: content definitions come from a read-only
//! [`EntityStore`], a character's durable state lives behind a
//! [`CharacterStore`], and open-ended candidate sets (tool proficiencies,
//! languages) are enumerated by an [`OptionLookup`]. Contracts are
//! batch-oriented — the engine fetches a character's resolutions or counters
//! in one call and writes mutations back as whole batches, never looping
//! per-row lookups.
//!
//! All operations are synchronous; serializing concurrent mutations of the
//! same character is the implementation's responsibility (a per-character
//! lock or an optimistic version check), since resolve-then-overwrite and
//! sync-then-mutate sequences are not safe under interleaving.

use crate::catalog::{GroupRef, Owner, OwnerKind};
use crate::character::{Character, CharacterId};
use crate::choice::ResolutionRecord;
use crate::content::{BackgroundDef, ClassDef, EntityId, FeatDef, RaceDef, SpellDef, SubclassDef};
use crate::counters::CharacterCounter;
use thiserror::Error;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No character with id {0}")]
    UnknownCharacter(CharacterId),
    #[error("Storage backend failure: {0}")]
    Backend(String),
}

/// Read-only lookup of content definitions by identifier.
pub trait EntityStore {
    fn race(&self, id: EntityId) -> Option<&RaceDef>;
    fn class(&self, id: EntityId) -> Option<&ClassDef>;
    fn subclass(&self, id: EntityId) -> Option<&SubclassDef>;
    fn background(&self, id: EntityId) -> Option<&BackgroundDef>;
    fn feat(&self, id: EntityId) -> Option<&FeatDef>;
    fn spell(&self, name: &str) -> Option<&SpellDef>;

    /// Display name for a choice-group or counter source.
    fn owner_name(&self, owner: &Owner) -> Option<String> {
        match owner.kind {
            OwnerKind::Race => self.race(owner.id).map(|r| r.name.clone()),
            OwnerKind::Class => self.class(owner.id).map(|c| c.name.clone()),
            OwnerKind::Subclass => self.subclass(owner.id).map(|s| s.name.clone()),
            OwnerKind::Background => self.background(owner.id).map(|b| b.name.clone()),
            OwnerKind::Feat => self.feat(owner.id).map(|f| f.name.clone()),
        }
    }
}

/// Read/write access to a character's durable state: the character snapshot,
/// its resolution records, and its resource counters.
pub trait CharacterStore {
    fn character(&self, id: CharacterId) -> Result<Character, StoreError>;
    fn save_character(&mut self, character: &Character) -> Result<(), StoreError>;

    /// All resolution records for a character, in one call.
    fn resolutions(&self, id: CharacterId) -> Result<Vec<ResolutionRecord>, StoreError>;

    /// Replace every record for one group with the given records.
    fn replace_resolutions(
        &mut self,
        id: CharacterId,
        group: &GroupRef,
        records: Vec<ResolutionRecord>,
    ) -> Result<(), StoreError>;

    /// Remove every record for one group. Succeeds when none exist.
    fn remove_resolutions(&mut self, id: CharacterId, group: &GroupRef) -> Result<(), StoreError>;

    /// All counters for a character, in one call.
    fn counters(&self, id: CharacterId) -> Result<Vec<CharacterCounter>, StoreError>;

    /// Replace the character's counter set as one atomic batch; a rest must
    /// never half-apply.
    fn save_counters(
        &mut self,
        id: CharacterId,
        counters: Vec<CharacterCounter>,
    ) -> Result<(), StoreError>;
}

/// Enumerates the candidate set behind an unrestricted proficiency or
/// language option. Keeps exhaustive candidate lists out of the catalog.
pub trait OptionLookup {
    fn candidates(&self, category: &str) -> Vec<String>;
}
