//! Choice resolution & progression engine for tabletop character building.
//!
//! This crate is the rules-resolution core of a character-building platform:
//! given a character's selected race, classes, subclasses, background, and
//! feats, it determines what choices remain (skills, languages,
//! ability-score bonuses, spells, starting equipment, optional features),
//! validates and applies selections with undo, and tracks limited-use
//! resource pools and hit-point progression across levels.
//!
//! Persistence, HTTP, and content import are external collaborators behind
//! the [`store`] contracts; the engine itself is synchronous and
//! request-scoped.
//!
//! # Quick Start
//!
//! ```
//! use charforge_core::character::Character;
//! use charforge_core::testing::{InMemoryCharacterStore, SampleContent};
//!
//! let content = SampleContent::new();
//! let ids = content.ids;
//!
//! let character = Character::new("Aramil");
//! let character_id = character.id;
//! let store = InMemoryCharacterStore::new().with_character(character);
//!
//! let mut engine = content.engine(store).expect("valid catalog");
//! engine.set_race(character_id, Some(ids.high_elf)).unwrap();
//! engine.add_class(character_id, ids.wizard).unwrap();
//!
//! for choice in engine.pending_choices(character_id).unwrap() {
//!     println!("{}: {} ({} remaining)", choice.source, choice.name, choice.remaining);
//! }
//! ```

pub mod catalog;
pub mod character;
pub mod choice;
pub mod content;
pub mod counters;
pub mod dice;
pub mod engine;
pub mod progression;
pub mod resolvers;
pub mod store;
pub mod testing;

// Primary public API
pub use catalog::{
    ChoiceCatalog, ChoiceGroup, ChoiceKind, ChoiceOption, ConfigError, GroupRef, OptionFilter,
    OptionTarget, Owner, OwnerKind,
};
pub use character::{Ability, AbilityScores, Character, CharacterId, HitPoints, Skill};
pub use choice::{
    ChoiceId, ChoiceValue, PendingChoice, ResolutionRecord, ResolverRegistry, SelectionError,
    StateError,
};
pub use content::EntityId;
pub use counters::{CharacterCounter, CounterId, CounterView, ResetTiming, UNLIMITED};
pub use engine::{Engine, EngineError, EngineOptions};
pub use progression::{HpGainChoice, HpPendingChoice};
