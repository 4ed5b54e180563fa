//! Game-content definitions consumed from the entity store.
//!
//! These are the read-only rule definitions the engine resolves choices
//! against: races (with parent-race links for subraces), classes with hit
//! dice, subclasses tied to their class, backgrounds, feats, and spells.
//! The catalog of choice groups these entities offer lives separately in
//! [`crate::catalog`]; resource pools they grant are described by
//! [`ResourcePoolDef`](crate::counters::ResourcePoolDef) rows attached here.

use crate::character::Skill;
use crate::counters::ResourcePoolDef;
use crate::dice::DieType;
use crate::store::OptionLookup;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for content entities (races, classes, backgrounds...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Spells
// ============================================================================

/// Schools of magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpellSchool {
    Abjuration,
    Conjuration,
    Divination,
    Enchantment,
    Evocation,
    Illusion,
    Necromancy,
    Transmutation,
}

impl SpellSchool {
    pub fn name(&self) -> &'static str {
        match self {
            SpellSchool::Abjuration => "Abjuration",
            SpellSchool::Conjuration => "Conjuration",
            SpellSchool::Divination => "Divination",
            SpellSchool::Enchantment => "Enchantment",
            SpellSchool::Evocation => "Evocation",
            SpellSchool::Illusion => "Illusion",
            SpellSchool::Necromancy => "Necromancy",
            SpellSchool::Transmutation => "Transmutation",
        }
    }
}

impl fmt::Display for SpellSchool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A spell definition, looked up by name when validating spell choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellDef {
    pub name: String,
    /// 0 = cantrip.
    pub level: u8,
    pub school: SpellSchool,
    pub ritual: bool,
    /// Classes on whose spell list this spell appears.
    pub classes: Vec<EntityId>,
}

impl SpellDef {
    pub fn new(name: impl Into<String>, level: u8, school: SpellSchool) -> Self {
        Self {
            name: name.into(),
            level,
            school,
            ritual: false,
            classes: Vec::new(),
        }
    }

    pub fn ritual(mut self) -> Self {
        self.ritual = true;
        self
    }

    pub fn for_class(mut self, class: EntityId) -> Self {
        self.classes.push(class);
        self
    }

    pub fn is_cantrip(&self) -> bool {
        self.level == 0
    }
}

// ============================================================================
// Sources
// ============================================================================

/// A playable race. Subraces point at their parent race and inherit its
/// choice groups and resource pools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RaceDef {
    pub id: EntityId,
    pub name: String,
    pub parent: Option<EntityId>,
    pub pools: Vec<ResourcePoolDef>,
}

impl RaceDef {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            parent: None,
            pools: Vec::new(),
        }
    }

    pub fn subrace_of(mut self, parent: EntityId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_pool(mut self, pool: ResourcePoolDef) -> Self {
        self.pools.push(pool);
        self
    }
}

/// A character class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDef {
    pub id: EntityId,
    pub name: String,
    pub hit_die: DieType,
    pub pools: Vec<ResourcePoolDef>,
}

impl ClassDef {
    pub fn new(id: EntityId, name: impl Into<String>, hit_die: DieType) -> Self {
        Self {
            id,
            name: name.into(),
            hit_die,
            pools: Vec::new(),
        }
    }

    pub fn with_pool(mut self, pool: ResourcePoolDef) -> Self {
        self.pools.push(pool);
        self
    }
}

/// A subclass. Its choice groups and pools are gated by the level the
/// character has in the owning class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubclassDef {
    pub id: EntityId,
    pub name: String,
    pub class: EntityId,
    pub pools: Vec<ResourcePoolDef>,
}

impl SubclassDef {
    pub fn new(id: EntityId, name: impl Into<String>, class: EntityId) -> Self {
        Self {
            id,
            name: name.into(),
            class,
            pools: Vec::new(),
        }
    }

    pub fn with_pool(mut self, pool: ResourcePoolDef) -> Self {
        self.pools.push(pool);
        self
    }
}

/// A character background.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackgroundDef {
    pub id: EntityId,
    pub name: String,
}

impl BackgroundDef {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A feat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatDef {
    pub id: EntityId,
    pub name: String,
    pub pools: Vec<ResourcePoolDef>,
}

impl FeatDef {
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pools: Vec::new(),
        }
    }

    pub fn with_pool(mut self, pool: ResourcePoolDef) -> Self {
        self.pools.push(pool);
        self
    }
}

// ============================================================================
// Standard option lookup
// ============================================================================

lazy_static::lazy_static! {
    /// Standard languages of the common campaign settings.
    pub static ref STANDARD_LANGUAGES: Vec<&'static str> = vec![
        "Common", "Dwarvish", "Elvish", "Giant", "Gnomish", "Goblin",
        "Halfling", "Orc",
    ];

    /// Exotic languages.
    pub static ref EXOTIC_LANGUAGES: Vec<&'static str> = vec![
        "Abyssal", "Celestial", "Deep Speech", "Draconic", "Infernal",
        "Primordial", "Sylvan", "Undercommon",
    ];

    /// Artisan's tools.
    pub static ref ARTISAN_TOOLS: Vec<&'static str> = vec![
        "Alchemist's Supplies", "Brewer's Supplies", "Calligrapher's Supplies",
        "Carpenter's Tools", "Cartographer's Tools", "Cobbler's Tools",
        "Cook's Utensils", "Glassblower's Tools", "Jeweler's Tools",
        "Leatherworker's Tools", "Mason's Tools", "Painter's Supplies",
        "Potter's Tools", "Smith's Tools", "Tinker's Tools", "Weaver's Tools",
        "Woodcarver's Tools",
    ];

    /// Musical instruments.
    pub static ref MUSICAL_INSTRUMENTS: Vec<&'static str> = vec![
        "Bagpipes", "Drum", "Dulcimer", "Flute", "Horn", "Lute", "Lyre",
        "Pan Flute", "Shawm", "Viol",
    ];

    /// Gaming sets.
    pub static ref GAMING_SETS: Vec<&'static str> = vec![
        "Dice Set", "Dragonchess Set", "Playing Card Set", "Three-Dragon Ante Set",
    ];
}

/// Category keys understood by [`StandardLookup`].
pub mod categories {
    pub const SKILLS: &str = "skills";
    pub const STANDARD_LANGUAGES: &str = "standard-languages";
    pub const EXOTIC_LANGUAGES: &str = "exotic-languages";
    pub const ARTISAN_TOOLS: &str = "artisan-tools";
    pub const MUSICAL_INSTRUMENTS: &str = "musical-instruments";
    pub const GAMING_SETS: &str = "gaming-sets";
}

/// Default option-lookup collaborator backed by the standard tables above.
///
/// Platforms with homebrew content supply their own [`OptionLookup`]; the
/// standard tables cover the common case.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLookup;

impl OptionLookup for StandardLookup {
    fn candidates(&self, category: &str) -> Vec<String> {
        let names: &[&str] = match category {
            categories::STANDARD_LANGUAGES => &STANDARD_LANGUAGES,
            categories::EXOTIC_LANGUAGES => &EXOTIC_LANGUAGES,
            categories::ARTISAN_TOOLS => &ARTISAN_TOOLS,
            categories::MUSICAL_INSTRUMENTS => &MUSICAL_INSTRUMENTS,
            categories::GAMING_SETS => &GAMING_SETS,
            categories::SKILLS => {
                return Skill::all().iter().map(|s| s.name().to_string()).collect()
            }
            _ => return Vec::new(),
        };
        names.iter().map(|n| n.to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_lookup_categories() {
        let lookup = StandardLookup;
        assert!(lookup
            .candidates(categories::STANDARD_LANGUAGES)
            .contains(&"Elvish".to_string()));
        assert!(lookup
            .candidates(categories::ARTISAN_TOOLS)
            .contains(&"Smith's Tools".to_string()));
        assert_eq!(lookup.candidates(categories::SKILLS).len(), 18);
        assert!(lookup.candidates("no-such-category").is_empty());
    }

    #[test]
    fn test_spell_builder() {
        let wizard = EntityId::new();
        let spell = SpellDef::new("Detect Magic", 1, SpellSchool::Divination)
            .ritual()
            .for_class(wizard);
        assert!(spell.ritual);
        assert!(!spell.is_cantrip());
        assert!(spell.classes.contains(&wizard));
    }
}
