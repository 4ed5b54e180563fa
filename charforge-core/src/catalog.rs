//! The choice catalog: declarative data describing what choices each
//! content entity offers, to whom, and at which level.
//!
//! Catalog rows are produced by the platform's content import (out of scope
//! here) and are immutable at resolution time. The engine only queries them:
//! [`ChoiceCatalog::groups_for`] returns the groups an owner grants at or
//! below a level, and [`ChoiceCatalog::validate`] fails fast on rows a
//! resolver could never satisfy.

use crate::character::{Ability, Skill};
use crate::content::{EntityId, SpellSchool};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// ============================================================================
// Owners
// ============================================================================

/// The kinds of entity that can own choice groups.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum OwnerKind {
    Race,
    Class,
    Subclass,
    Background,
    Feat,
}

impl OwnerKind {
    pub fn name(&self) -> &'static str {
        match self {
            OwnerKind::Race => "race",
            OwnerKind::Class => "class",
            OwnerKind::Subclass => "subclass",
            OwnerKind::Background => "background",
            OwnerKind::Feat => "feat",
        }
    }

    pub fn from_name(name: &str) -> Option<OwnerKind> {
        match name {
            "race" => Some(OwnerKind::Race),
            "class" => Some(OwnerKind::Class),
            "subclass" => Some(OwnerKind::Subclass),
            "background" => Some(OwnerKind::Background),
            "feat" => Some(OwnerKind::Feat),
            _ => None,
        }
    }
}

impl fmt::Display for OwnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A tagged reference to the entity that owns a choice group or grants a
/// resource pool. Lookups dispatch on the kind explicitly; there is no
/// owner inheritance hierarchy.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: EntityId,
}

impl Owner {
    pub fn race(id: EntityId) -> Self {
        Self {
            kind: OwnerKind::Race,
            id,
        }
    }

    pub fn class(id: EntityId) -> Self {
        Self {
            kind: OwnerKind::Class,
            id,
        }
    }

    pub fn subclass(id: EntityId) -> Self {
        Self {
            kind: OwnerKind::Subclass,
            id,
        }
    }

    pub fn background(id: EntityId) -> Self {
        Self {
            kind: OwnerKind::Background,
            id,
        }
    }

    pub fn feat(id: EntityId) -> Self {
        Self {
            kind: OwnerKind::Feat,
            id,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

// ============================================================================
// Choice kinds
// ============================================================================

/// The closed set of choice kinds the resolver registry covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceKind {
    Proficiency,
    Language,
    AbilityScore,
    Equipment,
    Spell,
    OptionalFeature,
}

impl ChoiceKind {
    pub fn name(&self) -> &'static str {
        match self {
            ChoiceKind::Proficiency => "proficiency",
            ChoiceKind::Language => "language",
            ChoiceKind::AbilityScore => "ability-score",
            ChoiceKind::Equipment => "equipment",
            ChoiceKind::Spell => "spell",
            ChoiceKind::OptionalFeature => "optional-feature",
        }
    }

    pub fn from_name(name: &str) -> Option<ChoiceKind> {
        match name {
            "proficiency" => Some(ChoiceKind::Proficiency),
            "language" => Some(ChoiceKind::Language),
            "ability-score" => Some(ChoiceKind::AbilityScore),
            "equipment" => Some(ChoiceKind::Equipment),
            "spell" => Some(ChoiceKind::Spell),
            "optional-feature" => Some(ChoiceKind::OptionalFeature),
            _ => None,
        }
    }

    pub fn all() -> &'static [ChoiceKind] {
        &[
            ChoiceKind::Proficiency,
            ChoiceKind::Language,
            ChoiceKind::AbilityScore,
            ChoiceKind::Equipment,
            ChoiceKind::Spell,
            ChoiceKind::OptionalFeature,
        ]
    }
}

impl fmt::Display for ChoiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================================================
// Group identity
// ============================================================================

/// The stable identity of one choice group: owner, level gate, and the
/// group key unique within the owner. Resolution records point back at
/// their group through this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupRef {
    pub owner: Owner,
    pub level: Option<u8>,
    pub key: String,
}

impl fmt::Display for GroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Some(level) => write!(f, "{}/{} (level {})", self.owner, self.key, level),
            None => write!(f, "{}/{}", self.owner, self.key),
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Constraints on an unrestricted option. Only the non-`None` fields apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionFilter {
    /// Highest allowed spell level (0 = cantrips only).
    pub max_spell_level: Option<u8>,
    /// The chosen spell must appear on this class's spell list.
    pub spell_list: Option<EntityId>,
    /// Required school of magic.
    pub school: Option<SpellSchool>,
    /// Only ritual spells qualify.
    pub ritual_only: bool,
    /// Candidate category resolved through the option-lookup collaborator
    /// (proficiency subcategories, language tiers).
    pub category: Option<String>,
}

impl OptionFilter {
    pub fn category(name: impl Into<String>) -> Self {
        Self {
            category: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn spells(max_level: u8, spell_list: EntityId) -> Self {
        Self {
            max_spell_level: Some(max_level),
            spell_list: Some(spell_list),
            ..Self::default()
        }
    }

    pub fn ritual(mut self) -> Self {
        self.ritual_only = true;
        self
    }

    pub fn of_school(mut self, school: SpellSchool) -> Self {
        self.school = Some(school);
        self
    }
}

/// What a single option points at: a concrete target, or a filter admitting
/// any matching candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptionTarget {
    Ability(Ability),
    Skill(Skill),
    /// A named entity: a spell, an item, a language, an optional feature.
    Name(String),
    /// Unrestricted; constrained by the filter.
    Filtered(OptionFilter),
}

/// A candidate within a choice group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub target: OptionTarget,
    /// Equipment options carry a letter tag grouping mutually exclusive
    /// bundles.
    pub bundle: Option<char>,
}

impl ChoiceOption {
    pub fn ability(ability: Ability) -> Self {
        Self {
            target: OptionTarget::Ability(ability),
            bundle: None,
        }
    }

    pub fn skill(skill: Skill) -> Self {
        Self {
            target: OptionTarget::Skill(skill),
            bundle: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            target: OptionTarget::Name(name.into()),
            bundle: None,
        }
    }

    pub fn filtered(filter: OptionFilter) -> Self {
        Self {
            target: OptionTarget::Filtered(filter),
            bundle: None,
        }
    }

    pub fn in_bundle(mut self, letter: char) -> Self {
        self.bundle = Some(letter);
        self
    }
}

// ============================================================================
// Groups
// ============================================================================

/// One declared choice: "choose N of kind K, granted by owner O at level L".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceGroup {
    pub owner: Owner,
    /// `None` applies immediately (races, backgrounds); `Some(l)` discloses
    /// the group once the owner reaches level `l`.
    pub level: Option<u8>,
    /// Stable key, unique within `(owner, level)`.
    pub key: String,
    /// Display label for pending-choice listings.
    pub label: String,
    pub kind: ChoiceKind,
    pub required: u8,
    pub optional: bool,
    /// Always-granted benefits that are recorded but may not be undone.
    pub permanent: bool,
    /// Ability-score kinds: the bonus each selected ability receives.
    pub bonus: Option<i8>,
    /// Whether submitted values must be pairwise distinct.
    pub distinct: bool,
    pub options: Vec<ChoiceOption>,
}

impl ChoiceGroup {
    pub fn new(owner: Owner, kind: ChoiceKind, key: impl Into<String>, required: u8) -> Self {
        let key = key.into();
        Self {
            owner,
            level: None,
            label: key.clone(),
            key,
            kind,
            required,
            optional: false,
            permanent: false,
            bonus: None,
            distinct: true,
            options: Vec::new(),
        }
    }

    pub fn at_level(mut self, level: u8) -> Self {
        self.level = Some(level);
        self
    }

    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn permanent(mut self) -> Self {
        self.permanent = true;
        self
    }

    pub fn with_bonus(mut self, bonus: i8) -> Self {
        self.bonus = Some(bonus);
        self
    }

    pub fn allow_repeats(mut self) -> Self {
        self.distinct = false;
        self
    }

    pub fn with_option(mut self, option: ChoiceOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn with_options(mut self, options: impl IntoIterator<Item = ChoiceOption>) -> Self {
        self.options.extend(options);
        self
    }

    pub fn group_ref(&self) -> GroupRef {
        GroupRef {
            owner: self.owner.clone(),
            level: self.level,
            key: self.key.clone(),
        }
    }

    /// The distinct bundle letters of an equipment group, in option order.
    pub fn bundle_letters(&self) -> Vec<char> {
        let mut letters = Vec::new();
        for option in &self.options {
            if let Some(letter) = option.bundle {
                if !letters.contains(&letter) {
                    letters.push(letter);
                }
            }
        }
        letters
    }
}

// ============================================================================
// Configuration errors
// ============================================================================

/// Catalog rows or registry wiring a resolver could never satisfy. These
/// abort the operation; they are never returned as selection feedback.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Choice group {0} has no options")]
    ZeroOptions(GroupRef),
    #[error("Choice group {0} references an owner missing from the entity store")]
    UnknownOwner(GroupRef),
    #[error("Ability-score group {0} has no bonus magnitude")]
    MissingBonus(GroupRef),
    #[error("Equipment group {0} has options without a bundle letter")]
    UntaggedEquipmentOption(GroupRef),
    #[error("Choice group {0} requires zero selections")]
    ZeroRequired(GroupRef),
    #[error("No resolver registered for choice kind '{0}'")]
    UnregisteredKind(ChoiceKind),
}

// ============================================================================
// Catalog
// ============================================================================

/// The full set of choice groups known to the platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceCatalog {
    groups: Vec<ChoiceGroup>,
}

impl ChoiceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a group, replacing any existing group with the same
    /// `(owner, level, key)` identity. Re-import is idempotent.
    pub fn insert(&mut self, group: ChoiceGroup) {
        let group_ref = group.group_ref();
        if let Some(existing) = self.groups.iter_mut().find(|g| g.group_ref() == group_ref) {
            *existing = group;
        } else {
            self.groups.push(group);
        }
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// All groups the owner grants at or below `max_level`. Level-less
    /// groups apply unconditionally. Insertion order is preserved.
    pub fn groups_for(&self, owner: &Owner, max_level: u8) -> Vec<&ChoiceGroup> {
        self.groups
            .iter()
            .filter(|g| &g.owner == owner)
            .filter(|g| match g.level {
                None => true,
                Some(level) => level <= max_level,
            })
            .collect()
    }

    /// Exact lookup by group identity.
    pub fn group(&self, group_ref: &GroupRef) -> Option<&ChoiceGroup> {
        self.groups.iter().find(|g| &g.group_ref() == group_ref)
    }

    /// Every distinct kind appearing in the catalog.
    pub fn kinds(&self) -> Vec<ChoiceKind> {
        let mut kinds = Vec::new();
        for group in &self.groups {
            if !kinds.contains(&group.kind) {
                kinds.push(group.kind);
            }
        }
        kinds
    }

    /// Fail-fast validation of catalog rows against the entity store.
    /// Run at engine construction, before any resolution is attempted.
    pub fn validate(&self, entities: &dyn crate::store::EntityStore) -> Result<(), ConfigError> {
        for group in &self.groups {
            let group_ref = group.group_ref();
            if group.options.is_empty() {
                return Err(ConfigError::ZeroOptions(group_ref));
            }
            if group.required == 0 {
                return Err(ConfigError::ZeroRequired(group_ref));
            }
            if !owner_exists(entities, &group.owner) {
                return Err(ConfigError::UnknownOwner(group_ref));
            }
            match group.kind {
                ChoiceKind::AbilityScore if group.bonus.is_none() => {
                    return Err(ConfigError::MissingBonus(group_ref));
                }
                ChoiceKind::Equipment if group.options.iter().any(|o| o.bundle.is_none()) => {
                    return Err(ConfigError::UntaggedEquipmentOption(group_ref));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Parse a catalog from the JSON the content import produces.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the catalog back to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn owner_exists(entities: &dyn crate::store::EntityStore, owner: &Owner) -> bool {
    match owner.kind {
        OwnerKind::Race => entities.race(owner.id).is_some(),
        OwnerKind::Class => entities.class(owner.id).is_some(),
        OwnerKind::Subclass => entities.subclass(owner.id).is_some(),
        OwnerKind::Background => entities.background(owner.id).is_some(),
        OwnerKind::Feat => entities.feat(owner.id).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_group(owner: Owner, key: &str) -> ChoiceGroup {
        ChoiceGroup::new(owner, ChoiceKind::Proficiency, key, 2)
            .with_option(ChoiceOption::skill(Skill::Athletics))
            .with_option(ChoiceOption::skill(Skill::Perception))
    }

    #[test]
    fn test_insert_is_idempotent() {
        let owner = Owner::class(EntityId::new());
        let mut catalog = ChoiceCatalog::new();
        catalog.insert(sample_group(owner.clone(), "skills"));
        catalog.insert(sample_group(owner.clone(), "skills"));
        assert_eq!(catalog.len(), 1);

        catalog.insert(sample_group(owner, "expertise"));
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_groups_for_respects_level_gate() {
        let owner = Owner::class(EntityId::new());
        let mut catalog = ChoiceCatalog::new();
        catalog.insert(sample_group(owner.clone(), "skills"));
        catalog.insert(sample_group(owner.clone(), "expertise").at_level(6));

        let at_1 = catalog.groups_for(&owner, 1);
        assert_eq!(at_1.len(), 1);
        assert_eq!(at_1[0].key, "skills");

        let at_6 = catalog.groups_for(&owner, 6);
        assert_eq!(at_6.len(), 2);
    }

    #[test]
    fn test_groups_for_other_owner_is_empty() {
        let mut catalog = ChoiceCatalog::new();
        catalog.insert(sample_group(Owner::class(EntityId::new()), "skills"));
        assert!(catalog
            .groups_for(&Owner::class(EntityId::new()), 20)
            .is_empty());
    }

    #[test]
    fn test_json_round_trip() {
        let owner = Owner::background(EntityId::new());
        let mut catalog = ChoiceCatalog::new();
        catalog.insert(
            ChoiceGroup::new(owner, ChoiceKind::Language, "languages", 2)
                .labelled("Bonus Languages")
                .with_option(ChoiceOption::filtered(OptionFilter::category(
                    "standard-languages",
                ))),
        );

        let json = catalog.to_json().unwrap();
        let parsed = ChoiceCatalog::from_json(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(
            parsed.groups[0].group_ref(),
            catalog.groups[0].group_ref()
        );
    }
}
