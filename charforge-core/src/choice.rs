//! The resolver protocol: the uniform contract every choice kind satisfies.
//!
//! A resolver turns catalog groups into [`PendingChoice`]s for a character,
//! validates submitted selections against the group's constraints, and
//! supports undo. The [`ResolverRegistry`] holds one resolver per
//! [`ChoiceKind`] and aggregates their output into one stable queue.
//!
//! Choice identifiers are structured values ([`ChoiceId`]); the string
//! encoding exists only for the system boundary and is versioned. Internal
//! logic never parses identifier strings apart.

use crate::catalog::{ChoiceCatalog, ChoiceGroup, ChoiceKind, ConfigError, GroupRef, Owner, OwnerKind};
use crate::character::{Ability, Character, Skill};
use crate::content::{EntityId, SpellSchool};
use crate::resolvers;
use crate::store::{EntityStore, OptionLookup};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Selection values
// ============================================================================

/// A value submitted for (or recorded against) a choice. Each resolver
/// accepts only the variants meaningful for its kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChoiceValue {
    Ability(Ability),
    Skill(Skill),
    /// A named entity: spell, language, tool, item, or optional feature.
    Name(String),
}

impl ChoiceValue {
    pub fn label(&self) -> String {
        match self {
            ChoiceValue::Ability(ability) => ability.name().to_string(),
            ChoiceValue::Skill(skill) => skill.name().to_string(),
            ChoiceValue::Name(name) => name.clone(),
        }
    }
}

impl fmt::Display for ChoiceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// Choice identifiers
// ============================================================================

/// Identifier version emitted and accepted by the string encoding.
const CHOICE_ID_VERSION: &str = "v1";

/// The structured identity of one pending choice: the kind plus the catalog
/// group it came from. Deterministic — re-fetching pending choices yields
/// the same identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChoiceId {
    pub kind: ChoiceKind,
    pub group: GroupRef,
}

impl ChoiceId {
    pub fn new(kind: ChoiceKind, group: GroupRef) -> Self {
        Self { kind, group }
    }

    /// Encode for the system boundary:
    /// `v1:<kind>:<owner-kind>:<owner-id>:<level|->:<key>`.
    pub fn encode(&self) -> String {
        let level = match self.group.level {
            Some(level) => level.to_string(),
            None => "-".to_string(),
        };
        format!(
            "{}:{}:{}:{}:{}:{}",
            CHOICE_ID_VERSION,
            self.kind.name(),
            self.group.owner.kind.name(),
            self.group.owner.id,
            level,
            self.group.key,
        )
    }

    /// Decode a boundary identifier. Rejects unknown versions outright.
    pub fn decode(encoded: &str) -> Result<Self, ChoiceIdError> {
        let mut parts = encoded.splitn(6, ':');
        let version = parts.next().unwrap_or_default();
        if version != CHOICE_ID_VERSION {
            return Err(ChoiceIdError::UnsupportedVersion(version.to_string()));
        }
        let malformed = || ChoiceIdError::Malformed(encoded.to_string());

        let kind = parts
            .next()
            .and_then(ChoiceKind::from_name)
            .ok_or_else(malformed)?;
        let owner_kind = parts
            .next()
            .and_then(OwnerKind::from_name)
            .ok_or_else(malformed)?;
        let owner_id = parts
            .next()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(EntityId)
            .ok_or_else(malformed)?;
        let level = match parts.next().ok_or_else(malformed)? {
            "-" => None,
            digits => Some(digits.parse::<u8>().map_err(|_| malformed())?),
        };
        let key = parts.next().ok_or_else(malformed)?.to_string();
        if key.is_empty() {
            return Err(malformed());
        }

        Ok(Self {
            kind,
            group: GroupRef {
                owner: Owner {
                    kind: owner_kind,
                    id: owner_id,
                },
                level,
                key,
            },
        })
    }
}

impl fmt::Display for ChoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode())
    }
}

/// Error type for boundary identifier decoding.
#[derive(Debug, Error)]
pub enum ChoiceIdError {
    #[error("Unsupported choice id version '{0}'")]
    UnsupportedVersion(String),
    #[error("Malformed choice id '{0}'")]
    Malformed(String),
}

// ============================================================================
// Pending choices
// ============================================================================

/// One renderable option of a pending choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionView {
    pub label: String,
    /// Equipment bundle letter, when applicable.
    pub bundle: Option<char>,
    /// Set when the candidate set is enumerated by the option-lookup
    /// collaborator instead of being listed inline.
    pub lookup: Option<String>,
}

/// The resolver-computed view of one actionable (or already-resolved)
/// choice group for one character. Recomputed on every request, never
/// cached across character mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    pub id: ChoiceId,
    pub kind: ChoiceKind,
    /// Human-readable source, e.g. "Wizard 1" or "High Elf".
    pub source: String,
    /// Display label of the group.
    pub name: String,
    pub required: u8,
    pub optional: bool,
    pub selected: Vec<ChoiceValue>,
    pub remaining: u8,
    pub options: Vec<OptionView>,
    /// Ability-score kinds: the bonus each selected ability receives.
    pub bonus: Option<i8>,
    /// Whether submitted values must be pairwise distinct.
    pub distinct: bool,
}

impl PendingChoice {
    pub fn is_resolved(&self) -> bool {
        self.remaining == 0
    }
}

// ============================================================================
// Resolution records
// ============================================================================

/// One persisted selection, linked back to the catalog group it resolves so
/// same-kind selections of different origins stay distinguishable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    pub group: GroupRef,
    pub kind: ChoiceKind,
    pub value: ChoiceValue,
    /// For quantity kinds (ability-score bonuses): the applied magnitude,
    /// so undo can revert it exactly.
    pub magnitude: Option<i8>,
}

impl ResolutionRecord {
    pub fn new(group: &ChoiceGroup, value: ChoiceValue) -> Self {
        Self {
            group: group.group_ref(),
            kind: group.kind,
            value,
            magnitude: None,
        }
    }

    pub fn with_magnitude(mut self, magnitude: i8) -> Self {
        self.magnitude = Some(magnitude);
        self
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A submitted selection violated a group constraint. Always recoverable;
/// names the offending value and the constraint, never silently coerced.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Expected exactly {expected} values, got {got}")]
    WrongCount { expected: u8, got: usize },
    #[error("'{value}' is not a valid {expected} selection")]
    WrongValueType {
        value: String,
        expected: &'static str,
    },
    #[error("'{0}' was submitted more than once but selections must be distinct")]
    DuplicateValue(String),
    #[error("'{0}' is not among this choice's options")]
    NotAnOption(String),
    #[error("Unknown spell '{0}'")]
    UnknownSpell(String),
    #[error("'{spell}' is level {level}, above the allowed maximum of {max_level}")]
    SpellLevelTooHigh {
        spell: String,
        level: u8,
        max_level: u8,
    },
    #[error("'{spell}' is not on the {class} spell list")]
    NotOnSpellList { spell: String, class: String },
    #[error("'{spell}' is not a {required} spell")]
    WrongSchool {
        spell: String,
        required: SpellSchool,
    },
    #[error("'{spell}' cannot be cast as a ritual")]
    NotRitual { spell: String },
    #[error("'{value}' is not a known {category} candidate")]
    NotInCategory { value: String, category: String },
    #[error("'{value}' does not belong to a single equipment bundle")]
    BundleMismatch { value: String },
    #[error("Bundle '{bundle}' grants {expected} items, got {got}")]
    IncompleteBundle {
        bundle: char,
        expected: usize,
        got: usize,
    },
    #[error("A roll of {roll} is out of range for a d{sides}")]
    RollOutOfRange { roll: u8, sides: u8 },
}

/// The request referred to state the character does not have. Reported, not
/// fatal.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Choice {0} does not exist for this character")]
    UnknownChoice(ChoiceId),
    #[error("Choice {0} is a permanent grant and cannot be undone")]
    NotUndoable(ChoiceId),
    #[error("Hit points for level {0} are already resolved")]
    HpGainAlreadyResolved(u8),
    #[error("Level {level} has no pending hit-point gain (total level {total})")]
    HpLevelOutOfRange { level: u8, total: u8 },
    #[error("No content entity with id {0}")]
    UnknownEntity(EntityId),
    #[error("Character already has levels in class {0}")]
    DuplicateClass(EntityId),
    #[error("Character has no levels in class {0}")]
    MissingClass(EntityId),
    #[error("Character already has feat {0}")]
    DuplicateFeat(EntityId),
    #[error("Subclass {subclass} does not belong to class {class}")]
    SubclassMismatch { subclass: EntityId, class: EntityId },
}

// ============================================================================
// Resolver protocol
// ============================================================================

/// Read-only collaborators a resolver needs while enumerating or
/// validating.
pub struct ResolveContext<'a> {
    pub entities: &'a dyn EntityStore,
    pub lookup: &'a dyn OptionLookup,
    pub catalog: &'a ChoiceCatalog,
}

/// The protocol every choice kind implements.
///
/// `resolve` is atomic and overwriting: the full required count is
/// submitted in one call, and a second resolve replaces the first. Side
/// effects beyond the returned records (ability-score application) are made
/// on the character snapshot and must be reverted by `undo`.
pub trait ChoiceResolver: Send + Sync {
    fn kind(&self) -> ChoiceKind;

    /// Every group of this kind applicable to the character's current
    /// sources at their current levels, joined with existing resolutions.
    fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice>;

    /// Validate a submission against the group's constraints and produce
    /// the records to persist, applying any character-side effects.
    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        character: &mut Character,
        group: &ChoiceGroup,
        values: &[ChoiceValue],
    ) -> Result<Vec<ResolutionRecord>, SelectionError>;

    /// Whether the group's resolution may be undone.
    fn can_undo(&self, group: &ChoiceGroup) -> bool {
        !group.permanent
    }

    /// Revert character-side effects of existing records. Record removal
    /// itself is the caller's job. Default: nothing to revert.
    fn undo(
        &self,
        _ctx: &ResolveContext<'_>,
        _character: &mut Character,
        _group: &ChoiceGroup,
        _records: &[ResolutionRecord],
    ) {
    }
}

// ============================================================================
// Registry & dispatcher
// ============================================================================

/// Holds one resolver per kind and aggregates their output. The registry is
/// built once at process start; an identifier whose kind has no registered
/// resolver is a configuration error. It holds no selection state.
pub struct ResolverRegistry {
    resolvers: Vec<Box<dyn ChoiceResolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// The standard registry covering every [`ChoiceKind`].
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(resolvers::ProficiencyResolver));
        registry.register(Box::new(resolvers::LanguageResolver));
        registry.register(Box::new(resolvers::AbilityScoreResolver));
        registry.register(Box::new(resolvers::EquipmentResolver));
        registry.register(Box::new(resolvers::SpellResolver));
        registry.register(Box::new(resolvers::OptionalFeatureResolver));
        registry
    }

    /// Register a resolver, replacing any existing resolver of its kind.
    pub fn register(&mut self, resolver: Box<dyn ChoiceResolver>) {
        let kind = resolver.kind();
        self.resolvers.retain(|r| r.kind() != kind);
        self.resolvers.push(resolver);
    }

    pub fn kinds(&self) -> Vec<ChoiceKind> {
        self.resolvers.iter().map(|r| r.kind()).collect()
    }

    pub fn resolver_for(&self, kind: ChoiceKind) -> Result<&dyn ChoiceResolver, ConfigError> {
        self.resolvers
            .iter()
            .find(|r| r.kind() == kind)
            .map(|r| r.as_ref())
            .ok_or(ConfigError::UnregisteredKind(kind))
    }

    /// Aggregate every resolver's pending choices into one queue with a
    /// stable order: source level first (immediate groups leading), then
    /// owner, then group key.
    pub fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice> {
        let mut pending: Vec<PendingChoice> = self
            .resolvers
            .iter()
            .flat_map(|r| r.pending_choices(ctx, character, resolutions))
            .collect();
        pending.sort_by(|a, b| {
            let a_key = (
                a.id.group.level.unwrap_or(0),
                a.id.group.owner.clone(),
                a.id.group.key.clone(),
            );
            let b_key = (
                b.id.group.level.unwrap_or(0),
                b.id.group.owner.clone(),
                b.id.group.key.clone(),
            );
            a_key.cmp(&b_key)
        });
        pending
    }

    /// Locate the catalog group behind an identifier, verifying the
    /// character still has the owning source at a sufficient level. A stale
    /// identifier (race changed, class removed) is a state error, not a
    /// panic.
    pub fn locate_group<'a>(
        &self,
        ctx: &ResolveContext<'a>,
        character: &Character,
        id: &ChoiceId,
    ) -> Result<&'a ChoiceGroup, StateError> {
        let group = ctx
            .catalog
            .group(&id.group)
            .ok_or_else(|| StateError::UnknownChoice(id.clone()))?;
        if group.kind != id.kind {
            return Err(StateError::UnknownChoice(id.clone()));
        }
        let owned = resolvers::character_sources(ctx.entities, character)
            .into_iter()
            .any(|(owner, max_level)| {
                owner == group.owner && group.level.map_or(true, |l| l <= max_level)
            });
        if !owned {
            return Err(StateError::UnknownChoice(id.clone()));
        }
        Ok(group)
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
