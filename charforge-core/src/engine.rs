//! The engine facade collaborators talk to.
//!
//! Wires the choice catalog, resolver registry, counter engine, and HP
//! progression over the store contracts. Every call is synchronous and
//! reads/writes one character's state; catalog and registry configuration
//! is validated once, at construction, so resolution never trips over a
//! misconfigured group.

use crate::catalog::{ChoiceCatalog, ConfigError};
use crate::character::{Ability, Character, CharacterId, ClassLevel};
use crate::choice::{
    ChoiceId, ChoiceValue, PendingChoice, ResolutionRecord, ResolveContext, ResolverRegistry,
    SelectionError, StateError,
};
use crate::content::EntityId;
use crate::counters::{self, CounterError, CounterView, ResetTiming};
use crate::progression::{self, HpError, HpGainChoice, HpPendingChoice};
use crate::store::{CharacterStore, EntityStore, OptionLookup, StoreError};
use thiserror::Error;
use tracing::{info, instrument};

/// Error type for engine operations, spanning the whole taxonomy:
/// configuration (fatal), selection and state (recoverable), and store
/// failures.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Selection(#[from] SelectionError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Counter(#[from] CounterError),
}

impl From<HpError> for EngineError {
    fn from(error: HpError) -> Self {
        match error {
            HpError::State(e) => EngineError::State(e),
            HpError::Selection(e) => EngineError::Selection(e),
        }
    }
}

/// Tunables for the choice queue.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Keep fully-resolved groups in the pending listing (with their
    /// selected values) instead of suppressing them.
    pub include_resolved: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            include_resolved: true,
        }
    }
}

/// The choice resolution & progression engine.
pub struct Engine<E, O, C>
where
    E: EntityStore,
    O: OptionLookup,
    C: CharacterStore,
{
    entities: E,
    lookup: O,
    characters: C,
    catalog: ChoiceCatalog,
    registry: ResolverRegistry,
    options: EngineOptions,
}

impl<E, O, C> Engine<E, O, C>
where
    E: EntityStore,
    O: OptionLookup,
    C: CharacterStore,
{
    /// Build an engine over the given stores and catalog, validating the
    /// catalog rows and resolver coverage up front. Configuration problems
    /// surface here, not at resolution time.
    pub fn new(
        entities: E,
        lookup: O,
        characters: C,
        catalog: ChoiceCatalog,
    ) -> Result<Self, ConfigError> {
        let registry = ResolverRegistry::standard();
        catalog.validate(&entities)?;
        for kind in catalog.kinds() {
            registry.resolver_for(kind)?;
        }
        Ok(Self {
            entities,
            lookup,
            characters,
            catalog,
            registry,
            options: EngineOptions::default(),
        })
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn entities(&self) -> &E {
        &self.entities
    }

    pub fn character(&self, id: CharacterId) -> Result<Character, EngineError> {
        Ok(self.characters.character(id)?)
    }

    // ------------------------------------------------------------------
    // Choices
    // ------------------------------------------------------------------

    /// The character's choice queue, aggregated across every resolver in a
    /// stable order.
    pub fn pending_choices(&self, id: CharacterId) -> Result<Vec<PendingChoice>, EngineError> {
        let character = self.characters.character(id)?;
        let resolutions = self.characters.resolutions(id)?;
        let ctx = ResolveContext {
            entities: &self.entities,
            lookup: &self.lookup,
            catalog: &self.catalog,
        };
        let mut pending = self.registry.pending_choices(&ctx, &character, &resolutions);
        if !self.options.include_resolved {
            pending.retain(|p| !p.is_resolved());
        }
        Ok(pending)
    }

    /// Validate and apply one selection. Overwrites any prior resolution of
    /// the same group; returns the group's refreshed pending view.
    #[instrument(skip(self, values), fields(character = %id, choice = %choice_id))]
    pub fn resolve(
        &mut self,
        id: CharacterId,
        choice_id: &ChoiceId,
        values: &[ChoiceValue],
    ) -> Result<PendingChoice, EngineError> {
        let character = self.characters.character(id)?;
        let resolutions = self.characters.resolutions(id)?;
        let ctx = ResolveContext {
            entities: &self.entities,
            lookup: &self.lookup,
            catalog: &self.catalog,
        };

        let group = self.registry.locate_group(&ctx, &character, choice_id)?;
        let resolver = self.registry.resolver_for(choice_id.kind)?;
        let group_ref = group.group_ref();
        let existing: Vec<ResolutionRecord> = resolutions
            .iter()
            .filter(|r| r.group == group_ref)
            .cloned()
            .collect();

        // Work on a copy so a failed validation leaves the character
        // untouched.
        let mut updated = character.clone();
        if !existing.is_empty() {
            resolver.undo(&ctx, &mut updated, group, &existing);
        }
        let records = resolver.resolve(&ctx, &mut updated, group, values)?;

        let old_con = character.constitution_modifier();
        let new_con = updated.constitution_modifier();
        if new_con != old_con {
            progression::apply_constitution_change(&mut updated, old_con, new_con);
        }

        self.characters.save_character(&updated)?;
        self.characters
            .replace_resolutions(id, &group_ref, records)?;
        info!(group = %group_ref, "choice resolved");

        let resolutions = self.characters.resolutions(id)?;
        resolver
            .pending_choices(&ctx, &updated, &resolutions)
            .into_iter()
            .find(|p| p.id == *choice_id)
            .ok_or_else(|| StateError::UnknownChoice(choice_id.clone()).into())
    }

    /// Remove a group's resolution, reverting its character-side effects.
    /// A no-op when nothing was resolved.
    #[instrument(skip(self), fields(character = %id, choice = %choice_id))]
    pub fn undo(&mut self, id: CharacterId, choice_id: &ChoiceId) -> Result<(), EngineError> {
        let character = self.characters.character(id)?;
        let resolutions = self.characters.resolutions(id)?;
        let ctx = ResolveContext {
            entities: &self.entities,
            lookup: &self.lookup,
            catalog: &self.catalog,
        };

        let group = self.registry.locate_group(&ctx, &character, choice_id)?;
        let resolver = self.registry.resolver_for(choice_id.kind)?;
        if !resolver.can_undo(group) {
            return Err(StateError::NotUndoable(choice_id.clone()).into());
        }

        let group_ref = group.group_ref();
        let existing: Vec<ResolutionRecord> = resolutions
            .iter()
            .filter(|r| r.group == group_ref)
            .cloned()
            .collect();
        if existing.is_empty() {
            return Ok(());
        }

        let mut updated = character.clone();
        resolver.undo(&ctx, &mut updated, group, &existing);
        let old_con = character.constitution_modifier();
        let new_con = updated.constitution_modifier();
        if new_con != old_con {
            progression::apply_constitution_change(&mut updated, old_con, new_con);
        }

        self.characters.save_character(&updated)?;
        self.characters.remove_resolutions(id, &group_ref)?;
        info!(group = %group_ref, "choice undone");
        Ok(())
    }

    /// Whether a choice may be undone.
    pub fn can_undo(&self, id: CharacterId, choice_id: &ChoiceId) -> Result<bool, EngineError> {
        let character = self.characters.character(id)?;
        let ctx = ResolveContext {
            entities: &self.entities,
            lookup: &self.lookup,
            catalog: &self.catalog,
        };
        let group = self.registry.locate_group(&ctx, &character, choice_id)?;
        let resolver = self.registry.resolver_for(choice_id.kind)?;
        Ok(resolver.can_undo(group))
    }

    // ------------------------------------------------------------------
    // Counters
    // ------------------------------------------------------------------

    /// The character's resource pools as listing rows.
    pub fn counters_for(&self, id: CharacterId) -> Result<Vec<CounterView>, EngineError> {
        let counters = self.characters.counters(id)?;
        Ok(counters
            .iter()
            .map(|counter| {
                let source_name = self
                    .entities
                    .owner_name(&counter.source)
                    .unwrap_or_else(|| counter.source.to_string());
                CounterView::new(counter, source_name)
            })
            .collect())
    }

    /// Spend one use of a pool. `Ok(false)` when the pool is exhausted.
    pub fn use_counter(
        &mut self,
        id: CharacterId,
        counter_id: crate::counters::CounterId,
    ) -> Result<bool, EngineError> {
        let mut all = self.characters.counters(id)?;
        let counter = all
            .iter_mut()
            .find(|c| c.id == counter_id)
            .ok_or(CounterError::UnknownCounter(counter_id))?;
        let spent = counters::use_counter(counter);
        self.characters.save_counters(id, all)?;
        Ok(spent)
    }

    /// Restore one use of a pool, capped at its maximum.
    pub fn restore_counter(
        &mut self,
        id: CharacterId,
        counter_id: crate::counters::CounterId,
    ) -> Result<(), EngineError> {
        let mut all = self.characters.counters(id)?;
        let counter = all
            .iter_mut()
            .find(|c| c.id == counter_id)
            .ok_or(CounterError::UnknownCounter(counter_id))?;
        counters::restore_counter(counter);
        self.characters.save_counters(id, all)?;
        Ok(())
    }

    /// Restore one pool to full.
    pub fn reset_counter(
        &mut self,
        id: CharacterId,
        counter_id: crate::counters::CounterId,
    ) -> Result<(), EngineError> {
        let mut all = self.characters.counters(id)?;
        let counter = all
            .iter_mut()
            .find(|c| c.id == counter_id)
            .ok_or(CounterError::UnknownCounter(counter_id))?;
        counters::reset_counter(counter);
        self.characters.save_counters(id, all)?;
        Ok(())
    }

    /// Reset every pool matching the given timings as one batch; returns
    /// the names of the pools that were reset, for the rest collaborator's
    /// result payload.
    #[instrument(skip(self), fields(character = %id))]
    pub fn rest(
        &mut self,
        id: CharacterId,
        timings: &[ResetTiming],
    ) -> Result<Vec<String>, EngineError> {
        let mut all = self.characters.counters(id)?;
        let reset = counters::reset_by_timing(&mut all, timings);
        self.characters.save_counters(id, all)?;
        info!(pools = reset.len(), "rest applied");
        Ok(reset)
    }

    // ------------------------------------------------------------------
    // Progression
    // ------------------------------------------------------------------

    /// Give the character its first level in a class. The first class ever
    /// assigned also sets starting HP — exactly once; multiclassing later
    /// never re-applies it.
    #[instrument(skip(self), fields(character = %id, class = %class_id))]
    pub fn add_class(&mut self, id: CharacterId, class_id: EntityId) -> Result<(), EngineError> {
        let mut character = self.characters.character(id)?;
        let class = self
            .entities
            .class(class_id)
            .ok_or(StateError::UnknownEntity(class_id))?;
        if character.class_entry(class_id).is_some() {
            return Err(StateError::DuplicateClass(class_id).into());
        }

        let first_class = character.classes.is_empty();
        character.classes.push(ClassLevel {
            class: class_id,
            level: 1,
            subclass: None,
        });
        character.advancement.push(class_id);
        if first_class {
            progression::apply_starting_hp(&mut character, class);
        }

        self.sync_and_save(character)
    }

    /// Advance one class by a level. The new level's HP gain becomes a
    /// pending choice; counters re-sync immediately.
    #[instrument(skip(self), fields(character = %id, class = %class_id))]
    pub fn level_up(&mut self, id: CharacterId, class_id: EntityId) -> Result<(), EngineError> {
        let mut character = self.characters.character(id)?;
        let entry = character
            .class_entry_mut(class_id)
            .ok_or(StateError::MissingClass(class_id))?;
        entry.level += 1;
        character.advancement.push(class_id);
        self.sync_and_save(character)
    }

    /// Pick a subclass for one of the character's classes.
    pub fn set_subclass(
        &mut self,
        id: CharacterId,
        class_id: EntityId,
        subclass_id: EntityId,
    ) -> Result<(), EngineError> {
        let subclass = self
            .entities
            .subclass(subclass_id)
            .ok_or(StateError::UnknownEntity(subclass_id))?;
        if subclass.class != class_id {
            return Err(StateError::SubclassMismatch {
                subclass: subclass_id,
                class: class_id,
            }
            .into());
        }
        let mut character = self.characters.character(id)?;
        let entry = character
            .class_entry_mut(class_id)
            .ok_or(StateError::MissingClass(class_id))?;
        entry.subclass = Some(subclass_id);
        self.sync_and_save(character)
    }

    /// Grant a feat.
    pub fn add_feat(&mut self, id: CharacterId, feat_id: EntityId) -> Result<(), EngineError> {
        if self.entities.feat(feat_id).is_none() {
            return Err(StateError::UnknownEntity(feat_id).into());
        }
        let mut character = self.characters.character(id)?;
        if character.feats.contains(&feat_id) {
            return Err(StateError::DuplicateFeat(feat_id).into());
        }
        character.feats.push(feat_id);
        self.sync_and_save(character)
    }

    /// Set (or clear) the character's race. Choices resolved against the
    /// old race become stale; their identifiers stop resolving.
    pub fn set_race(
        &mut self,
        id: CharacterId,
        race_id: Option<EntityId>,
    ) -> Result<(), EngineError> {
        if let Some(race_id) = race_id {
            if self.entities.race(race_id).is_none() {
                return Err(StateError::UnknownEntity(race_id).into());
            }
        }
        let mut character = self.characters.character(id)?;
        character.race = race_id;
        self.sync_and_save(character)
    }

    /// Set (or clear) the character's background.
    pub fn set_background(
        &mut self,
        id: CharacterId,
        background_id: Option<EntityId>,
    ) -> Result<(), EngineError> {
        if let Some(background_id) = background_id {
            if self.entities.background(background_id).is_none() {
                return Err(StateError::UnknownEntity(background_id).into());
            }
        }
        let mut character = self.characters.character(id)?;
        character.background = background_id;
        self.sync_and_save(character)
    }

    /// Set one ability score directly. Constitution changes re-derive HP.
    pub fn set_ability_score(
        &mut self,
        id: CharacterId,
        ability: Ability,
        value: u8,
    ) -> Result<(), EngineError> {
        let mut character = self.characters.character(id)?;
        let old_con = character.constitution_modifier();
        character.ability_scores.set(ability, value);
        let new_con = character.constitution_modifier();
        if new_con != old_con {
            progression::apply_constitution_change(&mut character, old_con, new_con);
        }
        self.characters.save_character(&character)?;
        Ok(())
    }

    /// Unresolved level-up HP decisions.
    pub fn pending_hp_choices(&self, id: CharacterId) -> Result<Vec<HpPendingChoice>, EngineError> {
        let character = self.characters.character(id)?;
        Ok(progression::pending_hp_gains(&self.entities, &character))
    }

    /// Resolve one level's HP gain; returns the applied gain.
    #[instrument(skip(self), fields(character = %id, level))]
    pub fn resolve_hp_gain(
        &mut self,
        id: CharacterId,
        level: u8,
        choice: HpGainChoice,
    ) -> Result<i32, EngineError> {
        let mut character = self.characters.character(id)?;
        let gain = progression::resolve_hp_gain(&self.entities, &mut character, level, choice)?;
        self.characters.save_character(&character)?;
        info!(gain, "hit points resolved");
        Ok(gain)
    }

    // ------------------------------------------------------------------

    /// Persist a mutated character and its freshly-synced counter set.
    fn sync_and_save(&mut self, character: Character) -> Result<(), EngineError> {
        let existing = self.characters.counters(character.id)?;
        let synced = counters::sync_counters(&self.entities, &character, &existing);
        self.characters.save_character(&character)?;
        self.characters.save_counters(character.id, synced)?;
        Ok(())
    }
}
