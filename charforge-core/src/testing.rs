//! Testing utilities.
//!
//! In-memory implementations of the store contracts plus a small sample
//! content pack (classes, subclasses, races, backgrounds, feats, spells,
//! and their choice groups) used by the integration tests. Platforms can
//! also use these as reference implementations of the contracts.

use crate::catalog::{ChoiceCatalog, ChoiceGroup, ChoiceKind, ChoiceOption, ConfigError, GroupRef, OptionFilter, Owner};
use crate::character::{Character, CharacterId, Ability, Skill};
use crate::choice::ResolutionRecord;
use crate::content::{
    categories, BackgroundDef, ClassDef, EntityId, FeatDef, RaceDef, SpellDef, SpellSchool,
    StandardLookup, SubclassDef,
};
use crate::counters::{CharacterCounter, ResetTiming, ResourcePoolDef, UNLIMITED};
use crate::dice::DieType;
use crate::engine::Engine;
use crate::store::{CharacterStore, EntityStore, StoreError};
use std::collections::HashMap;

// ============================================================================
// In-memory stores
// ============================================================================

/// Entity store backed by hash maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEntityStore {
    races: HashMap<EntityId, RaceDef>,
    classes: HashMap<EntityId, ClassDef>,
    subclasses: HashMap<EntityId, SubclassDef>,
    backgrounds: HashMap<EntityId, BackgroundDef>,
    feats: HashMap<EntityId, FeatDef>,
    spells: HashMap<String, SpellDef>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_race(&mut self, race: RaceDef) {
        self.races.insert(race.id, race);
    }

    pub fn add_class(&mut self, class: ClassDef) {
        self.classes.insert(class.id, class);
    }

    pub fn add_subclass(&mut self, subclass: SubclassDef) {
        self.subclasses.insert(subclass.id, subclass);
    }

    pub fn add_background(&mut self, background: BackgroundDef) {
        self.backgrounds.insert(background.id, background);
    }

    pub fn add_feat(&mut self, feat: FeatDef) {
        self.feats.insert(feat.id, feat);
    }

    pub fn add_spell(&mut self, spell: SpellDef) {
        self.spells.insert(spell.name.clone(), spell);
    }
}

impl EntityStore for InMemoryEntityStore {
    fn race(&self, id: EntityId) -> Option<&RaceDef> {
        self.races.get(&id)
    }

    fn class(&self, id: EntityId) -> Option<&ClassDef> {
        self.classes.get(&id)
    }

    fn subclass(&self, id: EntityId) -> Option<&SubclassDef> {
        self.subclasses.get(&id)
    }

    fn background(&self, id: EntityId) -> Option<&BackgroundDef> {
        self.backgrounds.get(&id)
    }

    fn feat(&self, id: EntityId) -> Option<&FeatDef> {
        self.feats.get(&id)
    }

    fn spell(&self, name: &str) -> Option<&SpellDef> {
        self.spells.get(name)
    }
}

/// Character store backed by hash maps. Plain owned data behind `&mut`;
/// per-character serialization falls out of the engine's synchronous use.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCharacterStore {
    characters: HashMap<CharacterId, Character>,
    resolutions: HashMap<CharacterId, Vec<ResolutionRecord>>,
    counters: HashMap<CharacterId, Vec<CharacterCounter>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, character: Character) {
        self.characters.insert(character.id, character);
    }

    pub fn with_character(mut self, character: Character) -> Self {
        self.insert(character);
        self
    }
}

impl CharacterStore for InMemoryCharacterStore {
    fn character(&self, id: CharacterId) -> Result<Character, StoreError> {
        self.characters
            .get(&id)
            .cloned()
            .ok_or(StoreError::UnknownCharacter(id))
    }

    fn save_character(&mut self, character: &Character) -> Result<(), StoreError> {
        self.characters.insert(character.id, character.clone());
        Ok(())
    }

    fn resolutions(&self, id: CharacterId) -> Result<Vec<ResolutionRecord>, StoreError> {
        Ok(self.resolutions.get(&id).cloned().unwrap_or_default())
    }

    fn replace_resolutions(
        &mut self,
        id: CharacterId,
        group: &GroupRef,
        records: Vec<ResolutionRecord>,
    ) -> Result<(), StoreError> {
        let all = self.resolutions.entry(id).or_default();
        all.retain(|r| &r.group != group);
        all.extend(records);
        Ok(())
    }

    fn remove_resolutions(&mut self, id: CharacterId, group: &GroupRef) -> Result<(), StoreError> {
        if let Some(all) = self.resolutions.get_mut(&id) {
            all.retain(|r| &r.group != group);
        }
        Ok(())
    }

    fn counters(&self, id: CharacterId) -> Result<Vec<CharacterCounter>, StoreError> {
        Ok(self.counters.get(&id).cloned().unwrap_or_default())
    }

    fn save_counters(
        &mut self,
        id: CharacterId,
        counters: Vec<CharacterCounter>,
    ) -> Result<(), StoreError> {
        self.counters.insert(id, counters);
        Ok(())
    }
}

// ============================================================================
// Sample content
// ============================================================================

/// Identifiers of the sample content entities.
#[derive(Debug, Clone, Copy)]
pub struct SampleIds {
    pub fighter: EntityId,
    pub wizard: EntityId,
    pub rogue: EntityId,
    pub cleric: EntityId,
    pub soulknife: EntityId,
    pub psi_warrior: EntityId,
    pub elf: EntityId,
    pub high_elf: EntityId,
    pub dwarf: EntityId,
    pub half_elf: EntityId,
    pub sage: EntityId,
    pub guild_artisan: EntityId,
    pub skilled: EntityId,
    pub ritual_caster: EntityId,
    pub healer: EntityId,
}

/// A small content pack exercising every choice kind and counter shape.
pub struct SampleContent {
    pub ids: SampleIds,
    pub entities: InMemoryEntityStore,
    pub catalog: ChoiceCatalog,
}

impl SampleContent {
    pub fn new() -> Self {
        let ids = SampleIds {
            fighter: EntityId::new(),
            wizard: EntityId::new(),
            rogue: EntityId::new(),
            cleric: EntityId::new(),
            soulknife: EntityId::new(),
            psi_warrior: EntityId::new(),
            elf: EntityId::new(),
            high_elf: EntityId::new(),
            dwarf: EntityId::new(),
            half_elf: EntityId::new(),
            sage: EntityId::new(),
            guild_artisan: EntityId::new(),
            skilled: EntityId::new(),
            ritual_caster: EntityId::new(),
            healer: EntityId::new(),
        };

        let mut entities = InMemoryEntityStore::new();

        // Classes.
        entities.add_class(
            ClassDef::new(ids.fighter, "Fighter", DieType::D10)
                .with_pool(ResourcePoolDef::new("Second Wind", ResetTiming::ShortRest).at(1, 1))
                .with_pool(
                    ResourcePoolDef::new("Action Surge", ResetTiming::ShortRest)
                        .at(2, 1)
                        .at(17, 2),
                )
                .with_pool(ResourcePoolDef::new("Indomitable", ResetTiming::LongRest).at(9, 1)),
        );
        entities.add_class(
            ClassDef::new(ids.wizard, "Wizard", DieType::D6).with_pool(
                ResourcePoolDef::new("Arcane Recovery", ResetTiming::LongRest).at(1, 1),
            ),
        );
        entities.add_class(ClassDef::new(ids.rogue, "Rogue", DieType::D8));
        entities.add_class(
            ClassDef::new(ids.cleric, "Cleric", DieType::D8).with_pool(
                ResourcePoolDef::new("Channel Divinity", ResetTiming::ShortRest)
                    .at(2, 1)
                    .at(6, 2),
            ),
        );

        // Subclasses. Both grant a "Psionic Energy" pool; the counters must
        // stay independent under multiclassing.
        let psionic_energy = || {
            ResourcePoolDef::new("Psionic Energy", ResetTiming::LongRest)
                .at(3, 4)
                .at(5, 6)
                .at(9, 8)
                .at(13, 10)
                .at(17, 12)
        };
        entities.add_subclass(
            SubclassDef::new(ids.soulknife, "Soulknife", ids.rogue).with_pool(psionic_energy()),
        );
        entities.add_subclass(
            SubclassDef::new(ids.psi_warrior, "Psi Warrior", ids.fighter)
                .with_pool(psionic_energy()),
        );

        // Races.
        entities.add_race(RaceDef::new(ids.elf, "Elf"));
        entities.add_race(RaceDef::new(ids.high_elf, "High Elf").subrace_of(ids.elf));
        entities.add_race(
            RaceDef::new(ids.dwarf, "Dwarf").with_pool(
                ResourcePoolDef::new("Stonecunning", ResetTiming::Manual).at(1, UNLIMITED),
            ),
        );
        entities.add_race(RaceDef::new(ids.half_elf, "Half-Elf"));

        // Backgrounds.
        entities.add_background(BackgroundDef::new(ids.sage, "Sage"));
        entities.add_background(BackgroundDef::new(ids.guild_artisan, "Guild Artisan"));

        // Feats.
        entities.add_feat(FeatDef::new(ids.skilled, "Skilled"));
        entities.add_feat(FeatDef::new(ids.ritual_caster, "Ritual Caster"));
        entities.add_feat(
            FeatDef::new(ids.healer, "Healer")
                .with_pool(ResourcePoolDef::new("Healing Hands", ResetTiming::Dawn).at(1, 1)),
        );

        // Spells.
        for spell in [
            SpellDef::new("Fire Bolt", 0, SpellSchool::Evocation).for_class(ids.wizard),
            SpellDef::new("Light", 0, SpellSchool::Evocation)
                .for_class(ids.wizard)
                .for_class(ids.cleric),
            SpellDef::new("Mage Hand", 0, SpellSchool::Conjuration).for_class(ids.wizard),
            SpellDef::new("Magic Missile", 1, SpellSchool::Evocation).for_class(ids.wizard),
            SpellDef::new("Shield", 1, SpellSchool::Abjuration).for_class(ids.wizard),
            SpellDef::new("Detect Magic", 1, SpellSchool::Divination)
                .ritual()
                .for_class(ids.wizard)
                .for_class(ids.cleric),
            SpellDef::new("Identify", 1, SpellSchool::Divination)
                .ritual()
                .for_class(ids.wizard),
            SpellDef::new("Cure Wounds", 1, SpellSchool::Evocation).for_class(ids.cleric),
            SpellDef::new("Fireball", 3, SpellSchool::Evocation).for_class(ids.wizard),
        ] {
            entities.add_spell(spell);
        }

        // Choice groups.
        let mut catalog = ChoiceCatalog::new();

        catalog.insert(
            ChoiceGroup::new(Owner::race(ids.elf), ChoiceKind::Language, "bonus-language", 1)
                .labelled("Bonus Language")
                .with_option(ChoiceOption::filtered(OptionFilter::category(
                    categories::STANDARD_LANGUAGES,
                ))),
        );
        catalog.insert(
            ChoiceGroup::new(Owner::race(ids.high_elf), ChoiceKind::Spell, "cantrip", 1)
                .labelled("High Elf Cantrip")
                .with_option(ChoiceOption::filtered(OptionFilter::spells(0, ids.wizard))),
        );
        catalog.insert(
            ChoiceGroup::new(
                Owner::race(ids.half_elf),
                ChoiceKind::AbilityScore,
                "ability-bonus",
                2,
            )
            .labelled("Ability Score Increase")
            .with_bonus(1)
            .with_options([
                ChoiceOption::ability(Ability::Strength),
                ChoiceOption::ability(Ability::Dexterity),
                ChoiceOption::ability(Ability::Constitution),
                ChoiceOption::ability(Ability::Intelligence),
                ChoiceOption::ability(Ability::Wisdom),
            ]),
        );

        catalog.insert(
            ChoiceGroup::new(Owner::class(ids.fighter), ChoiceKind::Proficiency, "skills", 2)
                .labelled("Fighter Skills")
                .with_options([
                    ChoiceOption::skill(Skill::Acrobatics),
                    ChoiceOption::skill(Skill::AnimalHandling),
                    ChoiceOption::skill(Skill::Athletics),
                    ChoiceOption::skill(Skill::History),
                    ChoiceOption::skill(Skill::Insight),
                    ChoiceOption::skill(Skill::Intimidation),
                    ChoiceOption::skill(Skill::Perception),
                    ChoiceOption::skill(Skill::Survival),
                ]),
        );
        catalog.insert(
            ChoiceGroup::new(Owner::class(ids.fighter), ChoiceKind::Equipment, "armor", 1)
                .labelled("Starting Armor")
                .with_options([
                    ChoiceOption::name("Chain Mail").in_bundle('a'),
                    ChoiceOption::name("Leather Armor").in_bundle('b'),
                    ChoiceOption::name("Longbow").in_bundle('b'),
                ]),
        );
        catalog.insert(
            ChoiceGroup::new(
                Owner::class(ids.fighter),
                ChoiceKind::OptionalFeature,
                "fighting-style",
                1,
            )
            .labelled("Fighting Style")
            .with_options([
                ChoiceOption::name("Archery"),
                ChoiceOption::name("Defense"),
                ChoiceOption::name("Dueling"),
                ChoiceOption::name("Great Weapon Fighting"),
            ]),
        );

        catalog.insert(
            ChoiceGroup::new(Owner::class(ids.wizard), ChoiceKind::Proficiency, "skills", 2)
                .labelled("Wizard Skills")
                .with_options([
                    ChoiceOption::skill(Skill::Arcana),
                    ChoiceOption::skill(Skill::History),
                    ChoiceOption::skill(Skill::Insight),
                    ChoiceOption::skill(Skill::Investigation),
                    ChoiceOption::skill(Skill::Medicine),
                    ChoiceOption::skill(Skill::Religion),
                ]),
        );
        catalog.insert(
            ChoiceGroup::new(Owner::class(ids.wizard), ChoiceKind::Spell, "spellbook", 2)
                .labelled("Spellbook")
                .with_option(ChoiceOption::filtered(OptionFilter::spells(1, ids.wizard))),
        );

        catalog.insert(
            ChoiceGroup::new(Owner::class(ids.rogue), ChoiceKind::Proficiency, "skills", 4)
                .labelled("Rogue Skills")
                .with_options([
                    ChoiceOption::skill(Skill::Acrobatics),
                    ChoiceOption::skill(Skill::Athletics),
                    ChoiceOption::skill(Skill::Deception),
                    ChoiceOption::skill(Skill::Insight),
                    ChoiceOption::skill(Skill::Intimidation),
                    ChoiceOption::skill(Skill::Investigation),
                    ChoiceOption::skill(Skill::Perception),
                    ChoiceOption::skill(Skill::Performance),
                    ChoiceOption::skill(Skill::Persuasion),
                    ChoiceOption::skill(Skill::SleightOfHand),
                    ChoiceOption::skill(Skill::Stealth),
                ]),
        );

        // An always-granted subclass benefit: recorded like a choice but
        // not undoable.
        catalog.insert(
            ChoiceGroup::new(
                Owner::subclass(ids.soulknife),
                ChoiceKind::OptionalFeature,
                "psionic-power",
                1,
            )
            .at_level(3)
            .labelled("Psionic Power")
            .permanent()
            .with_options([
                ChoiceOption::name("Psi-Bolstered Knack"),
                ChoiceOption::name("Psychic Whispers"),
            ]),
        );

        catalog.insert(
            ChoiceGroup::new(
                Owner::background(ids.sage),
                ChoiceKind::Language,
                "languages",
                2,
            )
            .labelled("Sage Languages")
            .with_option(ChoiceOption::filtered(OptionFilter::category(
                categories::STANDARD_LANGUAGES,
            ))),
        );
        catalog.insert(
            ChoiceGroup::new(
                Owner::background(ids.guild_artisan),
                ChoiceKind::Proficiency,
                "tools",
                1,
            )
            .labelled("Artisan's Tools")
            .with_option(ChoiceOption::filtered(OptionFilter::category(
                categories::ARTISAN_TOOLS,
            ))),
        );

        catalog.insert(
            ChoiceGroup::new(
                Owner::feat(ids.skilled),
                ChoiceKind::Proficiency,
                "proficiencies",
                3,
            )
            .labelled("Skilled")
            .with_options([
                ChoiceOption::filtered(OptionFilter::category(categories::SKILLS)),
                ChoiceOption::filtered(OptionFilter::category(categories::ARTISAN_TOOLS)),
            ]),
        );
        catalog.insert(
            ChoiceGroup::new(
                Owner::feat(ids.ritual_caster),
                ChoiceKind::Spell,
                "ritual-spells",
                2,
            )
            .labelled("Ritual Spells")
            .with_option(ChoiceOption::filtered(
                OptionFilter::spells(1, ids.wizard).ritual(),
            )),
        );

        Self {
            ids,
            entities,
            catalog,
        }
    }

    /// Build an engine over this content and the given character store.
    pub fn engine(
        self,
        characters: InMemoryCharacterStore,
    ) -> Result<Engine<InMemoryEntityStore, StandardLookup, InMemoryCharacterStore>, ConfigError>
    {
        Engine::new(self.entities, StandardLookup, characters, self.catalog)
    }
}

impl Default for SampleContent {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_content_validates() {
        let content = SampleContent::new();
        assert!(content.catalog.validate(&content.entities).is_ok());
    }

    #[test]
    fn test_store_round_trip() {
        let mut store = InMemoryCharacterStore::new();
        let character = Character::new("Round Trip");
        let id = character.id;
        store.insert(character);

        let loaded = store.character(id).expect("present");
        assert_eq!(loaded.name, "Round Trip");
        assert!(store.character(CharacterId::new()).is_err());
    }
}
