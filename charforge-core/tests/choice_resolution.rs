//! End-to-end choice flows through the engine: enumeration, validation,
//! overwrite semantics, undo, and stale-identifier handling.

use charforge_core::character::{Ability, Character, Skill};
use charforge_core::choice::{ChoiceId, ChoiceValue, PendingChoice};
use charforge_core::content::StandardLookup;
use charforge_core::testing::{InMemoryCharacterStore, InMemoryEntityStore, SampleContent, SampleIds};
use charforge_core::{
    CharacterId, ChoiceKind, Engine, EngineError, EntityId, GroupRef, Owner, SelectionError,
    StateError,
};

type TestEngine = Engine<InMemoryEntityStore, StandardLookup, InMemoryCharacterStore>;

fn new_engine() -> (TestEngine, SampleIds, CharacterId) {
    let content = SampleContent::new();
    let ids = content.ids;
    let character = Character::new("Testa");
    let id = character.id;
    let store = InMemoryCharacterStore::new().with_character(character);
    let engine = content.engine(store).expect("sample content validates");
    (engine, ids, id)
}

fn find_choice(engine: &TestEngine, id: CharacterId, key: &str) -> PendingChoice {
    engine
        .pending_choices(id)
        .expect("pending choices")
        .into_iter()
        .find(|p| p.id.group.key == key)
        .unwrap_or_else(|| panic!("no pending choice with key '{key}'"))
}

fn skill(s: Skill) -> ChoiceValue {
    ChoiceValue::Skill(s)
}

fn name(n: &str) -> ChoiceValue {
    ChoiceValue::Name(n.to_string())
}

fn ability(a: Ability) -> ChoiceValue {
    ChoiceValue::Ability(a)
}

/// The structural invariants every pending listing must satisfy.
fn assert_invariants(pending: &[PendingChoice]) {
    for choice in pending {
        assert!(
            choice.remaining <= choice.required,
            "{}: remaining {} > required {}",
            choice.id,
            choice.remaining,
            choice.required
        );
        // Equipment reports granted items rather than bundle counts.
        if choice.kind != ChoiceKind::Equipment {
            assert_eq!(
                choice.selected.len() + choice.remaining as usize,
                choice.required as usize,
                "{}: selected + remaining != required",
                choice.id
            );
        }
    }
}

#[test]
fn test_blank_character_has_no_choices() {
    let (engine, _ids, id) = new_engine();
    assert!(engine.pending_choices(id).unwrap().is_empty());
}

#[test]
fn test_wizard_choice_queue() {
    let (mut engine, ids, id) = new_engine();
    engine.set_race(id, Some(ids.high_elf)).unwrap();
    engine.add_class(id, ids.wizard).unwrap();

    let pending = engine.pending_choices(id).unwrap();
    assert_invariants(&pending);

    let keys: Vec<&str> = pending.iter().map(|p| p.id.group.key.as_str()).collect();
    assert!(keys.contains(&"skills"), "wizard skills missing: {keys:?}");
    assert!(keys.contains(&"spellbook"));
    assert!(keys.contains(&"cantrip"), "subrace group missing");
    assert!(
        keys.contains(&"bonus-language"),
        "group inherited from parent race missing"
    );

    let skills = find_choice(&engine, id, "skills");
    assert_eq!(skills.required, 2);
    assert_eq!(skills.remaining, 2);
    assert!(skills.selected.is_empty());
    assert_eq!(skills.source, "Wizard");
}

#[test]
fn test_resolve_then_refetch_reports_selection() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "skills");
    let values = [skill(Skill::Arcana), skill(Skill::History)];
    let updated = engine.resolve(id, &choice.id, &values).unwrap();
    assert_eq!(updated.remaining, 0);
    assert!(updated.is_resolved());

    let refetched = find_choice(&engine, id, "skills");
    assert_eq!(refetched.remaining, 0);
    assert_eq!(refetched.selected.len(), 2);
    for value in &values {
        assert!(refetched.selected.contains(value), "missing {value}");
    }
    assert_invariants(&engine.pending_choices(id).unwrap());
}

#[test]
fn test_wrong_count_is_rejected() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "skills");
    let err = engine
        .resolve(id, &choice.id, &[skill(Skill::Arcana)])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::WrongCount {
            expected: 2,
            got: 1
        })
    ));
}

#[test]
fn test_unlisted_skill_is_rejected() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "skills");
    let err = engine
        .resolve(id, &choice.id, &[skill(Skill::Stealth), skill(Skill::Arcana)])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::NotAnOption(ref v)) if v == "Stealth"
    ));

    // The failed submission left nothing behind.
    assert_eq!(find_choice(&engine, id, "skills").remaining, 2);
}

#[test]
fn test_resolve_overwrites_previous_selection() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "skills");
    engine
        .resolve(id, &choice.id, &[skill(Skill::Arcana), skill(Skill::History)])
        .unwrap();
    engine
        .resolve(
            id,
            &choice.id,
            &[skill(Skill::Arcana), skill(Skill::Investigation)],
        )
        .unwrap();

    let refetched = find_choice(&engine, id, "skills");
    assert_eq!(refetched.selected.len(), 2);
    assert!(refetched.selected.contains(&skill(Skill::Investigation)));
    assert!(!refetched.selected.contains(&skill(Skill::History)));
}

#[test]
fn test_resolve_undo_is_idempotent() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let before = find_choice(&engine, id, "skills");
    engine
        .resolve(id, &before.id, &[skill(Skill::Arcana), skill(Skill::History)])
        .unwrap();
    engine.undo(id, &before.id).unwrap();

    let after = find_choice(&engine, id, "skills");
    assert_eq!(after, before, "undo must restore the never-resolved state");
}

#[test]
fn test_undo_without_resolution_is_noop() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "skills");
    engine.undo(id, &choice.id).unwrap();
}

#[test]
fn test_ability_bonus_rejects_duplicate_targets() {
    let (mut engine, ids, id) = new_engine();
    engine.set_race(id, Some(ids.half_elf)).unwrap();

    let choice = find_choice(&engine, id, "ability-bonus");
    assert_eq!(choice.bonus, Some(1));
    assert!(choice.distinct);

    let err = engine
        .resolve(
            id,
            &choice.id,
            &[ability(Ability::Strength), ability(Ability::Strength)],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::DuplicateValue(_))
    ));
}

#[test]
fn test_ability_bonus_applies_and_undoes() {
    let (mut engine, ids, id) = new_engine();
    engine.set_race(id, Some(ids.half_elf)).unwrap();

    let choice = find_choice(&engine, id, "ability-bonus");
    engine
        .resolve(
            id,
            &choice.id,
            &[ability(Ability::Strength), ability(Ability::Wisdom)],
        )
        .unwrap();

    let character = engine.character(id).unwrap();
    assert_eq!(character.ability_scores.strength, 11);
    assert_eq!(character.ability_scores.wisdom, 11);

    let refetched = find_choice(&engine, id, "ability-bonus");
    assert_eq!(refetched.remaining, 0);
    assert!(refetched.selected.contains(&ability(Ability::Strength)));
    assert!(refetched.selected.contains(&ability(Ability::Wisdom)));

    engine.undo(id, &choice.id).unwrap();
    let character = engine.character(id).unwrap();
    assert_eq!(character.ability_scores.strength, 10);
    assert_eq!(character.ability_scores.wisdom, 10);
}

#[test]
fn test_ability_bonus_to_constitution_shifts_hp() {
    let (mut engine, ids, id) = new_engine();
    engine.set_ability_score(id, Ability::Constitution, 15).unwrap();
    engine.add_class(id, ids.fighter).unwrap();
    assert_eq!(engine.character(id).unwrap().hit_points.maximum, 12);

    engine.set_race(id, Some(ids.half_elf)).unwrap();
    let choice = find_choice(&engine, id, "ability-bonus");
    engine
        .resolve(
            id,
            &choice.id,
            &[ability(Ability::Constitution), ability(Ability::Strength)],
        )
        .unwrap();

    // CON 15 -> 16 lifts the modifier from +2 to +3: +1 HP per level.
    let character = engine.character(id).unwrap();
    assert_eq!(character.hit_points.maximum, 13);
    assert_eq!(character.hit_points.current, 13);

    engine.undo(id, &choice.id).unwrap();
    let character = engine.character(id).unwrap();
    assert_eq!(character.hit_points.maximum, 12);
}

#[test]
fn test_language_candidates_come_from_lookup() {
    let (mut engine, ids, id) = new_engine();
    engine.set_background(id, Some(ids.sage)).unwrap();

    let choice = find_choice(&engine, id, "languages");
    assert_eq!(choice.options.len(), 1);
    assert_eq!(
        choice.options[0].lookup.as_deref(),
        Some("standard-languages")
    );

    engine
        .resolve(id, &choice.id, &[name("Elvish"), name("Giant")])
        .unwrap();

    let err = engine
        .resolve(id, &choice.id, &[name("Elvish"), name("Valyrian")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::NotInCategory { ref value, .. }) if value == "Valyrian"
    ));
}

#[test]
fn test_tool_proficiency_category() {
    let (mut engine, ids, id) = new_engine();
    engine.set_background(id, Some(ids.guild_artisan)).unwrap();

    let choice = find_choice(&engine, id, "tools");
    engine
        .resolve(id, &choice.id, &[name("Smith's Tools")])
        .unwrap();

    let err = engine
        .resolve(id, &choice.id, &[name("Longsword")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::NotInCategory { .. })
    ));
}

#[test]
fn test_skilled_feat_mixes_skills_and_tools() {
    let (mut engine, ids, id) = new_engine();
    engine.add_feat(id, ids.skilled).unwrap();

    let choice = find_choice(&engine, id, "proficiencies");
    engine
        .resolve(
            id,
            &choice.id,
            &[
                skill(Skill::Stealth),
                name("Smith's Tools"),
                skill(Skill::Arcana),
            ],
        )
        .unwrap();

    let refetched = find_choice(&engine, id, "proficiencies");
    assert_eq!(refetched.remaining, 0);
    assert_eq!(refetched.selected.len(), 3);
}

#[test]
fn test_spellbook_filters() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "spellbook");
    engine
        .resolve(id, &choice.id, &[name("Magic Missile"), name("Shield")])
        .unwrap();

    let err = engine
        .resolve(id, &choice.id, &[name("Fireball"), name("Shield")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::SpellLevelTooHigh {
            level: 3,
            max_level: 1,
            ..
        })
    ));

    let err = engine
        .resolve(id, &choice.id, &[name("Cure Wounds"), name("Shield")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::NotOnSpellList { .. })
    ));

    let err = engine
        .resolve(id, &choice.id, &[name("Wish Harder"), name("Shield")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::UnknownSpell(_))
    ));
}

#[test]
fn test_cantrip_filter_caps_spell_level() {
    let (mut engine, ids, id) = new_engine();
    engine.set_race(id, Some(ids.high_elf)).unwrap();

    let choice = find_choice(&engine, id, "cantrip");
    engine.resolve(id, &choice.id, &[name("Fire Bolt")]).unwrap();

    let err = engine
        .resolve(id, &choice.id, &[name("Magic Missile")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::SpellLevelTooHigh { max_level: 0, .. })
    ));
}

#[test]
fn test_ritual_caster_requires_rituals() {
    let (mut engine, ids, id) = new_engine();
    engine.add_feat(id, ids.ritual_caster).unwrap();

    let choice = find_choice(&engine, id, "ritual-spells");
    engine
        .resolve(id, &choice.id, &[name("Detect Magic"), name("Identify")])
        .unwrap();

    let err = engine
        .resolve(id, &choice.id, &[name("Magic Missile"), name("Identify")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::NotRitual { ref spell }) if spell == "Magic Missile"
    ));
}

#[test]
fn test_equipment_accepts_exactly_one_bundle() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.fighter).unwrap();

    let choice = find_choice(&engine, id, "armor");
    engine.resolve(id, &choice.id, &[name("Chain Mail")]).unwrap();

    // Switching to the other bundle overwrites.
    engine
        .resolve(id, &choice.id, &[name("Leather Armor"), name("Longbow")])
        .unwrap();
    let refetched = find_choice(&engine, id, "armor");
    assert_eq!(refetched.remaining, 0);
    assert_eq!(refetched.selected.len(), 2);
}

#[test]
fn test_equipment_rejects_bundle_mix() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.fighter).unwrap();

    let choice = find_choice(&engine, id, "armor");
    let err = engine
        .resolve(id, &choice.id, &[name("Chain Mail"), name("Longbow")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::BundleMismatch { .. })
    ));

    let err = engine
        .resolve(id, &choice.id, &[name("Leather Armor")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::IncompleteBundle {
            bundle: 'b',
            expected: 2,
            got: 1
        })
    ));

    let err = engine
        .resolve(id, &choice.id, &[name("Tower Shield")])
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Selection(SelectionError::NotAnOption(_))
    ));
}

#[test]
fn test_unknown_choice_id_is_state_error() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let bogus = ChoiceId::new(
        ChoiceKind::Spell,
        GroupRef {
            owner: Owner::race(EntityId::new()),
            level: None,
            key: "cantrip".to_string(),
        },
    );
    let err = engine.resolve(id, &bogus, &[name("Fire Bolt")]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::State(StateError::UnknownChoice(_))
    ));
}

#[test]
fn test_race_change_makes_choice_stale() {
    let (mut engine, ids, id) = new_engine();
    engine.set_race(id, Some(ids.high_elf)).unwrap();

    let choice = find_choice(&engine, id, "cantrip");
    engine.resolve(id, &choice.id, &[name("Fire Bolt")]).unwrap();

    engine.set_race(id, Some(ids.dwarf)).unwrap();

    let pending = engine.pending_choices(id).unwrap();
    assert!(
        pending.iter().all(|p| p.id.group.key != "cantrip"),
        "stale group still listed"
    );
    let err = engine.resolve(id, &choice.id, &[name("Light")]).unwrap_err();
    assert!(matches!(
        err,
        EngineError::State(StateError::UnknownChoice(_))
    ));
}

#[test]
fn test_permanent_group_cannot_be_undone() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.rogue).unwrap();
    engine.set_subclass(id, ids.rogue, ids.soulknife).unwrap();

    // Gated until rogue 3.
    assert!(engine
        .pending_choices(id)
        .unwrap()
        .iter()
        .all(|p| p.id.group.key != "psionic-power"));

    engine.level_up(id, ids.rogue).unwrap();
    engine.level_up(id, ids.rogue).unwrap();

    let choice = find_choice(&engine, id, "psionic-power");
    assert!(!engine.can_undo(id, &choice.id).unwrap());

    engine
        .resolve(id, &choice.id, &[name("Psychic Whispers")])
        .unwrap();
    let err = engine.undo(id, &choice.id).unwrap_err();
    assert!(matches!(
        err,
        EngineError::State(StateError::NotUndoable(_))
    ));
}

#[test]
fn test_queue_orders_immediate_groups_before_gated_ones() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.rogue).unwrap();
    engine.set_subclass(id, ids.rogue, ids.soulknife).unwrap();
    engine.level_up(id, ids.rogue).unwrap();
    engine.level_up(id, ids.rogue).unwrap();

    let pending = engine.pending_choices(id).unwrap();
    let gated_position = pending
        .iter()
        .position(|p| p.id.group.key == "psionic-power")
        .expect("gated group present");
    assert_eq!(
        gated_position,
        pending.len() - 1,
        "level-gated group should sort after immediate groups"
    );
}

#[test]
fn test_choice_ids_survive_boundary_encoding() {
    let (mut engine, ids, id) = new_engine();
    engine.add_class(id, ids.wizard).unwrap();

    let choice = find_choice(&engine, id, "spellbook");
    let decoded = ChoiceId::decode(&choice.id.encode()).expect("boundary round trip");
    engine
        .resolve(id, &decoded, &[name("Magic Missile"), name("Shield")])
        .unwrap();
}
