//! Kind-specific resolver implementations.
//!
//! Each resolver handles one [`ChoiceKind`](crate::catalog::ChoiceKind)
//! through the shared protocol. Group discovery, option rendering, and the
//! common count/distinctness validations live here; the per-kind modules
//! add only their own constraint checks.

mod ability_score;
mod equipment;
mod language;
mod optional_feature;
mod proficiency;
mod spell;

pub use ability_score::AbilityScoreResolver;
pub use equipment::EquipmentResolver;
pub use language::LanguageResolver;
pub use optional_feature::OptionalFeatureResolver;
pub use proficiency::ProficiencyResolver;
pub use spell::SpellResolver;

use crate::catalog::{ChoiceGroup, ChoiceKind, ChoiceOption, OptionFilter, OptionTarget, Owner};
use crate::character::Character;
use crate::choice::{
    ChoiceId, ChoiceValue, OptionView, PendingChoice, ResolutionRecord, ResolveContext,
    SelectionError,
};
use crate::store::EntityStore;

/// Every choice-group source the character currently has, with the level
/// that gates its groups: classes at their class level, subclasses at the
/// owning class's level, races (and the parent race of a subrace),
/// backgrounds, and feats at the total character level.
pub(crate) fn character_sources(
    entities: &dyn EntityStore,
    character: &Character,
) -> Vec<(Owner, u8)> {
    let total = character.total_level();
    let mut sources = Vec::new();

    if let Some(race_id) = character.race {
        sources.push((Owner::race(race_id), total));
        if let Some(parent) = entities.race(race_id).and_then(|r| r.parent) {
            sources.push((Owner::race(parent), total));
        }
    }
    if let Some(background_id) = character.background {
        sources.push((Owner::background(background_id), total));
    }
    for entry in &character.classes {
        sources.push((Owner::class(entry.class), entry.level));
        if let Some(subclass_id) = entry.subclass {
            sources.push((Owner::subclass(subclass_id), entry.level));
        }
    }
    for &feat_id in &character.feats {
        sources.push((Owner::feat(feat_id), total));
    }

    sources
}

/// All catalog groups of one kind applicable to the character right now.
pub(crate) fn applicable_groups<'a>(
    ctx: &ResolveContext<'a>,
    character: &Character,
    kind: ChoiceKind,
) -> Vec<&'a ChoiceGroup> {
    character_sources(ctx.entities, character)
        .into_iter()
        .flat_map(|(owner, max_level)| ctx.catalog.groups_for(&owner, max_level))
        .filter(|group| group.kind == kind)
        .collect()
}

/// Human-readable source of a group: owner name plus the level gate, e.g.
/// "Wizard 3" or "High Elf".
pub(crate) fn source_label(ctx: &ResolveContext<'_>, group: &ChoiceGroup) -> String {
    let name = ctx
        .entities
        .owner_name(&group.owner)
        .unwrap_or_else(|| group.owner.to_string());
    match group.level {
        Some(level) => format!("{name} {level}"),
        None => name,
    }
}

/// Render one catalog option for the pending-choice listing.
pub(crate) fn option_view(ctx: &ResolveContext<'_>, option: &ChoiceOption) -> OptionView {
    let (label, lookup) = match &option.target {
        OptionTarget::Ability(ability) => (ability.name().to_string(), None),
        OptionTarget::Skill(skill) => (skill.name().to_string(), None),
        OptionTarget::Name(name) => (name.clone(), None),
        OptionTarget::Filtered(filter) => (filter_label(ctx, filter), filter.category.clone()),
    };
    OptionView {
        label,
        bundle: option.bundle,
        lookup,
    }
}

fn filter_label(ctx: &ResolveContext<'_>, filter: &OptionFilter) -> String {
    if let Some(category) = &filter.category {
        return format!("any {category}");
    }

    let mut label = match filter.max_spell_level {
        Some(0) => "any cantrip".to_string(),
        Some(max) => format!("any spell of level {max} or lower"),
        None => "any spell".to_string(),
    };
    if let Some(school) = filter.school {
        label.push_str(&format!(" ({school})"));
    }
    if let Some(class_id) = filter.spell_list {
        if let Some(class) = ctx.entities.class(class_id) {
            label.push_str(&format!(" from the {} list", class.name));
        }
    }
    if filter.ritual_only {
        label.push_str(" (ritual)");
    }
    label
}

/// The values already recorded against one group.
pub(crate) fn selected_values(
    resolutions: &[ResolutionRecord],
    group: &ChoiceGroup,
) -> Vec<ChoiceValue> {
    let group_ref = group.group_ref();
    resolutions
        .iter()
        .filter(|r| r.group == group_ref)
        .map(|r| r.value.clone())
        .collect()
}

/// The shared pending-choice computation: discover applicable groups of a
/// kind, join each with its resolutions, compute the remaining count.
pub(crate) fn pending_for_kind(
    ctx: &ResolveContext<'_>,
    character: &Character,
    resolutions: &[ResolutionRecord],
    kind: ChoiceKind,
) -> Vec<PendingChoice> {
    applicable_groups(ctx, character, kind)
        .into_iter()
        .map(|group| {
            let selected = selected_values(resolutions, group);
            let remaining = group.required.saturating_sub(selected.len() as u8);
            PendingChoice {
                id: ChoiceId::new(group.kind, group.group_ref()),
                kind: group.kind,
                source: source_label(ctx, group),
                name: group.label.clone(),
                required: group.required,
                optional: group.optional,
                remaining,
                selected,
                options: group.options.iter().map(|o| option_view(ctx, o)).collect(),
                bonus: group.bonus,
                distinct: group.distinct,
            }
        })
        .collect()
}

/// Submissions are atomic: the value count must equal the required count
/// exactly.
pub(crate) fn ensure_count(
    group: &ChoiceGroup,
    values: &[ChoiceValue],
) -> Result<(), SelectionError> {
    if values.len() != group.required as usize {
        return Err(SelectionError::WrongCount {
            expected: group.required,
            got: values.len(),
        });
    }
    Ok(())
}

/// Reject repeated values when the group demands distinct selections.
pub(crate) fn ensure_distinct(
    group: &ChoiceGroup,
    values: &[ChoiceValue],
) -> Result<(), SelectionError> {
    if !group.distinct {
        return Ok(());
    }
    for (index, value) in values.iter().enumerate() {
        if values[..index].contains(value) {
            return Err(SelectionError::DuplicateValue(value.label()));
        }
    }
    Ok(())
}

/// Match a named value against a group's concrete options and category
/// filters. Category filters defer enumeration to the option-lookup
/// collaborator but the final membership check happens here.
pub(crate) fn match_named_option(
    ctx: &ResolveContext<'_>,
    group: &ChoiceGroup,
    name: &str,
) -> Result<(), SelectionError> {
    let mut category_tried: Option<&str> = None;
    for option in &group.options {
        match &option.target {
            OptionTarget::Name(candidate) if candidate == name => return Ok(()),
            OptionTarget::Filtered(filter) => {
                if let Some(category) = &filter.category {
                    category_tried = Some(category);
                    if ctx.lookup.candidates(category).iter().any(|c| c == name) {
                        return Ok(());
                    }
                }
            }
            _ => {}
        }
    }
    match category_tried {
        Some(category) => Err(SelectionError::NotInCategory {
            value: name.to_string(),
            category: category.to_string(),
        }),
        None => Err(SelectionError::NotAnOption(name.to_string())),
    }
}
