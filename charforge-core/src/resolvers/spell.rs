//! Spell choices.
//!
//! Unrestricted options carry filters (maximum spell level, class-list
//! membership, school, ritual-only); a chosen spell must satisfy every
//! non-null filter of the option that admits it.

use super::{ensure_count, ensure_distinct, pending_for_kind};
use crate::catalog::{ChoiceGroup, ChoiceKind, OptionFilter, OptionTarget};
use crate::character::Character;
use crate::choice::{
    ChoiceResolver, ChoiceValue, PendingChoice, ResolutionRecord, ResolveContext, SelectionError,
};
use crate::content::SpellDef;

pub struct SpellResolver;

impl ChoiceResolver for SpellResolver {
    fn kind(&self) -> ChoiceKind {
        ChoiceKind::Spell
    }

    fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice> {
        pending_for_kind(ctx, character, resolutions, ChoiceKind::Spell)
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        _character: &mut Character,
        group: &ChoiceGroup,
        values: &[ChoiceValue],
    ) -> Result<Vec<ResolutionRecord>, SelectionError> {
        ensure_count(group, values)?;
        ensure_distinct(group, values)?;

        for value in values {
            let ChoiceValue::Name(name) = value else {
                return Err(SelectionError::WrongValueType {
                    value: value.label(),
                    expected: "spell",
                });
            };
            let spell = ctx
                .entities
                .spell(name)
                .ok_or_else(|| SelectionError::UnknownSpell(name.clone()))?;
            match_spell(ctx, group, spell)?;
        }

        Ok(values
            .iter()
            .map(|value| ResolutionRecord::new(group, value.clone()))
            .collect())
    }
}

/// A spell is admitted by a concrete option naming it, or by a filtered
/// option whose every constraint it satisfies. When no option admits it,
/// report the first filter's specific violation.
fn match_spell(
    ctx: &ResolveContext<'_>,
    group: &ChoiceGroup,
    spell: &SpellDef,
) -> Result<(), SelectionError> {
    let mut first_violation = None;

    for option in &group.options {
        match &option.target {
            OptionTarget::Name(candidate) if *candidate == spell.name => return Ok(()),
            OptionTarget::Filtered(filter) => match check_filter(ctx, filter, spell) {
                Ok(()) => return Ok(()),
                Err(violation) => {
                    first_violation.get_or_insert(violation);
                }
            },
            _ => {}
        }
    }

    Err(first_violation.unwrap_or_else(|| SelectionError::NotAnOption(spell.name.clone())))
}

fn check_filter(
    ctx: &ResolveContext<'_>,
    filter: &OptionFilter,
    spell: &SpellDef,
) -> Result<(), SelectionError> {
    if let Some(max_level) = filter.max_spell_level {
        if spell.level > max_level {
            return Err(SelectionError::SpellLevelTooHigh {
                spell: spell.name.clone(),
                level: spell.level,
                max_level,
            });
        }
    }
    if let Some(class_id) = filter.spell_list {
        if !spell.classes.contains(&class_id) {
            let class = ctx
                .entities
                .class(class_id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| class_id.to_string());
            return Err(SelectionError::NotOnSpellList {
                spell: spell.name.clone(),
                class,
            });
        }
    }
    if let Some(school) = filter.school {
        if spell.school != school {
            return Err(SelectionError::WrongSchool {
                spell: spell.name.clone(),
                required: school,
            });
        }
    }
    if filter.ritual_only && !spell.ritual {
        return Err(SelectionError::NotRitual {
            spell: spell.name.clone(),
        });
    }
    Ok(())
}
