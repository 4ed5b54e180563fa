//! Skill and tool proficiency choices.
//!
//! Groups mix concrete skill options with category filters ("any artisan's
//! tools") whose candidates come from the option-lookup collaborator.

use super::{ensure_count, ensure_distinct, match_named_option, pending_for_kind};
use crate::catalog::{ChoiceGroup, ChoiceKind, OptionFilter, OptionTarget};
use crate::character::Character;
use crate::choice::{
    ChoiceResolver, ChoiceValue, PendingChoice, ResolutionRecord, ResolveContext, SelectionError,
};
use crate::content::categories;

pub struct ProficiencyResolver;

impl ChoiceResolver for ProficiencyResolver {
    fn kind(&self) -> ChoiceKind {
        ChoiceKind::Proficiency
    }

    fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice> {
        pending_for_kind(ctx, character, resolutions, ChoiceKind::Proficiency)
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
            match value {
                ChoiceValue::Skill(skill) => {
                    if !admits_skill(group, *skill) {
                        return Err(SelectionError::NotAnOption(skill.name().to_string()));
                    }
                }
                ChoiceValue::Name(name) => match_named_option(ctx, group, name)?,
                ChoiceValue::Ability(_) => {
                    return Err(SelectionError::WrongValueType {
                        value: value.label(),
                        expected: "proficiency",
                    })
                }
            }
        }

        Ok(values
            .iter()
            .map(|value| ResolutionRecord::new(group, value.clone()))
            .collect())
    }
}

/// A skill is admitted by a concrete skill option or by an unrestricted
/// "any skill" filter.
fn admits_skill(group: &ChoiceGroup, skill: crate::character::Skill) -> bool {
    group.options.iter().any(|option| match &option.target {
        OptionTarget::Skill(candidate) => *candidate == skill,
        OptionTarget::Filtered(OptionFilter { category, .. }) => {
            matches!(category.as_deref(), Some(categories::SKILLS))
        }
        _ => false,
    })
}
