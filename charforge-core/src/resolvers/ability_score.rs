//! Ability-score bonus choices.
//!
//! The group carries the bonus magnitude; resolving applies it to the
//! character's scores and records the applied magnitude so undo can revert
//! it exactly. Groups normally demand distinct ability targets.

use super::{ensure_count, ensure_distinct, pending_for_kind};
use crate::catalog::{ChoiceGroup, ChoiceKind, OptionTarget};
use crate::character::{Ability, Character};
use crate::choice::{
    ChoiceResolver, ChoiceValue, PendingChoice, ResolutionRecord, ResolveContext, SelectionError,
};

pub struct AbilityScoreResolver;

impl ChoiceResolver for AbilityScoreResolver {
    fn kind(&self) -> ChoiceKind {
        ChoiceKind::AbilityScore
    }

    fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice> {
        pending_for_kind(ctx, character, resolutions, ChoiceKind::AbilityScore)
    }

    fn resolve(
        &self,
        _ctx: &ResolveContext<'_>,
        character: &mut Character,
        group: &ChoiceGroup,
        values: &[ChoiceValue],
    ) -> Result<Vec<ResolutionRecord>, SelectionError> {
        ensure_count(group, values)?;
        ensure_distinct(group, values)?;

        let mut abilities = Vec::with_capacity(values.len());
        for value in values {
            let ChoiceValue::Ability(ability) = value else {
                return Err(SelectionError::WrongValueType {
                    value: value.label(),
                    expected: "ability score",
                });
            };
            if !admits_ability(group, *ability) {
                return Err(SelectionError::NotAnOption(ability.name().to_string()));
            }
            abilities.push(*ability);
        }

        let bonus = group.bonus.unwrap_or(1);
        for &ability in &abilities {
            apply_bonus(character, ability, bonus);
        }

        Ok(abilities
            .into_iter()
            .map(|ability| {
                ResolutionRecord::new(group, ChoiceValue::Ability(ability)).with_magnitude(bonus)
            })
            .collect())
    }

    fn undo(
        &self,
        _ctx: &ResolveContext<'_>,
        character: &mut Character,
        _group: &ChoiceGroup,
        records: &[ResolutionRecord],
    ) {
        for record in records {
            if let (ChoiceValue::Ability(ability), Some(magnitude)) =
                (&record.value, record.magnitude)
            {
                apply_bonus(character, *ability, -magnitude);
            }
        }
    }
}

fn admits_ability(group: &ChoiceGroup, ability: Ability) -> bool {
    group.options.iter().any(|option| match &option.target {
        OptionTarget::Ability(candidate) => *candidate == ability,
        OptionTarget::Filtered(_) => true,
        _ => false,
    })
}

fn apply_bonus(character: &mut Character, ability: Ability, bonus: i8) {
    let current = character.ability_scores.get(ability) as i16;
    let updated = (current + bonus as i16).max(0) as u8;
    character.ability_scores.set(ability, updated);
}
