//! Language choices.
//!
//! Options are either concrete language names or a category filter
//! ("standard-languages", "exotic-languages") enumerated on demand by the
//! option-lookup collaborator.

use super::{ensure_count, ensure_distinct, match_named_option, pending_for_kind};
use crate::catalog::{ChoiceGroup, ChoiceKind};
use crate::character::Character;
use crate::choice::{
    ChoiceResolver, ChoiceValue, PendingChoice, ResolutionRecord, ResolveContext, SelectionError,
};

pub struct LanguageResolver;

impl ChoiceResolver for LanguageResolver {
    fn kind(&self) -> ChoiceKind {
        ChoiceKind::Language
    }

    fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice> {
        pending_for_kind(ctx, character, resolutions, ChoiceKind::Language)
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
                    expected: "language",
                });
            };
            match_named_option(ctx, group, name)?;
        }

        Ok(values
            .iter()
            .map(|value| ResolutionRecord::new(group, value.clone()))
            .collect())
    }
}
