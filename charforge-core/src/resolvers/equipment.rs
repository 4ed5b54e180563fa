//! Starting-equipment choices.
//!
//! Options are grouped into mutually exclusive bundles by a letter tag; a
//! valid selection is exactly one bundle's items, never a mix. Bundle slots
//! may be concrete items or category filters ("any musical instrument").

use super::{ensure_count, pending_for_kind};
use crate::catalog::{ChoiceGroup, ChoiceKind, ChoiceOption, OptionTarget};
use crate::character::Character;
use crate::choice::{
    ChoiceResolver, ChoiceValue, PendingChoice, ResolutionRecord, ResolveContext, SelectionError,
};

pub struct EquipmentResolver;

impl ChoiceResolver for EquipmentResolver {
    fn kind(&self) -> ChoiceKind {
        ChoiceKind::Equipment
    }

    fn pending_choices(
        &self,
        ctx: &ResolveContext<'_>,
        character: &Character,
        resolutions: &[ResolutionRecord],
    ) -> Vec<PendingChoice> {
        pending_for_kind(ctx, character, resolutions, ChoiceKind::Equipment)
    }

    fn resolve(
        &self,
        ctx: &ResolveContext<'_>,
        _character: &mut Character,
        group: &ChoiceGroup,
        values: &[ChoiceValue],
    ) -> Result<Vec<ResolutionRecord>, SelectionError> {
        let mut names = Vec::with_capacity(values.len());
        for value in values {
            let ChoiceValue::Name(name) = value else {
                return Err(SelectionError::WrongValueType {
                    value: value.label(),
                    expected: "equipment",
                });
            };
            names.push(name.as_str());
        }
        if names.is_empty() {
            return Err(SelectionError::WrongCount {
                expected: group.required,
                got: 0,
            });
        }

        for letter in group.bundle_letters() {
            let options = bundle_options(group, letter);
            if names.len() == options.len() && bundle_matches(ctx, &options, &names) {
                return Ok(values
                    .iter()
                    .map(|value| ResolutionRecord::new(group, value.clone()))
                    .collect());
            }
        }

        Err(self.mismatch_error(ctx, group, &names, values))
    }
}

impl EquipmentResolver {
    /// No bundle matched; work out the most specific complaint.
    fn mismatch_error(
        &self,
        ctx: &ResolveContext<'_>,
        group: &ChoiceGroup,
        names: &[&str],
        values: &[ChoiceValue],
    ) -> SelectionError {
        // A value that is no option at all.
        for name in names {
            if letters_admitting(ctx, group, name).is_empty() {
                return SelectionError::NotAnOption(name.to_string());
            }
        }

        // All values are options; is there one bundle they all belong to?
        let mut common = letters_admitting(ctx, group, names[0]);
        let mut offender = None;
        for name in &names[1..] {
            let letters = letters_admitting(ctx, group, name);
            common.retain(|l| letters.contains(l));
            if common.is_empty() {
                offender = Some(name.to_string());
                break;
            }
        }

        match (offender, common.first()) {
            (Some(value), _) => SelectionError::BundleMismatch { value },
            (None, Some(&letter)) => SelectionError::IncompleteBundle {
                bundle: letter,
                expected: bundle_options(group, letter).len(),
                got: names.len(),
            },
            // Unreachable with a validated catalog; fall back to the count
            // check's error shape.
            (None, None) => ensure_count(group, values)
                .err()
                .unwrap_or(SelectionError::BundleMismatch {
                    value: names[0].to_string(),
                }),
        }
    }
}

fn bundle_options(group: &ChoiceGroup, letter: char) -> Vec<&ChoiceOption> {
    group
        .options
        .iter()
        .filter(|o| o.bundle == Some(letter))
        .collect()
}

/// Which bundle letters admit a submitted item.
fn letters_admitting(ctx: &ResolveContext<'_>, group: &ChoiceGroup, name: &str) -> Vec<char> {
    let mut letters = Vec::new();
    for option in &group.options {
        let Some(letter) = option.bundle else { continue };
        if letters.contains(&letter) {
            continue;
        }
        if option_admits(ctx, option, name) {
            letters.push(letter);
        }
    }
    letters
}

fn option_admits(ctx: &ResolveContext<'_>, option: &ChoiceOption, name: &str) -> bool {
    match &option.target {
        OptionTarget::Name(candidate) => candidate == name,
        OptionTarget::Filtered(filter) => filter
            .category
            .as_deref()
            .map(|category| ctx.lookup.candidates(category).iter().any(|c| c == name))
            .unwrap_or(false),
        _ => false,
    }
}

/// Multiset match of submitted names against one bundle's slots: concrete
/// slots claim their exact item first, then filter slots claim whatever
/// qualifies.
fn bundle_matches(ctx: &ResolveContext<'_>, options: &[&ChoiceOption], names: &[&str]) -> bool {
    let mut remaining: Vec<&str> = names.to_vec();

    for option in options {
        if let OptionTarget::Name(candidate) = &option.target {
            match remaining.iter().position(|n| n == candidate) {
                Some(index) => {
                    remaining.swap_remove(index);
                }
                None => return false,
            }
        }
    }

    for option in options {
        if matches!(option.target, OptionTarget::Filtered(_)) {
            match remaining
                .iter()
                .position(|n| option_admits(ctx, option, n))
            {
                Some(index) => {
                    remaining.swap_remove(index);
                }
                None => return false,
            }
        }
    }

    remaining.is_empty()
}
