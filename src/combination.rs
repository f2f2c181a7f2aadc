//! Weighted selection of variant options without repetition.

use rand::Rng;
use rand::distributions::{Distribution, WeightedIndex};
use std::ops::RangeInclusive;
use tracing::warn;

use crate::command::{Command, VariantOption};
use crate::utils::Result;
use crate::wildcard::{WildcardProvider, resolve_wildcard};

/// Consecutive duplicate picks tolerated before the collector gives up
pub const MAX_SELECTION_ATTEMPTS: usize = 100;

/// Something that draws items, with replacement
pub trait Selector {
    type Item;

    /// Draw `count` items. Returns fewer only when nothing is selectable.
    fn pick<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Self::Item>;
}

/// Identity of a draw: which option, and which value of a wildcard option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pick {
    pub option: usize,
    pub value: Option<usize>,
}

/// What a [`Pick`] refers to
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selected<'s> {
    Command(&'s Command),
    /// Raw wildcard value, still to be parsed
    Value(&'s str),
}

#[derive(Debug)]
enum Choice<'c> {
    Command(&'c Command),
    Values(Vec<String>),
}

/// Weighted choice over a variant's options. An option that is a bare
/// wildcard is replaced by its values, each equally likely once the option
/// itself has been chosen.
#[derive(Debug)]
pub struct CombinationSelector<'c> {
    choices: Vec<Choice<'c>>,
    distribution: Option<WeightedIndex<f64>>,
}

impl<'c> CombinationSelector<'c> {
    pub fn new(options: &'c [VariantOption], provider: &dyn WildcardProvider) -> Self {
        let mut choices = Vec::with_capacity(options.len());
        let mut weights = Vec::with_capacity(options.len());

        for option in options {
            let choice = match option.value.as_wildcard() {
                Some(name) => Choice::Values(resolve_wildcard(provider, name)),
                None => Choice::Command(&option.value),
            };
            let selectable = !matches!(&choice, Choice::Values(values) if values.is_empty());
            weights.push(if selectable { option.weight } else { 0.0 });
            choices.push(choice);
        }

        // fails when every weight is zero
        let distribution = WeightedIndex::new(&weights).ok();
        if distribution.is_none() && !options.is_empty() {
            warn!(options = options.len(), "variant has no selectable option");
        }

        CombinationSelector {
            choices,
            distribution,
        }
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Look up what a pick made by this selector refers to
    pub fn resolve(&self, pick: Pick) -> Option<Selected<'_>> {
        match (self.choices.get(pick.option)?, pick.value) {
            (Choice::Command(command), None) => Some(Selected::Command(command)),
            (Choice::Values(values), Some(index)) => {
                values.get(index).map(|v| Selected::Value(v.as_str()))
            }
            _ => None,
        }
    }
}

impl Selector for CombinationSelector<'_> {
    type Item = Pick;

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Pick> {
        let Some(distribution) = &self.distribution else {
            return Vec::new();
        };

        let mut picked = Vec::with_capacity(count);
        for _ in 0..count {
            let option = distribution.sample(rng);
            let value = match &self.choices[option] {
                Choice::Command(_) => None,
                Choice::Values(values) => Some(rng.gen_range(0..values.len())),
            };
            picked.push(Pick { option, value });
        }
        picked
    }
}

/// Gathers picks from a [`Selector`] whose rendered values are distinct.
///
/// Each pick is rendered as soon as it is drawn, and a pick whose value was
/// already collected counts as a duplicate, so two options with the same
/// text, or a wildcard value equal to a literal option, never both appear.
/// Asking for more distinct values than exist is not an error: after
/// [`MAX_SELECTION_ATTEMPTS`] duplicate draws in a row the collector returns
/// what it has.
#[derive(Debug)]
pub struct CombinationCollector<'s, S> {
    selector: &'s S,
}

impl<'s, S: Selector> CombinationCollector<'s, S> {
    pub fn new(selector: &'s S) -> Self {
        CombinationCollector { selector }
    }

    /// Collect between `bounds.start()` and `bounds.end()` distinct values,
    /// the exact number drawn uniformly from the range. `render` turns a pick
    /// into its value and may draw from the same RNG.
    pub fn collect<R, T, F>(
        &self,
        rng: &mut R,
        bounds: RangeInclusive<usize>,
        mut render: F,
    ) -> Result<Vec<T>>
    where
        R: Rng + ?Sized,
        T: PartialEq,
        F: FnMut(&mut R, S::Item) -> Result<T>,
    {
        let (min, max) = (*bounds.start(), *bounds.end());
        let wanted = rng.gen_range(min..=max.max(min));

        let mut collected: Vec<T> = Vec::with_capacity(wanted);
        let mut attempts = 0;

        while collected.len() < wanted {
            attempts += 1;
            if attempts > MAX_SELECTION_ATTEMPTS {
                warn!(
                    wanted,
                    collected = collected.len(),
                    "not enough distinct options, returning a shorter selection"
                );
                break;
            }

            let Some(item) = self.selector.pick(rng, 1).pop() else {
                break;
            };
            let value = render(rng, item)?;
            if collected.contains(&value) {
                continue;
            }

            attempts = 0;
            collected.push(value);
        }

        Ok(collected)
    }
}
