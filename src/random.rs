//! Random generation: one stochastic walk of the command tree per prompt.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::iter;
use std::sync::Arc;
use tracing::debug;

use crate::combination::{CombinationCollector, CombinationSelector, Selected};
use crate::command::{Command, Variant};
use crate::grammar::parse;
use crate::strategy::{RenderStrategy, Renders};
use crate::utils::{MAX_RECURSION_DEPTH, PromptError, Result, join_non_empty};
use crate::wildcard::{WildcardProvider, resolve_wildcard};

/// Renders each node by a single random choice.
pub struct RandomStrategy<'a, R: Rng + ?Sized> {
    resolver: Resolver<'a>,
    rng: &'a mut R,
}

impl<'a, R: Rng + ?Sized> RandomStrategy<'a, R> {
    pub fn new(provider: &'a dyn WildcardProvider, rng: &'a mut R) -> Self {
        RandomStrategy {
            resolver: Resolver { provider },
            rng,
        }
    }
}

impl<'a, R: Rng + ?Sized> RenderStrategy for RandomStrategy<'a, R> {
    fn render<'s>(&'s mut self, command: &'s Command, depth: usize) -> Renders<'s> {
        Box::new(iter::once(self.resolver.resolve(&mut *self.rng, command, depth)))
    }
}

/// The tree walk itself. Kept apart from the RNG so a variant can lend the
/// RNG to its collector and still render picks as they are drawn.
#[derive(Clone, Copy)]
struct Resolver<'a> {
    provider: &'a dyn WildcardProvider,
}

impl Resolver<'_> {
    fn resolve<R: Rng + ?Sized>(self, rng: &mut R, command: &Command, depth: usize) -> Result<String> {
        match command {
            Command::Literal { text } => Ok(text.clone()),
            Command::Sequence { parts, separator } => {
                let mut rendered = Vec::with_capacity(parts.len());
                for part in parts {
                    rendered.push(self.resolve(rng, part, depth)?);
                }
                Ok(join_non_empty(&rendered, separator).trim().to_string())
            }
            Command::Variant(variant) => self.resolve_variant(rng, variant, depth),
            Command::Wildcard { name } => self.resolve_wildcard(rng, name, depth),
        }
    }

    fn resolve_variant<R: Rng + ?Sized>(self, rng: &mut R, variant: &Variant, depth: usize) -> Result<String> {
        if variant.is_empty() {
            return Ok(String::new());
        }

        // distinct by rendered text, not by which option was drawn
        let selector = CombinationSelector::new(variant.options(), self.provider);
        let picks = CombinationCollector::new(&selector).collect(
            rng,
            variant.min_bound()..=variant.max_bound(),
            |rng, pick| match selector.resolve(pick) {
                Some(Selected::Command(command)) => self.resolve(rng, command, depth),
                Some(Selected::Value(value)) => self.resolve_template(rng, value, depth + 1),
                None => Ok(String::new()),
            },
        )?;
        Ok(picks.join(variant.joiner()))
    }

    fn resolve_wildcard<R: Rng + ?Sized>(self, rng: &mut R, name: &str, depth: usize) -> Result<String> {
        let values = resolve_wildcard(self.provider, name);
        match values.choose(rng) {
            Some(value) => self.resolve_template(rng, value, depth + 1),
            None => Ok(String::new()),
        }
    }

    /// Parse wildcard content and render it one level deeper
    fn resolve_template<R: Rng + ?Sized>(self, rng: &mut R, template: &str, depth: usize) -> Result<String> {
        if depth > MAX_RECURSION_DEPTH {
            return Err(PromptError::RecursionLimit {
                limit: MAX_RECURSION_DEPTH,
                template: template.to_string(),
            });
        }
        let command = parse(template)?;
        self.resolve(rng, &command, depth)
    }
}

/// Produces independent random prompts from a template.
#[derive(Debug, Clone)]
pub struct RandomGenerator {
    provider: Arc<dyn WildcardProvider>,
}

impl RandomGenerator {
    pub fn new(provider: Arc<dyn WildcardProvider>) -> Self {
        RandomGenerator { provider }
    }

    /// Generate `count` prompts. A seed makes the output reproducible; without
    /// one the generator draws from an entropy-seeded RNG.
    pub fn generate(&self, template: &str, count: usize, seed: Option<u64>) -> Result<Vec<String>> {
        let command = parse(template)?;
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let prompts = self.generate_from(&command, count, &mut rng)?;
        debug!(template, count, produced = prompts.len(), "generated random prompts");
        Ok(prompts)
    }

    /// Generate `count` prompts from a parsed tree with a caller-owned RNG.
    /// The RNG advances, so repeated calls continue the same random stream.
    pub fn generate_from<R: Rng + ?Sized>(
        &self,
        command: &Command,
        count: usize,
        rng: &mut R,
    ) -> Result<Vec<String>> {
        let mut strategy = RandomStrategy::new(&*self.provider, rng);
        (0..count).map(|_| strategy.render_one(command)).collect()
    }
}
