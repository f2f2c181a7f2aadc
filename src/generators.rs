//! Generators as a host pipeline sees them: one `generate(template, count)`
//! call, with the mode and seeding policy fixed up front by a
//! [`GeneratorConfig`].

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::combinatorial::CombinatorialGenerator;
use crate::grammar::parse;
use crate::random::RandomGenerator;
use crate::utils::Result;
use crate::wildcard::WildcardProvider;

/// Default cap on combinatorial output when the caller does not give one
pub const DEFAULT_MAX_PROMPTS: usize = 1000;

/// A configured source of prompts
pub trait PromptGenerator: fmt::Debug + Send {
    /// Produce prompts for `template`. How `count` is read depends on the
    /// generator: an exact number for random generation, a cap for
    /// combinatorial generation.
    fn generate(&mut self, template: &str, count: usize) -> Result<Vec<String>>;
}

/// Which generator a [`GeneratorBuilder`] produces
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMode {
    #[default]
    Random,
    Combinatorial,
    /// Echo the template back unchanged
    Dummy,
}

/// Configuration options for prompt generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub mode: GenerationMode,
    /// Seed for random generation
    pub seed: Option<u64>,
    /// Ignore `seed` and draw from an entropy-seeded RNG
    pub unlink_seed_from_prompt: bool,
    /// Number of times combinatorial generation runs per call
    pub combinatorial_batches: usize,
    /// Generate one prompt and repeat it
    pub freeze_prompt: bool,
    /// Combinatorial cap used when a caller asks for zero prompts
    pub max_prompts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            mode: GenerationMode::Random,
            seed: None,
            unlink_seed_from_prompt: false,
            combinatorial_batches: 1,
            freeze_prompt: false,
            max_prompts: DEFAULT_MAX_PROMPTS,
        }
    }
}

impl GeneratorConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// The seed random generation should use, if any
    pub fn effective_seed(&self) -> Option<u64> {
        if self.unlink_seed_from_prompt {
            None
        } else {
            self.seed
        }
    }
}

/// Random generation with one RNG that advances across calls.
#[derive(Debug)]
pub struct RandomPromptGenerator {
    generator: RandomGenerator,
    rng: StdRng,
}

impl RandomPromptGenerator {
    pub fn new(provider: Arc<dyn WildcardProvider>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        RandomPromptGenerator {
            generator: RandomGenerator::new(provider),
            rng,
        }
    }
}

impl PromptGenerator for RandomPromptGenerator {
    fn generate(&mut self, template: &str, count: usize) -> Result<Vec<String>> {
        let command = parse(template)?;
        let prompts = self.generator.generate_from(&command, count, &mut self.rng)?;
        debug!(template, count, produced = prompts.len(), "generated random prompts");
        Ok(prompts)
    }
}

/// Combinatorial generation; `count` is the cap, zero meaning the default.
#[derive(Debug)]
pub struct CombinatorialPromptGenerator {
    generator: CombinatorialGenerator,
    max_prompts: usize,
}

impl CombinatorialPromptGenerator {
    pub fn new(provider: Arc<dyn WildcardProvider>, max_prompts: usize) -> Self {
        CombinatorialPromptGenerator {
            generator: CombinatorialGenerator::new(provider),
            max_prompts,
        }
    }
}

impl PromptGenerator for CombinatorialPromptGenerator {
    fn generate(&mut self, template: &str, count: usize) -> Result<Vec<String>> {
        let cap = if count == 0 { self.max_prompts } else { count };
        self.generator.generate(template, cap)
    }
}

/// Runs the inner generator `batches` times and concatenates the output.
#[derive(Debug)]
pub struct BatchedGenerator {
    inner: Box<dyn PromptGenerator>,
    batches: usize,
}

impl BatchedGenerator {
    pub fn new(inner: Box<dyn PromptGenerator>, batches: usize) -> Self {
        BatchedGenerator { inner, batches }
    }
}

impl PromptGenerator for BatchedGenerator {
    fn generate(&mut self, template: &str, count: usize) -> Result<Vec<String>> {
        let mut prompts = Vec::new();
        for _ in 0..self.batches {
            prompts.extend(self.inner.generate(template, count)?);
        }
        Ok(prompts)
    }
}

/// Returns the template unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyGenerator;

impl PromptGenerator for DummyGenerator {
    fn generate(&mut self, template: &str, count: usize) -> Result<Vec<String>> {
        Ok(vec![template.to_string(); count])
    }
}

/// Generates a single prompt and repeats it `count` times.
#[derive(Debug)]
pub struct FrozenPromptGenerator {
    inner: Box<dyn PromptGenerator>,
}

impl FrozenPromptGenerator {
    pub fn new(inner: Box<dyn PromptGenerator>) -> Self {
        FrozenPromptGenerator { inner }
    }
}

impl PromptGenerator for FrozenPromptGenerator {
    fn generate(&mut self, template: &str, count: usize) -> Result<Vec<String>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let prompts = self.inner.generate(template, 1)?;
        Ok(match prompts.into_iter().next() {
            Some(prompt) => vec![prompt; count],
            None => Vec::new(),
        })
    }
}

/// Builder for composing a [`PromptGenerator`] from a [`GeneratorConfig`]
#[derive(Debug)]
pub struct GeneratorBuilder {
    provider: Arc<dyn WildcardProvider>,
    config: GeneratorConfig,
}

impl GeneratorBuilder {
    /// Create a new builder with the default config
    pub fn new(provider: Arc<dyn WildcardProvider>) -> Self {
        GeneratorBuilder {
            provider,
            config: GeneratorConfig::default(),
        }
    }

    /// Set the configuration
    pub fn config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn mode(mut self, mode: GenerationMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = Some(seed);
        self
    }

    pub fn unlink_seed_from_prompt(mut self, unlink: bool) -> Self {
        self.config.unlink_seed_from_prompt = unlink;
        self
    }

    pub fn combinatorial_batches(mut self, batches: usize) -> Self {
        self.config.combinatorial_batches = batches;
        self
    }

    pub fn freeze_prompt(mut self, freeze: bool) -> Self {
        self.config.freeze_prompt = freeze;
        self
    }

    /// Build the generator
    pub fn build(self) -> Box<dyn PromptGenerator> {
        let config = self.config;
        debug!(
            mode = ?config.mode,
            seed = ?config.seed,
            unlink_seed_from_prompt = config.unlink_seed_from_prompt,
            combinatorial_batches = config.combinatorial_batches,
            freeze_prompt = config.freeze_prompt,
            "creating generator"
        );

        let generator: Box<dyn PromptGenerator> = match config.mode {
            GenerationMode::Dummy => return Box::new(DummyGenerator),
            GenerationMode::Combinatorial => Box::new(BatchedGenerator::new(
                Box::new(CombinatorialPromptGenerator::new(self.provider, config.max_prompts)),
                config.combinatorial_batches,
            )),
            GenerationMode::Random => Box::new(RandomPromptGenerator::new(
                self.provider,
                config.effective_seed(),
            )),
        };

        if config.freeze_prompt {
            Box::new(FrozenPromptGenerator::new(generator))
        } else {
            generator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wildcard::WildcardMap;
    use pretty_assertions::assert_eq;

    fn provider() -> Arc<dyn WildcardProvider> {
        Arc::new(WildcardMap::new().insert("colours", ["red", "green", "blue"]))
    }

    #[test]
    fn test_config_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.mode, GenerationMode::Random);
        assert_eq!(config.seed, None);
        assert_eq!(config.combinatorial_batches, 1);
        assert_eq!(config.max_prompts, DEFAULT_MAX_PROMPTS);
        assert!(!config.freeze_prompt);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config = GeneratorConfig::from_json_str(r#"{"mode": "combinatorial", "seed": 7}"#).unwrap();
        assert_eq!(config.mode, GenerationMode::Combinatorial);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.combinatorial_batches, 1);
        assert_eq!(config.max_prompts, DEFAULT_MAX_PROMPTS);
    }

    #[test]
    fn test_config_rejects_unknown_mode() {
        assert!(GeneratorConfig::from_json_str(r#"{"mode": "lucky"}"#).is_err());
    }

    #[test]
    fn test_effective_seed() {
        let mut config = GeneratorConfig {
            seed: Some(3),
            ..GeneratorConfig::default()
        };
        assert_eq!(config.effective_seed(), Some(3));

        config.unlink_seed_from_prompt = true;
        assert_eq!(config.effective_seed(), None);
    }

    #[test]
    fn test_random_generator_is_seeded() {
        let template = "{a|b|c|d|e|f|g|h} __colours__";
        let mut first = GeneratorBuilder::new(provider()).seed(42).build();
        let mut second = GeneratorBuilder::new(provider()).seed(42).build();
        assert_eq!(
            first.generate(template, 10).unwrap(),
            second.generate(template, 10).unwrap()
        );
    }

    #[test]
    fn test_random_generator_rng_advances() {
        let template = "{a|b|c|d|e|f|g|h|i|j|k|l|m|n|o|p}";
        let mut generator = GeneratorBuilder::new(provider()).seed(1).build();
        let first = generator.generate(template, 20).unwrap();
        let second = generator.generate(template, 20).unwrap();
        assert_eq!(first.len(), 20);
        assert_ne!(first, second);
    }

    #[test]
    fn test_combinatorial_generator() {
        let mut generator = GeneratorBuilder::new(provider())
            .mode(GenerationMode::Combinatorial)
            .build();
        assert_eq!(
            generator.generate("A __colours__ ball", 2).unwrap(),
            vec!["A red ball", "A green ball"]
        );
        assert_eq!(generator.generate("A __colours__ ball", 0).unwrap().len(), 3);
    }

    #[test]
    fn test_combinatorial_batches() {
        let mut generator = GeneratorBuilder::new(provider())
            .mode(GenerationMode::Combinatorial)
            .combinatorial_batches(2)
            .build();
        assert_eq!(
            generator.generate("{x|y}", 10).unwrap(),
            vec!["x", "y", "x", "y"]
        );
    }

    #[test]
    fn test_dummy_generator() {
        let mut generator = GeneratorBuilder::new(provider())
            .mode(GenerationMode::Dummy)
            .freeze_prompt(true)
            .build();
        assert_eq!(
            generator.generate("A {x|y}", 3).unwrap(),
            vec!["A {x|y}", "A {x|y}", "A {x|y}"]
        );
    }

    #[test]
    fn test_frozen_generator_repeats_one_prompt() {
        let template = "{A|B|C|D|E|F|G|H|I|J|K}";
        let mut generator = GeneratorBuilder::new(provider()).seed(5).freeze_prompt(true).build();

        let mut firsts = Vec::new();
        for _ in 0..5 {
            let prompts = generator.generate(template, 10).unwrap();
            assert_eq!(prompts.len(), 10);
            assert!(prompts.iter().all(|p| *p == prompts[0]));
            firsts.push(prompts[0].clone());
        }

        firsts.dedup();
        assert!(firsts.len() > 1, "frozen prompt never changed between calls");
    }

    #[test]
    fn test_frozen_zero_count() {
        let mut generator = FrozenPromptGenerator::new(Box::new(DummyGenerator));
        assert!(generator.generate("anything", 0).unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors_surface() {
        let mut generator = GeneratorBuilder::new(provider()).build();
        assert!(generator.generate("{unclosed", 1).is_err());
    }
}
