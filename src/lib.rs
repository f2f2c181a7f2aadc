//! Promptgen is a template language for generating families of text prompts.
//!
//! A template mixes literal text with `{a|b}` variants and `__name__`
//! wildcards. It parses once into a [`Command`] tree, which can then be
//! rendered randomly (one independent draw per prompt) or combinatorially
//! (every distinct prompt, in order, up to a cap).
//!
//! # Example
//!
//! ```rust
//! use promptgen::{CombinatorialGenerator, RandomGenerator, WildcardMap};
//! use std::sync::Arc;
//!
//! let wildcards = Arc::new(WildcardMap::new().insert("colours", ["red", "green"]));
//!
//! // Every combination, in order
//! let combinatorial = CombinatorialGenerator::new(wildcards.clone());
//! let prompts = combinatorial.generate("A __colours__ {ball|cube}", 10).unwrap();
//! assert_eq!(prompts, ["A red ball", "A red cube", "A green ball", "A green cube"]);
//!
//! // Reproducible random draws
//! let random = RandomGenerator::new(wildcards);
//! let prompts = random.generate("A __colours__ {ball|cube}", 3, Some(42)).unwrap();
//! assert_eq!(prompts.len(), 3);
//! assert_eq!(prompts, random.generate("A __colours__ {ball|cube}", 3, Some(42)).unwrap());
//! ```

pub mod combination;
pub mod combinatorial;
pub mod command;
pub mod generators;
pub mod grammar;
pub mod random;
pub mod strategy;
pub mod utils;
pub mod wildcard;

pub use combinatorial::{CombinatorialGenerator, CombinatorialStrategy};
pub use command::{BoundExpr, Command, Variant, VariantOption};
pub use generators::{
    GenerationMode, GeneratorBuilder, GeneratorConfig, PromptGenerator,
};
pub use grammar::parse;
pub use random::{RandomGenerator, RandomStrategy};
pub use strategy::RenderStrategy;
pub use utils::{MAX_RECURSION_DEPTH, ParseError, ParseErrorKind, PromptError, Result};
pub use wildcard::{WildcardMap, WildcardProvider};
