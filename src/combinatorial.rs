//! Combinatorial generation: every distinct prompt a template can produce,
//! enumerated lazily so a cap stops the walk early.

use std::collections::{HashMap, HashSet};
use std::iter;
use std::ops::RangeInclusive;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::command::{Command, Variant};
use crate::grammar::parse;
use crate::strategy::{RenderStrategy, Renders};
use crate::utils::{MAX_RECURSION_DEPTH, PromptError, Result, dedupe_in_order, join_pair};
use crate::wildcard::{WildcardProvider, resolve_wildcard};

/// Lazy stream of rendered selections
type Tuples<'a> = Box<dyn Iterator<Item = Result<Vec<String>>> + 'a>;

/// Renders each node as the full, ordered set of its expansions.
///
/// Nodes are cloned into the iterators that expand them, so a stream can
/// outlive the tree it came from. This is what lets wildcard content be
/// parsed on demand in the middle of a walk.
#[derive(Debug, Clone, Copy)]
pub struct CombinatorialStrategy<'a> {
    provider: &'a dyn WildcardProvider,
}

impl<'a> CombinatorialStrategy<'a> {
    pub fn new(provider: &'a dyn WildcardProvider) -> Self {
        CombinatorialStrategy { provider }
    }

    fn expand(self, command: Command, depth: usize) -> Renders<'a> {
        match command {
            Command::Literal { text } => Box::new(iter::once(Ok(text))),
            Command::Sequence { parts, separator } => Box::new(
                self.expand_parts(parts.into(), separator.into(), 0, depth)
                    .map(|rendered| rendered.map(|text| text.trim().to_string())),
            ),
            Command::Variant(variant) => self.expand_variant(variant, depth),
            Command::Wildcard { name } => self.expand_wildcard(&name, depth),
        }
    }

    /// Cross product of `parts[index..]`, the earliest part varying slowest
    fn expand_parts(self, parts: Rc<[Command]>, separator: Rc<str>, index: usize, depth: usize) -> Renders<'a> {
        let Some(head) = parts.get(index).cloned() else {
            return Box::new(iter::once(Ok(String::new())));
        };

        Box::new(self.expand(head, depth).flat_map(move |head| -> Renders<'a> {
            let head = match head {
                Ok(head) => head,
                Err(err) => return Box::new(iter::once(Err(err))),
            };
            let separator = Rc::clone(&separator);
            let tails = self.expand_parts(Rc::clone(&parts), Rc::clone(&separator), index + 1, depth);
            Box::new(tails.map(move |tail| tail.map(|tail| join_pair(&head, &tail, &separator))))
        }))
    }

    fn expand_variant(self, variant: Variant, depth: usize) -> Renders<'a> {
        if variant.is_empty() {
            return Box::new(iter::once(Ok(String::new())));
        }

        let (options, min, max, joiner) = variant.into_parts();
        let options: Rc<[Command]> = options.into_iter().map(|option| option.value).collect();

        // single picks stream straight from each option
        let singles: Tuples<'a> = if min == 1 {
            let options = Rc::clone(&options);
            Box::new((0..options.len()).flat_map(move |index| {
                self.expand(options[index].clone(), depth)
                    .map(|value| value.map(|value| vec![value]))
            }))
        } else {
            Box::new(iter::empty())
        };

        // longer picks need every option's values up front, fetched on first pull
        let multiples = iter::once(()).flat_map(move |()| -> Tuples<'a> {
            let lower = min.max(2);
            if max < lower {
                return Box::new(iter::empty());
            }
            match self.option_values(&options, depth) {
                Ok(values) => Box::new(distinct_selections(values, lower..=max).map(Ok)),
                Err(err) => Box::new(iter::once(Err(err))),
            }
        });

        let mut seen = HashSet::new();
        Box::new(singles.chain(multiples).filter_map(move |values| match values {
            Ok(values) => seen
                .insert(values.clone())
                .then(|| Ok(values.join(joiner.as_str()))),
            Err(err) => Some(Err(err)),
        }))
    }

    /// Every expansion of every option, duplicates within an option removed
    fn option_values(self, options: &[Command], depth: usize) -> Result<Vec<Vec<String>>> {
        options
            .iter()
            .map(|option| {
                let values = self.expand(option.clone(), depth).collect::<Result<Vec<_>>>()?;
                Ok(dedupe_in_order(values))
            })
            .collect()
    }

    fn expand_wildcard(self, name: &str, depth: usize) -> Renders<'a> {
        let values = resolve_wildcard(self.provider, name);
        Box::new(
            values
                .into_iter()
                .flat_map(move |value| self.expand_template(&value, depth + 1)),
        )
    }

    fn expand_template(self, template: &str, depth: usize) -> Renders<'a> {
        if depth > MAX_RECURSION_DEPTH {
            return Box::new(iter::once(Err(PromptError::RecursionLimit {
                limit: MAX_RECURSION_DEPTH,
                template: template.to_string(),
            })));
        }
        match parse(template) {
            Ok(command) => self.expand(command, depth),
            Err(err) => Box::new(iter::once(Err(err.into()))),
        }
    }
}

/// Ordered selections of `bounds` many options, each option given a value
/// that no other position holds. Option tuples come first position slowest,
/// then the values within each tuple in the same order.
///
/// A tuple prefix is only extended while its options can still all be given
/// different values, so the walk never visits a dead branch of the tuple
/// space, and lengths beyond the number of distinct values are skipped.
fn distinct_selections(
    values: Vec<Vec<String>>,
    bounds: RangeInclusive<usize>,
) -> Box<dyn Iterator<Item = Vec<String>>> {
    let (ids, total) = {
        let mut lookup: HashMap<&str, usize> = HashMap::new();
        let ids: Vec<Vec<usize>> = values
            .iter()
            .map(|option| {
                option
                    .iter()
                    .map(|value| {
                        let next = lookup.len();
                        *lookup.entry(value.as_str()).or_insert(next)
                    })
                    .collect()
            })
            .collect();
        (ids, lookup.len())
    };

    let (lower, upper) = (*bounds.start(), (*bounds.end()).min(total));
    let ids: Rc<[Vec<usize>]> = ids.into();
    let values: Rc<[Vec<String>]> = values.into();

    Box::new((lower..=upper).flat_map(move |k| {
        let values = Rc::clone(&values);
        option_tuples(Rc::clone(&ids), total, Vec::new(), k)
            .flat_map(move |tuple| value_tuples(Rc::clone(&values), tuple.into(), Vec::new()))
    }))
}

/// Length-`k` extensions of `prefix` whose options admit distinct values
fn option_tuples(
    ids: Rc<[Vec<usize>]>,
    total: usize,
    prefix: Vec<usize>,
    k: usize,
) -> Box<dyn Iterator<Item = Vec<usize>>> {
    if prefix.len() == k {
        return Box::new(iter::once(prefix));
    }

    Box::new(
        (0..ids.len())
            .filter_map(move |option| {
                let mut tuple = prefix.clone();
                tuple.push(option);
                has_distinct_values(&ids, &tuple, total).then(|| option_tuples(Rc::clone(&ids), total, tuple, k))
            })
            .flatten(),
    )
}

/// Value tuples for the options in `tuple`, no value used twice
fn value_tuples(
    values: Rc<[Vec<String>]>,
    tuple: Rc<[usize]>,
    prefix: Vec<String>,
) -> Box<dyn Iterator<Item = Vec<String>>> {
    let Some(&option) = tuple.get(prefix.len()) else {
        return Box::new(iter::once(prefix));
    };

    Box::new(
        (0..values[option].len())
            .filter_map(move |index| {
                let value = &values[option][index];
                if prefix.contains(value) {
                    return None;
                }
                let mut next = prefix.clone();
                next.push(value.clone());
                Some(value_tuples(Rc::clone(&values), Rc::clone(&tuple), next))
            })
            .flatten(),
    )
}

/// Whether each option in `tuple` can hold its own value, found as a
/// matching between tuple positions and value ids.
fn has_distinct_values(ids: &[Vec<usize>], tuple: &[usize], total: usize) -> bool {
    let mut owner: Vec<Option<usize>> = vec![None; total];
    (0..tuple.len()).all(|position| {
        let mut visited = vec![false; total];
        assign(ids, tuple, position, &mut owner, &mut visited)
    })
}

fn assign(
    ids: &[Vec<usize>],
    tuple: &[usize],
    position: usize,
    owner: &mut [Option<usize>],
    visited: &mut [bool],
) -> bool {
    for &value in &ids[tuple[position]] {
        if visited[value] {
            continue;
        }
        visited[value] = true;

        let free = match owner[value] {
            None => true,
            Some(other) => assign(ids, tuple, other, owner, visited),
        };
        if free {
            owner[value] = Some(position);
            return true;
        }
    }
    false
}

impl<'a> RenderStrategy for CombinatorialStrategy<'a> {
    fn render<'s>(&'s mut self, command: &'s Command, depth: usize) -> Renders<'s> {
        self.expand(command.clone(), depth)
    }
}

/// Enumerates the distinct prompts of a template, in order, up to a cap.
#[derive(Debug, Clone)]
pub struct CombinatorialGenerator {
    provider: Arc<dyn WildcardProvider>,
}

impl CombinatorialGenerator {
    pub fn new(provider: Arc<dyn WildcardProvider>) -> Self {
        CombinatorialGenerator { provider }
    }

    /// Generate up to `max_prompts` distinct prompts. A template that yields
    /// no combination at all is returned unchanged as the only prompt.
    pub fn generate(&self, template: &str, max_prompts: usize) -> Result<Vec<String>> {
        let command = parse(template)?;
        let mut prompts = self.generate_from(&command, max_prompts)?;

        if prompts.is_empty() && max_prompts > 0 {
            warn!(template, "no combinations produced, falling back to the template");
            prompts.push(template.to_string());
        }

        debug!(template, max_prompts, produced = prompts.len(), "generated combinatorial prompts");
        Ok(prompts)
    }

    /// Generate up to `max_prompts` distinct prompts from a parsed tree.
    /// Enumeration stops as soon as the cap is reached.
    pub fn generate_from(&self, command: &Command, max_prompts: usize) -> Result<Vec<String>> {
        let mut prompts = Vec::new();
        if max_prompts == 0 {
            return Ok(prompts);
        }

        let mut strategy = CombinatorialStrategy::new(&*self.provider);
        let mut seen = HashSet::new();
        for prompt in strategy.render(command, 0) {
            let prompt = prompt?;
            if seen.insert(prompt.clone()) {
                prompts.push(prompt);
                if prompts.len() >= max_prompts {
                    break;
                }
            }
        }

        Ok(prompts)
    }
}
