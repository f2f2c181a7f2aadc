use serde::Serialize;

/// Separator placed between the parts of a parsed sequence
pub const DEFAULT_SEPARATOR: &str = " ";
/// Joiner placed between the picks of a variant when none is given
pub const DEFAULT_JOINER: &str = ",";

/// A node of the parsed template. Both generators walk the same tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Text emitted verbatim
    Literal { text: String },
    /// Parts rendered in order and joined with `separator`
    Sequence {
        parts: Vec<Command>,
        separator: String,
    },
    /// A choice between weighted options
    Variant(Variant),
    /// A reference resolved through the wildcard provider at generation time
    Wildcard { name: String },
}

impl Command {
    pub fn literal(text: impl Into<String>) -> Self {
        Command::Literal { text: text.into() }
    }

    pub fn wildcard(name: impl Into<String>) -> Self {
        Command::Wildcard { name: name.into() }
    }

    /// A sequence joined with the default single space
    pub fn sequence(parts: Vec<Command>) -> Self {
        Command::Sequence {
            parts,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    /// The wildcard name if this node is a bare wildcard, possibly wrapped in
    /// a one-part sequence as variant options are.
    pub fn as_wildcard(&self) -> Option<&str> {
        match self {
            Command::Wildcard { name } => Some(name),
            Command::Sequence { parts, .. } if parts.len() == 1 => parts[0].as_wildcard(),
            _ => None,
        }
    }

    /// True for the empty prompt
    pub fn is_empty(&self) -> bool {
        match self {
            Command::Literal { text } => text.is_empty(),
            Command::Sequence { parts, .. } => parts.iter().all(Command::is_empty),
            _ => false,
        }
    }
}

/// One alternative inside a variant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantOption {
    pub weight: f64,
    pub value: Command,
}

impl VariantOption {
    pub fn new(weight: f64, value: Command) -> Self {
        VariantOption { weight, value }
    }

    /// An option with the default weight of 1
    pub fn unweighted(value: Command) -> Self {
        VariantOption::new(1.0, value)
    }
}

/// The count expression written before `$$` in a variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundExpr {
    /// `N`
    Exact(usize),
    /// `N-`
    AtLeast(usize),
    /// `-M`
    AtMost(usize),
    /// `N-M`, in either order
    Between(usize, usize),
}

impl BoundExpr {
    /// Raw `(lower, upper)` before clamping, given the number of options
    fn raw_bounds(self, option_count: usize) -> (usize, usize) {
        match self {
            BoundExpr::Exact(n) => (n, n),
            BoundExpr::AtLeast(n) => (n, option_count),
            BoundExpr::AtMost(m) => (1, m),
            BoundExpr::Between(a, b) => (a, b),
        }
    }
}

/// "Choose between `min_bound` and `max_bound` options and join them with
/// `joiner`". `1 <= min_bound <= max_bound` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    options: Vec<VariantOption>,
    min_bound: usize,
    max_bound: usize,
    joiner: String,
}

impl Variant {
    /// Build a variant from its options and an optional bound expression.
    /// Without a bound exactly one option is picked.
    pub fn new(options: Vec<VariantOption>, bound: Option<BoundExpr>, joiner: impl Into<String>) -> Self {
        let (lower, upper) = match bound {
            Some(bound) => bound.raw_bounds(options.len()),
            None => (1, 1),
        };
        Variant::with_bounds(options, lower, upper, joiner)
    }

    /// Build a variant from explicit bounds, reordering them and clamping the
    /// lower bound to at least one.
    pub fn with_bounds(
        options: Vec<VariantOption>,
        lower: usize,
        upper: usize,
        joiner: impl Into<String>,
    ) -> Self {
        let (lower, upper) = (lower.min(upper), lower.max(upper));
        let min_bound = lower.max(1);
        Variant {
            options,
            min_bound,
            max_bound: upper.max(min_bound),
            joiner: joiner.into(),
        }
    }

    pub fn options(&self) -> &[VariantOption] {
        &self.options
    }

    pub fn min_bound(&self) -> usize {
        self.min_bound
    }

    pub fn max_bound(&self) -> usize {
        self.max_bound
    }

    pub fn joiner(&self) -> &str {
        &self.joiner
    }

    pub fn weights(&self) -> Vec<f64> {
        self.options.iter().map(|o| o.weight).collect()
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub(crate) fn into_parts(self) -> (Vec<VariantOption>, usize, usize, String) {
        (self.options, self.min_bound, self.max_bound, self.joiner)
    }
}
