use regex::Regex;
use std::sync::LazyLock;

use crate::command::{BoundExpr, Command, DEFAULT_JOINER, Variant, VariantOption};
use crate::utils::{ParseError, ParseErrorKind};

/// Delimiter wrapped around wildcard names
pub const WILDCARD_DELIMITER: &str = "__";
/// Delimiter between the bound, joiner and options of a variant
const SEGMENT_DELIMITER: &str = "$$";

static BOUND_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:(?P<lower>\d+)\s*-\s*(?P<upper>\d+)|(?P<from>\d+)\s*-|-\s*(?P<to>\d+)|(?P<exact>\d+))\s*$",
    )
    .expect("bound pattern is valid")
});
static WEIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?|\.\d+)::").expect("weight pattern is valid"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));
static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*([():])\s*").expect("punctuation pattern is valid"));

/// Parse a template into its command tree.
///
/// The result is always a [`Command::Sequence`]; a template without any
/// variant or wildcard parses to a sequence holding a single literal.
pub fn parse(template: &str) -> Result<Command, ParseError> {
    let source = strip_comments(template);
    let mut parser = TemplateParser::new(&source);
    let sequence = parser.parse_sequence(false)?;

    // parse_sequence only stops early inside a variant
    debug_assert!(parser.at_end());
    Ok(sequence)
}

/// Remove `# ...` and `// ...` line comments and `/* ... */` block comments.
pub fn strip_comments(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(ch) = rest.chars().next() {
        if rest.starts_with("/*") {
            match rest[2..].find("*/") {
                Some(end) => rest = &rest[2 + end + 2..],
                None => rest = "",
            }
            result.push(' ');
        } else if ch == '#' || rest.starts_with("//") {
            match rest.find('\n') {
                Some(end) => rest = &rest[end..],
                None => rest = "",
            }
        } else {
            result.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    result
}

/// Parse the count expression written before `$$`.
pub fn parse_bound_expr(text: &str) -> Option<BoundExpr> {
    let captures = BOUND_RE.captures(text)?;
    let number = |name: &str| -> Option<Option<usize>> {
        match captures.name(name) {
            Some(m) => m.as_str().parse().ok().map(Some),
            None => Some(None),
        }
    };

    if let (Some(lower), Some(upper)) = (number("lower")?, number("upper")?) {
        return Some(BoundExpr::Between(lower, upper));
    }
    if let Some(from) = number("from")? {
        return Some(BoundExpr::AtLeast(from));
    }
    if let Some(to) = number("to")? {
        return Some(BoundExpr::AtMost(to));
    }
    number("exact")?.map(BoundExpr::Exact)
}

/// Collapse the whitespace inside an emphasis group, letting `(`, `)` and
/// `:` absorb the spaces around them.
pub fn normalize_group(group: &str) -> String {
    let collapsed = WHITESPACE_RE.replace_all(group, " ");
    PUNCTUATION_RE.replace_all(&collapsed, "$1").into_owned()
}

/// Byte offset of the next `$$` in `text`, unless an option boundary or a
/// nested variant comes first.
fn segment_end(text: &str) -> Option<usize> {
    for (offset, ch) in text.char_indices() {
        match ch {
            '$' if text[offset..].starts_with(SEGMENT_DELIMITER) => return Some(offset),
            '{' | '}' | '|' => return None,
            _ => {}
        }
    }
    None
}

/// Words of plain text collected until the next non-literal token.
#[derive(Default)]
struct LiteralRun {
    words: Vec<String>,
    word: String,
}

impl LiteralRun {
    fn push(&mut self, ch: char) {
        self.word.push(ch);
    }

    fn push_str(&mut self, text: &str) {
        self.word.push_str(text);
    }

    fn end_word(&mut self) {
        if !self.word.is_empty() {
            self.words.push(std::mem::take(&mut self.word));
        }
    }

    /// Flush the run into `parts` as a single literal
    fn flush_into(&mut self, parts: &mut Vec<Command>) {
        self.end_word();
        if !self.words.is_empty() {
            parts.push(Command::literal(self.words.join(" ")));
            self.words.clear();
        }
    }
}

struct TemplateParser<'t> {
    source: &'t str,
    pos: usize,
}

impl<'t> TemplateParser<'t> {
    fn new(source: &'t str) -> Self {
        TemplateParser { source, pos: 0 }
    }

    fn rest(&self) -> &'t str {
        &self.source[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) {
        if let Some(ch) = self.peek() {
            self.pos += ch.len_utf8();
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn error(&self, kind: ParseErrorKind, start: usize) -> ParseError {
        ParseError::new(kind, start, &self.source[start..])
    }

    /// Parse tokens until the end of input or, inside a variant, until the
    /// `|` or `}` that ends the current option.
    fn parse_sequence(&mut self, in_variant: bool) -> Result<Command, ParseError> {
        let mut parts = Vec::new();
        let mut run = LiteralRun::default();

        while let Some(ch) = self.peek() {
            if self.rest().starts_with(WILDCARD_DELIMITER) {
                run.flush_into(&mut parts);
                parts.push(self.parse_wildcard()?);
                continue;
            }

            match ch {
                '{' => {
                    run.flush_into(&mut parts);
                    parts.push(self.parse_variant()?);
                }
                '|' | '}' if in_variant => break,
                '(' | '[' => {
                    let group = self.parse_group()?;
                    run.push_str(&group);
                }
                '|' | '}' | '$' | ')' | ']' => {
                    let start = self.pos;
                    return Err(self.error(ParseErrorKind::UnexpectedCharacter(ch), start));
                }
                c if c.is_whitespace() => {
                    run.end_word();
                    self.bump();
                }
                c => {
                    run.push(c);
                    self.bump();
                }
            }
        }

        run.flush_into(&mut parts);
        Ok(Command::sequence(parts))
    }

    fn parse_wildcard(&mut self) -> Result<Command, ParseError> {
        let start = self.pos;
        let body = &self.source[start + WILDCARD_DELIMITER.len()..];

        match body.find(WILDCARD_DELIMITER) {
            None => Err(self.error(ParseErrorKind::UnterminatedWildcard, start)),
            Some(0) => Err(self.error(ParseErrorKind::EmptyWildcard, start)),
            Some(end) => {
                self.pos = start + WILDCARD_DELIMITER.len() * 2 + end;
                Ok(Command::wildcard(&body[..end]))
            }
        }
    }

    /// Consume a balanced `(...)` or `[...]` group and return it normalized.
    /// The contents are not interpreted.
    fn parse_group(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        let source = self.source;
        let mut closers = Vec::new();
        let mut end = None;

        for (offset, ch) in source[start..].char_indices() {
            match ch {
                '(' => closers.push(')'),
                '[' => closers.push(']'),
                ')' | ']' => {
                    if closers.pop() != Some(ch) {
                        return Err(self.error(ParseErrorKind::MismatchedGroup, start + offset));
                    }
                    if closers.is_empty() {
                        end = Some(start + offset + ch.len_utf8());
                        break;
                    }
                }
                _ => {}
            }
        }

        let end = end.ok_or_else(|| self.error(ParseErrorKind::UnclosedGroup, start))?;
        self.pos = end;
        Ok(normalize_group(&source[start..end]))
    }

    fn parse_variant(&mut self) -> Result<Command, ParseError> {
        let start = self.pos;
        self.bump(); // '{'

        let (bound, joiner) = self.parse_variant_header()?;
        let mut options = Vec::new();

        loop {
            let weight = self.parse_weight();
            let value = self.parse_sequence(true)?;
            options.push(VariantOption::new(weight, value));

            match self.peek() {
                Some('|') => self.bump(),
                Some('}') => {
                    self.bump();
                    break;
                }
                _ => return Err(self.error(ParseErrorKind::UnclosedVariant, start)),
            }
        }

        Ok(Command::Variant(Variant::new(options, bound, joiner)))
    }

    /// Parse `bound$$` and `bound$$joiner$$` prefixes of a variant body
    fn parse_variant_header(&mut self) -> Result<(Option<BoundExpr>, String), ParseError> {
        let Some(end) = segment_end(self.rest()) else {
            return Ok((None, DEFAULT_JOINER.to_string()));
        };

        let start = self.pos;
        let bound_text = &self.rest()[..end];
        let bound = parse_bound_expr(bound_text)
            .ok_or_else(|| ParseError::new(ParseErrorKind::InvalidBound, start, bound_text))?;
        self.pos += end + SEGMENT_DELIMITER.len();

        let joiner = match segment_end(self.rest()) {
            Some(end) => {
                let joiner = self.rest()[..end].to_string();
                self.pos += end + SEGMENT_DELIMITER.len();
                joiner
            }
            None => DEFAULT_JOINER.to_string(),
        };

        Ok((Some(bound), joiner))
    }

    /// Consume an optional `W::` weight prefix, defaulting to 1
    fn parse_weight(&mut self) -> f64 {
        let Some(captures) = WEIGHT_RE.captures(self.rest()) else {
            return 1.0;
        };
        match captures[1].parse::<f64>() {
            Ok(weight) => {
                self.pos += captures[0].len();
                weight
            }
            Err(_) => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parts(command: &Command) -> &[Command] {
        match command {
            Command::Sequence { parts, .. } => parts,
            other => panic!("Expected Sequence, got {:?}", other),
        }
    }

    fn variant(command: &Command) -> &Variant {
        match command {
            Command::Variant(variant) => variant,
            other => panic!("Expected Variant, got {:?}", other),
        }
    }

    fn first_variant(template: &str) -> Variant {
        let sequence = parse(template).unwrap();
        variant(&parts(&sequence)[0]).clone()
    }

    fn lit(text: &str) -> Command {
        Command::literal(text)
    }

    #[test]
    fn test_basic_literal() {
        let sequence = parse("hello world").unwrap();
        assert_eq!(parts(&sequence), &[lit("hello world")]);
    }

    #[test]
    fn test_literal_characters() {
        for text in ["good-bye world", "good_bye world", "I, love. punctuation", "Test änderō"] {
            let sequence = parse(text).unwrap();
            assert_eq!(parts(&sequence), &[lit(text)]);
        }
    }

    #[test]
    fn test_literal_whitespace_collapses() {
        let sequence = parse("  a   lot\nof\tspace ").unwrap();
        assert_eq!(parts(&sequence), &[lit("a lot of space")]);
    }

    #[test]
    fn test_empty_template() {
        let sequence = parse("").unwrap();
        assert!(parts(&sequence).is_empty());
        assert!(sequence.is_empty());
    }

    #[test]
    fn test_bracket_groups_pass_through() {
        let cases = [
            ("Test [low emphasis]", "Test [low emphasis]"),
            ("Test (high emphasis)", "Test (high emphasis)"),
            ("Test (high emphasis:0.4)", "Test (high emphasis:0.4)"),
            ("Test ( high emphasis : 0.4 )", "Test (high emphasis:0.4)"),
            ("A [start prompt|end prompt|0.25] example", "A [start prompt|end prompt|0.25] example"),
            ("A [start prompt:end prompt:0.25] example", "A [start prompt:end prompt:0.25] example"),
            ("((nested [deep]))", "((nested [deep]))"),
            ("a (b {c|d}) e", "a (b {c|d}) e"),
            ("({red|blue} car:1.2)", "({red|blue} car:1.2)"),
        ];

        for (template, expected) in cases {
            let sequence = parse(template).unwrap();
            assert_eq!(parts(&sequence), &[lit(expected)], "template: {}", template);
        }
    }

    #[test]
    fn test_bracket_group_errors() {
        let err = parse("Test (unclosed").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedGroup);
        assert_eq!(err.fragment, "(unclosed");

        let err = parse("Test (wrong]").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MismatchedGroup);

        let err = parse("stray ] bracket").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter(']'));
    }

    #[test]
    fn test_wildcard() {
        let sequence = parse("__colours__").unwrap();
        assert_eq!(parts(&sequence), &[Command::wildcard("colours")]);

        let sequence = parse("__path/to/colours__").unwrap();
        assert_eq!(parts(&sequence), &[Command::wildcard("path/to/colours")]);

        let sequence = parse("__änder__").unwrap();
        assert_eq!(parts(&sequence), &[Command::wildcard("änder")]);
    }

    #[test]
    fn test_wildcard_with_literals() {
        let sequence = parse("A __colours__ ball").unwrap();
        assert_eq!(
            parts(&sequence),
            &[lit("A"), Command::wildcard("colours"), lit("ball")]
        );
    }

    #[test]
    fn test_wildcard_errors() {
        let err = parse("A __colours ball").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnterminatedWildcard);
        assert_eq!(err.fragment, "__colours ball");
        assert_eq!(err.position, 2);

        let err = parse("____").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::EmptyWildcard);
    }

    #[test]
    fn test_basic_variant() {
        let variant = first_variant("{cat|dog}");
        assert_eq!(variant.len(), 2);
        assert_eq!(variant.options()[0].value, Command::sequence(vec![lit("cat")]));
        assert_eq!(variant.options()[1].value, Command::sequence(vec![lit("dog")]));
        assert_eq!(variant.weights(), vec![1.0, 1.0]);
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 1));
        assert_eq!(variant.joiner(), ",");
    }

    #[test]
    fn test_variant_with_different_characters() {
        let variant = first_variant("{new york|washing-ton!|änder}");
        let values: Vec<_> = variant.options().iter().map(|o| o.value.clone()).collect();
        assert_eq!(
            values,
            vec![
                Command::sequence(vec![lit("new york")]),
                Command::sequence(vec![lit("washing-ton!")]),
                Command::sequence(vec![lit("änder")]),
            ]
        );
    }

    #[test]
    fn test_variant_with_blank() {
        let variant = first_variant("{|red|blue}");
        assert_eq!(variant.len(), 3);
        assert!(variant.options()[0].value.is_empty());
    }

    #[test]
    fn test_unbalanced_braces() {
        let err = parse("{cat|dog").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnclosedVariant);
        assert_eq!(err.fragment, "{cat|dog");

        let err = parse("cat|dog}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter('|'));

        let err = parse("cat}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter('}'));
    }

    #[test]
    fn test_variant_with_wildcard() {
        let variant = first_variant("{__test/colours__|washington}");
        assert_eq!(variant.options()[0].value.as_wildcard(), Some("test/colours"));
        assert_eq!(variant.options()[1].value, Command::sequence(vec![lit("washington")]));
    }

    #[test]
    fn test_variant_sequences() {
        let variant = first_variant(
            "{My favourite colour is __colour__ and not __other_colour__|__colour__ is my favourite colour}",
        );
        assert_eq!(
            parts(&variant.options()[0].value),
            &[
                lit("My favourite colour is"),
                Command::wildcard("colour"),
                lit("and not"),
                Command::wildcard("other_colour"),
            ]
        );
        assert_eq!(
            parts(&variant.options()[1].value),
            &[Command::wildcard("colour"), lit("is my favourite colour")]
        );
    }

    #[test]
    fn test_nested_variant() {
        let outer = first_variant("{__test/colours__|{__test/colours__|washington}}");
        assert_eq!(outer.len(), 2);

        let inner = variant(&parts(&outer.options()[1].value)[0]);
        assert_eq!(inner.len(), 2);
        assert_eq!(inner.options()[0].value.as_wildcard(), Some("test/colours"));
    }

    #[test]
    fn test_variant_with_weights() {
        let variant = first_variant("{1::cat|2::dog|3::bird} test");
        assert_eq!(variant.weights(), vec![1.0, 2.0, 3.0]);
        assert_eq!(variant.options()[0].value, Command::sequence(vec![lit("cat")]));

        let variant = first_variant("{1::cat|dog|0.25::bird}");
        assert_eq!(variant.weights(), vec![1.0, 1.0, 0.25]);
    }

    #[test]
    fn test_ranges() {
        let variant = first_variant("{2$$cat|dog|bird}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (2, 2));
        assert_eq!(variant.joiner(), ",");

        let variant = first_variant("{1-2$$cat|dog|bird}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 2));

        let variant = first_variant("{1-$$cat|dog|bird}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 3));

        let variant = first_variant("{-2$$cat|dog|bird}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 2));

        let variant = first_variant("{2-4$$a|b|c}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (2, 4));

        let variant = first_variant("{-2$$a|b}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 2));

        let variant = first_variant("{3-1$$a|b}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 3));

        let variant = first_variant("{0$$a|b}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (1, 1));
    }

    #[test]
    fn test_range_with_joiner() {
        let variant = first_variant("{2$$ and $$cat|dog|bird}");
        assert_eq!((variant.min_bound(), variant.max_bound()), (2, 2));
        assert_eq!(variant.joiner(), " and ");
        assert_eq!(variant.len(), 3);
    }

    #[test]
    fn test_invalid_bound() {
        let err = parse("{a$$cat|dog}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidBound);
        assert_eq!(err.fragment, "a");

        let err = parse("{1-2-3$$cat|dog}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidBound);
    }

    #[test]
    fn test_stray_dollar() {
        let err = parse("{cat|d$g}").unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::UnexpectedCharacter('$'));
    }

    #[test]
    fn test_comments() {
        let sequence = parse("red # a comment\nball").unwrap();
        assert_eq!(parts(&sequence), &[lit("red ball")]);

        let sequence = parse("red // a comment\nball").unwrap();
        assert_eq!(parts(&sequence), &[lit("red ball")]);

        let sequence = parse("red /* {unclosed */ ball").unwrap();
        assert_eq!(parts(&sequence), &[lit("red ball")]);

        let variant = first_variant("{cat # feline\n|dog}");
        assert_eq!(variant.options()[0].value, Command::sequence(vec![lit("cat")]));
    }

    #[test]
    fn test_strip_comments() {
        assert_eq!(strip_comments("a /* b */ c"), "a   c");
        assert_eq!(strip_comments("a # b\nc"), "a \nc");
        assert_eq!(strip_comments("a // b"), "a ");
        assert_eq!(strip_comments("a /* never closed"), "a  ");
    }

    #[test]
    fn test_parse_bound_expr() {
        assert_eq!(parse_bound_expr("3"), Some(BoundExpr::Exact(3)));
        assert_eq!(parse_bound_expr(" 2 - 4 "), Some(BoundExpr::Between(2, 4)));
        assert_eq!(parse_bound_expr("2-"), Some(BoundExpr::AtLeast(2)));
        assert_eq!(parse_bound_expr("-5"), Some(BoundExpr::AtMost(5)));
        assert_eq!(parse_bound_expr("x"), None);
        assert_eq!(parse_bound_expr(""), None);
    }

    #[test]
    fn test_normalize_group() {
        assert_eq!(normalize_group("( a  b :1.2 )"), "(a b:1.2)");
        assert_eq!(normalize_group("[low   emphasis]"), "[low emphasis]");
    }
}
