//! Translation of wildcard path patterns into the solver's regular
//! expressions.
//!
//! Pattern syntax:
//! - `+` matches one or more literal characters, never `/` (single
//!   segment)
//! - a trailing `*` matches any run of literal characters including `/`
//! - `*` anywhere else is a literal character of the pattern

use z3::ast::Regexp;
use z3::Context;

use crate::policy::PathPattern;

/// Whether `c` belongs to the literal alphabet matched by wildcards.
pub(crate) fn is_literal_char(c: char) -> bool {
    c.is_ascii_lowercase()
        || c.is_ascii_uppercase()
        || c.is_ascii_digit()
        || matches!(c, '-' | '_' | '.')
}

/// Whether `c` may appear in a path pattern at all.
pub(crate) fn is_pattern_char(c: char) -> bool {
    is_literal_char(c) || matches!(c, '/' | '+' | '*')
}

/// A lexed piece of a path pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    /// A run of characters matched exactly.
    Literal(&'a str),
    /// `+`: one or more literal characters within a single segment.
    AnySegment,
    /// Trailing `*`: any suffix of literal characters and separators.
    AnySuffix,
}

/// Split a pattern at each `+` and at a trailing `*`, preserving the
/// wildcard tokens. Empty literals between adjacent wildcards are
/// skipped.
pub(crate) fn tokenize(pattern: &str) -> Vec<Token<'_>> {
    let (body, trailing_star) = match pattern.strip_suffix('*') {
        Some(body) => (body, true),
        None => (pattern, false),
    };

    let mut tokens = Vec::new();
    let mut rest = body;
    while let Some(pos) = rest.find('+') {
        if pos > 0 {
            tokens.push(Token::Literal(&rest[..pos]));
        }
        tokens.push(Token::AnySegment);
        rest = &rest[pos + 1..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }
    if trailing_star {
        tokens.push(Token::AnySuffix);
    }
    tokens
}

/// The character class matched by wildcards: the literal alphabet
/// without `/`.
fn literal_class<'ctx>(ctx: &'ctx Context) -> Regexp<'ctx> {
    Regexp::union(
        ctx,
        &[
            &Regexp::range(ctx, &'a', &'z'),
            &Regexp::range(ctx, &'A', &'Z'),
            &Regexp::range(ctx, &'0', &'9'),
            &Regexp::literal(ctx, "-"),
            &Regexp::literal(ctx, "_"),
            &Regexp::literal(ctx, "."),
        ],
    )
}

/// Compile a validated pattern into a solver regex.
///
/// The language of the result is always a subset of strings over the
/// literal alphabet plus `/`.
pub(crate) fn compile<'ctx>(ctx: &'ctx Context, pattern: &PathPattern) -> Regexp<'ctx> {
    let fragments: Vec<Regexp<'_>> = tokenize(pattern.as_str())
        .iter()
        .map(|token| match token {
            Token::Literal(literal) => Regexp::literal(ctx, literal),
            Token::AnySegment => literal_class(ctx).plus(),
            Token::AnySuffix => {
                Regexp::union(ctx, &[&literal_class(ctx), &Regexp::literal(ctx, "/")]).star()
            }
        })
        .collect();

    // Patterns are non-empty, so there is at least one fragment; a lone
    // fragment skips the unary concat.
    match fragments.as_slice() {
        [single] => single.clone(),
        _ => {
            let refs: Vec<&Regexp<'_>> = fragments.iter().collect();
            Regexp::concat(ctx, &refs)
        }
    }
}
