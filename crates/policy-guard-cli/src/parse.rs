//! Parser for the secrets engine's policy text format.
//!
//! ```text
//! # comment
//! path "secret/app/*" {
//!   capabilities = ["read", "list"]
//! }
//! ```
//!
//! Blocks for the same pattern merge their capability sets before
//! hand-off to the checker.

use std::collections::BTreeSet;

use policy_guard::{Capability, CheckError, PathPattern, Policy};
use thiserror::Error;

/// Errors raised while parsing policy source text.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The source does not follow the block grammar.
    #[error("line {line}: {message}")]
    Syntax {
        /// 1-based source line.
        line: usize,
        /// What was expected or found.
        message: String,
    },

    /// A capability name outside the vocabulary.
    #[error("line {line}: unknown capability '{name}'")]
    UnknownCapability {
        /// 1-based source line.
        line: usize,
        /// The unrecognized name.
        name: String,
    },

    /// A rule that failed the core's validation.
    #[error("line {line}: {source}")]
    InvalidRule {
        /// 1-based source line.
        line: usize,
        /// The underlying validation error.
        source: CheckError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Str(&'a str),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Equals,
    Comma,
}

impl<'a> Token<'a> {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("'{name}'"),
            Token::Str(value) => format!("\"{value}\""),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::LBracket => "'['".to_string(),
            Token::RBracket => "']'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

fn lex(source: &str) -> Result<Vec<(Token<'_>, usize)>, ParseError> {
    let mut tokens = Vec::new();
    let mut line = 1usize;
    let mut rest = source;

    while let Some(c) = rest.chars().next() {
        match c {
            '\n' => {
                line += 1;
                rest = &rest[1..];
            }
            c if c.is_whitespace() => rest = &rest[c.len_utf8()..],
            '#' => {
                let end = rest.find('\n').unwrap_or(rest.len());
                rest = &rest[end..];
            }
            '{' => {
                tokens.push((Token::LBrace, line));
                rest = &rest[1..];
            }
            '}' => {
                tokens.push((Token::RBrace, line));
                rest = &rest[1..];
            }
            '[' => {
                tokens.push((Token::LBracket, line));
                rest = &rest[1..];
            }
            ']' => {
                tokens.push((Token::RBracket, line));
                rest = &rest[1..];
            }
            '=' => {
                tokens.push((Token::Equals, line));
                rest = &rest[1..];
            }
            ',' => {
                tokens.push((Token::Comma, line));
                rest = &rest[1..];
            }
            '"' => {
                let body = &rest[1..];
                let end = body.find(['"', '\n']).ok_or(ParseError::Syntax {
                    line,
                    message: "unterminated string".to_string(),
                })?;
                if body.as_bytes()[end] != b'"' {
                    return Err(ParseError::Syntax {
                        line,
                        message: "unterminated string".to_string(),
                    });
                }
                tokens.push((Token::Str(&body[..end]), line));
                rest = &body[end + 1..];
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let end = rest
                    .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                    .unwrap_or(rest.len());
                tokens.push((Token::Ident(&rest[..end]), line));
                rest = &rest[end..];
            }
            other => {
                return Err(ParseError::Syntax {
                    line,
                    message: format!("unexpected character '{other}'"),
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<(Token<'a>, usize)>,
    position: usize,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Result<(Token<'a>, usize), ParseError> {
        let token = self.tokens.get(self.position).cloned().ok_or_else(|| {
            let line = self.tokens.last().map(|(_, line)| *line).unwrap_or(1);
            ParseError::Syntax {
                line,
                message: "unexpected end of input".to_string(),
            }
        })?;
        self.position += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token<'_>) -> Result<usize, ParseError> {
        let (token, line) = self.next()?;
        if token == *expected {
            Ok(line)
        } else {
            Err(ParseError::Syntax {
                line,
                message: format!("expected {}, found {}", expected.describe(), token.describe()),
            })
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<usize, ParseError> {
        let (token, line) = self.next()?;
        match token {
            Token::Ident(name) if name == keyword => Ok(line),
            other => Err(ParseError::Syntax {
                line,
                message: format!("expected '{keyword}', found {}", other.describe()),
            }),
        }
    }

    fn expect_str(&mut self) -> Result<(&'a str, usize), ParseError> {
        let (token, line) = self.next()?;
        match token {
            Token::Str(value) => Ok((value, line)),
            other => Err(ParseError::Syntax {
                line,
                message: format!("expected a quoted string, found {}", other.describe()),
            }),
        }
    }

    /// `"cap" ("," "cap")* ","?` up to the closing bracket.
    fn capability_list(&mut self) -> Result<BTreeSet<Capability>, ParseError> {
        let mut caps = BTreeSet::new();
        loop {
            let (token, line) = self.next()?;
            match token {
                Token::RBracket => return Ok(caps),
                Token::Str(name) => {
                    let cap = Capability::parse(name)
                        .ok_or_else(|| ParseError::UnknownCapability {
                            line,
                            name: name.to_string(),
                        })?;
                    caps.insert(cap);
                    let (token, line) = self.next()?;
                    match token {
                        Token::Comma => {}
                        Token::RBracket => return Ok(caps),
                        other => {
                            return Err(ParseError::Syntax {
                                line,
                                message: format!(
                                    "expected ',' or ']', found {}",
                                    other.describe()
                                ),
                            });
                        }
                    }
                }
                other => {
                    return Err(ParseError::Syntax {
                        line,
                        message: format!(
                            "expected a quoted capability or ']', found {}",
                            other.describe()
                        ),
                    });
                }
            }
        }
    }
}

/// Parse policy source text into a [`Policy`].
pub fn parse_policy(source: &str) -> Result<Policy, ParseError> {
    let mut parser = Parser {
        tokens: lex(source)?,
        position: 0,
    };
    let mut policy = Policy::new();

    while parser.position < parser.tokens.len() {
        parser.expect_keyword("path")?;
        let (raw_pattern, pattern_line) = parser.expect_str()?;
        parser.expect(&Token::LBrace)?;
        parser.expect_keyword("capabilities")?;
        parser.expect(&Token::Equals)?;
        let caps_line = parser.expect(&Token::LBracket)?;
        let caps = parser.capability_list()?;
        parser.expect(&Token::RBrace)?;

        let pattern = PathPattern::new(raw_pattern).map_err(|source| ParseError::InvalidRule {
            line: pattern_line,
            source,
        })?;
        policy
            .insert(pattern, caps)
            .map_err(|source| ParseError::InvalidRule {
                line: caps_line,
                source,
            })?;
    }

    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_single_rule() {
        let policy = parse_policy(
            r#"
            path "secret/app/*" {
              capabilities = ["read", "list"]
            }
            "#,
        )
        .expect("parses");

        let pattern = PathPattern::new("secret/app/*").unwrap();
        assert_eq!(policy.len(), 1);
        assert_eq!(
            policy.get(&pattern),
            Some(&BTreeSet::from([Capability::Read, Capability::List]))
        );
    }

    #[test]
    fn parses_multiple_rules_with_comments_and_trailing_commas() {
        let policy = parse_policy(
            r#"
            # grants for the app team
            path "secret/app/*" {
              capabilities = ["read",]
            }

            path "secret/app/admin" {
              # carved out below the wildcard
              capabilities = ["deny"]
            }
            "#,
        )
        .expect("parses");

        assert_eq!(policy.len(), 2);
        assert_eq!(
            policy.get(&PathPattern::new("secret/app/admin").unwrap()),
            Some(&BTreeSet::from([Capability::Deny]))
        );
    }

    #[test]
    fn duplicate_blocks_merge_set_wise() {
        let policy = parse_policy(
            r#"
            path "secret/app" { capabilities = ["read"] }
            path "secret/app" { capabilities = ["write"] }
            "#,
        )
        .expect("parses");

        assert_eq!(policy.len(), 1);
        assert_eq!(
            policy.get(&PathPattern::new("secret/app").unwrap()),
            Some(&BTreeSet::from([Capability::Read, Capability::Write]))
        );
    }

    #[test]
    fn reports_unknown_capability_with_line() {
        let err = parse_policy(
            "path \"secret/app\" {\n  capabilities = [\"fly\"]\n}\n",
        )
        .unwrap_err();
        assert!(
            matches!(err, ParseError::UnknownCapability { line: 2, ref name } if name == "fly"),
            "{err}"
        );
    }

    #[test]
    fn reports_invalid_pattern_with_line() {
        let err = parse_policy("path \"bad pattern\" { capabilities = [\"read\"] }").unwrap_err();
        assert!(matches!(err, ParseError::InvalidRule { line: 1, .. }), "{err}");
    }

    #[test]
    fn reports_empty_capability_list() {
        let err = parse_policy("path \"secret/app\" { capabilities = [] }").unwrap_err();
        assert!(matches!(err, ParseError::InvalidRule { .. }), "{err}");
    }

    #[test]
    fn reports_malformed_blocks() {
        for source in [
            "path \"secret/app\" {",
            "path secret/app { capabilities = [\"read\"] }",
            "route \"secret/app\" { capabilities = [\"read\"] }",
            "path \"secret/app\" { capabilities = \"read\" }",
        ] {
            assert!(
                matches!(parse_policy(source), Err(ParseError::Syntax { .. })),
                "{source} should be a syntax error"
            );
        }
    }

    #[test]
    fn empty_source_is_an_empty_policy() {
        let policy = parse_policy("# nothing here\n").expect("parses");
        assert!(policy.is_empty());
    }
}
