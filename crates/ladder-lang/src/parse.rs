// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! S-expression reader and program lowering.
//!
//! Top-level forms:
//! - `(root <term-expr>)`: mandatory, once
//! - `(rules (rule <name> (pattern …) (action …)) …)`
//! - `(max_steps N)`: positive integer, once
//!
//! `<term-expr>` is a bare symbol (scale 0) or `(symbol :scale N child…)`.
use std::collections::{BTreeMap, BTreeSet};

use ladder_core::{Action, Pattern, Program, Rule, TermExpr};

use crate::lexer::{lex, Pos, Token};

/// Everything that can go wrong reading a program. All variants are
/// validation-class failures; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Input ended inside a form.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// A `)` with no matching `(`.
    #[error("{0}: unbalanced close paren")]
    UnbalancedClose(Pos),
    /// Something other than a list at the top level.
    #[error("{0}: expected a top-level form")]
    ExpectedForm(Pos),
    /// A form headed by an unknown atom.
    #[error("{pos}: unknown form {head:?}")]
    UnknownForm {
        /// Position of the form.
        pos: Pos,
        /// The offending head atom.
        head: String,
    },
    /// A form that may appear once appeared again.
    #[error("{0}: duplicate {1} form")]
    DuplicateForm(Pos, &'static str),
    /// `(root …)` is mandatory.
    #[error("program has no (root ...) form")]
    MissingRoot,
    /// `(max_steps N)` is mandatory.
    #[error("program has no (max_steps ...) form")]
    MissingMaxSteps,
    /// An atom where an integer was required, or a value out of range.
    #[error("{0}: expected a non-negative integer, got {1:?}")]
    BadInteger(Pos, String),
    /// A malformed term expression.
    #[error("{0}: malformed term expression")]
    BadTerm(Pos),
    /// A malformed rule, pattern, or action form.
    #[error("{pos}: {what}")]
    Malformed {
        /// Position of the form.
        pos: Pos,
        /// Description of the problem.
        what: String,
    },
    /// A keyword marker missing its value.
    #[error("{0}: keyword {1} is missing a value")]
    MissingValue(Pos, String),
}

/// Parsed S-expression tree.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Sexpr {
    Atom(String, Pos),
    List(Vec<Sexpr>, Pos),
}

impl Sexpr {
    fn pos(&self) -> Pos {
        match self {
            Self::Atom(_, pos) | Self::List(_, pos) => *pos,
        }
    }

    fn as_atom(&self) -> Option<&str> {
        match self {
            Self::Atom(a, _) => Some(a),
            Self::List(..) => None,
        }
    }
}

fn read_all(tokens: &[Token]) -> Result<Vec<Sexpr>, ParseError> {
    let mut i = 0;
    let mut out = Vec::new();
    while i < tokens.len() {
        let (expr, next) = read_one(tokens, i)?;
        out.push(expr);
        i = next;
    }
    Ok(out)
}

fn read_one(tokens: &[Token], at: usize) -> Result<(Sexpr, usize), ParseError> {
    match tokens.get(at) {
        None => Err(ParseError::UnexpectedEof),
        Some(Token::Atom(a, pos)) => Ok((Sexpr::Atom(a.clone(), *pos), at + 1)),
        Some(Token::Close(pos)) => Err(ParseError::UnbalancedClose(*pos)),
        Some(Token::Open(pos)) => {
            let mut items = Vec::new();
            let mut i = at + 1;
            loop {
                match tokens.get(i) {
                    None => return Err(ParseError::UnexpectedEof),
                    Some(Token::Close(_)) => return Ok((Sexpr::List(items, *pos), i + 1)),
                    Some(_) => {
                        let (item, next) = read_one(tokens, i)?;
                        items.push(item);
                        i = next;
                    }
                }
            }
        }
    }
}

fn parse_uint<T: std::str::FromStr>(expr: &Sexpr) -> Result<T, ParseError> {
    let text = expr
        .as_atom()
        .ok_or_else(|| ParseError::BadInteger(expr.pos(), "(list)".into()))?;
    text.parse::<T>()
        .map_err(|_| ParseError::BadInteger(expr.pos(), text.to_owned()))
}

fn parse_term_expr(expr: &Sexpr) -> Result<TermExpr, ParseError> {
    match expr {
        Sexpr::Atom(symbol, _) => Ok(TermExpr::symbol(symbol.clone())),
        Sexpr::List(items, pos) => {
            let mut iter = items.iter();
            let symbol = iter
                .next()
                .and_then(Sexpr::as_atom)
                .ok_or(ParseError::BadTerm(*pos))?;
            let mut scale = 0u32;
            let mut children = Vec::new();
            let mut rest = iter.peekable();
            if rest.peek().and_then(|e| e.as_atom()) == Some(":scale") {
                let marker = rest.next().ok_or(ParseError::BadTerm(*pos))?;
                let value = rest
                    .next()
                    .ok_or_else(|| ParseError::MissingValue(marker.pos(), ":scale".into()))?;
                scale = parse_uint(value)?;
            }
            for child in rest {
                children.push(parse_term_expr(child)?);
            }
            Ok(TermExpr {
                symbol: symbol.to_owned(),
                scale,
                children,
            })
        }
    }
}

fn parse_pattern(items: &[Sexpr], pos: Pos) -> Result<Pattern, ParseError> {
    let mut symbol = None;
    let mut scales: Option<BTreeSet<u32>> = None;
    let mut max_children = None;
    let mut i = 0;
    while i < items.len() {
        let marker = items[i]
            .as_atom()
            .ok_or_else(|| ParseError::Malformed {
                pos: items[i].pos(),
                what: "expected a keyword marker in pattern".into(),
            })?
            .to_owned();
        let value = items.get(i + 1).ok_or_else(|| {
            ParseError::MissingValue(items[i].pos(), marker.clone())
        })?;
        match marker.as_str() {
            ":sym" => {
                symbol = Some(
                    value
                        .as_atom()
                        .ok_or_else(|| ParseError::Malformed {
                            pos: value.pos(),
                            what: ":sym takes a symbol".into(),
                        })?
                        .to_owned(),
                );
            }
            ":scale" => {
                let set = match value {
                    Sexpr::Atom(..) => BTreeSet::from([parse_uint::<u32>(value)?]),
                    Sexpr::List(entries, _) => entries
                        .iter()
                        .map(parse_uint::<u32>)
                        .collect::<Result<BTreeSet<u32>, _>>()?,
                };
                scales = Some(set);
            }
            ":max-children" => {
                max_children = Some(parse_uint::<usize>(value)?);
            }
            other => {
                return Err(ParseError::Malformed {
                    pos,
                    what: format!("unknown pattern keyword {other:?}"),
                });
            }
        }
        i += 2;
    }
    Ok(Pattern {
        symbol,
        scales,
        max_children,
    })
}

fn parse_action(items: &[Sexpr], pos: Pos) -> Result<Action, ParseError> {
    let name = items
        .first()
        .and_then(Sexpr::as_atom)
        .ok_or_else(|| ParseError::Malformed {
            pos,
            what: "action needs a name".into(),
        })?;
    let rest = &items[1..];
    match name {
        "expand" => {
            let mut fanout = None;
            let mut i = 0;
            while i < rest.len() {
                match rest[i].as_atom() {
                    Some(":fanout") => {
                        let value = rest.get(i + 1).ok_or_else(|| {
                            ParseError::MissingValue(rest[i].pos(), ":fanout".into())
                        })?;
                        fanout = Some(parse_uint::<usize>(value)?);
                        i += 2;
                    }
                    _ => {
                        return Err(ParseError::Malformed {
                            pos: rest[i].pos(),
                            what: "expand accepts only :fanout".into(),
                        });
                    }
                }
            }
            let fanout = fanout.ok_or_else(|| ParseError::Malformed {
                pos,
                what: "expand requires :fanout".into(),
            })?;
            Ok(Action::Expand { fanout })
        }
        "reduce" => {
            if rest.is_empty() {
                Ok(Action::Reduce)
            } else {
                Err(ParseError::Malformed {
                    pos,
                    what: "reduce takes no parameters".into(),
                })
            }
        }
        custom => {
            let mut params = BTreeMap::new();
            let mut i = 0;
            while i < rest.len() {
                let marker = rest[i].as_atom().ok_or_else(|| ParseError::Malformed {
                    pos: rest[i].pos(),
                    what: "expected a :param marker".into(),
                })?;
                let key = marker.strip_prefix(':').ok_or_else(|| ParseError::Malformed {
                    pos: rest[i].pos(),
                    what: format!("expected a :param marker, got {marker:?}"),
                })?;
                let value = rest.get(i + 1).ok_or_else(|| {
                    ParseError::MissingValue(rest[i].pos(), marker.to_owned())
                })?;
                let value = value.as_atom().ok_or_else(|| ParseError::Malformed {
                    pos: value.pos(),
                    what: "parameter values are atoms".into(),
                })?;
                params.insert(key.to_owned(), value.to_owned());
                i += 2;
            }
            Ok(Action::Custom {
                name: custom.to_owned(),
                params,
            })
        }
    }
}

fn parse_rule(expr: &Sexpr) -> Result<Rule, ParseError> {
    let Sexpr::List(items, pos) = expr else {
        return Err(ParseError::Malformed {
            pos: expr.pos(),
            what: "expected a (rule ...) form".into(),
        });
    };
    let mut iter = items.iter();
    match iter.next().and_then(Sexpr::as_atom) {
        Some("rule") => {}
        _ => {
            return Err(ParseError::Malformed {
                pos: *pos,
                what: "expected a (rule ...) form".into(),
            });
        }
    }
    let name = iter
        .next()
        .and_then(Sexpr::as_atom)
        .ok_or_else(|| ParseError::Malformed {
            pos: *pos,
            what: "rule needs a name".into(),
        })?
        .to_owned();

    let mut pattern = None;
    let mut action = None;
    for part in iter {
        let Sexpr::List(inner, inner_pos) = part else {
            return Err(ParseError::Malformed {
                pos: part.pos(),
                what: "rule body holds (pattern ...) and (action ...)".into(),
            });
        };
        match inner.first().and_then(Sexpr::as_atom) {
            Some("pattern") => {
                if pattern.is_some() {
                    return Err(ParseError::DuplicateForm(*inner_pos, "pattern"));
                }
                pattern = Some(parse_pattern(&inner[1..], *inner_pos)?);
            }
            Some("action") => {
                if action.is_some() {
                    return Err(ParseError::DuplicateForm(*inner_pos, "action"));
                }
                action = Some(parse_action(&inner[1..], *inner_pos)?);
            }
            _ => {
                return Err(ParseError::Malformed {
                    pos: *inner_pos,
                    what: "rule body holds (pattern ...) and (action ...)".into(),
                });
            }
        }
    }
    let pattern = pattern.ok_or_else(|| ParseError::Malformed {
        pos: *pos,
        what: format!("rule {name:?} has no pattern"),
    })?;
    let action = action.ok_or_else(|| ParseError::Malformed {
        pos: *pos,
        what: format!("rule {name:?} has no action"),
    })?;
    Ok(Rule {
        name,
        pattern,
        action,
    })
}

/// Reads a complete program from source text.
///
/// `name` is a display name only (usually the source file stem); it lands in
/// the summary object, never in term identity.
///
/// # Errors
///
/// Returns the first [`ParseError`] encountered, with source position.
pub fn parse_program(name: &str, source: &str) -> Result<Program, ParseError> {
    let tokens = lex(source);
    let forms = read_all(&tokens)?;

    let mut root = None;
    let mut rules: Option<Vec<Rule>> = None;
    let mut max_steps = None;

    for form in &forms {
        let Sexpr::List(items, pos) = form else {
            return Err(ParseError::ExpectedForm(form.pos()));
        };
        let head = items
            .first()
            .and_then(Sexpr::as_atom)
            .ok_or(ParseError::ExpectedForm(*pos))?;
        match head {
            "root" => {
                if root.is_some() {
                    return Err(ParseError::DuplicateForm(*pos, "root"));
                }
                let [_, term] = items.as_slice() else {
                    return Err(ParseError::Malformed {
                        pos: *pos,
                        what: "root takes exactly one term expression".into(),
                    });
                };
                root = Some(parse_term_expr(term)?);
            }
            "rules" => {
                if rules.is_some() {
                    return Err(ParseError::DuplicateForm(*pos, "rules"));
                }
                rules = Some(
                    items[1..]
                        .iter()
                        .map(parse_rule)
                        .collect::<Result<Vec<Rule>, _>>()?,
                );
            }
            "max_steps" => {
                if max_steps.is_some() {
                    return Err(ParseError::DuplicateForm(*pos, "max_steps"));
                }
                let [_, value] = items.as_slice() else {
                    return Err(ParseError::Malformed {
                        pos: *pos,
                        what: "max_steps takes exactly one integer".into(),
                    });
                };
                max_steps = Some(parse_uint::<u64>(value)?);
            }
            other => {
                return Err(ParseError::UnknownForm {
                    pos: *pos,
                    head: other.to_owned(),
                });
            }
        }
    }

    Ok(Program {
        name: name.to_owned(),
        root: root.ok_or(ParseError::MissingRoot)?,
        rules: rules.unwrap_or_default(),
        max_steps: max_steps.ok_or(ParseError::MissingMaxSteps)?,
    })
}
