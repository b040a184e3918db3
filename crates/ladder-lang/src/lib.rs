// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! ladder-lang: S-expression surface for ladder rewrite programs.
//!
//! A program is three top-level forms: `(root <term-expr>)`, `(rules ...)`,
//! and `(max_steps N)`. This crate lexes and lowers that surface into the
//! [`ladder_core::Program`] model; all semantic validation beyond shape
//! (duplicate rule names, empty patterns, filter overlap) stays in
//! `ladder-core`.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod lexer;
mod parse;

/// Source positions and raw tokens.
pub use lexer::{lex, Pos, Token};
/// Program reader and its error type.
pub use parse::{parse_program, ParseError};
