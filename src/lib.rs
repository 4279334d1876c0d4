//! Query-driven filtering of sequence alignment records.
//!
//! # Overview
//! bamsieve compiles small boolean query expressions over SAM-style
//! alignment records and streams a file through them, routing each record to
//! the outputs whose queries accept it.
//!
//! This is useful for:
//! * Splitting an alignment file by flags, chromosome, or read group
//! * Downsampling with `random(p)`
//! * Pulling out reads covering a position or carrying a particular base
//!
//! ## Queries
//! A query is a boolean expression over predicates:
//! ```text
//! chr(1) & paired? & !duplicate?          # mapped pairs on chromosome 1
//! read_group(tumour) | random(0.05)
//! unmapped? then true else mapping_quality(20)
//! ```
//! Operators, loosest first: `cond then X else Y`, `|`, `&`, `!`, `(...)`.
//! `#` starts a comment running to the end of the line.
//!
//! Queries are parsed against a predicate registry ([`default_predicates`])
//! into an immutable [`Expr`] tree. Evaluation is total: a compiled query
//! answers true or false for any well-formed record.
//!
//! ## Output chains
//! Each output pairs one query with one sink. The outputs form a chain
//! visited front to back, and a [`ChainPolicy`] decides how far each record
//! travels: `parallel` offers every record to every output, `series` stops
//! at the first rejection, `shuttle` stops at the first acceptance.
//!
//! Before any record of a chromosome is decoded, the chain is asked whether
//! that chromosome could match at all; ruled-out chromosomes are skipped
//! wholesale.

pub mod chain;
pub mod errors;
pub mod expr;
pub mod hts;
pub mod parser;
pub mod predicates;

mod parse_utils;
mod patterns;

// commonly used functions and types

pub use crate::chain::{ChainPolicy, FilterChain};
pub use crate::errors::{Error, Result};
pub use crate::expr::Expr;
pub use crate::parser::{parse, parse_with_report};
pub use crate::patterns::globish_match;
pub use crate::predicates::{default_predicates, PredicateMap};

pub use crate::parse_utils::Cursor;
