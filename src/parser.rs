//! Recursive-descent parser for the query language.
//!
//! Precedence, high to low: terminal (predicates, `!`, `(...)`), `&`, `|`,
//! `cond then X else Y`. Whitespace and `#` comments are ignored between
//! tokens.

use colored::Colorize;

use crate::errors::{Error, Result};
use crate::expr::Expr;
use crate::parse_utils::Cursor;
use crate::predicates::PredicateMap;

/// Parse one complete query. Trailing unconsumed text is an error.
pub fn parse(input: &str, predicates: &PredicateMap) -> Result<Expr> {
    let mut cursor = Cursor::new(input);
    let node = parse_conditional(&mut cursor, predicates)?;
    cursor.parse_space();
    if !cursor.is_empty() {
        return Err(Error::parse(cursor.offset(), "Junk at end of input."));
    }
    Ok(node)
}

/// Parse a query, rendering any failure to stderr with a caret under the
/// offending offset. Returns no tree on failure.
pub fn parse_with_report(input: &str, predicates: &PredicateMap) -> Option<Expr> {
    match parse(input, predicates) {
        Ok(expr) => Some(expr),
        Err(error) => {
            eprintln!("{} {}", "Error:".red().bold(), error);
            eprintln!("{input}");
            eprintln!("{}{}", " ".repeat(error.offset().unwrap_or(0)), "^".red());
            None
        }
    }
}

fn parse_terminal(cursor: &mut Cursor, predicates: &PredicateMap) -> Result<Expr> {
    cursor.parse_space();
    match cursor.peek() {
        None => Err(Error::parse(
            cursor.offset(),
            "Reached end of input before completing parsing.",
        )),
        Some(b'!') => {
            cursor.advance();
            Ok(parse_terminal(cursor, predicates)?.not())
        }
        Some(b'(') => {
            let brace = cursor.offset();
            cursor.advance();
            let node = parse_conditional(cursor, predicates)?;
            cursor.parse_space();
            if cursor.peek() == Some(b')') {
                cursor.advance();
                Ok(node)
            } else {
                Err(Error::parse(
                    brace,
                    "Open brace has no matching closing brace.",
                ))
            }
        }
        Some(_) => {
            let start = cursor.offset();
            while let Some(c) = cursor.peek() {
                let accept = match c {
                    b'a'..=b'z' => true,
                    b'0'..=b'9' | b'_' | b'?' => cursor.offset() > start,
                    _ => false,
                };
                if !accept {
                    break;
                }
                cursor.advance();
            }
            if cursor.offset() == start {
                return Err(Error::parse(start, "Empty predicate."));
            }
            match predicates.get(cursor.slice_from(start)) {
                Some(parser) => parser(cursor),
                None => Err(Error::parse(start, "Unknown predicate.")),
            }
        }
    }
}

fn parse_and(cursor: &mut Cursor, predicates: &PredicateMap) -> Result<Expr> {
    let mut node = parse_terminal(cursor, predicates)?;
    cursor.parse_space();
    while cursor.peek() == Some(b'&') {
        cursor.advance();
        node = node.and(parse_terminal(cursor, predicates)?);
        cursor.parse_space();
    }
    Ok(node)
}

fn parse_or(cursor: &mut Cursor, predicates: &PredicateMap) -> Result<Expr> {
    let mut node = parse_and(cursor, predicates)?;
    cursor.parse_space();
    while cursor.peek() == Some(b'|') {
        cursor.advance();
        node = node.or(parse_and(cursor, predicates)?);
        cursor.parse_space();
    }
    Ok(node)
}

fn parse_conditional(cursor: &mut Cursor, predicates: &PredicateMap) -> Result<Expr> {
    let cond = parse_or(cursor, predicates)?;
    cursor.parse_space();
    if !cursor.parse_keyword("then") {
        return Ok(cond);
    }
    let then_part = parse_or(cursor, predicates)?;
    cursor.parse_space();
    if !cursor.parse_keyword("else") {
        return Err(Error::parse(
            cursor.offset(),
            "Ternary operator has no else.",
        ));
    }
    let else_part = parse_or(cursor, predicates)?;
    Ok(cond.conditional(then_part, else_part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hts::{Header, Record};
    use crate::predicates::default_predicates;

    fn eval(input: &str) -> bool {
        let header = Header::from_targets([("chr1", 1000)]);
        let record = Record::default();
        parse(input, default_predicates())
            .unwrap()
            .matches_record(&header, &record)
    }

    #[test]
    fn and_binds_tighter_than_or() {
        assert!(!eval("false | true & false"));
        assert!(eval("true | true & false"));
        assert!(eval("false & true | true"));
    }

    #[test]
    fn negation_and_grouping() {
        assert!(eval("!false"));
        assert!(eval("!(true & false)"));
        assert!(!eval("!(true | false)"));
        assert!(eval("!!true"));
    }

    #[test]
    fn conditional_requires_else() {
        assert!(!eval("true then false else true"));
        assert!(eval("false then false else true"));
        assert!(eval("true & false then false else true"));

        let err = parse("true then false", default_predicates()).unwrap_err();
        assert!(err.to_string().contains("no else"));
    }

    #[test]
    fn conditional_is_optional() {
        assert!(eval("true"));
    }

    #[test]
    fn comments_and_whitespace() {
        assert!(eval("true # comment\n & ! false"));
    }

    #[test]
    fn short_circuit_hides_nondeterminism() {
        let header = Header::from_targets([("chr1", 1000)]);
        let record = Record::default();
        let expr = parse("false & random(1)", default_predicates()).unwrap();
        for _ in 0..100 {
            assert!(!expr.matches_record(&header, &record));
        }
    }

    #[test]
    fn parsing_is_deterministic() {
        let header = Header::from_targets([("chr1", 1000), ("chrX", 800)]);
        let a = parse("chr(1) | paired? & !unmapped?", default_predicates()).unwrap();
        let b = parse("chr(1) | paired? & !unmapped?", default_predicates()).unwrap();
        let mut record = Record {
            tid: Some(1),
            ..Record::default()
        };
        for flag in [0u16, 0x1, 0x4, 0x5] {
            record.flag = flag;
            assert_eq!(
                a.matches_record(&header, &record),
                b.matches_record(&header, &record)
            );
        }
    }

    #[test]
    fn unknown_predicate_offset() {
        let err = parse("unknown_predicate?", default_predicates()).unwrap_err();
        assert_eq!(err.offset(), Some(0));

        let err = parse("true & mystery?", default_predicates()).unwrap_err();
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn unterminated_group_points_at_open_brace() {
        let err = parse("(true & false", default_predicates()).unwrap_err();
        assert_eq!(err.offset(), Some(0));

        let err = parse("true & (false", default_predicates()).unwrap_err();
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn junk_at_end() {
        let err = parse("true )", default_predicates()).unwrap_err();
        assert_eq!(err.offset(), Some(5));
        assert!(err.to_string().contains("Junk"));
    }

    #[test]
    fn empty_input() {
        assert!(parse("", default_predicates()).is_err());
        assert!(parse("   # only a comment", default_predicates()).is_err());
    }
}
