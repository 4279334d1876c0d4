//! The built-in predicate set and the registry that makes the grammar
//! extensible.
//!
//! Each entry maps a predicate name to a parser that consumes the
//! predicate's argument list (the cursor sits just past the name) and
//! returns an expression leaf.

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

use crate::errors::{Error, Result};
use crate::expr::{Expr, Node};
use crate::hts::*;
use crate::parse_utils::Cursor;

pub type PredicateParser = fn(&mut Cursor) -> Result<Expr>;

/// Predicate name to argument parser. Callers may extend or replace this
/// to plug in their own predicates.
pub type PredicateMap = FxHashMap<&'static str, PredicateParser>;

lazy_static! {
    static ref DEFAULT_PREDICATES: PredicateMap = {
        let mut map = PredicateMap::default();
        map.insert("chr", parse_chromosome as PredicateParser);
        map.insert("mate_chr", parse_mate_chromosome);
        map.insert("read_group", parse_read_group);
        map.insert("mapping_quality", parse_mapping_quality);
        map.insert("position", parse_position);
        map.insert("nt", parse_nucleotide_check);
        map.insert("nt_exact", parse_nucleotide_exact);
        map.insert("random", parse_random);
        map.insert("true", parse_true);
        map.insert("false", parse_false);
        map.insert("paired?", parse_flag::<FLAG_PAIRED>);
        map.insert("proper_pair?", parse_flag::<FLAG_PROPER_PAIR>);
        map.insert("unmapped?", parse_flag::<FLAG_UNMAPPED>);
        map.insert("mate_unmapped?", parse_flag::<FLAG_MATE_UNMAPPED>);
        map.insert("mapped_to_reverse?", parse_flag::<FLAG_REVERSE>);
        map.insert("mate_mapped_to_reverse?", parse_flag::<FLAG_MATE_REVERSE>);
        map.insert("read1?", parse_flag::<FLAG_READ1>);
        map.insert("read2?", parse_flag::<FLAG_READ2>);
        map.insert("secondary?", parse_flag::<FLAG_SECONDARY>);
        map.insert("failed_qc?", parse_flag::<FLAG_QC_FAIL>);
        map.insert("duplicate?", parse_flag::<FLAG_DUPLICATE>);
        map.insert("supplementary?", parse_flag::<FLAG_SUPPLEMENTARY>);
        map.insert("split_pair?", parse_split_pair);
        map
    };
}

/// All the predicates known to the system.
pub fn default_predicates() -> &'static PredicateMap {
    &DEFAULT_PREDICATES
}

const CHROMOSOME_CHARS: &str =
    "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_*?.";

fn chromosome_leaf(name: &str, mate: bool) -> Expr {
    Node::Chromosome {
        pattern: name.to_owned(),
        mate,
    }
    .into()
}

fn parse_chromosome_args(cursor: &mut Cursor, mate: bool) -> Result<Expr> {
    cursor.parse_char_in_space('(')?;
    let name = cursor.parse_str(CHROMOSOME_CHARS, false)?;
    if name.starts_with("chr") {
        return Err(Error::parse(
            cursor.offset(),
            "Chromosome names must not start with `chr'.",
        ));
    }
    cursor.parse_char_in_space(')')?;

    // chromosomes that go by several names match all of them
    let node = match name {
        "23" | "X" | "x" => chromosome_leaf("23", mate).or(chromosome_leaf("x", mate)),
        "24" | "Y" | "y" => chromosome_leaf("24", mate).or(chromosome_leaf("y", mate)),
        "25" | "M" | "m" => chromosome_leaf("25", mate).or(chromosome_leaf("m", mate)),
        name => chromosome_leaf(name, mate),
    };
    Ok(node)
}

fn parse_chromosome(cursor: &mut Cursor) -> Result<Expr> {
    parse_chromosome_args(cursor, false)
}

fn parse_mate_chromosome(cursor: &mut Cursor) -> Result<Expr> {
    parse_chromosome_args(cursor, true)
}

fn parse_read_group(cursor: &mut Cursor) -> Result<Expr> {
    cursor.parse_char_in_space('(')?;
    let start = cursor.offset();
    // any printable character except `)`, and `=` must not come first
    while let Some(c) = cursor.peek() {
        if !(b'!'..=b'~').contains(&c) || c == b')' || (cursor.offset() == start && c == b'=') {
            break;
        }
        cursor.advance();
    }
    if cursor.offset() == start {
        return Err(Error::parse(start, "Expected valid read group name."));
    }
    let name = cursor.slice_from(start).to_owned();
    cursor.parse_char_in_space(')')?;
    Ok(Node::ReadGroup(name).into())
}

fn parse_mapping_quality(cursor: &mut Cursor) -> Result<Expr> {
    cursor.parse_char_in_space('(')?;
    let offset = cursor.offset();
    let quality = cursor.parse_int()?;
    if quality > 254 {
        return Err(Error::parse(
            offset,
            "Mapping quality must be between 0 and 254.",
        ));
    }
    cursor.parse_char_in_space(')')?;
    Ok(Node::MappingQuality(quality as u8).into())
}

fn parse_position(cursor: &mut Cursor) -> Result<Expr> {
    cursor.parse_char_in_space('(')?;
    let offset = cursor.offset();
    let start = cursor.parse_int()?;
    cursor.parse_char_in_space(',')?;
    let end = cursor.parse_int()?;
    if start > end {
        return Err(Error::parse(offset, "Start must not exceed end."));
    }
    cursor.parse_char_in_space(')')?;
    Ok(Node::Position { start, end }.into())
}

fn parse_nucleotide_args(cursor: &mut Cursor, exact: bool) -> Result<Expr> {
    cursor.parse_char_in_space('(')?;
    let pos = cursor.parse_int()?;
    cursor.parse_char_in_space(',')?;
    let offset = cursor.offset();
    let code = cursor.parse_nucleotide();
    if code == 0 {
        return Err(Error::parse(offset, "Expected nucleotide."));
    }
    cursor.parse_char_in_space(')')?;
    Ok(Node::Nucleotide { pos, code, exact }.into())
}

fn parse_nucleotide_check(cursor: &mut Cursor) -> Result<Expr> {
    parse_nucleotide_args(cursor, false)
}

fn parse_nucleotide_exact(cursor: &mut Cursor) -> Result<Expr> {
    parse_nucleotide_args(cursor, true)
}

fn parse_random(cursor: &mut Cursor) -> Result<Expr> {
    cursor.parse_char_in_space('(')?;
    let offset = cursor.offset();
    let probability = cursor.parse_double()?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(Error::parse(
            offset,
            "The provided probability is not probable.",
        ));
    }
    cursor.parse_char_in_space(')')?;
    Ok(Node::random(probability).into())
}

fn parse_flag<const MASK: u16>(_cursor: &mut Cursor) -> Result<Expr> {
    Ok(Node::Flag(MASK).into())
}

fn parse_split_pair(_cursor: &mut Cursor) -> Result<Expr> {
    Ok(Node::SplitPair.into())
}

fn parse_true(_cursor: &mut Cursor) -> Result<Expr> {
    Ok(Expr::literal(true))
}

fn parse_false(_cursor: &mut Cursor) -> Result<Expr> {
    Ok(Expr::literal(false))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(name: &str, args: &str) -> Result<Expr> {
        let mut cursor = Cursor::new(args);
        default_predicates().get(name).unwrap()(&mut cursor)
    }

    fn alias_header() -> Header {
        Header::from_targets([("chr1", 1000), ("chrX", 800)])
    }

    #[test]
    fn chromosome_alias_folding() {
        let h = alias_header();
        for query in ["(X)", "(x)", "(23)"] {
            let e = parse("chr", query).unwrap();
            assert!(e.matches_chromosome(&h, 1), "{query} should accept chrX");
            assert!(!e.matches_chromosome(&h, 0), "{query} should reject chr1");
        }
    }

    #[test]
    fn chromosome_rejects_chr_prefix() {
        assert!(parse("chr", "(chr1)").is_err());
    }

    #[test]
    fn read_group_name_grammar() {
        let h = alias_header();
        let e = parse("read_group", "( grp-1.2 )").unwrap();
        let mut r = Record::default();
        r.aux.push((*b"RG", Aux::String("grp-1.2".to_owned())));
        assert!(e.matches_record(&h, &r));

        assert!(parse("read_group", "(=x)").is_err());
        assert!(parse("read_group", "()").is_err());
    }

    #[test]
    fn random_probability_range() {
        assert!(parse("random", "(0.5)").is_ok());
        assert!(parse("random", "(0)").is_ok());
        assert!(parse("random", "(1)").is_ok());
        assert!(parse("random", "(1.5)").is_err());
        assert!(parse("random", "(-0.1)").is_err());
    }

    #[test]
    fn mapping_quality_range() {
        assert!(parse("mapping_quality", "(20)").is_ok());
        assert!(parse("mapping_quality", "(255)").is_err());
    }

    #[test]
    fn position_arguments() {
        assert!(parse("position", "(100, 200)").is_ok());
        assert!(parse("position", "(200, 100)").is_err());
        assert!(parse("position", "(100)").is_err());
    }

    #[test]
    fn nucleotide_arguments() {
        assert!(parse("nt", "(100, a)").is_ok());
        assert!(parse("nt", "(100, n)").is_ok());
        assert!(parse("nt", "(100, q)").is_err());
        assert!(parse("nt_exact", "(100, t)").is_ok());
    }

    #[test]
    fn flags_take_no_arguments() {
        let h = alias_header();
        let e = parse("paired?", "").unwrap();
        let r = Record {
            flag: FLAG_PAIRED,
            ..Record::default()
        };
        assert!(e.matches_record(&h, &r));
        assert!(!e.matches_record(&h, &Record::default()));
    }
}
