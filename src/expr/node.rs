use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

use crate::expr::Expr;
use crate::hts::{Header, Record};
use crate::patterns::{globish_match, nucleotide_code};

/// One node of the expression tree. Leaves hold predicate parameters;
/// combinators hold only children.
#[derive(Debug)]
pub enum Node {
    Literal(bool),
    Not(Expr),
    And(Expr, Expr),
    Or(Expr, Expr),
    Conditional {
        cond: Expr,
        then_part: Expr,
        else_part: Expr,
    },
    /// Glob match against the (or the mate's) chromosome name.
    Chromosome {
        pattern: String,
        mate: bool,
    },
    ReadGroup(String),
    /// All bits of the mask must be set.
    Flag(u16),
    MappingQuality(u8),
    /// Mapped span overlaps the closed 1-based interval [start, end].
    Position {
        start: u32,
        end: u32,
    },
    /// Base aligned at a 1-based reference position is compatible with
    /// (or, when exact, equal to) a degenerate nucleotide code.
    Nucleotide {
        pos: u32,
        code: u8,
        exact: bool,
    },
    SplitPair,
    Random {
        probability: f64,
        rng: Mutex<Xoshiro256StarStar>,
    },
}

impl Node {
    pub fn random(probability: f64) -> Node {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Node::random_seeded(probability, seed)
    }

    pub fn random_seeded(probability: f64, seed: u64) -> Node {
        Node::Random {
            probability,
            rng: Mutex::new(Xoshiro256StarStar::seed_from_u64(seed)),
        }
    }

    pub fn matches_record(&self, header: &Header, record: &Record) -> bool {
        match self {
            Node::Literal(value) => *value,
            Node::Not(child) => !child.matches_record(header, record),
            Node::And(left, right) => {
                left.matches_record(header, record) && right.matches_record(header, record)
            }
            Node::Or(left, right) => {
                left.matches_record(header, record) || right.matches_record(header, record)
            }
            Node::Conditional {
                cond,
                then_part,
                else_part,
            } => {
                if cond.matches_record(header, record) {
                    then_part.matches_record(header, record)
                } else {
                    else_part.matches_record(header, record)
                }
            }
            Node::Chromosome { pattern, mate } => {
                let tid = if *mate { record.mtid } else { record.tid };
                match tid {
                    Some(tid) => chromosome_matches(header, tid, pattern),
                    None => false,
                }
            }
            Node::ReadGroup(name) => record.aux_str(b"RG") == Some(name.as_str()),
            Node::Flag(mask) => record.has_flags(*mask),
            // 255 means the quality is unavailable
            Node::MappingQuality(quality) => record.mapq != 255 && record.mapq >= *quality,
            Node::Position { start, end } => {
                if record.tid.is_none() {
                    return false;
                }
                let mapped_start = record.pos + 1;
                let mapped_end = record.mapped_end();
                (mapped_start <= *start && mapped_end >= *start)
                    || (mapped_start <= *end && mapped_end >= *end)
                    || (mapped_start >= *start && mapped_end <= *end)
            }
            Node::Nucleotide { pos, code, exact } => match pos
                .checked_sub(1)
                .and_then(|ref_pos| record.base_at(ref_pos))
            {
                Some(base) => {
                    let read_code = nucleotide_code(base);
                    if *exact {
                        read_code == *code
                    } else {
                        read_code & *code != 0
                    }
                }
                None => false,
            },
            Node::SplitPair => {
                matches!((record.tid, record.mtid), (Some(tid), Some(mtid)) if tid != mtid)
            }
            Node::Random { probability, rng } => rng.lock().unwrap().gen::<f64>() < *probability,
        }
    }

    pub fn matches_chromosome(&self, header: &Header, tid: u32) -> bool {
        match self {
            Node::And(left, right) => {
                left.matches_chromosome(header, tid) && right.matches_chromosome(header, tid)
            }
            Node::Or(left, right) => {
                left.matches_chromosome(header, tid) || right.matches_chromosome(header, tid)
            }
            Node::Chromosome {
                pattern,
                mate: false,
            } => chromosome_matches(header, tid, pattern),
            // a mate can sit on any chromosome, and every other node can
            // only be decided per record
            _ => true,
        }
    }
}

/// Test a target's recorded name against a pattern, ignoring any leading
/// `chr` so `1` matches both `1` and `chr1`.
fn chromosome_matches(header: &Header, tid: u32, pattern: &str) -> bool {
    let Some(mut name) = header.target_name(tid) else {
        return false;
    };
    // byte comparison: target names are not guaranteed to be ASCII
    if name.as_bytes().len() >= 3 && name.as_bytes()[..3].eq_ignore_ascii_case(b"chr") {
        name = &name[3..];
    }
    globish_match(pattern, name)
}
