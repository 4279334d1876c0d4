//! In-memory model of alignment headers and records.

use crate::errors::utf8;

pub const FLAG_PAIRED: u16 = 0x1;
pub const FLAG_PROPER_PAIR: u16 = 0x2;
pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_MATE_UNMAPPED: u16 = 0x8;
pub const FLAG_REVERSE: u16 = 0x10;
pub const FLAG_MATE_REVERSE: u16 = 0x20;
pub const FLAG_READ1: u16 = 0x40;
pub const FLAG_READ2: u16 = 0x80;
pub const FLAG_SECONDARY: u16 = 0x100;
pub const FLAG_QC_FAIL: u16 = 0x200;
pub const FLAG_DUPLICATE: u16 = 0x400;
pub const FLAG_SUPPLEMENTARY: u16 = 0x800;

/// One reference sequence named by the header.
#[derive(Clone, Debug)]
pub struct Target {
    pub name: String,
    pub len: u32,
}

/// Per-run metadata: the ordered set of reference targets plus the verbatim
/// header lines, so output files can reproduce the header exactly.
#[derive(Clone, Debug, Default)]
pub struct Header {
    targets: Vec<Target>,
    lines: Vec<String>,
}

impl Header {
    pub fn new(targets: Vec<Target>, lines: Vec<String>) -> Self {
        Self { targets, lines }
    }

    /// Build a header from `(name, length)` pairs, synthesizing `@SQ` lines.
    pub fn from_targets(targets: impl IntoIterator<Item = (impl Into<String>, u32)>) -> Self {
        let targets: Vec<Target> = targets
            .into_iter()
            .map(|(name, len)| Target {
                name: name.into(),
                len,
            })
            .collect();
        let lines = targets
            .iter()
            .map(|t| format!("@SQ\tSN:{}\tLN:{}", t.name, t.len))
            .collect();
        Self { targets, lines }
    }

    pub fn targets(&self) -> &[Target] {
        &self.targets
    }

    pub fn target_name(&self, tid: u32) -> Option<&str> {
        self.targets.get(tid as usize).map(|t| t.name.as_str())
    }

    pub fn tid_of(&self, name: &str) -> Option<u32> {
        self.targets
            .iter()
            .position(|t| t.name == name)
            .map(|i| i as u32)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

/// A typed auxiliary field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Aux {
    Char(u8),
    Int(i64),
    Float(f32),
    String(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cigar {
    pub len: u32,
    pub op: u8,
}

impl Cigar {
    pub fn consumes_reference(&self) -> bool {
        matches!(self.op, b'M' | b'D' | b'N' | b'=' | b'X')
    }

    pub fn consumes_query(&self) -> bool {
        matches!(self.op, b'M' | b'I' | b'S' | b'=' | b'X')
    }
}

/// One alignment record. Positions are 0-based internally; the SAM text
/// layer converts on read and write.
#[derive(Clone, Debug, Default)]
pub struct Record {
    pub qname: Vec<u8>,
    pub flag: u16,
    pub tid: Option<u32>,
    pub pos: u32,
    pub mapq: u8,
    pub cigar: Vec<Cigar>,
    pub mtid: Option<u32>,
    pub mpos: u32,
    pub tlen: i64,
    pub seq: Vec<u8>,
    pub qual: Vec<u8>,
    pub aux: Vec<([u8; 2], Aux)>,
}

impl Record {
    /// Whether every bit of `mask` is set in the record's flag field.
    pub fn has_flags(&self, mask: u16) -> bool {
        self.flag & mask == mask
    }

    pub fn qname_str(&self) -> String {
        utf8(&self.qname)
    }

    /// 0-based exclusive end of the mapped span, derived from the CIGAR.
    /// Unmapped records and records without CIGAR data fall back to
    /// start plus read length.
    pub fn mapped_end(&self) -> u32 {
        if self.has_flags(FLAG_UNMAPPED) || self.cigar.is_empty() {
            self.pos + self.seq.len() as u32
        } else {
            self.pos
                + self
                    .cigar
                    .iter()
                    .filter(|c| c.consumes_reference())
                    .map(|c| c.len)
                    .sum::<u32>()
        }
    }

    /// The read base aligned at 0-based reference position `ref_pos`, or
    /// `None` when the record is unmapped, the position falls outside the
    /// mapped span, or a deletion/skip covers it.
    pub fn base_at(&self, ref_pos: u32) -> Option<u8> {
        if self.has_flags(FLAG_UNMAPPED) || self.tid.is_none() {
            return None;
        }
        if ref_pos < self.pos || ref_pos >= self.mapped_end() {
            return None;
        }
        let mut remaining = ref_pos - self.pos;
        if self.cigar.is_empty() {
            return self.seq.get(remaining as usize).copied();
        }
        let mut query = 0u32;
        for c in &self.cigar {
            match (c.consumes_query(), c.consumes_reference()) {
                (true, true) => {
                    if remaining < c.len {
                        return self.seq.get((query + remaining) as usize).copied();
                    }
                    remaining -= c.len;
                    query += c.len;
                }
                (true, false) => query += c.len,
                (false, true) => {
                    if remaining < c.len {
                        // deletion or reference skip at the queried position
                        return None;
                    }
                    remaining -= c.len;
                }
                (false, false) => {}
            }
        }
        None
    }

    pub fn aux(&self, tag: &[u8; 2]) -> Option<&Aux> {
        self.aux.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
    }

    pub fn aux_str(&self, tag: &[u8; 2]) -> Option<&str> {
        match self.aux(tag) {
            Some(Aux::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn aux_char(&self, tag: &[u8; 2]) -> Option<u8> {
        match self.aux(tag) {
            Some(Aux::Char(c)) => Some(*c),
            _ => None,
        }
    }

    pub fn aux_int(&self, tag: &[u8; 2]) -> Option<i64> {
        match self.aux(tag) {
            Some(Aux::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn aux_float(&self, tag: &[u8; 2]) -> Option<f32> {
        match self.aux(tag) {
            Some(Aux::Float(f)) => Some(*f),
            _ => None,
        }
    }
}
