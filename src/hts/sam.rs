//! SAM text reading and writing, with optional gzip compression.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};

use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};
use memchr::memchr_iter;

use crate::errors::{Error, Result};
use crate::hts::{Aux, Cigar, Header, Record, RecordSink, RecordSource, Target};

/// Streaming reader for SAM text. The header is parsed eagerly; records are
/// decoded one line at a time.
pub struct SamReader {
    reader: Box<dyn BufRead + Send>,
    header: Header,
    file: String,
    line_no: usize,
    // first non-header line, or a line buffered by a chromosome skip
    pending: Option<String>,
}

/// Open a SAM file, decompressing when `compressed` is set.
pub fn open_for_read(path: &str, compressed: bool) -> Result<SamReader> {
    let file = File::open(path).map_err(|e| Error::FileIo {
        file: path.to_owned(),
        source: Box::new(e),
    })?;
    let reader: Box<dyn BufRead + Send> = if compressed {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };
    SamReader::new(reader, path)
}

impl SamReader {
    /// Read SAM text from an arbitrary reader, labeled `file` in errors.
    pub fn from_reader(reader: impl BufRead + Send + 'static, file: &str) -> Result<Self> {
        Self::new(Box::new(reader), file)
    }

    fn new(mut reader: Box<dyn BufRead + Send>, file: &str) -> Result<Self> {
        let mut targets = Vec::new();
        let mut lines = Vec::new();
        let mut line_no = 0;
        let mut pending = None;

        loop {
            let Some(line) = read_line(&mut reader, file)? else {
                break;
            };
            line_no += 1;
            if let Some(rest) = line.strip_prefix('@') {
                if let Some(sq) = rest.strip_prefix("SQ\t") {
                    targets.push(parse_sq(sq, file, line_no)?);
                }
                lines.push(line);
            } else {
                pending = Some(line);
                break;
            }
        }

        Ok(Self {
            reader,
            header: Header::new(targets, lines),
            file: file.to_owned(),
            line_no,
            pending,
        })
    }

    fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.take() {
            return Ok(Some(line));
        }
        let line = read_line(&mut self.reader, &self.file)?;
        if line.is_some() {
            self.line_no += 1;
        }
        Ok(line)
    }

    fn record_error(&self, reason: impl Into<String>) -> Error {
        Error::ParseRecord {
            file: self.file.clone(),
            line: self.line_no,
            reason: reason.into(),
        }
    }
}

impl RecordSource for SamReader {
    fn header(&self) -> &Header {
        &self.header
    }

    fn next_record(&mut self) -> Result<Option<Record>> {
        loop {
            let Some(line) = self.next_line()? else {
                return Ok(None);
            };
            if line.is_empty() {
                continue;
            }
            return parse_record(&line, &self.header)
                .map(Some)
                .map_err(|reason| self.record_error(reason));
        }
    }

    fn skip_chromosome(&mut self, tid: u32) -> Result<()> {
        let Some(name) = self.header.target_name(tid).map(str::to_owned) else {
            return Ok(());
        };
        // compare only the rname field; no full record decode
        loop {
            let Some(line) = self.next_line()? else {
                return Ok(());
            };
            if !line.is_empty() && rname_field(&line) != Some(name.as_str()) {
                self.pending = Some(line);
                return Ok(());
            }
        }
    }
}

/// The third tab-separated field of a record line.
fn rname_field(line: &str) -> Option<&str> {
    let mut tabs = memchr_iter(b'\t', line.as_bytes());
    let start = tabs.nth(1)? + 1;
    let end = tabs.next().unwrap_or(line.len());
    Some(&line[start..end])
}

fn read_line(reader: &mut (dyn BufRead + Send), file: &str) -> Result<Option<String>> {
    let mut buf = String::new();
    let n = reader.read_line(&mut buf).map_err(|e| Error::FileIo {
        file: file.to_owned(),
        source: Box::new(e),
    })?;
    if n == 0 {
        return Ok(None);
    }
    while buf.ends_with('\n') || buf.ends_with('\r') {
        buf.pop();
    }
    Ok(Some(buf))
}

fn parse_sq(fields: &str, file: &str, line: usize) -> Result<Target> {
    let mut name = None;
    let mut len = 0;
    for field in fields.split('\t') {
        if let Some(sn) = field.strip_prefix("SN:") {
            name = Some(sn.to_owned());
        } else if let Some(ln) = field.strip_prefix("LN:") {
            len = ln.parse().unwrap_or(0);
        }
    }
    name.map(|name| Target { name, len })
        .ok_or_else(|| Error::ParseRecord {
            file: file.to_owned(),
            line,
            reason: "@SQ line without SN field".to_owned(),
        })
}

fn parse_record(line: &str, header: &Header) -> std::result::Result<Record, String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 11 {
        return Err(format!("expected 11 fields, found {}", fields.len()));
    }

    let flag = fields[1]
        .parse::<u16>()
        .map_err(|_| format!("invalid flag field `{}'", fields[1]))?;
    let tid = parse_rname(fields[2], None, header)?;
    let pos = fields[3]
        .parse::<u32>()
        .map_err(|_| format!("invalid position `{}'", fields[3]))?
        .saturating_sub(1);
    let mapq = fields[4]
        .parse::<u8>()
        .map_err(|_| format!("invalid mapping quality `{}'", fields[4]))?;
    let cigar = parse_cigar(fields[5])?;
    let mtid = parse_rname(fields[6], tid, header)?;
    let mpos = fields[7]
        .parse::<u32>()
        .map_err(|_| format!("invalid mate position `{}'", fields[7]))?
        .saturating_sub(1);
    let tlen = fields[8]
        .parse::<i64>()
        .map_err(|_| format!("invalid template length `{}'", fields[8]))?;
    let seq = if fields[9] == "*" {
        Vec::new()
    } else {
        fields[9].as_bytes().to_vec()
    };
    let qual = if fields[10] == "*" {
        Vec::new()
    } else {
        fields[10].as_bytes().to_vec()
    };

    let mut aux = Vec::new();
    for field in &fields[11..] {
        aux.push(parse_aux(field)?);
    }

    Ok(Record {
        qname: fields[0].as_bytes().to_vec(),
        flag,
        tid,
        pos,
        mapq,
        cigar,
        mtid,
        mpos,
        tlen,
        seq,
        qual,
        aux,
    })
}

fn parse_rname(
    field: &str,
    same_as: Option<u32>,
    header: &Header,
) -> std::result::Result<Option<u32>, String> {
    match field {
        "*" => Ok(None),
        "=" => Ok(same_as),
        name => header
            .tid_of(name)
            .map(Some)
            .ok_or_else(|| format!("reference `{name}' is not named by the header")),
    }
}

fn parse_cigar(field: &str) -> std::result::Result<Vec<Cigar>, String> {
    if field == "*" {
        return Ok(Vec::new());
    }
    let mut cigar = Vec::new();
    let mut len = 0u32;
    let mut have_len = false;
    for &c in field.as_bytes() {
        match c {
            b'0'..=b'9' => {
                len = len
                    .checked_mul(10)
                    .and_then(|l| l.checked_add((c - b'0') as u32))
                    .ok_or_else(|| format!("invalid CIGAR `{field}'"))?;
                have_len = true;
            }
            b'M' | b'I' | b'D' | b'N' | b'S' | b'H' | b'P' | b'=' | b'X' if have_len => {
                cigar.push(Cigar { len, op: c });
                len = 0;
                have_len = false;
            }
            _ => return Err(format!("invalid CIGAR `{field}'")),
        }
    }
    if have_len {
        return Err(format!("invalid CIGAR `{field}'"));
    }
    Ok(cigar)
}

fn parse_aux(field: &str) -> std::result::Result<([u8; 2], Aux), String> {
    let bytes = field.as_bytes();
    if bytes.len() < 5 || bytes[2] != b':' || bytes[4] != b':' {
        return Err(format!("invalid auxiliary field `{field}'"));
    }
    let tag = [bytes[0], bytes[1]];
    let value = &field[5..];
    let aux = match bytes[3] {
        b'A' => Aux::Char(*value.as_bytes().first().ok_or("empty A auxiliary field")?),
        b'i' => Aux::Int(
            value
                .parse()
                .map_err(|_| format!("invalid integer auxiliary field `{field}'"))?,
        ),
        b'f' => Aux::Float(
            value
                .parse()
                .map_err(|_| format!("invalid float auxiliary field `{field}'"))?,
        ),
        b'Z' | b'H' | b'B' => Aux::String(value.to_owned()),
        t => return Err(format!("unsupported auxiliary type `{}'", t as char)),
    };
    Ok((tag, aux))
}

/// Buffered SAM text writer; paths ending in `.gz` are compressed.
/// `finish` closes the stream; the compressed trailer is not complete
/// until then.
pub struct SamWriter {
    writer: Option<Box<dyn Write + Send>>,
    file: String,
}

pub fn open_for_write(path: &str) -> Result<SamWriter> {
    let file = File::create(path).map_err(|e| Error::FileIo {
        file: path.to_owned(),
        source: Box::new(e),
    })?;
    let writer: Box<dyn Write + Send> = if path.ends_with(".gz") {
        Box::new(BufWriter::new(GzEncoder::new(file, Compression::default())))
    } else {
        Box::new(BufWriter::new(file))
    };
    Ok(SamWriter {
        writer: Some(writer),
        file: path.to_owned(),
    })
}

impl SamWriter {
    pub fn from_writer(writer: impl Write + Send + 'static, file: &str) -> Self {
        Self {
            writer: Some(Box::new(writer)),
            file: file.to_owned(),
        }
    }

    fn io(&self, e: std::io::Error) -> Error {
        Error::FileIo {
            file: self.file.clone(),
            source: Box::new(e),
        }
    }

    fn open_writer(&mut self) -> Result<&mut Box<dyn Write + Send>> {
        let file = self.file.clone();
        self.writer.as_mut().ok_or_else(|| Error::FileIo {
            file,
            source: "stream is already closed".into(),
        })
    }
}

impl RecordSink for SamWriter {
    fn write_header(&mut self, header: &Header) -> Result<()> {
        let mut text = String::new();
        for line in header.lines() {
            text.push_str(line);
            text.push('\n');
        }
        let writer = self.open_writer()?;
        if let Err(e) = writer.write_all(text.as_bytes()) {
            return Err(self.io(e));
        }
        Ok(())
    }

    fn write_record(&mut self, header: &Header, record: &Record) -> Result<()> {
        let mut line = Vec::with_capacity(128);
        format_record(&mut line, header, record);
        let writer = self.open_writer()?;
        if let Err(e) = writer.write_all(&line) {
            return Err(self.io(e));
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        // dropping the writer flushes the buffer and, for compressed
        // output, writes the gzip trailer
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| self.io(e))?;
        }
        Ok(())
    }
}

fn format_record(out: &mut Vec<u8>, header: &Header, record: &Record) {
    let rname = |tid: Option<u32>| -> &str {
        tid.and_then(|t| header.target_name(t)).unwrap_or("*")
    };

    out.extend_from_slice(&record.qname);
    out.extend_from_slice(format!("\t{}\t{}\t", record.flag, rname(record.tid)).as_bytes());
    let pos = if record.tid.is_some() { record.pos + 1 } else { 0 };
    out.extend_from_slice(format!("{}\t{}\t", pos, record.mapq).as_bytes());
    if record.cigar.is_empty() {
        out.push(b'*');
    } else {
        for c in &record.cigar {
            out.extend_from_slice(c.len.to_string().as_bytes());
            out.push(c.op);
        }
    }
    let mate = match (record.mtid, record.tid) {
        (Some(m), Some(t)) if m == t => "=".to_owned(),
        (mtid, _) => rname(mtid).to_owned(),
    };
    let mpos = if record.mtid.is_some() { record.mpos + 1 } else { 0 };
    out.extend_from_slice(format!("\t{}\t{}\t{}\t", mate, mpos, record.tlen).as_bytes());
    if record.seq.is_empty() {
        out.push(b'*');
    } else {
        out.extend_from_slice(&record.seq);
    }
    out.push(b'\t');
    if record.qual.is_empty() {
        out.push(b'*');
    } else {
        out.extend_from_slice(&record.qual);
    }
    for (tag, value) in &record.aux {
        out.push(b'\t');
        out.extend_from_slice(tag);
        match value {
            Aux::Char(c) => out.extend_from_slice(format!(":A:{}", *c as char).as_bytes()),
            Aux::Int(i) => out.extend_from_slice(format!(":i:{i}").as_bytes()),
            Aux::Float(f) => out.extend_from_slice(format!(":f:{f}").as_bytes()),
            Aux::String(s) => out.extend_from_slice(format!(":Z:{s}").as_bytes()),
        }
    }
    out.push(b'\n');
}
