//! Alignment record model and stream collaborators.

mod record;
pub use record::*;

mod sam;
pub use sam::*;

mod mem;
pub use mem::*;

use crate::errors::Result;

/// A sequential source of alignment records.
pub trait RecordSource {
    fn header(&self) -> &Header;

    fn next_record(&mut self) -> Result<Option<Record>>;

    /// Fast-forward past every remaining record mapped to `tid`, without
    /// decoding them. Sources that cannot seek may decode and discard.
    fn skip_chromosome(&mut self, tid: u32) -> Result<()>;
}

/// A sink accepting a header followed by records in stream order.
pub trait RecordSink {
    fn write_header(&mut self, header: &Header) -> Result<()>;

    fn write_record(&mut self, header: &Header, record: &Record) -> Result<()>;

    fn finish(&mut self) -> Result<()>;
}
