use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Malformed query text. The offset is the byte position in the query
    /// where parsing failed, used for caret-style reporting.
    #[error("{message}")]
    Parse { offset: usize, message: String },

    #[error("Error in file \"{file}\": {source}")]
    FileIo {
        file: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Malformed record at line {line} of \"{file}\": {reason}")]
    ParseRecord {
        file: String,
        line: usize,
        reason: String,
    },

    #[error("Unknown chaining method: {0}")]
    UnknownChain(String),
}

impl Error {
    pub(crate) fn parse(offset: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            offset,
            message: message.into(),
        }
    }

    /// Byte offset of a parse failure, if this is one.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Parse { offset, .. } => Some(*offset),
            _ => None,
        }
    }
}

pub fn utf8(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}
