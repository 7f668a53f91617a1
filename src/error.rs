use thiserror::Error;

use crate::encryption::DecryptionError;
use crate::ObjectId;
use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of failures, used by callers to decide how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The lexer or parser could not make sense of the bytes.
    Syntax,
    /// The cross-reference/trailer chain is broken or an object can't be located.
    Structural,
    /// The password matched neither the owner nor the user hash, or the
    /// encryption dictionary is unusable.
    Security,
    /// An object owned by one document was attached to another without cloning.
    Ownership,
    /// Stream payload problems (bad length, undecodable filter data).
    Resource,
    /// Underlying I/O failure.
    Io,
    /// The API was used in a way the document does not allow.
    Usage,
}

/// The public operation during which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Open,
    Save,
    Resolve,
    Sign,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Operation::Open => "open",
            Operation::Save => "save",
            Operation::Resolve => "resolve",
            Operation::Sign => "sign",
        })
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// A public operation failed; `source` holds the underlying cause.
    #[error("{operation} failed: {source}")]
    Operation {
        operation: Operation,
        #[source]
        source: Box<Error>,
    },
    /// Syntax error while lexing or parsing.
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { offset: usize, message: String },
    /// The bytes at `offset` are not an `N G obj` header.
    #[error("invalid indirect object at byte {offset}")]
    IndirectObject { offset: usize },
    /// Found Object ID does not match Expected Object ID.
    #[error("expected object {expected:?} but found {found:?}")]
    ObjectIdMismatch { expected: ObjectId, found: ObjectId },
    /// The `%PDF-` header is missing.
    #[error("invalid file header")]
    Header,
    /// Error while parsing cross reference table.
    #[error("invalid cross-reference section: {0}")]
    Xref(XrefError),
    /// The file trailer was invalid.
    #[error("invalid file trailer")]
    Trailer,
    /// The Object ID was not found.
    #[error("object {0:?} not found")]
    ObjectNotFound(ObjectId),
    /// Lazy recovery scanned the whole file and still could not locate the object.
    #[error("position of object {0:?} not found, even after scanning the file")]
    PositionNotFound(ObjectId),
    /// Dereferencing object failed due to a reference cycle.
    #[error("reference cycle detected at object {0:?}")]
    ReferenceCycle(ObjectId),
    /// Dereferencing object reached the limit.
    #[error("reference chain is too long")]
    ReferenceLimit,
    /// Offset in file is invalid.
    #[error("invalid file offset {0}")]
    InvalidOffset(usize),
    /// Stream payload problems.
    #[error("invalid stream: {0}")]
    InvalidStream(String),
    /// The stream couldn't be decompressed.
    #[error("couldn't decompress stream: {0}")]
    Decompress(String),
    /// Error when decrypting or encrypting the contents of the file.
    #[error("security handler error: {0}")]
    Decryption(#[from] DecryptionError),
    /// Attaching an object owned by another document.
    #[error("object {id:?} is owned by another document; deep-clone it before attaching")]
    Ownership { id: ObjectId },
    /// The document was opened with `OpenMode::ReadOnly`.
    #[error("the document was opened read-only")]
    ReadOnly,
    /// An incremental save can't be done in the current state.
    #[error("incremental save is not possible: {0}")]
    IncrementalSave(&'static str),
    /// An Object has the wrong type, e.g. the Object is an Array where a Name would be expected.
    #[error("object has wrong type; expected type {expected} but found type {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },
    /// Dictionary key was not found.
    #[error("missing required dictionary key \"{0}\"")]
    DictKey(String),
    /// Page number was not found in document.
    #[error("page number {0} not found")]
    PageNumberNotFound(u32),
    /// The signature placeholder was not written during the signing pass.
    #[error("signature placeholder of object {0:?} was not written")]
    SignaturePlaceholder(ObjectId),
    /// The detached signature does not fit into the reserved `/Contents`.
    #[error("signature needs {needed} bytes but only {capacity} were reserved")]
    SignatureTooLarge { needed: usize, capacity: usize },
    /// The string is not a valid PDF date.
    #[error("invalid date string")]
    InvalidDate,
    /// Decoding byte vector to UTF8 String failed.
    #[error("invalid UTF-8")]
    UTF8,
    /// Integer conversion failed.
    #[error("numeric conversion failed: {0}")]
    NumericCast(String),
    /// A feature this crate does not implement.
    #[error("unsupported: {0}")]
    Unimplemented(&'static str),
    /// IO error
    #[error("I/O error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefError {
    /// Could not parse cross reference table.
    Parse,
    /// Could not find start of cross reference table.
    Start,
    /// The trailer's "Prev" field was invalid.
    PrevStart,
    /// The trailer's "XRefStm" field was invalid.
    StreamStart,
    /// An in-use entry does not point at its object header.
    Offset { number: u32, offset: u32 },
}

impl fmt::Display for XrefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            XrefError::Parse => write!(f, "could not parse xref"),
            XrefError::Start => write!(f, "invalid start value"),
            XrefError::PrevStart => write!(f, "invalid start value in Prev field"),
            XrefError::StreamStart => write!(f, "invalid stream start value"),
            XrefError::Offset { number, offset } => {
                write!(f, "entry of object {} points at byte {} which holds no matching header", number, offset)
            }
        }
    }
}

impl std::error::Error for XrefError {}

impl Error {
    pub(crate) fn syntax<M: Into<String>>(offset: usize, message: M) -> Self {
        Error::Syntax {
            offset,
            message: message.into(),
        }
    }

    /// Attach the name of the failing public operation.
    pub(crate) fn during(self, operation: Operation) -> Self {
        match self {
            Error::Operation { .. } => self,
            other => Error::Operation {
                operation,
                source: Box::new(other),
            },
        }
    }

    /// The error without any `Operation` wrapper.
    pub fn root(&self) -> &Error {
        match self {
            Error::Operation { source, .. } => source.root(),
            other => other,
        }
    }

    /// The operation (open/save/resolve/sign) the error surfaced from, if recorded.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Error::Operation { operation, .. } => Some(*operation),
            _ => None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self.root() {
            Error::Syntax { .. } | Error::IndirectObject { .. } | Error::ObjectIdMismatch { .. } | Error::Header => {
                ErrorKind::Syntax
            }
            Error::Xref(_)
            | Error::Trailer
            | Error::ObjectNotFound(_)
            | Error::PositionNotFound(_)
            | Error::ReferenceCycle(_)
            | Error::ReferenceLimit
            | Error::InvalidOffset(_) => ErrorKind::Structural,
            Error::Decryption(_) => ErrorKind::Security,
            Error::Ownership { .. } => ErrorKind::Ownership,
            Error::InvalidStream(_) | Error::Decompress(_) => ErrorKind::Resource,
            Error::IO(_) => ErrorKind::Io,
            _ => ErrorKind::Usage,
        }
    }
}

impl From<XrefError> for Error {
    fn from(err: XrefError) -> Self {
        Error::Xref(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_err: std::string::FromUtf8Error) -> Self {
        Error::UTF8
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_err: std::str::Utf8Error) -> Self {
        Error::UTF8
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(err: std::num::TryFromIntError) -> Self {
        Error::NumericCast(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_looks_through_operation_wrapper() {
        let err = Error::PositionNotFound((7, 0)).during(Operation::Resolve);
        assert_eq!(err.kind(), ErrorKind::Structural);
        assert_eq!(err.operation(), Some(Operation::Resolve));
        assert!(matches!(err.root(), Error::PositionNotFound((7, 0))));
        assert!(err.to_string().starts_with("resolve failed"));
    }

    #[test]
    fn wrapping_twice_keeps_first_operation() {
        let err = Error::ReadOnly.during(Operation::Save).during(Operation::Sign);
        assert_eq!(err.operation(), Some(Operation::Save));
        assert_eq!(err.kind(), ErrorKind::Usage);
    }
}
