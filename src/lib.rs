#![forbid(unsafe_code)]

#[macro_use]
mod object;
pub use object::{Dictionary, Object, ObjectId, Stream, StringFormat};

mod datetime;
pub use datetime::DateTime;

mod document;
pub use document::{Document, DocumentId, MAX_REFERENCE_DEPTH, SecurityState};

mod error;
pub use error::{Error, ErrorKind, Operation, Result, XrefError};

pub mod content;
pub mod encodings;
pub mod encryption;
pub use encryption::{DecryptionError, EncryptionMethod, EncryptionOptions, Permissions};

mod filters {
    pub mod png;
}
mod graph;
pub use graph::ObjectHandle;

mod load_options;
pub use load_options::{Accuracy, LoadOptions, LoadOptionsBuilder, OpenMode, PasswordCallback};

mod object_stream;
mod pages;
pub use pages::INHERITABLE_ATTRIBUTES;

mod parser;
mod reader;

mod save_options;
pub use save_options::{SaveOptions, SaveOptionsBuilder};

mod signature;
pub use signature::Signer;

mod writer;
pub use writer::{CountingWrite, WritePositions, Writer};

pub mod xref;
pub use xref::{Xref, XrefEntry, XrefType};
