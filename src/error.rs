use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::result;
use std::str::Utf8Error;

use protobuf::Error as ProtobufError;

pub(crate) fn new_error(kind: ErrorKind) -> Error {
    Error(Box::new(kind))
}

pub(crate) fn new_protobuf_error(err: ProtobufError, location: &'static str) -> Error {
    Error(Box::new(ErrorKind::Protobuf { err, location }))
}

/// A type alias for `Result<T, osmpbf_stream::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur while decoding a PBF byte stream.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }
}

/// The specific type of an error.
///
/// The non-I/O, non-protobuf variants correspond one-to-one with the error
/// kinds of the decoder's error handling design: `format-error`,
/// `input-sequence-error`, `unsupported-compression`,
/// `changesets-not-implemented`, `parallel-array-mismatch` and
/// `config-error`.
#[non_exhaustive]
#[derive(Debug)]
pub enum ErrorKind {
    /// An error for I/O operations on the underlying byte source.
    Io(io::Error),
    /// An error that occurs when decoding a protobuf message.
    Protobuf {
        err: ProtobufError,
        location: &'static str,
    },
    /// `format-error`: buffer/length inconsistencies, or truncation at EOF
    /// while a frame was still in progress.
    Format(String),
    /// `input-sequence-error`: a `BlobHeader.type` outside
    /// `{OSMHeader, OSMData}`, or an `OSMData` blob before any `OSMHeader`.
    InputSequence(String),
    /// `unsupported-compression`: a `Blob` carries neither `raw` nor
    /// `zlib_data`.
    UnsupportedCompression,
    /// `changesets-not-implemented`: a `PrimitiveGroup` carries a non-empty
    /// `changesets` array.
    ChangesetsNotImplemented,
    /// `parallel-array-mismatch`: arrays declared parallel by the format
    /// (way `keys`/`vals`, relation `memids`/`types`/`roles_sid`, dense
    /// node/info arrays) differ in length.
    ParallelArrayMismatch(String),
    /// `config-error`: a malformed `withTags` configuration, detected at
    /// decoder construction time.
    Config(String),
    /// The stringtable contains an entry at `index` that could not be decoded to a valid UTF-8
    /// string.
    StringtableUtf8 { err: Utf8Error, index: usize },
    /// An element contains an out-of-bounds index to the stringtable.
    StringtableIndexOutOfBounds { index: usize },
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        new_error(ErrorKind::Io(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        io::Error::new(io::ErrorKind::Other, err)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &*self.0 {
            ErrorKind::Io(err) => Some(err),
            ErrorKind::Protobuf { err, .. } => Some(err),
            ErrorKind::StringtableUtf8 { err, .. } => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &*self.0 {
            ErrorKind::Io(err) => err.fmt(f),
            ErrorKind::Protobuf { err, location } => {
                write!(f, "protobuf error at '{location}': {err}")
            }
            ErrorKind::Format(msg) => write!(f, "format error: {msg}"),
            ErrorKind::InputSequence(msg) => write!(f, "input sequence error: {msg}"),
            ErrorKind::UnsupportedCompression => {
                write!(f, "blob is missing fields 'raw' and 'zlib_data'")
            }
            ErrorKind::ChangesetsNotImplemented => write!(
                f,
                "primitive group contains changesets, which this decoder does not implement"
            ),
            ErrorKind::ParallelArrayMismatch(msg) => {
                write!(f, "parallel array length mismatch: {msg}")
            }
            ErrorKind::Config(msg) => write!(f, "configuration error: {msg}"),
            ErrorKind::StringtableUtf8 { err, index } => {
                write!(f, "invalid UTF-8 at string table index {index}: {err}")
            }
            ErrorKind::StringtableIndexOutOfBounds { index } => {
                write!(f, "stringtable index out of bounds: {index}")
            }
        }
    }
}
