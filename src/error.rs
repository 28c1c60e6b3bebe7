use std::error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::result;
use std::slice;

use swiftcsv_core::ParseError;

/// A type alias for `Result<T, swiftcsv::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when parsing CSV data.
///
/// Configuration and validation errors are always reported before any data
/// is read. Parse errors depend on the configured policy: in strict mode the
/// first malformed construct fails the whole operation, while in relaxed and
/// skip-lines-with-error modes errors are collected on the result instead.
#[derive(Debug)]
pub enum Error {
    /// The configuration given was invalid.
    Config(ConfigError),
    /// A file failed validation before it was opened for parsing.
    Validation(ValidationError),
    /// Malformed CSV data was found in strict mode.
    Parse(ParseErrors),
    /// A resource needed for parsing (for example, a worker pool) could not
    /// be created.
    Resource(String),
    /// An I/O error that occurred while reading CSV data.
    Io(io::Error),
    /// A UTF-8 decoding error that occurred while decoding fields in strict
    /// mode.
    Utf8 {
        /// The index of the row in which this error occurred.
        row: u64,
        /// The corresponding UTF-8 error.
        err: Utf8Error,
    },
    /// A row or column index was out of range.
    Index(IndexError),
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Error {
        Error::Config(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Error {
        Error::Validation(err)
    }
}

impl From<ParseErrors> for Error {
    fn from(err: ParseErrors) -> Error {
        Error::Parse(err)
    }
}

impl From<IndexError> for Error {
    fn from(err: IndexError) -> Error {
        Error::Index(err)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Config(ref err) => Some(err),
            Error::Validation(ref err) => Some(err),
            Error::Parse(ref err) => Some(err.first()),
            Error::Resource(_) => None,
            Error::Io(ref err) => Some(err),
            Error::Utf8 { ref err, .. } => Some(err),
            Error::Index(ref err) => Some(err),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Config(ref err) => write!(f, "CSV config error: {}", err),
            Error::Validation(ref err) => err.fmt(f),
            Error::Parse(ref err) => err.fmt(f),
            Error::Resource(ref msg) => {
                write!(f, "CSV resource error: {}", msg)
            }
            Error::Io(ref err) => err.fmt(f),
            Error::Utf8 { row, ref err } => {
                write!(
                    f,
                    "CSV parse error: row {} (field {}): {}",
                    row, err.field(), err)
            }
            Error::Index(ref err) => err.fmt(f),
        }
    }
}

/// An invalid configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// A single byte option was given an empty or multi-byte value.
    NotSingleByte {
        /// The name of the option.
        option: &'static str,
        /// The value given.
        value: String,
    },
    /// Two options that must differ were given the same byte.
    Conflict {
        /// The name of the first option.
        option: &'static str,
        /// The name of the option it conflicts with.
        other: &'static str,
        /// The byte both were set to.
        byte: u8,
    },
    /// A special byte was set to a line terminator.
    LineTerminator {
        /// The name of the option.
        option: &'static str,
    },
    /// The line range starts at line `0`. Lines are numbered from `1`.
    ZeroFromLine,
    /// The line range ends before it starts.
    InvertedLineRange {
        /// The first line of the range.
        from: u64,
        /// The last line of the range.
        to: u64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ConfigError::NotSingleByte { option, ref value } => {
                write!(
                    f,
                    "{} must be exactly one byte, but got {:?}",
                    option, value)
            }
            ConfigError::Conflict { option, other, byte } => {
                write!(
                    f,
                    "{} and {} must differ, but both are {:?}",
                    option, other, byte as char)
            }
            ConfigError::LineTerminator { option } => {
                write!(f, "{} cannot be a line terminator", option)
            }
            ConfigError::ZeroFromLine => {
                write!(f, "from_line must be at least 1")
            }
            ConfigError::InvertedLineRange { from, to } => {
                write!(
                    f,
                    "to_line ({}) must not be less than from_line ({})",
                    to, from)
            }
        }
    }
}

impl error::Error for ConfigError {}

/// A file that was refused before parsing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidationError {
    path: PathBuf,
    kind: ValidationErrorKind,
}

/// The reason a file was refused.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ValidationErrorKind {
    /// The path does not exist (or is a dangling symlink).
    NotFound,
    /// The path is a directory.
    Directory,
    /// The path is a block device.
    BlockDevice,
    /// The path is a character device.
    CharDevice,
    /// The path is a FIFO.
    Fifo,
    /// The path is a socket.
    Socket,
    /// The path is not a regular file for some other reason.
    NotRegular,
    /// The file is larger than the configured maximum.
    TooLarge {
        /// The actual size of the file.
        size: u64,
        /// The configured maximum.
        limit: u64,
    },
    /// The file changed between validation and opening.
    Changed,
}

impl ValidationError {
    /// Create a new validation error for the given path.
    pub fn new<P: AsRef<Path>>(
        path: P,
        kind: ValidationErrorKind,
    ) -> ValidationError {
        ValidationError { path: path.as_ref().to_path_buf(), kind: kind }
    }

    /// The path that was refused.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The reason the path was refused.
    pub fn kind(&self) -> &ValidationErrorKind {
        &self.kind
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ValidationErrorKind::NotFound => write!(f, "file not found"),
            ValidationErrorKind::Directory => write!(f, "is a directory"),
            ValidationErrorKind::BlockDevice => {
                write!(f, "is a block device")
            }
            ValidationErrorKind::CharDevice => {
                write!(f, "is a character device")
            }
            ValidationErrorKind::Fifo => write!(f, "is a FIFO"),
            ValidationErrorKind::Socket => write!(f, "is a socket"),
            ValidationErrorKind::NotRegular => {
                write!(f, "is not a regular file")
            }
            ValidationErrorKind::TooLarge { size, limit } => {
                write!(
                    f,
                    "file size {} exceeds the maximum of {} bytes",
                    size, limit)
            }
            ValidationErrorKind::Changed => {
                write!(f, "file changed while it was being opened")
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "CSV validation error: {}: {}",
            self.path.display(), self.kind)
    }
}

impl error::Error for ValidationError {}

/// The errors found by a failed strict parse.
///
/// This is never empty. Errors are ordered by line number, so the first
/// error is always the one that occurs earliest in the data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseErrors {
    errs: Vec<ParseError>,
}

impl ParseErrors {
    /// Create a set of parse errors, ordered by line.
    ///
    /// This returns `None` when `errs` is empty.
    pub fn new(mut errs: Vec<ParseError>) -> Option<ParseErrors> {
        if errs.is_empty() {
            return None;
        }
        errs.sort_by_key(|e| e.line());
        Some(ParseErrors { errs: errs })
    }

    /// The error with the lowest line number.
    pub fn first(&self) -> &ParseError {
        &self.errs[0]
    }

    /// Iterate over all errors in line order.
    pub fn iter(&self) -> slice::Iter<'_, ParseError> {
        self.errs.iter()
    }

    /// The number of errors.
    pub fn len(&self) -> usize {
        self.errs.len()
    }

    /// Always false. Provided for symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Return the underlying errors.
    pub fn into_vec(self) -> Vec<ParseError> {
        self.errs
    }
}

impl<'a> IntoIterator for &'a ParseErrors {
    type Item = &'a ParseError;
    type IntoIter = slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errs.iter()
    }
}

impl fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.first().fmt(f)?;
        if self.errs.len() > 1 {
            write!(f, " (and {} more)", self.errs.len() - 1)?;
        }
        Ok(())
    }
}

impl error::Error for ParseErrors {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.first())
    }
}

/// A UTF-8 validation error that occurred while decoding a field.
///
/// The error includes the index of the field that failed validation, and the
/// last byte at which valid UTF-8 was verified.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Utf8Error {
    /// The field index of a row in which UTF-8 validation failed.
    field: usize,
    /// The index into the given field up to which valid UTF-8 was verified.
    valid_up_to: usize,
}

impl Utf8Error {
    pub(crate) fn new(field: usize, valid_up_to: usize) -> Utf8Error {
        Utf8Error { field: field, valid_up_to: valid_up_to }
    }

    /// The field index of a row in which UTF-8 validation failed.
    pub fn field(&self) -> usize { self.field }
    /// The index into the given field up to which valid UTF-8 was verified.
    pub fn valid_up_to(&self) -> usize { self.valid_up_to }
}

impl fmt::Display for Utf8Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid utf-8: invalid UTF-8 in field {} near byte index {}",
            self.field,
            self.valid_up_to)
    }
}

impl error::Error for Utf8Error {}

/// An out of range index into a lazy result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum IndexError {
    /// A row index (possibly negative) that does not resolve into
    /// `[0, rows)`.
    Row {
        /// The index requested.
        index: isize,
        /// The number of rows.
        rows: usize,
    },
    /// A column index beyond the number of fields in a row.
    Column {
        /// The resolved row index.
        row: usize,
        /// The column requested.
        column: usize,
        /// The number of fields in the row.
        fields: usize,
    },
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IndexError::Row { index, rows } => {
                write!(
                    f,
                    "row index {} out of range for result with {} rows",
                    index, rows)
            }
            IndexError::Column { row, column, fields } => {
                write!(
                    f,
                    "column index {} out of range for row {} with {} fields",
                    column, row, fields)
            }
        }
    }
}

impl error::Error for IndexError {}
