use std::error;
use std::fmt;

/// An error found while tokenizing malformed CSV data.
///
/// Every error carries the line number (starting at `1`) of the row in which
/// the tokenizer detected it. Rows are numbered in order, so a quoted field
/// spanning several physical lines does not advance the count. Whether an error aborts tokenizing or is merely
/// reported to a `Sink` depends on how the `Tokenizer` was configured.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParseError {
    line: u64,
    kind: ParseErrorKind,
}

/// The specific kind of a `ParseError`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseErrorKind {
    /// The data ended while inside a quoted field.
    UnterminatedQuote,
    /// A byte other than a delimiter, quote or line terminator followed the
    /// closing quote of a quoted field.
    UnexpectedByteAfterQuote(u8),
    /// A carriage return followed the closing quote of a quoted field, but
    /// was not itself followed by a line feed.
    BareCarriageReturn,
    /// The row grew beyond the configured maximum number of bytes.
    RowTooLarge {
        /// The configured maximum.
        limit: usize,
    },
}

impl ParseError {
    /// Create a new parse error at the given line.
    pub fn new(line: u64, kind: ParseErrorKind) -> ParseError {
        ParseError { line: line, kind: kind }
    }

    /// The line on which this error was detected.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// The kind of this error.
    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// A human readable description of this error without its location.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseErrorKind::UnterminatedQuote => {
                write!(f, "unterminated quoted field at end of input")
            }
            ParseErrorKind::UnexpectedByteAfterQuote(b) => {
                write!(
                    f,
                    "unexpected byte {:?} after closing quote",
                    b as char)
            }
            ParseErrorKind::BareCarriageReturn => {
                write!(f, "carriage return after closing quote \
                           is not followed by a line feed")
            }
            ParseErrorKind::RowTooLarge { limit } => {
                write!(f, "row exceeds the maximum size of {} bytes", limit)
            }
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CSV parse error: line {}: {}", self.line, self.kind)
    }
}

impl error::Error for ParseError {}
