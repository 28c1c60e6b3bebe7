use memchr::{memchr, memchr2, memchr3};

use crate::error::{ParseError, ParseErrorKind};

/// The default maximum number of bytes in a single row (100 MiB).
pub const DEFAULT_MAX_ROW_SIZE: usize = 100 * 1024 * 1024;

/// Receives the events produced by a `Tokenizer`.
///
/// A tokenizer only calls a sink once a row is complete. That is, for every
/// row delivered, the sink sees one call to `on_field` per field (in order)
/// followed by exactly one call to `on_row`. Rows suppressed by the
/// tokenizer's configuration (empty lines, line ranges, rows with errors)
/// never reach the sink at all.
///
/// Errors are reported through `on_error` only when the tokenizer is
/// configured to recover from them. In strict mode, the first error is
/// returned from `Tokenizer::read` instead.
pub trait Sink {
    /// Called with the unescaped contents of one field.
    fn on_field(&mut self, field: &[u8]);

    /// Called after the last field of a row.
    fn on_row(&mut self);

    /// Called for every error the tokenizer recovered from.
    fn on_error(&mut self, err: ParseError) {
        let _ = err;
    }
}

/// A sink that ignores every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl Sink for NullSink {
    fn on_field(&mut self, _: &[u8]) {}
    fn on_row(&mut self) {}
}

/// The result of feeding input to a `Tokenizer`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ReadResult {
    /// All of the input given was consumed without completing a row.
    InputEmpty,
    /// A row was completed. It may or may not have been delivered to the
    /// sink, depending on the tokenizer's configuration.
    Row,
    /// All CSV data has been read.
    ///
    /// This can only be returned when an empty input buffer is provided.
    End,
    /// Tokenizing stopped at a malformed construct. This is only returned
    /// in strict mode, and once returned, it is returned by every
    /// subsequent call.
    Abort(ParseError),
}

/// Builds a CSV tokenizer with various configuration knobs.
///
/// Once a `Tokenizer` is built, its configuration cannot be changed. A
/// builder may be cloned and shared freely; every tokenizer built from it
/// behaves identically.
///
/// Building never fails. Callers that accept configuration from untrusted
/// sources should validate it first (for example, a delimiter equal to the
/// quote produces a parse, but probably not a useful one).
#[derive(Clone, Debug, Default)]
pub struct TokenizerBuilder {
    tok: Tokenizer,
}

impl TokenizerBuilder {
    /// Create a new builder.
    pub fn new() -> TokenizerBuilder {
        TokenizerBuilder::default()
    }

    /// Build a tokenizer from this configuration.
    pub fn build(&self) -> Tokenizer {
        let mut tok = self.tok.clone();
        tok.reset();
        tok
    }

    /// The field delimiter to use when parsing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut TokenizerBuilder {
        self.tok.delimiter = delimiter;
        self
    }

    /// The quote character to use when parsing CSV.
    ///
    /// A quote only opens a quoted field at the very start of a field
    /// (after leading whitespace, when trimming). Elsewhere it is literal.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut TokenizerBuilder {
        self.tok.quote = quote;
        self
    }

    /// The escape character to use when parsing CSV.
    ///
    /// When set, the byte following an escape is always taken literally,
    /// both inside and outside of quoted fields. This is independent of
    /// doubled quote escapes, which are always recognized.
    ///
    /// By default, no escape character is recognized.
    pub fn escape(&mut self, escape: Option<u8>) -> &mut TokenizerBuilder {
        self.tok.escape = escape;
        self
    }

    /// The comment character to use when parsing CSV.
    ///
    /// A line that starts with the comment character is skipped entirely.
    /// The comment character is literal anywhere else.
    ///
    /// By default, comments are not recognized.
    pub fn comment(&mut self, comment: Option<u8>) -> &mut TokenizerBuilder {
        self.tok.comment = comment;
        self
    }

    /// Strip leading and trailing ASCII whitespace from unquoted fields.
    ///
    /// Quoted field contents are never modified, but whitespace surrounding
    /// the quotes is skipped.
    pub fn trim(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.trim = yes;
        self
    }

    /// Suppress rows that consist of a single empty, unquoted field.
    pub fn skip_empty_lines(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.skip_empty_lines = yes;
        self
    }

    /// Recover from malformed input instead of aborting.
    ///
    /// Recovered errors are reported to the sink's `on_error` method.
    pub fn relaxed(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.relaxed = yes;
        self
    }

    /// Drop any row in which an error occurred instead of aborting.
    ///
    /// Errors are still reported to the sink's `on_error` method.
    pub fn skip_lines_with_error(
        &mut self,
        yes: bool,
    ) -> &mut TokenizerBuilder {
        self.tok.skip_lines_with_error = yes;
        self
    }

    /// The maximum number of field bytes a single row may hold.
    ///
    /// A value of `0` disables the limit. The default is 100 MiB.
    pub fn max_row_size(&mut self, limit: usize) -> &mut TokenizerBuilder {
        self.tok.max_row_size = limit;
        self
    }

    /// Only deliver rows whose line number is in `from..=to`.
    ///
    /// Line numbers count rows, not `\n` bytes: a quoted field spanning
    /// several lines still belongs to a single line. Comment lines are not
    /// counted. Rows outside the range are still tokenized. When `to` is
    /// `None`, the range is unbounded above.
    pub fn line_range(
        &mut self,
        from: u64,
        to: Option<u64>,
    ) -> &mut TokenizerBuilder {
        self.tok.from_line = from;
        self.tok.to_line = to;
        self
    }

    /// The line number of the first row given to the tokenizer.
    ///
    /// This is `1` by default. Setting it is useful when tokenizing a slice
    /// that starts in the middle of some larger CSV data.
    pub fn first_line(&mut self, line: u64) -> &mut TokenizerBuilder {
        self.tok.first_line = line;
        self
    }

    /// Enable or disable copying field data.
    ///
    /// This is enabled by default. When disabled, the tokenizer only tracks
    /// structure: every field is reported as empty, and neither trimming,
    /// empty line suppression nor the row size limit apply. This is useful
    /// when all you care about is where rows begin and end.
    pub fn copy(&mut self, yes: bool) -> &mut TokenizerBuilder {
        self.tok.copy = yes;
        self
    }
}

/// A push based CSV tokenizer.
///
/// This tokenizer parses CSV data using a finite state machine. Callers feed
/// it input incrementally with `read`, and it reports completed rows to a
/// `Sink`. Input may be split at any byte; the tokenizer carries its state
/// (including any partially read field) across calls.
///
/// # Grammar
///
/// * Fields are separated by the delimiter, rows by `\n`. A `\r`
///   immediately before a row's terminating `\n` is dropped, so CRLF and LF
///   data parse identically. A lone `\r` is ordinary data.
/// * A field that starts with a quote is a quoted field. Inside it,
///   delimiters and line terminators are literal, and a doubled quote is a
///   literal quote.
/// * An escape byte, if configured, makes the following byte literal.
/// * The final row does not need a line terminator. A `\r` ending the
///   input is dropped just as it would be before a `\n`.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    delimiter: u8,
    quote: u8,
    escape: Option<u8>,
    comment: Option<u8>,
    trim: bool,
    skip_empty_lines: bool,
    relaxed: bool,
    skip_lines_with_error: bool,
    max_row_size: usize,
    from_line: u64,
    to_line: Option<u64>,
    first_line: u64,
    copy: bool,

    /// The current state of the machine.
    state: State,
    /// The number of rows completed, whether delivered or not.
    rows: u64,
    /// Field data for the current row, stored contiguously.
    buf: Vec<u8>,
    /// The ending position in `buf` of each completed field in this row.
    ends: Vec<usize>,
    /// Whether the field being read was quoted.
    field_quoted: bool,
    /// Whether the first field of this row was quoted.
    first_quoted: bool,
    /// Whether an error was recovered from in this row.
    row_error: bool,
    /// Whether this row hit the size limit.
    row_full: bool,
    /// The error that stopped a strict tokenizer, if any.
    failed: Option<ParseError>,
}

impl Default for Tokenizer {
    fn default() -> Tokenizer {
        Tokenizer {
            delimiter: b',',
            quote: b'"',
            escape: None,
            comment: None,
            trim: false,
            skip_empty_lines: false,
            relaxed: false,
            skip_lines_with_error: false,
            max_row_size: DEFAULT_MAX_ROW_SIZE,
            from_line: 1,
            to_line: None,
            first_line: 1,
            copy: true,
            state: State::StartRecord,
            rows: 0,
            buf: vec![],
            ends: vec![],
            field_quoted: false,
            first_quoted: false,
            row_error: false,
            row_full: false,
            failed: None,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    StartRecord,
    StartField,
    InField,
    EscapeInField,
    InQuotedField,
    EscapeInQuotedField,
    QuoteInQuotedField,
    EndQuotedField,
    QuotedCarriageReturn,
    Comment,
    End,
}

/// What the main loop should do after a single transition.
enum Step {
    /// Consume the current byte.
    Consume,
    /// Feed the current byte to the new state.
    Again,
    /// Consume the current byte, which completed a row.
    Row,
    /// Stop tokenizing.
    Abort(ParseError),
}

impl Tokenizer {
    /// Create a new tokenizer with a default configuration.
    pub fn new() -> Tokenizer {
        TokenizerBuilder::new().build()
    }

    /// Reset the tokenizer such that it behaves as if it had never been used.
    pub fn reset(&mut self) {
        self.state = State::StartRecord;
        self.rows = 0;
        self.failed = None;
        self.clear_row();
    }

    /// Return the line number of the row currently being read.
    ///
    /// Every completed row advances the line number by one, however many
    /// `\n` bytes its quoted fields contain. Line numbers start at the
    /// configured first line (`1` by default).
    pub fn line(&self) -> u64 {
        self.first_line.saturating_add(self.rows)
    }

    /// Return the number of rows completed so far.
    ///
    /// This counts every row the tokenizer finished, including rows that
    /// were not delivered to the sink.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Tokenize CSV data in `input`, reporting completed rows to `sink`.
    ///
    /// Calling this routine consumes input until exactly one row has been
    /// completed or until `input` is exhausted, and returns what happened
    /// along with the number of bytes consumed. See `ReadResult`.
    ///
    /// # Termination
    ///
    /// An empty `input` buffer indicates that there is no CSV data left to
    /// read. Callers should keep calling `read` with an empty buffer until
    /// `ReadResult::End` (or `ReadResult::Abort`) is returned, since the
    /// final row is only completed at that point.
    pub fn read<S: Sink>(
        &mut self,
        input: &[u8],
        sink: &mut S,
    ) -> (ReadResult, usize) {
        if let Some(ref err) = self.failed {
            return (ReadResult::Abort(err.clone()), 0);
        }
        if input.is_empty() {
            return (self.finish(sink), 0);
        }
        if self.state == State::End {
            return (ReadResult::End, 0);
        }
        let mut nin = 0;
        while nin < input.len() {
            let rest = &input[nin..];
            match self.state {
                State::InField => {
                    let n = match self.escape {
                        None => memchr2(self.delimiter, b'\n', rest),
                        Some(e) => memchr3(self.delimiter, b'\n', e, rest),
                    }
                    .unwrap_or(rest.len());
                    if n > 0 {
                        if let Err(err) = self.push(&rest[..n], sink) {
                            return (ReadResult::Abort(err), nin + n);
                        }
                        nin += n;
                        continue;
                    }
                }
                State::InQuotedField => {
                    let n = match self.escape {
                        Some(e) if e != self.quote => {
                            memchr2(self.quote, e, rest)
                        }
                        _ => memchr(self.quote, rest),
                    }
                    .unwrap_or(rest.len());
                    if n > 0 {
                        if let Err(err) = self.push(&rest[..n], sink) {
                            return (ReadResult::Abort(err), nin + n);
                        }
                        nin += n;
                        continue;
                    }
                }
                State::Comment => {
                    let n = memchr(b'\n', rest).unwrap_or(rest.len());
                    if n > 0 {
                        nin += n;
                        continue;
                    }
                }
                _ => {}
            }
            let c = input[nin];
            match self.step(c, sink) {
                Step::Consume => nin += 1,
                Step::Again => {}
                Step::Row => {
                    nin += 1;
                    return (self.end_row(sink), nin);
                }
                Step::Abort(err) => return (ReadResult::Abort(err), nin),
            }
        }
        (ReadResult::InputEmpty, nin)
    }

    fn step<S: Sink>(&mut self, c: u8, sink: &mut S) -> Step {
        use self::State::*;

        match self.state {
            StartRecord => {
                if self.comment == Some(c) {
                    self.state = Comment;
                    Step::Consume
                } else {
                    self.state = StartField;
                    Step::Again
                }
            }
            StartField => {
                if c == b'\n' {
                    self.end_field(false);
                    Step::Row
                } else if c == self.delimiter {
                    self.end_field(false);
                    Step::Consume
                } else if self.trim && c.is_ascii_whitespace() {
                    Step::Consume
                } else if c == self.quote {
                    self.field_quoted = true;
                    self.state = InQuotedField;
                    Step::Consume
                } else if self.escape == Some(c) {
                    self.state = EscapeInField;
                    Step::Consume
                } else {
                    self.state = InField;
                    Step::Again
                }
            }
            InField => {
                if c == b'\n' {
                    self.end_field(true);
                    Step::Row
                } else if c == self.delimiter {
                    self.end_field(false);
                    self.state = StartField;
                    Step::Consume
                } else if self.escape == Some(c) {
                    self.state = EscapeInField;
                    Step::Consume
                } else {
                    self.push_byte(c, sink)
                }
            }
            EscapeInField => {
                self.state = InField;
                self.push_byte(c, sink)
            }
            InQuotedField => {
                if c == self.quote {
                    self.state = QuoteInQuotedField;
                    Step::Consume
                } else if self.escape == Some(c) {
                    self.state = EscapeInQuotedField;
                    Step::Consume
                } else {
                    self.push_byte(c, sink)
                }
            }
            EscapeInQuotedField => {
                self.state = InQuotedField;
                self.push_byte(c, sink)
            }
            QuoteInQuotedField => {
                if c == self.quote {
                    self.state = InQuotedField;
                    self.push_byte(c, sink)
                } else {
                    self.state = EndQuotedField;
                    Step::Again
                }
            }
            EndQuotedField => {
                if c == b'\n' {
                    self.end_field(false);
                    Step::Row
                } else if c == self.delimiter {
                    self.end_field(false);
                    self.state = StartField;
                    Step::Consume
                } else if c == b'\r' {
                    self.state = QuotedCarriageReturn;
                    Step::Consume
                } else if self.trim && c.is_ascii_whitespace() {
                    Step::Consume
                } else {
                    let kind = ParseErrorKind::UnexpectedByteAfterQuote(c);
                    if let Err(err) = self.error(kind, sink) {
                        return Step::Abort(err);
                    }
                    self.state = InField;
                    Step::Again
                }
            }
            QuotedCarriageReturn => {
                if c == b'\n' {
                    self.end_field(false);
                    Step::Row
                } else {
                    let kind = ParseErrorKind::BareCarriageReturn;
                    if let Err(err) = self.error(kind, sink) {
                        return Step::Abort(err);
                    }
                    self.state = InField;
                    match self.push(b"\r", sink) {
                        Ok(()) => Step::Again,
                        Err(err) => Step::Abort(err),
                    }
                }
            }
            Comment => {
                if c == b'\n' {
                    self.state = StartRecord;
                }
                Step::Consume
            }
            End => Step::Consume,
        }
    }

    /// Handle the end of input.
    fn finish<S: Sink>(&mut self, sink: &mut S) -> ReadResult {
        use self::State::*;

        match self.state {
            End | StartRecord | Comment => {
                self.state = End;
                return ReadResult::End;
            }
            InQuotedField | EscapeInQuotedField => {
                let kind = ParseErrorKind::UnterminatedQuote;
                if let Err(err) = self.error(kind, sink) {
                    return ReadResult::Abort(err);
                }
            }
            EscapeInField => {
                if let Some(esc) = self.escape {
                    if let Err(err) = self.push(&[esc], sink) {
                        return ReadResult::Abort(err);
                    }
                }
            }
            StartField
            | InField
            | QuoteInQuotedField
            | EndQuotedField
            | QuotedCarriageReturn => {}
        }
        let strip_cr = self.state == InField;
        self.end_field(strip_cr);
        self.end_row(sink)
    }

    fn push_byte<S: Sink>(&mut self, c: u8, sink: &mut S) -> Step {
        match self.push(&[c], sink) {
            Ok(()) => Step::Consume,
            Err(err) => Step::Abort(err),
        }
    }

    /// Append field data to the current row, enforcing the size limit.
    fn push<S: Sink>(
        &mut self,
        bytes: &[u8],
        sink: &mut S,
    ) -> Result<(), ParseError> {
        if !self.copy || self.row_full {
            return Ok(());
        }
        let limit = self.max_row_size;
        if limit > 0 && self.buf.len() + bytes.len() > limit {
            let room = limit - self.buf.len();
            self.buf.extend_from_slice(&bytes[..room]);
            self.row_full = true;
            let kind = ParseErrorKind::RowTooLarge { limit: limit };
            return self.error(kind, sink);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Report an error according to the configured policy.
    ///
    /// In strict mode this returns the error, and the tokenizer refuses to
    /// do any more work.
    fn error<S: Sink>(
        &mut self,
        kind: ParseErrorKind,
        sink: &mut S,
    ) -> Result<(), ParseError> {
        let err = ParseError::new(self.line(), kind);
        if self.relaxed || self.skip_lines_with_error {
            self.row_error = true;
            sink.on_error(err);
            Ok(())
        } else {
            self.failed = Some(err.clone());
            Err(err)
        }
    }

    fn end_field(&mut self, strip_cr: bool) {
        let start = self.ends.last().map(|&i| i).unwrap_or(0);
        if !self.field_quoted {
            let mut end = self.buf.len();
            if strip_cr && end > start && self.buf[end - 1] == b'\r' {
                end -= 1;
            }
            if self.trim {
                while end > start && self.buf[end - 1].is_ascii_whitespace() {
                    end -= 1;
                }
            }
            self.buf.truncate(end);
        }
        if self.ends.is_empty() {
            self.first_quoted = self.field_quoted;
        }
        self.ends.push(self.buf.len());
        self.field_quoted = false;
    }

    fn end_row<S: Sink>(&mut self, sink: &mut S) -> ReadResult {
        let deliver = self.should_deliver();
        self.rows += 1;
        self.state = State::StartRecord;
        if deliver {
            let mut start = 0;
            for &end in &self.ends {
                sink.on_field(&self.buf[start..end]);
                start = end;
            }
            sink.on_row();
        }
        self.clear_row();
        ReadResult::Row
    }

    fn should_deliver(&self) -> bool {
        if self.row_error && self.skip_lines_with_error {
            return false;
        }
        let empty = self.ends.len() == 1
            && self.ends[0] == 0
            && !self.first_quoted;
        if self.copy && self.skip_empty_lines && empty {
            return false;
        }
        let line = self.line();
        line >= self.from_line && self.to_line.map_or(true, |to| line <= to)
    }

    fn clear_row(&mut self) {
        self.buf.clear();
        self.ends.clear();
        self.field_quoted = false;
        self.first_quoted = false;
        self.row_error = false;
        self.row_full = false;
    }
}
