use std::fs::File;
use std::io::{self, BufRead};
use std::mem;
use std::str;

use bstr::ByteSlice;
use swiftcsv_core::{ParseError, ReadResult, Sink, Tokenizer};
use tracing::debug;

use crate::collect::strict_failure;
use crate::config::Config;
use crate::error::{Error, Result, Utf8Error};
use crate::source::{self, Source};

const BUF_SIZE: usize = 128 * (1 << 10);

/// An iterator over decoded rows, read on demand.
///
/// Only as much input is read and tokenized as is needed to produce the next
/// row, so a caller that stops early never pays for the rest of the data.
/// The underlying reader is released when the input is exhausted, when an
/// error is returned, when `close` is called or when the iterator is dropped,
/// whichever happens first.
///
/// In strict mode, the first error ends iteration: every later call to
/// `next` returns `None`.
pub struct RowIter<R> {
    rdr: Option<io::BufReader<R>>,
    tok: Tokenizer,
    sink: RowSink,
    yielded: u64,
}

impl<R: io::Read> RowIter<R> {
    /// Create an iterator over the CSV data in `rdr`.
    ///
    /// This fails if `config` is invalid.
    pub fn from_reader(rdr: R, config: &Config) -> Result<RowIter<R>> {
        config.validate()?;
        debug!("opened CSV row iterator");
        Ok(RowIter {
            rdr: Some(io::BufReader::with_capacity(BUF_SIZE, rdr)),
            tok: config.tokenizer().build(),
            sink: RowSink::new(config.relaxed),
            yielded: 0,
        })
    }

    /// The number of rows the tokenizer has completed so far.
    ///
    /// This includes rows that were suppressed (for example, by a line
    /// range), but never more than one row beyond those already returned.
    pub fn rows_tokenized(&self) -> u64 {
        self.tok.rows()
    }

    /// The current line number of the tokenizer.
    pub fn line(&self) -> u64 {
        self.tok.line()
    }

    /// Errors recovered from in relaxed or skip-lines-with-error mode.
    pub fn errors(&self) -> &[ParseError] {
        &self.sink.errors
    }

    /// Whether the underlying reader has been released.
    pub fn is_closed(&self) -> bool {
        self.rdr.is_none()
    }

    /// Release the underlying reader and stop iterating.
    ///
    /// Calling this more than once has no further effect.
    pub fn close(&mut self) {
        if self.rdr.take().is_some() {
            debug!(
                rows = self.yielded,
                tokenized = self.tok.rows(),
                "closed CSV row iterator"
            );
        }
    }

    fn fail(&mut self, err: Error) -> Option<Result<Vec<String>>> {
        self.close();
        Some(Err(err))
    }
}

impl<R: io::Read> Iterator for RowIter<R> {
    type Item = Result<Vec<String>>;

    fn next(&mut self) -> Option<Result<Vec<String>>> {
        loop {
            if let Some(row) = self.sink.ready.take() {
                if let Some(err) = self.sink.utf8.take() {
                    let row = self.yielded;
                    return self.fail(Error::Utf8 { row: row, err: err });
                }
                self.yielded += 1;
                return Some(Ok(row));
            }
            let rdr = match self.rdr.as_mut() {
                None => return None,
                Some(rdr) => rdr,
            };
            let (res, nin) = match rdr.fill_buf() {
                Ok(buf) => self.tok.read(buf, &mut self.sink),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue;
                }
                Err(err) => return self.fail(Error::Io(err)),
            };
            rdr.consume(nin);
            match res {
                ReadResult::InputEmpty | ReadResult::Row => {}
                ReadResult::End => self.close(),
                ReadResult::Abort(err) => {
                    return self.fail(strict_failure(vec![err]));
                }
            }
        }
    }
}

/// Collects exactly one row at a time.
#[derive(Debug)]
struct RowSink {
    lossy: bool,
    row: Vec<String>,
    ready: Option<Vec<String>>,
    utf8: Option<Utf8Error>,
    errors: Vec<ParseError>,
}

impl RowSink {
    fn new(lossy: bool) -> RowSink {
        RowSink {
            lossy: lossy,
            row: vec![],
            ready: None,
            utf8: None,
            errors: vec![],
        }
    }
}

impl Sink for RowSink {
    fn on_field(&mut self, field: &[u8]) {
        let s = match str::from_utf8(field) {
            Ok(s) => s.to_string(),
            Err(err) => {
                if !self.lossy && self.utf8.is_none() {
                    let field = self.row.len();
                    self.utf8 = Some(Utf8Error::new(field, err.valid_up_to()));
                }
                field.to_str_lossy().into_owned()
            }
        };
        self.row.push(s);
    }

    fn on_row(&mut self) {
        self.ready = Some(mem::replace(&mut self.row, vec![]));
    }

    fn on_error(&mut self, err: ParseError) {
        self.errors.push(err);
    }
}

/// The reader behind an iterator opened with `open_iterator`.
#[derive(Debug)]
pub enum SourceReader<'a> {
    /// A validated file.
    File(File),
    /// An in-memory buffer.
    Bytes(&'a [u8]),
}

impl<'a> io::Read for SourceReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match *self {
            SourceReader::File(ref mut f) => io::Read::read(f, buf),
            SourceReader::Bytes(ref mut b) => io::Read::read(b, buf),
        }
    }
}

/// Open a row iterator over `source`.
///
/// Configuration and file validation happen here, so a bad path or dialect
/// fails before any row is requested.
pub fn open_iterator<'a>(
    source: Source<'a>,
    config: &Config,
) -> Result<RowIter<SourceReader<'a>>> {
    config.validate()?;
    let rdr = match source {
        Source::Bytes(bytes) => SourceReader::Bytes(bytes),
        Source::Path(path) => {
            SourceReader::File(source::open(path, config)?.into_file())
        }
    };
    RowIter::from_reader(rdr, config)
}
