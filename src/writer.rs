use std::fs::File;
use std::io;
use std::path::Path;

use swiftcsv_core::{self, WriteResult};
use tracing::debug;

use crate::error::{ConfigError, Result};

pub use swiftcsv_core::QuoteStyle;

const DEFAULT_CAPACITY: usize = 64 * (1 << 10);

/// Builds a CSV writer with various configuration knobs.
///
/// The dialect knobs mirror the ones on `Config`, so data written with a
/// given delimiter and quote reads back with the same settings.
#[derive(Debug)]
pub struct WriterBuilder {
    builder: swiftcsv_core::WriterBuilder,
    delimiter: u8,
    quote: u8,
    capacity: usize,
}

impl Default for WriterBuilder {
    fn default() -> WriterBuilder {
        WriterBuilder {
            builder: swiftcsv_core::WriterBuilder::new(),
            delimiter: b',',
            quote: b'"',
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl WriterBuilder {
    /// Create a new builder for configuring CSV writing.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer that writes to `wtr`.
    ///
    /// This fails if the delimiter and quote are equal, or if either is a
    /// line terminator.
    pub fn from_writer<W: io::Write>(&self, wtr: W) -> Result<Writer<W>> {
        for &(option, b) in
            &[("delimiter", self.delimiter), ("quote", self.quote)]
        {
            if b == b'\n' || b == b'\r' {
                return Err(ConfigError::LineTerminator { option }.into());
            }
        }
        if self.delimiter == self.quote {
            return Err(ConfigError::Conflict {
                option: "delimiter",
                other: "quote",
                byte: self.quote,
            }
            .into());
        }
        Ok(Writer {
            core: self.builder.build(),
            wtr: Some(wtr),
            buf: Buffer { buf: vec![0; self.capacity.max(4)], len: 0 },
            flushed: 0,
            rows: 0,
            fields: 0,
            panicked: false,
        })
    }

    /// Build a CSV writer that writes to the file at `path`.
    ///
    /// The file is created if it does not exist and truncated if it does.
    pub fn from_path<P: AsRef<Path>>(&self, path: P) -> Result<Writer<File>> {
        let file = File::create(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "created CSV output file");
        self.from_writer(file)
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.delimiter = delimiter;
        self.builder.delimiter(delimiter);
        self
    }

    /// The quote character to use when writing CSV.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.quote = quote;
        self.builder.quote(quote);
        self
    }

    /// The quoting style to use when writing CSV.
    ///
    /// By default, this is set to `QuoteStyle::Necessary`, which will only
    /// use quotes when they are necessary to preserve the integrity of data.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.builder.quote_style(style);
        self
    }

    /// Terminate rows with `\r\n` instead of `\n`.
    pub fn crlf(&mut self, yes: bool) -> &mut WriterBuilder {
        self.builder.crlf(yes);
        self
    }

    /// The number of bytes buffered before they are written to the
    /// underlying writer.
    pub fn buffer_capacity(&mut self, capacity: usize) -> &mut WriterBuilder {
        self.capacity = capacity;
        self
    }
}

/// A buffered CSV writer.
///
/// Fields are written one at a time with `field` (or one of the numeric
/// variants) and rows are ended with `row_end`. `write_row` does both.
/// Output is buffered; it is flushed when the buffer fills, when `flush` or
/// `into_inner` is called, and when the writer is dropped.
///
/// # Example
///
/// ```
/// use swiftcsv::Writer;
///
/// let mut wtr = Writer::from_writer(vec![]).unwrap();
/// wtr.write_row(&["city", "pop"]).unwrap();
/// wtr.field("Concord, MA").unwrap();
/// wtr.field_int(17668).unwrap();
/// wtr.row_end().unwrap();
///
/// let data = wtr.into_inner().unwrap();
/// assert_eq!(data, b"city,pop\n\"Concord, MA\",17668\n");
/// ```
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    core: swiftcsv_core::Writer,
    wtr: Option<W>,
    buf: Buffer,
    /// The number of bytes handed to the underlying writer.
    flushed: u64,
    rows: u64,
    /// The number of fields written in the current row.
    fields: u64,
    /// Set while writing to the underlying writer, so that a panic there
    /// doesn't cause a second write attempt on drop.
    panicked: bool,
}

#[derive(Debug)]
struct Buffer {
    buf: Vec<u8>,
    len: usize,
}

impl Buffer {
    fn readable(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    fn writable(&mut self) -> &mut [u8] {
        &mut self.buf[self.len..]
    }

    fn written(&mut self, n: usize) {
        self.len += n;
    }

    fn clear(&mut self) {
        self.len = 0;
    }
}

impl<W: io::Write> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.wtr.is_some() && !self.panicked {
            let _ = self.flush();
        }
    }
}

impl Writer<File> {
    /// Create a CSV writer with the default configuration that writes to
    /// the file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Writer<File>> {
        WriterBuilder::new().from_path(path)
    }
}

impl<W: io::Write> Writer<W> {
    /// Create a CSV writer with the default configuration that writes to
    /// `wtr`.
    pub fn from_writer(wtr: W) -> Result<Writer<W>> {
        WriterBuilder::new().from_writer(wtr)
    }

    /// Write a single field.
    ///
    /// The field is quoted if it needs to be.
    pub fn field<T: AsRef<[u8]>>(&mut self, field: T) -> Result<()> {
        let mut field = field.as_ref();
        if self.fields > 0 {
            loop {
                let (res, nout) = self.core.delimiter(self.buf.writable());
                self.buf.written(nout);
                match res {
                    WriteResult::InputEmpty => break,
                    WriteResult::OutputFull => self.flush_buf()?,
                }
            }
        }
        loop {
            let (res, nin, nout) = self.core.field(field, self.buf.writable());
            field = &field[nin..];
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => break,
                WriteResult::OutputFull => self.flush_buf()?,
            }
        }
        self.fields += 1;
        Ok(())
    }

    /// Write an integer field.
    pub fn field_int(&mut self, value: i64) -> Result<()> {
        let mut buf = itoa::Buffer::new();
        self.field(buf.format(value))
    }

    /// Write a floating point field.
    ///
    /// The shortest representation that reads back as the same value is
    /// used. Non-finite values are written as `NaN`, `inf` and `-inf`.
    pub fn field_float(&mut self, value: f64) -> Result<()> {
        let mut buf = ryu::Buffer::new();
        self.field(buf.format(value))
    }

    /// End the current row.
    ///
    /// A row with no fields (or a single empty one) is written as `""`, so
    /// that it reads back as a row.
    pub fn row_end(&mut self) -> Result<()> {
        loop {
            let (res, nout) = self.core.terminator(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => break,
                WriteResult::OutputFull => self.flush_buf()?,
            }
        }
        self.fields = 0;
        self.rows += 1;
        Ok(())
    }

    /// Write every field in `row`, then end the row.
    pub fn write_row<I, T>(&mut self, row: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        for field in row {
            self.field(field)?;
        }
        self.row_end()
    }

    /// Write all buffered data to the underlying writer and flush it.
    ///
    /// A quoted field left open by an unterminated row is closed first.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            let (res, nout) = self.core.finish(self.buf.writable());
            self.buf.written(nout);
            match res {
                WriteResult::InputEmpty => break,
                WriteResult::OutputFull => self.flush_buf()?,
            }
        }
        self.flush_buf()?;
        if let Some(ref mut wtr) = self.wtr {
            wtr.flush()?;
        }
        Ok(())
    }

    /// The total number of bytes written, including those still buffered.
    pub fn bytes_written(&self) -> u64 {
        self.flushed + self.buf.len as u64
    }

    /// The number of rows ended so far.
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Return a reference to the underlying writer.
    pub fn get_ref(&self) -> Option<&W> {
        self.wtr.as_ref()
    }

    /// Flush this writer and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        match self.wtr.take() {
            Some(wtr) => Ok(wtr),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "CSV writer has no underlying writer",
            )
            .into()),
        }
    }

    fn flush_buf(&mut self) -> Result<()> {
        if self.buf.len == 0 {
            return Ok(());
        }
        let wtr = match self.wtr {
            Some(ref mut wtr) => wtr,
            None => return Ok(()),
        };
        self.panicked = true;
        let res = wtr.write_all(self.buf.readable());
        self.panicked = false;
        res?;
        self.flushed += self.buf.len as u64;
        self.buf.clear();
        Ok(())
    }
}
