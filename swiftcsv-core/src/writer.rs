use memchr::{memchr, memchr3};

/// The quoting style to use when writing CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QuoteStyle {
    /// This puts quotes around every field. Always.
    Always,
    /// This puts quotes around fields only when necessary.
    ///
    /// They are necessary when fields contain a quote, delimiter or line
    /// terminator (`\n` or `\r`). A row made of a single empty field is also
    /// written as `""`, so that it reads back as a row rather than an empty
    /// line.
    ///
    /// This is the default.
    Necessary,
}

impl Default for QuoteStyle {
    fn default() -> QuoteStyle {
        QuoteStyle::Necessary
    }
}

/// The result of writing CSV data.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WriteResult {
    /// All of the input given was written.
    InputEmpty,
    /// The output buffer filled up before all of the input could be
    /// written. The caller should drain the output and call again with the
    /// input that remains.
    OutputFull,
}

/// A builder for configuring a CSV writer.
#[derive(Clone, Debug, Default)]
pub struct WriterBuilder {
    wtr: Writer,
}

impl WriterBuilder {
    /// Create a new builder for configuring a CSV writer.
    pub fn new() -> WriterBuilder {
        WriterBuilder::default()
    }

    /// Build a CSV writer from this configuration.
    pub fn build(&self) -> Writer {
        let mut wtr = self.wtr.clone();
        wtr.state = WriterState::default();
        wtr
    }

    /// The field delimiter to use when writing CSV.
    ///
    /// The default is `b','`.
    pub fn delimiter(&mut self, delimiter: u8) -> &mut WriterBuilder {
        self.wtr.delimiter = delimiter;
        self
    }

    /// The quote character to use when writing CSV.
    ///
    /// Quotes inside a field are escaped by doubling them.
    ///
    /// The default is `b'"'`.
    pub fn quote(&mut self, quote: u8) -> &mut WriterBuilder {
        self.wtr.quote = quote;
        self
    }

    /// The quoting style to use when writing CSV.
    pub fn quote_style(&mut self, style: QuoteStyle) -> &mut WriterBuilder {
        self.wtr.style = style;
        self
    }

    /// Terminate rows with `\r\n` instead of `\n`.
    pub fn crlf(&mut self, yes: bool) -> &mut WriterBuilder {
        self.wtr.crlf = yes;
        self
    }
}

/// A writer for CSV data.
///
/// Like the `Tokenizer`, this writer performs no I/O. It writes into caller
/// provided output buffers and tells the caller how much input it consumed
/// and how much output it produced, so it can resume after the output
/// fills up.
///
/// Each call to `field` must be given the entire contents of a field (or
/// whatever remains of it after an `OutputFull`), since whether a field is
/// quoted is decided when the field starts.
#[derive(Clone, Debug)]
pub struct Writer {
    delimiter: u8,
    quote: u8,
    style: QuoteStyle,
    crlf: bool,
    state: WriterState,
}

#[derive(Clone, Debug, Default)]
struct WriterState {
    /// Whether a field has been started and not yet ended.
    in_field: bool,
    /// Whether the current field is quoted and its closing quote is
    /// pending.
    quoting: bool,
    /// The number of bytes written for the current row.
    row_bytes: u64,
}

impl Default for Writer {
    fn default() -> Writer {
        Writer {
            delimiter: b',',
            quote: b'"',
            style: QuoteStyle::default(),
            crlf: false,
            state: WriterState::default(),
        }
    }
}

impl Writer {
    /// Create a new CSV writer with the default configuration.
    pub fn new() -> Writer {
        Writer::default()
    }

    /// Write a field (or the remainder of one) to `output`.
    ///
    /// Returns the result along with the number of input bytes consumed and
    /// the number of output bytes produced. The field stays open until the
    /// next call to `delimiter`, `terminator` or `finish`.
    pub fn field(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> (WriteResult, usize, usize) {
        let mut nout = 0;
        if !self.state.in_field {
            let quoting = self.should_quote(input);
            if quoting {
                if output.is_empty() {
                    return (WriteResult::OutputFull, 0, 0);
                }
                output[0] = self.quote;
                nout = 1;
            }
            self.state.quoting = quoting;
            self.state.in_field = true;
        }
        let (res, nin, o) = if self.state.quoting {
            quote(input, &mut output[nout..], self.quote)
        } else {
            let (res, n) = copy(input, &mut output[nout..]);
            (res, n, n)
        };
        nout += o;
        self.state.row_bytes += nout as u64;
        (res, nin, nout)
    }

    /// End the current field and write a field delimiter.
    pub fn delimiter(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        let mut nout = 0;
        if self.state.quoting {
            if output.is_empty() {
                return (WriteResult::OutputFull, 0);
            }
            output[0] = self.quote;
            nout = 1;
            self.state.quoting = false;
        }
        let res = if output.len() > nout {
            output[nout] = self.delimiter;
            nout += 1;
            self.state.in_field = false;
            WriteResult::InputEmpty
        } else {
            WriteResult::OutputFull
        };
        self.state.row_bytes += nout as u64;
        (res, nout)
    }

    /// End the current row and write a line terminator.
    pub fn terminator(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        let (res, mut nout) = self.finish(output);
        if res == WriteResult::OutputFull {
            return (res, nout);
        }
        if self.state.row_bytes == 0 {
            if output.len() - nout < 2 {
                return (WriteResult::OutputFull, nout);
            }
            output[nout] = self.quote;
            output[nout + 1] = self.quote;
            nout += 2;
            self.state.row_bytes += 2;
        }
        let term: &[u8] = if self.crlf { b"\r\n" } else { b"\n" };
        if output.len() - nout < term.len() {
            return (WriteResult::OutputFull, nout);
        }
        output[nout..nout + term.len()].copy_from_slice(term);
        self.state = WriterState::default();
        (WriteResult::InputEmpty, nout + term.len())
    }

    /// Close a quoted field that is still open.
    ///
    /// This should be called once all CSV data has been written, in case
    /// the last row was not terminated.
    pub fn finish(&mut self, output: &mut [u8]) -> (WriteResult, usize) {
        if !self.state.quoting {
            return (WriteResult::InputEmpty, 0);
        }
        if output.is_empty() {
            return (WriteResult::OutputFull, 0);
        }
        output[0] = self.quote;
        self.state.quoting = false;
        self.state.row_bytes += 1;
        (WriteResult::InputEmpty, 1)
    }

    /// Whether `field` would be quoted when written as a whole.
    pub fn should_quote(&self, field: &[u8]) -> bool {
        match self.style {
            QuoteStyle::Always => true,
            QuoteStyle::Necessary => {
                memchr3(self.delimiter, self.quote, b'\n', field).is_some()
                    || memchr(b'\r', field).is_some()
            }
        }
    }
}

/// Copy as much of `input` into `output` as fits.
fn copy(input: &[u8], output: &mut [u8]) -> (WriteResult, usize) {
    if input.len() > output.len() {
        let n = output.len();
        output.copy_from_slice(&input[..n]);
        (WriteResult::OutputFull, n)
    } else {
        output[..input.len()].copy_from_slice(input);
        (WriteResult::InputEmpty, input.len())
    }
}

/// Copy `input` into `output`, doubling every quote.
fn quote(
    mut input: &[u8],
    output: &mut [u8],
    quote: u8,
) -> (WriteResult, usize, usize) {
    let (mut nin, mut nout) = (0, 0);
    loop {
        match memchr(quote, input) {
            None => {
                let (res, n) = copy(input, &mut output[nout..]);
                return (res, nin + n, nout + n);
            }
            Some(i) => {
                let (res, n) = copy(&input[..i], &mut output[nout..]);
                nin += n;
                nout += n;
                if res == WriteResult::OutputFull || output.len() - nout < 2 {
                    return (WriteResult::OutputFull, nin, nout);
                }
                output[nout] = quote;
                output[nout + 1] = quote;
                nin += 1;
                nout += 2;
                input = &input[i + 1..];
            }
        }
    }
}
