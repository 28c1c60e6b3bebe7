use crate::tokenizer::{NullSink, ReadResult, TokenizerBuilder};

/// A contiguous byte range of CSV data that starts and ends on a row
/// boundary.
///
/// Tokenizing each chunk independently (with the tokenizer's first line set
/// to `first_line`) and concatenating the results in order yields exactly
/// the rows produced by tokenizing the whole buffer at once.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Chunk {
    /// The offset of the first byte in this chunk.
    pub start: usize,
    /// The offset one past the last byte in this chunk.
    pub end: usize,
    /// The line number of the first row in this chunk, that is, one more
    /// than the number of rows before it.
    pub first_line: u64,
}

impl Chunk {
    /// The number of bytes in this chunk.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether this chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Return a tokenizer builder for this chunk, derived from `builder`.
    pub fn builder(&self, builder: &TokenizerBuilder) -> TokenizerBuilder {
        let mut builder = builder.clone();
        builder.first_line(self.first_line);
        builder
    }
}

/// Splits CSV data into chunks at row boundaries.
///
/// Boundaries are found by tokenizing the data for structure only, so a
/// delimiter or line terminator inside a quoted field is never mistaken for
/// a row boundary. The quote, escape and comment settings of the builder
/// given are honored; everything else is ignored.
#[derive(Clone, Debug)]
pub struct Splitter {
    builder: TokenizerBuilder,
    min_chunk: usize,
}

impl Splitter {
    /// Create a splitter that finds row boundaries the way tokenizers built
    /// by `builder` would.
    pub fn new(builder: &TokenizerBuilder) -> Splitter {
        let mut builder = builder.clone();
        builder
            .copy(false)
            .relaxed(true)
            .skip_lines_with_error(false)
            .skip_empty_lines(false)
            .line_range(1, None)
            .max_row_size(0);
        Splitter { builder: builder, min_chunk: 1 }
    }

    /// Never produce chunks smaller than this many bytes (except the last).
    ///
    /// When the data is too small to give every chunk at least this many
    /// bytes, fewer chunks are produced.
    pub fn min_chunk(&mut self, size: usize) -> &mut Splitter {
        self.min_chunk = size;
        self
    }

    /// Split `data` into at most `count` chunks of roughly equal size.
    ///
    /// The chunks returned are non-empty, contiguous, cover all of `data`
    /// and appear in order. Empty data yields no chunks.
    pub fn split(&self, data: &[u8], count: usize) -> Vec<Chunk> {
        let first_line = self.builder.build().line();
        if data.is_empty() {
            return vec![];
        }
        let count = count.max(1);
        let target = data.len() / count;
        if count == 1 || target == 0 || target < self.min_chunk {
            return vec![Chunk { start: 0, end: data.len(), first_line }];
        }

        let mut tok = self.builder.build();
        let mut chunks = Vec::with_capacity(count);
        let (mut start, mut start_line) = (0, first_line);
        let mut pos = 0;
        for i in 1..count {
            let candidate = i * target;
            if pos < candidate {
                pos = next_boundary(&mut tok, data, pos, candidate);
            }
            if pos >= data.len() {
                break;
            }
            if pos > start {
                chunks.push(Chunk {
                    start: start,
                    end: pos,
                    first_line: start_line,
                });
                start = pos;
                start_line = tok.line();
            }
        }
        chunks.push(Chunk {
            start: start,
            end: data.len(),
            first_line: start_line,
        });
        chunks
    }
}

/// Advance the tokenizer from `pos` until a row ends at or beyond
/// `candidate`, returning the offset just after that row.
fn next_boundary(
    tok: &mut crate::tokenizer::Tokenizer,
    data: &[u8],
    mut pos: usize,
    candidate: usize,
) -> usize {
    while pos < data.len() {
        let (res, nin) = tok.read(&data[pos..], &mut NullSink);
        pos += nin;
        match res {
            ReadResult::Row if pos >= candidate => return pos,
            ReadResult::Row => {}
            _ => return data.len(),
        }
    }
    data.len()
}

/// Split `data` into at most `count` chunks using the given configuration.
///
/// This is a convenience for `Splitter::new(builder).split(data, count)`.
pub fn split_rows(
    builder: &TokenizerBuilder,
    data: &[u8],
    count: usize,
) -> Vec<Chunk> {
    Splitter::new(builder).split(data, count)
}

/// Count the rows in `data` without materializing any field.
///
/// Every row is counted, including empty lines and rows outside any
/// configured line range. Comment lines are not rows.
pub fn count_rows(builder: &TokenizerBuilder, data: &[u8]) -> u64 {
    let mut builder = builder.clone();
    builder.copy(false).relaxed(true).skip_lines_with_error(false);
    let mut tok = builder.build();
    let mut pos = 0;
    loop {
        let (res, nin) = tok.read(&data[pos..], &mut NullSink);
        pos += nin;
        match res {
            ReadResult::InputEmpty | ReadResult::Row => {}
            ReadResult::End | ReadResult::Abort(_) => break,
        }
    }
    tok.rows()
}
