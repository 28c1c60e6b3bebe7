/*!
`swiftcsv-core` provides a push based CSV tokenizer and writer.

The tokenizer never allocates per field and never performs I/O. Callers feed
it bytes with [`Tokenizer::read`](struct.Tokenizer.html#method.read) and it
reports completed rows to a [`Sink`](trait.Sink.html). Input may be split at
arbitrary byte offsets, which makes it suitable both for streaming and for
tokenizing independent chunks of a larger buffer in parallel. The
[`Splitter`](struct.Splitter.html) finds chunk boundaries that are safe to
tokenize independently. The [`Writer`](struct.Writer.html) goes the other
way, quoting fields into caller provided output buffers.

Most users should use the `swiftcsv` crate instead, which builds eager, lazy,
counting and streaming parsers on top of this one.

# Example

```
use swiftcsv_core::{ReadResult, Sink, TokenizerBuilder};

struct Count(usize);

impl Sink for Count {
    fn on_field(&mut self, _: &[u8]) {}
    fn on_row(&mut self) { self.0 += 1; }
}

let mut data: &[u8] = b"a,b\n\"c\nd\",e\n";
let mut tok = TokenizerBuilder::new().build();
let mut count = Count(0);
loop {
    let (res, nin) = tok.read(data, &mut count);
    data = &data[nin..];
    match res {
        ReadResult::InputEmpty | ReadResult::Row => {}
        ReadResult::End => break,
        ReadResult::Abort(err) => panic!("{}", err),
    }
}
assert_eq!(count.0, 2);
```
*/

#![deny(missing_docs)]

pub use crate::error::{ParseError, ParseErrorKind};
pub use crate::split::{count_rows, split_rows, Chunk, Splitter};
pub use crate::tokenizer::{
    NullSink, ReadResult, Sink, Tokenizer, TokenizerBuilder,
    DEFAULT_MAX_ROW_SIZE,
};
pub use crate::writer::{QuoteStyle, WriteResult, Writer, WriterBuilder};

mod error;
mod split;
mod tokenizer;
mod writer;
