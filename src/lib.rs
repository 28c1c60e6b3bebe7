/*!
The `swiftcsv` crate provides a fast CSV parser with eager, lazy, counting
and streaming front ends.

# Overview

All parsing is driven by the push based tokenizer in `swiftcsv-core`. This
crate adds:

* A validated [`Config`](struct.Config.html) describing the dialect.
* A hardened file access layer ([`validate_path`](fn.validate_path.html))
  that resolves symlinks and refuses devices, FIFOs, sockets and oversized
  files before a single byte is parsed.
* Three result shapes: [`EagerResult`](struct.EagerResult.html) (decoded
  rows), [`LazyResult`](struct.LazyResult.html) (one byte arena plus index
  tables, decoded on access) and [`CountResult`](struct.CountResult.html).
* A chunk parallel mode that splits large inputs at row boundaries (never
  inside a quoted field), parses each chunk on its own worker and merges
  the results in input order.
* A pull based [`RowIter`](struct.RowIter.html) that only reads and
  tokenizes as much input as is needed for the next row.
* A buffered [`Writer`](struct.Writer.html) that quotes fields only when
  needed, so anything it writes parses back to the same rows.

# Example

```
use swiftcsv::{parse, Config, Mode, Source};

let data = "city,pop\nBoston,4628910\n\"Concord, MA\",17668\n";
let config = Config::default();
let parsed = parse(Source::Bytes(data.as_bytes()), &config, Mode::LazyParallel(0))
    .unwrap()
    .into_lazy()
    .unwrap();

assert_eq!(parsed.len(), 3);
assert_eq!(parsed.get_field(-1, 0).unwrap(), "Concord, MA");
assert_eq!(parsed.column(1), vec!["pop", "4628910", "17668"]);
```

# Error handling

Configuration errors and file validation errors are always reported before
any data is read. What happens on malformed data depends on the
configuration:

* By default (strict mode), the first error fails the operation with
  [`Error::Parse`](enum.Error.html#variant.Parse).
* With `relaxed`, the tokenizer recovers and keeps the affected row. Errors
  are collected on the result.
* With `skip_lines_with_error`, rows that had an error are dropped. Errors
  are collected on the result.

This crate logs through `tracing` and never installs a subscriber.
*/

#![deny(missing_docs)]

pub use swiftcsv_core::{ParseError, ParseErrorKind};

pub use crate::config::{Config, DEFAULT_MAX_FILE_SIZE};
pub use crate::count::CountResult;
pub use crate::eager::EagerResult;
pub use crate::error::{
    ConfigError, Error, IndexError, ParseErrors, Result, Utf8Error,
    ValidationError, ValidationErrorKind,
};
pub use crate::lazy::{LazyIter, LazyResult, RowView};
pub use crate::parallel::{DEFAULT_MIN_CHUNK, MAX_THREADS};
pub use crate::parse::{
    count_rows, count_rows_with_config, parse, parse_chunked, Mode, Parsed,
    Parser,
};
pub use crate::source::Source;
pub use crate::stream::{open_iterator, RowIter, SourceReader};
pub use crate::validate::{validate_path, ValidatedFile};
pub use crate::writer::{QuoteStyle, Writer, WriterBuilder};

mod collect;
mod config;
mod count;
mod eager;
mod error;
mod lazy;
mod parallel;
mod parse;
mod source;
mod stream;
mod validate;
mod writer;
