use swiftcsv_core::{ParseError, ReadResult, Sink, TokenizerBuilder};

use crate::error::{Error, ParseErrors, Result};

/// A sink that accumulates one of the result shapes.
///
/// Collectors for adjacent chunks of the same data can be concatenated with
/// `append`, which is how parallel workers' results are merged.
pub(crate) trait Collector: Sink + Send {
    /// The finished result.
    type Output;

    /// Append everything collected by `other`, which saw the data
    /// immediately following the data seen by `self`.
    fn append(&mut self, other: Self)
    where
        Self: Sized;

    /// Finish collecting.
    fn finish(self) -> Result<Self::Output>;
}

/// Tokenize all of `data`, reporting to `sink`.
///
/// This returns the error that stopped a strict tokenizer, if any.
pub(crate) fn run<S: Sink>(
    builder: &TokenizerBuilder,
    mut data: &[u8],
    sink: &mut S,
) -> ::std::result::Result<(), ParseError> {
    let mut tok = builder.build();
    loop {
        let (res, nin) = tok.read(data, sink);
        data = &data[nin..];
        match res {
            ReadResult::InputEmpty | ReadResult::Row => {}
            ReadResult::End => return Ok(()),
            ReadResult::Abort(err) => return Err(err),
        }
    }
}

/// Tokenize all of `data` sequentially into a collector.
pub(crate) fn collect<C: Collector>(
    builder: &TokenizerBuilder,
    data: &[u8],
    mut collector: C,
) -> Result<C::Output> {
    match run(builder, data, &mut collector) {
        Ok(()) => collector.finish(),
        Err(err) => Err(strict_failure(vec![err])),
    }
}

/// Convert the errors that stopped strict tokenizers into an `Error`.
pub(crate) fn strict_failure(errs: Vec<ParseError>) -> Error {
    match ParseErrors::new(errs) {
        Some(errs) => Error::Parse(errs),
        None => Error::Resource("parse failed without an error".to_string()),
    }
}
