use std::path::Path;

use swiftcsv_core::{ReadResult, Tokenizer};
use tracing::debug;

use crate::collect::{collect, strict_failure, Collector};
use crate::config::Config;
use crate::count::{CountResult, CountSink};
use crate::eager::{EagerResult, EagerSink};
use crate::error::Result;
use crate::lazy::{LazyResult, LazySink};
use crate::parallel::{collect_parallel, DEFAULT_MIN_CHUNK};
use crate::source::{Data, Source};

/// How to parse, and what shape of result to build.
///
/// Every parallel mode takes a worker count, where `0` selects the available
/// parallelism. A worker count of `1` parses sequentially.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Decode every field sequentially.
    Eager,
    /// Decode every field, in parallel.
    EagerParallel(usize),
    /// Record field positions without decoding, in parallel.
    LazyParallel(usize),
    /// Count rows and fields only, in parallel.
    CountParallel(usize),
}

/// The result of `parse`, in the shape selected by its `Mode`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Parsed {
    /// From `Mode::Eager` and `Mode::EagerParallel`.
    Eager(EagerResult),
    /// From `Mode::LazyParallel`.
    Lazy(LazyResult),
    /// From `Mode::CountParallel`.
    Count(CountResult),
}

impl Parsed {
    /// The number of rows, whatever the shape.
    pub fn len(&self) -> usize {
        match *self {
            Parsed::Eager(ref r) => r.len(),
            Parsed::Lazy(ref r) => r.len(),
            Parsed::Count(ref r) => r.rows as usize,
        }
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the eager result, if that is what this is.
    pub fn into_eager(self) -> Option<EagerResult> {
        match self {
            Parsed::Eager(r) => Some(r),
            _ => None,
        }
    }

    /// Return the lazy result, if that is what this is.
    pub fn into_lazy(self) -> Option<LazyResult> {
        match self {
            Parsed::Lazy(r) => Some(r),
            _ => None,
        }
    }

    /// Return the counts, if that is what this is.
    pub fn into_count(self) -> Option<CountResult> {
        match self {
            Parsed::Count(r) => Some(r),
            _ => None,
        }
    }
}

/// Parse all of `source`.
///
/// The configuration is validated first, then the file (if any) is validated
/// and mapped. Nothing is tokenized unless both succeed.
///
/// # Example
///
/// ```
/// use swiftcsv::{parse, Config, Mode, Source};
///
/// let data = b"a,b\n\"say \"\"hello\"\"\",c\n";
/// let parsed = parse(Source::Bytes(data), &Config::default(), Mode::Eager)
///     .unwrap()
///     .into_eager()
///     .unwrap();
/// assert_eq!(parsed.rows, vec![vec!["a", "b"], vec!["say \"hello\"", "c"]]);
/// ```
pub fn parse(source: Source, config: &Config, mode: Mode) -> Result<Parsed> {
    parse_chunked(source, config, mode, DEFAULT_MIN_CHUNK)
}

/// Like `parse`, but never gives a parallel worker less than `min_chunk`
/// bytes of input.
///
/// Inputs smaller than `min_chunk` are always parsed sequentially.
pub fn parse_chunked(
    source: Source,
    config: &Config,
    mode: Mode,
    min_chunk: usize,
) -> Result<Parsed> {
    config.validate()?;
    let data = Data::load(source, config)?;
    let builder = config.tokenizer();
    let lossy = config.relaxed;
    let parsed = match mode {
        Mode::Eager => {
            Parsed::Eager(collect(&builder, &data, EagerSink::new(lossy))?)
        }
        Mode::EagerParallel(threads) => {
            Parsed::Eager(collect_parallel(
                &builder,
                &data,
                threads,
                min_chunk,
                || EagerSink::new(lossy),
            )?)
        }
        Mode::LazyParallel(threads) => {
            Parsed::Lazy(collect_parallel(
                &builder,
                &data,
                threads,
                min_chunk,
                LazySink::default,
            )?)
        }
        Mode::CountParallel(threads) => {
            Parsed::Count(collect_parallel(
                &builder,
                &data,
                threads,
                min_chunk,
                CountSink::default,
            )?)
        }
    };
    debug!(mode = ?mode, rows = parsed.len(), "parsed CSV data");
    Ok(parsed)
}

/// Count the rows in the file at `path` using the default dialect.
///
/// Fields are never copied or decoded. Every row is counted, including
/// empty ones, so for well-formed data this equals the number of rows an
/// eager parse produces with the default configuration.
pub fn count_rows<P: AsRef<Path>>(path: P) -> Result<u64> {
    let config = Config::default();
    let data = Data::load(Source::Path(path.as_ref()), &config)?;
    let rows = swiftcsv_core::count_rows(&config.tokenizer(), &data);
    debug!(rows = rows, "counted CSV rows");
    Ok(rows)
}

/// Count the rows in the file at `path` that `config` would produce.
///
/// Unlike `count_rows`, this honors comments, empty line skipping, line
/// ranges and the error policy of `config`.
pub fn count_rows_with_config<P: AsRef<Path>>(
    path: P,
    config: &Config,
) -> Result<u64> {
    config.validate()?;
    let data = Data::load(Source::Path(path.as_ref()), config)?;
    let counts = collect(&config.tokenizer(), &data, CountSink::default())?;
    Ok(counts.rows)
}

/// An incremental parser that builds an eager result from pushed input.
///
/// Input may be split at any byte. Call `finish` once all input has been
/// fed to complete the final row.
///
/// ```
/// use swiftcsv::{Config, Parser};
///
/// let mut parser = Parser::new(&Config::default()).unwrap();
/// parser.feed(b"a,\"b").unwrap();
/// parser.feed(b"\nc\",d\ne").unwrap();
/// let result = parser.finish().unwrap();
/// assert_eq!(result.rows, vec![vec!["a", "b\nc", "d"], vec!["e"]]);
/// ```
#[derive(Debug)]
pub struct Parser {
    tok: Tokenizer,
    sink: EagerSink,
}

impl Parser {
    /// Create a parser for the given configuration.
    pub fn new(config: &Config) -> Result<Parser> {
        config.validate()?;
        Ok(Parser {
            tok: config.tokenizer().build(),
            sink: EagerSink::new(config.relaxed),
        })
    }

    /// Feed more input.
    ///
    /// In strict mode, this fails on the first malformed construct, and so
    /// will every later call.
    pub fn feed(&mut self, mut data: &[u8]) -> Result<()> {
        while !data.is_empty() {
            let (res, nin) = self.tok.read(data, &mut self.sink);
            data = &data[nin..];
            if let ReadResult::Abort(err) = res {
                return Err(strict_failure(vec![err]));
            }
        }
        Ok(())
    }

    /// The current line number.
    pub fn line(&self) -> u64 {
        self.tok.line()
    }

    /// Signal the end of input and return everything parsed.
    pub fn finish(mut self) -> Result<EagerResult> {
        loop {
            match self.tok.read(&[], &mut self.sink).0 {
                ReadResult::End => break,
                ReadResult::Abort(err) => {
                    return Err(strict_failure(vec![err]));
                }
                ReadResult::InputEmpty | ReadResult::Row => {}
            }
        }
        self.sink.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{parse, parse_chunked, Mode, Parser};
    use crate::config::Config;
    use crate::error::Error;
    use crate::source::Source;

    fn eager(data: &str, config: &Config) -> Vec<Vec<String>> {
        parse(Source::Bytes(data.as_bytes()), config, Mode::Eager)
            .unwrap()
            .into_eager()
            .unwrap()
            .rows
    }

    #[test]
    fn no_trailing_terminator() {
        assert_eq!(eager("a,b,c", &Config::default()), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn empty_input_all_modes() {
        let config = Config::default();
        for &mode in &[
            Mode::Eager,
            Mode::EagerParallel(4),
            Mode::LazyParallel(4),
            Mode::CountParallel(4),
        ] {
            let parsed = parse(Source::Bytes(b""), &config, mode).unwrap();
            assert!(parsed.is_empty(), "mode {:?}", mode);
        }
    }

    #[test]
    fn naive_join_round_trips() {
        let rows = vec![
            vec!["alpha", "beta", ""],
            vec!["1", " two ", "3.0"],
            vec!["x", "y", "z"],
        ];
        let data: String = rows
            .iter()
            .map(|r| format!("{}\n", r.join(",")))
            .collect();
        assert_eq!(eager(&data, &Config::default()), rows);
    }

    #[test]
    fn trim_semantics() {
        let on = Config { trim: true, ..Config::default() };
        assert_eq!(eager("  a  ,  b  ", &on), vec![vec!["a", "b"]]);
        assert_eq!(
            eager("  a  ,  b  ", &Config::default()),
            vec![vec!["  a  ", "  b  "]]
        );
    }

    #[test]
    fn config_checked_before_io() {
        let config = Config { quote: b',', ..Config::default() };
        let path = std::path::Path::new("/definitely/not/here.csv");
        match parse(Source::Path(path), &config, Mode::Eager) {
            Err(Error::Config(_)) => {}
            res => panic!("expected config error, got {:?}", res),
        }
    }

    #[test]
    fn strict_parse_error() {
        let res = parse(Source::Bytes(b"a\nb,\"c"), &Config::default(), Mode::Eager);
        match res {
            Err(Error::Parse(errs)) => {
                assert_eq!(errs.len(), 1);
                assert_eq!(errs.first().line(), 2);
            }
            res => panic!("expected parse error, got {:?}", res),
        }
    }

    #[test]
    fn skip_lines_with_error_keeps_errors() {
        let config = Config { skip_lines_with_error: true, ..Config::default() };
        let res = parse(Source::Bytes(b"a\n\"b\"c\nd"), &config, Mode::Eager)
            .unwrap()
            .into_eager()
            .unwrap();
        assert_eq!(res.rows, vec![vec!["a"], vec!["d"]]);
        assert_eq!(res.errors.len(), 1);
        assert_eq!(res.errors[0].line(), 2);
    }

    #[test]
    fn modes_agree() {
        let mut data = String::new();
        for i in 0..300 {
            data.push_str(&format!("{},\"q{}\nline\",x\r\n", i, i));
        }
        let config = Config::default();
        let src = Source::Bytes(data.as_bytes());
        let eager = parse(src, &config, Mode::Eager).unwrap().into_eager().unwrap();
        let par = parse_chunked(src, &config, Mode::EagerParallel(4), 32)
            .unwrap()
            .into_eager()
            .unwrap();
        let lazy = parse_chunked(src, &config, Mode::LazyParallel(4), 32)
            .unwrap()
            .into_lazy()
            .unwrap();
        let count = parse_chunked(src, &config, Mode::CountParallel(4), 32)
            .unwrap()
            .into_count()
            .unwrap();
        assert_eq!(eager, par);
        assert_eq!(eager.rows, lazy.to_rows());
        assert_eq!(count.rows, 300);
        assert_eq!(count.fields, 900);
        assert_eq!(count.columns, 3);
    }

    #[test]
    fn parser_feed_bytewise() {
        let data = b"a,\"b\"\"c\"\r\nd,e";
        let mut parser = Parser::new(&Config::default()).unwrap();
        for b in data.iter() {
            parser.feed(&[*b]).unwrap();
        }
        assert_eq!(parser.line(), 2);
        let res = parser.finish().unwrap();
        assert_eq!(res.rows, vec![vec!["a", "b\"c"], vec!["d", "e"]]);
    }

    #[test]
    fn parser_strict_error() {
        let mut parser = Parser::new(&Config::default()).unwrap();
        parser.feed(b"a,\"b").unwrap();
        match parser.finish() {
            Err(Error::Parse(errs)) => assert_eq!(errs.first().line(), 1),
            res => panic!("expected parse error, got {:?}", res),
        }
    }
}
