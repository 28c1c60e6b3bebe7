use std::mem;
use std::str;

use bstr::ByteSlice;
use swiftcsv_core::{ParseError, Sink};

use crate::collect::Collector;
use crate::error::{Error, Result, Utf8Error};

/// Fully decoded rows, built while parsing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EagerResult {
    /// The rows, in input order.
    pub rows: Vec<Vec<String>>,
    /// Errors recovered from in relaxed or skip-lines-with-error mode.
    pub errors: Vec<ParseError>,
}

impl EagerResult {
    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Decodes each field as it arrives.
///
/// Invalid UTF-8 is replaced with U+FFFD when `lossy` is set. Otherwise the
/// first offending field is remembered and reported by `finish`.
#[derive(Debug)]
pub(crate) struct EagerSink {
    lossy: bool,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    errors: Vec<ParseError>,
    utf8: Option<(u64, Utf8Error)>,
}

impl EagerSink {
    pub(crate) fn new(lossy: bool) -> EagerSink {
        EagerSink {
            lossy: lossy,
            rows: vec![],
            row: vec![],
            errors: vec![],
            utf8: None,
        }
    }
}

impl Sink for EagerSink {
    fn on_field(&mut self, field: &[u8]) {
        let s = match str::from_utf8(field) {
            Ok(s) => s.to_string(),
            Err(err) => {
                if !self.lossy && self.utf8.is_none() {
                    let field = self.row.len();
                    let err = Utf8Error::new(field, err.valid_up_to());
                    self.utf8 = Some((self.rows.len() as u64, err));
                }
                field.to_str_lossy().into_owned()
            }
        };
        self.row.push(s);
    }

    fn on_row(&mut self) {
        let row = mem::replace(&mut self.row, vec![]);
        self.rows.push(row);
    }

    fn on_error(&mut self, err: ParseError) {
        self.errors.push(err);
    }
}

impl Collector for EagerSink {
    type Output = EagerResult;

    fn append(&mut self, other: EagerSink) {
        if self.utf8.is_none() {
            let offset = self.rows.len() as u64;
            self.utf8 = other.utf8.map(|(row, err)| (offset + row, err));
        }
        self.rows.extend(other.rows);
        self.errors.extend(other.errors);
    }

    fn finish(self) -> Result<EagerResult> {
        if let Some((row, err)) = self.utf8 {
            return Err(Error::Utf8 { row: row, err: err });
        }
        Ok(EagerResult { rows: self.rows, errors: self.errors })
    }
}

#[cfg(test)]
mod tests {
    use bstr::B;
    use swiftcsv_core::Sink;

    use super::EagerSink;
    use crate::collect::Collector;
    use crate::error::Error;

    fn feed(sink: &mut EagerSink, rows: &[&[&[u8]]]) {
        for row in rows {
            for field in row.iter() {
                sink.on_field(field);
            }
            sink.on_row();
        }
    }

    #[test]
    fn decodes_rows() {
        let mut sink = EagerSink::new(false);
        feed(&mut sink, &[&[B("a"), B("b")], &[B(b"\xce\xb1")]]);
        let res = sink.finish().unwrap();
        assert_eq!(res.rows, vec![vec!["a", "b"], vec!["α"]]);
    }

    #[test]
    fn strict_invalid_utf8() {
        let mut sink = EagerSink::new(false);
        feed(&mut sink, &[&[B("a")], &[B("b"), B(b"ab\xff")]]);
        match sink.finish() {
            Err(Error::Utf8 { row, err }) => {
                assert_eq!(row, 1);
                assert_eq!(err.field(), 1);
                assert_eq!(err.valid_up_to(), 2);
            }
            res => panic!("expected UTF-8 error, got {:?}", res),
        }
    }

    #[test]
    fn lossy_invalid_utf8() {
        let mut sink = EagerSink::new(true);
        feed(&mut sink, &[&[B(b"ab\xff")]]);
        let res = sink.finish().unwrap();
        assert_eq!(res.rows, vec![vec!["ab\u{FFFD}"]]);
    }

    #[test]
    fn append_offsets_utf8_row() {
        let mut first = EagerSink::new(false);
        feed(&mut first, &[&[B("a")], &[B("b")]]);
        let mut second = EagerSink::new(false);
        feed(&mut second, &[&[B("c")], &[B(b"\xff")]]);
        first.append(second);
        match first.finish() {
            Err(Error::Utf8 { row, .. }) => assert_eq!(row, 3),
            res => panic!("expected UTF-8 error, got {:?}", res),
        }
    }
}
