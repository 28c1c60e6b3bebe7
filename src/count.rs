use swiftcsv_core::{ParseError, Sink};

use crate::collect::Collector;
use crate::error::Result;

/// Row and field counts, without any field contents.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CountResult {
    /// The number of rows.
    pub rows: u64,
    /// The total number of fields across all rows.
    pub fields: u64,
    /// The number of fields in the first row, or `0` if there are no rows.
    pub columns: usize,
    /// Errors recovered from in relaxed or skip-lines-with-error mode.
    pub errors: Vec<ParseError>,
}

#[derive(Debug, Default)]
pub(crate) struct CountSink {
    result: CountResult,
    row_fields: usize,
}

impl Sink for CountSink {
    fn on_field(&mut self, _: &[u8]) {
        self.row_fields += 1;
    }

    fn on_row(&mut self) {
        if self.result.rows == 0 {
            self.result.columns = self.row_fields;
        }
        self.result.rows += 1;
        self.result.fields += self.row_fields as u64;
        self.row_fields = 0;
    }

    fn on_error(&mut self, err: ParseError) {
        self.result.errors.push(err);
    }
}

impl Collector for CountSink {
    type Output = CountResult;

    fn append(&mut self, other: CountSink) {
        let (r, o) = (&mut self.result, other.result);
        if r.rows == 0 {
            r.columns = o.columns;
        }
        r.rows += o.rows;
        r.fields += o.fields;
        r.errors.extend(o.errors);
    }

    fn finish(self) -> Result<CountResult> {
        Ok(self.result)
    }
}

#[cfg(test)]
mod tests {
    use swiftcsv_core::Sink;

    use super::CountSink;
    use crate::collect::Collector;

    fn counted(rows: &[usize]) -> CountSink {
        let mut sink = CountSink::default();
        for &n in rows {
            for _ in 0..n {
                sink.on_field(b"x");
            }
            sink.on_row();
        }
        sink
    }

    #[test]
    fn counts() {
        let res = counted(&[3, 2, 4]).finish().unwrap();
        assert_eq!((res.rows, res.fields, res.columns), (3, 9, 3));
    }

    #[test]
    fn append_keeps_first_columns() {
        let mut empty = counted(&[]);
        empty.append(counted(&[2, 5]));
        empty.append(counted(&[7]));
        let res = empty.finish().unwrap();
        assert_eq!((res.rows, res.fields, res.columns), (3, 14, 2));
    }
}
