use std::borrow::Cow;
use std::fmt;
use std::ops::Range;

use bstr::{BStr, ByteSlice};
use swiftcsv_core::{ParseError, Sink};

use crate::collect::Collector;
use crate::error::{IndexError, Result};

/// Rows stored as one byte arena plus index tables.
///
/// Field contents are stored back to back in a single buffer. Field `i`
/// occupies `arena[offsets[i]..offsets[i] + lengths[i]]`, and row `r`
/// consists of fields `row_starts[r]..row_starts[r + 1]`. Nothing is decoded
/// until a field is asked for.
///
/// A `LazyResult` is immutable once built, so it may be shared freely
/// between threads.
#[derive(Clone, Eq, PartialEq)]
pub struct LazyResult {
    arena: Vec<u8>,
    offsets: Vec<usize>,
    lengths: Vec<usize>,
    row_starts: Vec<usize>,
    errors: Vec<ParseError>,
}

impl Default for LazyResult {
    fn default() -> LazyResult {
        LazyResult {
            arena: vec![],
            offsets: vec![],
            lengths: vec![],
            row_starts: vec![0],
            errors: vec![],
        }
    }
}

impl fmt::Debug for LazyResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("LazyResult")
            .field("rows", &self.len())
            .field("fields", &self.field_count())
            .field("bytes", &self.arena.len())
            .field("errors", &self.errors)
            .finish()
    }
}

impl LazyResult {
    /// The number of rows.
    pub fn len(&self) -> usize {
        self.row_starts.len() - 1
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The total number of fields across all rows.
    pub fn field_count(&self) -> usize {
        self.offsets.len()
    }

    /// Errors recovered from in relaxed or skip-lines-with-error mode.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Return the row at `index`.
    ///
    /// Negative indices count from the end, so `-1` is the last row. An index
    /// that does not resolve into `[0, len)` is an error.
    pub fn row(&self, index: isize) -> Result<RowView<'_>> {
        let r = self.resolve(index)?;
        Ok(self.view(r))
    }

    /// Return the raw bytes of a single field.
    ///
    /// Both an out of range row and a column beyond the row's last field are
    /// errors.
    pub fn get_field_bytes(&self, row: isize, column: usize) -> Result<&[u8]> {
        let r = self.resolve(row)?;
        let view = self.view(r);
        match view.get(column) {
            Some(field) => Ok(field),
            None => Err(IndexError::Column {
                row: r,
                column: column,
                fields: view.len(),
            }
            .into()),
        }
    }

    /// Return a single field decoded as text.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn get_field(
        &self,
        row: isize,
        column: usize,
    ) -> Result<Cow<'_, str>> {
        self.get_field_bytes(row, column).map(|b| b.to_str_lossy())
    }

    /// Return one column across all rows, decoded as text.
    ///
    /// Rows with fewer fields contribute an empty string.
    pub fn column(&self, column: usize) -> Vec<Cow<'_, str>> {
        self.iter()
            .map(|row| row.get_str(column).unwrap_or(Cow::Borrowed("")))
            .collect()
    }

    /// Iterate over all rows in order.
    pub fn iter(&self) -> LazyIter<'_> {
        LazyIter { result: self, rows: 0..self.len() }
    }

    /// Decode every row.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        self.iter().map(|row| row.to_vec()).collect()
    }

    fn resolve(&self, index: isize) -> Result<usize> {
        let len = self.len();
        let resolved = if index < 0 {
            (len as isize).checked_add(index)
        } else {
            Some(index)
        };
        match resolved {
            Some(r) if r >= 0 && (r as usize) < len => Ok(r as usize),
            _ => Err(IndexError::Row { index: index, rows: len }.into()),
        }
    }

    fn view(&self, r: usize) -> RowView<'_> {
        RowView {
            result: self,
            fields: self.row_starts[r]..self.row_starts[r + 1],
        }
    }

    fn field(&self, i: usize) -> &[u8] {
        let start = self.offsets[i];
        &self.arena[start..start + self.lengths[i]]
    }
}

impl<'a> IntoIterator for &'a LazyResult {
    type IntoIter = LazyIter<'a>;
    type Item = RowView<'a>;

    fn into_iter(self) -> LazyIter<'a> {
        self.iter()
    }
}

/// An iterator over the rows of a `LazyResult`.
#[derive(Clone, Debug)]
pub struct LazyIter<'a> {
    result: &'a LazyResult,
    rows: Range<usize>,
}

impl<'a> Iterator for LazyIter<'a> {
    type Item = RowView<'a>;

    fn next(&mut self) -> Option<RowView<'a>> {
        self.rows.next().map(|r| self.result.view(r))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl<'a> DoubleEndedIterator for LazyIter<'a> {
    fn next_back(&mut self) -> Option<RowView<'a>> {
        self.rows.next_back().map(|r| self.result.view(r))
    }
}

impl<'a> ExactSizeIterator for LazyIter<'a> {}

/// A borrowed view of one row of a `LazyResult`.
#[derive(Clone)]
pub struct RowView<'a> {
    result: &'a LazyResult,
    fields: Range<usize>,
}

impl<'a> RowView<'a> {
    /// The number of fields in this row.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether this row has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.start == self.fields.end
    }

    /// Return the raw bytes of the field at index `i`.
    pub fn get(&self, i: usize) -> Option<&'a [u8]> {
        if i >= self.len() {
            return None;
        }
        Some(self.result.field(self.fields.start + i))
    }

    /// Return the field at index `i` decoded as text.
    ///
    /// Invalid UTF-8 is replaced with U+FFFD.
    pub fn get_str(&self, i: usize) -> Option<Cow<'a, str>> {
        self.get(i).map(|b| b.to_str_lossy())
    }

    /// Iterate over the raw bytes of each field.
    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + 'a {
        let result = self.result;
        self.fields.clone().map(move |i| result.field(i))
    }

    /// Decode every field.
    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(|b| b.to_str_lossy().into_owned()).collect()
    }
}

impl<'a> fmt::Debug for RowView<'a> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let fields: Vec<&BStr> = self.iter().map(|b| b.as_bstr()).collect();
        write!(f, "RowView({:?})", fields)
    }
}

/// Records field positions into a `LazyResult`.
#[derive(Debug, Default)]
pub(crate) struct LazySink {
    result: LazyResult,
}

impl Sink for LazySink {
    fn on_field(&mut self, field: &[u8]) {
        let r = &mut self.result;
        r.offsets.push(r.arena.len());
        r.lengths.push(field.len());
        r.arena.extend_from_slice(field);
    }

    fn on_row(&mut self) {
        let r = &mut self.result;
        r.row_starts.push(r.offsets.len());
    }

    fn on_error(&mut self, err: ParseError) {
        self.result.errors.push(err);
    }
}

impl Collector for LazySink {
    type Output = LazyResult;

    fn append(&mut self, other: LazySink) {
        let r = &mut self.result;
        let o = other.result;
        let (base, nfields) = (r.arena.len(), r.offsets.len());
        r.arena.extend_from_slice(&o.arena);
        r.offsets.extend(o.offsets.iter().map(|&off| base + off));
        r.lengths.extend_from_slice(&o.lengths);
        r.row_starts.extend(o.row_starts[1..].iter().map(|&s| nfields + s));
        r.errors.extend(o.errors);
    }

    fn finish(self) -> Result<LazyResult> {
        Ok(self.result)
    }
}
