//! Forward-only row cursor over a table, with three sink shapes:
//! positional cells, a name-keyed map, and a user-defined record.

use std::any::TypeId;
use std::collections::HashMap;

use crate::cell::{Cell, Record};
use crate::error::{Error, Result};
use crate::table::TableHdu;

/// The result of a row query on a [`TableHdu`].
///
/// The cursor starts before the first requested row; every scan must be
/// preceded by a call to [`Rows::next`]:
///
/// ```no_run
/// # use fitsrw::{Cell, TableHdu};
/// # fn demo(table: &TableHdu) -> fitsrw::Result<()> {
/// let mut rows = table.read(0, table.num_rows() as i64)?;
/// let mut cells = vec![Cell::I32(0), Cell::F64(0.0)];
/// while rows.next() {
///     rows.scan(&mut cells)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct Rows<'t> {
    table: &'t TableHdu,
    /// Active column indices, in scan order.
    cols: Vec<usize>,
    /// Iteration counter, compared against `n`.
    i: i64,
    /// End bound of the iteration counter.
    n: i64,
    /// Row increment per step.
    stride: i64,
    /// Current row index; starts one stride before the first row.
    cur: i64,
    closed: bool,
    err: Option<Error>,
    /// Per record type, the (field, column) pairs it binds to; built on
    /// first use.
    record_cols: HashMap<TypeId, Vec<(usize, usize)>>,
}

impl<'t> Rows<'t> {
    pub(crate) fn new(table: &'t TableHdu, beg: i64, end: i64, stride: i64) -> Rows<'t> {
        Rows {
            table,
            cols: (0..table.num_cols()).collect(),
            i: beg,
            n: end,
            stride,
            cur: beg - stride,
            closed: false,
            err: None,
            record_cols: HashMap::new(),
        }
    }

    /// Advance to the next row. Returns `true` when a row is available;
    /// on exhaustion the cursor closes and the latched error clears.
    pub fn next(&mut self) -> bool {
        if self.closed {
            return false;
        }
        let more = self.i < self.n;
        self.cur += self.stride;
        self.i += self.stride;
        if !more {
            self.closed = true;
            self.err = None;
        }
        more
    }

    /// The error, if any, latched by the last scan. Natural exhaustion
    /// leaves no error.
    pub fn err(&self) -> Option<&Error> {
        self.err.as_ref()
    }

    /// Close the cursor, preventing further iteration. Idempotent, and
    /// does not affect [`Rows::err`].
    pub fn close(&mut self) {
        self.closed = true;
    }

    fn current_row(&self) -> Result<usize> {
        if self.cur < 0 || self.cur >= self.table.num_rows() as i64 {
            return Err(Error::InvalidArg(
                "scan called without a preceding successful next".into(),
            ));
        }
        Ok(self.cur as usize)
    }

    fn latch<T>(&mut self, res: Result<T>) -> Result<T> {
        self.err = res.as_ref().err().cloned();
        res
    }

    /// Decode the current row into positional cells, one per column. The
    /// variant of each supplied cell selects its sink type.
    pub fn scan(&mut self, dest: &mut [Cell]) -> Result<()> {
        let res = self.scan_inner(dest);
        self.latch(res)
    }

    fn scan_inner(&self, dest: &mut [Cell]) -> Result<()> {
        if dest.len() != self.cols.len() {
            return Err(Error::InvalidArg(format!(
                "scan got {} cells, table has {} columns",
                dest.len(),
                self.cols.len()
            )));
        }
        let irow = self.current_row()?;
        for (cell, &icol) in dest.iter_mut().zip(&self.cols) {
            self.table.read_cell_at(icol, irow, cell)?;
        }
        Ok(())
    }

    /// Decode the current row into a name-keyed map. An empty map is
    /// filled with every column keyed by name; otherwise only the keys
    /// naming existing columns are replaced, and unknown keys are left
    /// untouched.
    pub fn scan_map(&mut self, dest: &mut HashMap<String, Cell>) -> Result<()> {
        let res = self.scan_map_inner(dest);
        self.latch(res)
    }

    fn scan_map_inner(&self, dest: &mut HashMap<String, Cell>) -> Result<()> {
        let irow = self.current_row()?;
        let wanted: Vec<usize> = if dest.is_empty() {
            self.cols.clone()
        } else {
            dest.keys()
                .filter_map(|k| self.table.index(k))
                .collect()
        };
        for icol in wanted {
            let col = self.table.col(icol);
            let mut cell = Cell::natural(col.dtype());
            self.table.read_cell_at(icol, irow, &mut cell)?;
            dest.insert(col.name.clone(), cell);
        }
        Ok(())
    }

    /// Decode the current row into a record. Fields bind to columns by
    /// name; unmatched fields are silently skipped. The field-to-column
    /// mapping is cached per record type on first use.
    pub fn scan_record<R: Record>(&mut self, dest: &mut R) -> Result<()> {
        let res = self.scan_record_inner(dest);
        self.latch(res)
    }

    fn scan_record_inner<R: Record>(&mut self, dest: &mut R) -> Result<()> {
        let irow = self.current_row()?;
        let key = TypeId::of::<R>();
        if !self.record_cols.contains_key(&key) {
            let mapping = R::field_names()
                .iter()
                .enumerate()
                .filter_map(|(field, name)| Some((field, self.table.index(name)?)))
                .collect();
            self.record_cols.insert(key, mapping);
        }
        for &(field, icol) in &self.record_cols[&key] {
            let mut cell = dest.load(field);
            self.table.read_cell_at(icol, irow, &mut cell)?;
            dest.store(field, cell)?;
        }
        Ok(())
    }
}
