//! Table HDUs: the fixed row area, the variable-length heap, schema
//! construction, row writes and table-to-table copies.

use std::collections::HashMap;

use crate::card::Card;
use crate::cell::{Cell, Record};
use crate::column::{self, Codec, Column};
use crate::error::{Error, Result};
use crate::hdu::HduKind;
use crate::header::Header;
use crate::rows::Rows;
use crate::tform::{text_format, ColumnType};

/// A table HDU, ASCII or binary.
///
/// The data area is row-major, `NAXIS2` rows of `NAXIS1` bytes; binary
/// tables may carry a heap holding variable-length array data addressed
/// by (length, offset) descriptors stored in the rows.
#[derive(Debug, Clone)]
pub struct TableHdu {
    pub(crate) hdr: Header,
    pub(crate) binary: bool,
    pub(crate) data: Vec<u8>,
    pub(crate) heap: Vec<u8>,
    pub(crate) rowsz: usize,
    pub(crate) nrows: usize,
    pub(crate) cols: Vec<Column>,
    pub(crate) colidx: HashMap<String, usize>,
}

impl TableHdu {
    /// Create an empty table with the given columns. Each column needs a
    /// name and a TFORM; the builder resolves types, assigns row offsets
    /// and materialises the column description cards.
    pub fn new(name: &str, cols: Vec<Column>, kind: HduKind) -> Result<TableHdu> {
        let binary = match kind {
            HduKind::BinaryTable => true,
            HduKind::AsciiTable => false,
            _ => {
                return Err(Error::InvalidArg(format!(
                    "{kind:?} is not a table kind"
                )));
            }
        };

        let mut table = TableHdu {
            hdr: Header::default_primary(), // replaced below
            binary,
            data: Vec::new(),
            heap: Vec::new(),
            rowsz: 0,
            nrows: 0,
            cols,
            colidx: HashMap::new(),
        };

        let mut cards = Vec::with_capacity(table.cols.len() * 4 + 2);
        cards.push(Card::new(
            "TFIELDS",
            table.cols.len(),
            "number of fields in each row",
        ));

        let mut offset = 0usize;
        for i in 0..table.cols.len() {
            let n = i + 1;
            let col = &mut table.cols[i];
            if col.format.is_empty() {
                return Err(Error::InvalidArg(format!(
                    "column {:?} has no format",
                    col.name
                )));
            }

            col.codec = if binary { Codec::Binary } else { Codec::Text };
            col.dtype = if binary {
                ColumnType::from_binary_form(&col.format)?
            } else {
                ColumnType::from_ascii_form(&col.format)?
            };
            if !binary {
                col.txtfmt = text_format(&col.format);
            }
            // TBCOL is authoritative for the column start when set.
            col.offset = if col.start > 0 {
                (col.start - 1) as usize
            } else {
                offset
            };
            offset = col.offset + col.dtype.row_bytes();

            cards.push(Card::new(
                &format!("TTYPE{n}"),
                col.name.as_str(),
                &format!("label for column {n}"),
            ));
            cards.push(Card::new(
                &format!("TFORM{n}"),
                col.format.as_str(),
                &format!("data format for column {n}"),
            ));
            if !col.unit.is_empty() {
                cards.push(Card::new(
                    &format!("TUNIT{n}"),
                    col.unit.as_str(),
                    &format!("unit for column {n}"),
                ));
            }
            if !col.null.is_empty() {
                cards.push(Card::new(
                    &format!("TNULL{n}"),
                    col.null.as_str(),
                    &format!("default value for column {n}"),
                ));
            }
            cards.push(Card::new(
                &format!("TSCAL{n}"),
                col.bscale,
                &format!("scaling offset for column {n}"),
            ));
            cards.push(Card::new(
                &format!("TZERO{n}"),
                col.bzero,
                &format!("zero value for column {n}"),
            ));
            cards.push(Card::new(&format!("TBCOL{n}"), col.offset + 1, ""));
            if !col.display.is_empty() {
                cards.push(Card::new(
                    &format!("TDISP{n}"),
                    col.display.as_str(),
                    &format!("display format for column {n}"),
                ));
            }
            if !col.dim.is_empty() {
                let dims = col
                    .dim
                    .iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join(",");
                cards.push(Card::new(&format!("TDIM{n}"), format!("({dims})"), ""));
            }

            table.colidx.insert(col.name.clone(), i);
        }

        cards.push(Card::new("EXTNAME", name, "name of this table extension"));

        table.hdr = Header::bare(cards, kind, 8, &[offset, 0])?;
        table.rowsz = offset;
        Ok(table)
    }

    /// Create an empty table whose columns mirror the fields of a record
    /// type: one column per field, named by the field's column binding,
    /// with the TFORM its type maps to.
    pub fn from_record<R: Record>(name: &str, kind: HduKind) -> Result<TableHdu> {
        let names = R::field_names();
        let forms = R::field_forms(kind)?;
        let cols = names
            .iter()
            .zip(&forms)
            .map(|(n, f)| Column::new(n, f))
            .collect();
        TableHdu::new(name, cols, kind)
    }

    /// The header of this HDU.
    pub fn header(&self) -> &Header {
        &self.hdr
    }

    /// Mutable access to the header.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.hdr
    }

    /// The HDU kind ([`HduKind::AsciiTable`] or [`HduKind::BinaryTable`]).
    pub fn kind(&self) -> HduKind {
        self.hdr.kind()
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn num_cols(&self) -> usize {
        self.cols.len()
    }

    /// All columns.
    pub fn cols(&self) -> &[Column] {
        &self.cols
    }

    /// The i-th column.
    pub fn col(&self, i: usize) -> &Column {
        &self.cols[i]
    }

    /// Index of the column named `name`.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.colidx.get(name).copied()
    }

    /// Iterate rows over `[beg, end)` with stride 1.
    pub fn read(&self, beg: i64, end: i64) -> Result<Rows<'_>> {
        self.read_range(beg, end, 1)
    }

    /// Iterate rows over `[beg, end)` with the given stride. The bounds
    /// clamp to the table: `beg` to zero, `end` to the row count.
    pub fn read_range(&self, beg: i64, end: i64, stride: i64) -> Result<Rows<'_>> {
        if stride < 1 {
            return Err(Error::InvalidArg(format!(
                "row stride must be positive, got {stride}"
            )));
        }
        let beg = beg.max(0);
        let end = end.min(self.nrows as i64);
        Ok(Rows::new(self, beg, end, stride))
    }

    pub(crate) fn read_cell_at(&self, icol: usize, irow: usize, cell: &mut Cell) -> Result<()> {
        column::read_cell(
            &self.cols[icol],
            &self.data,
            &self.heap,
            self.rowsz,
            irow,
            cell,
        )
    }

    fn write_cell_at(&mut self, icol: usize, irow: usize, cell: &Cell) -> Result<()> {
        let TableHdu {
            cols,
            data,
            heap,
            rowsz,
            ..
        } = self;
        column::write_cell(&cols[icol], data, heap, *rowsz, irow, cell)
    }

    /// Extend the data area by one blank row and return its index.
    fn grow_row(&mut self) -> usize {
        let pad = if self.binary { 0u8 } else { b' ' };
        self.data.extend(std::iter::repeat_n(pad, self.rowsz));
        self.nrows
    }

    fn commit_row(&mut self) {
        self.nrows += 1;
        let nrows = self.nrows;
        self.hdr.set_axis(1, nrows);
    }

    /// Append one row from positional cells, one per column.
    pub fn push_row(&mut self, cells: &[Cell]) -> Result<()> {
        if cells.len() != self.cols.len() {
            return Err(Error::InvalidArg(format!(
                "row has {} values, table has {} columns",
                cells.len(),
                self.cols.len()
            )));
        }
        let irow = self.grow_row();
        for (i, cell) in cells.iter().enumerate() {
            self.write_cell_at(i, irow, cell)?;
        }
        self.commit_row();
        Ok(())
    }

    /// Append one row from a name-keyed map. Keys naming existing columns
    /// are written; unknown keys are silently ignored; columns absent from
    /// the map keep their blank value. An empty map appends a blank row
    /// for every column.
    pub fn push_row_map(&mut self, values: &HashMap<String, Cell>) -> Result<()> {
        let irow = self.grow_row();
        if values.is_empty() {
            for i in 0..self.cols.len() {
                let cell = Cell::natural(&self.cols[i].dtype);
                self.write_cell_at(i, irow, &cell)?;
            }
        } else {
            for (key, cell) in values {
                if let Some(icol) = self.index(key) {
                    self.write_cell_at(icol, irow, cell)?;
                }
            }
        }
        self.commit_row();
        Ok(())
    }

    /// Append one row from a record; fields without a matching column are
    /// silently skipped.
    pub fn push_row_record<R: Record>(&mut self, record: &R) -> Result<()> {
        let irow = self.grow_row();
        for (field, name) in R::field_names().iter().enumerate() {
            if let Some(icol) = self.index(name) {
                let cell = record.load(field);
                self.write_cell_at(icol, irow, &cell)?;
            }
        }
        self.commit_row();
        Ok(())
    }

    /// Finalise the header before encoding: reconcile `NAXIS2` with the
    /// row count and, on first freeze, prepend the mandatory extension
    /// block (`XTENSION`, `BITPIX`, `NAXIS`, `NAXIS1`, `NAXIS2`, `PCOUNT`,
    /// `GCOUNT`) and ensure a `THEAP` card exists.
    pub(crate) fn freeze(&mut self) -> Result<()> {
        let nrows = self.nrows;
        self.hdr.set_axis(1, nrows);

        if self.hdr.get("XTENSION").is_none() {
            let ext = if self.binary { "BINTABLE" } else { "TABLE   " };
            self.hdr.prepend(vec![
                Card::new("XTENSION", ext, "table extension"),
                Card::new(
                    "BITPIX",
                    self.hdr.bitpix(),
                    "number of bits per data pixel",
                ),
                Card::new("NAXIS", self.hdr.axes().len(), "number of data axes"),
                Card::new("NAXIS1", self.hdr.axes()[0], "length of data axis 1"),
                Card::new("NAXIS2", self.hdr.axes()[1], "length of data axis 2"),
                Card::new("PCOUNT", self.heap.len(), "heap area size (bytes)"),
                Card::new("GCOUNT", 1, "one data group"),
            ])?;
        } else {
            self.hdr.set("NAXIS2", nrows, "length of data axis 2");
            self.hdr
                .set("PCOUNT", self.heap.len(), "heap area size (bytes)");
        }

        if self.hdr.get("THEAP").is_none() {
            self.hdr.append([Card::new("THEAP", 0, "gap size (bytes)")])?;
        }
        Ok(())
    }
}

/// Copy every row of `src` into `dst`.
pub fn copy_table(dst: &mut TableHdu, src: &TableHdu) -> Result<()> {
    copy_table_range(dst, src, 0, src.num_rows() as i64)
}

/// Copy the row interval `[beg, end)` of `src` into `dst`.
///
/// Tables without variable-length columns share row bytes directly; VLA
/// tables go through a row-wise decode and re-encode because heap
/// offsets cannot be preserved across tables.
pub fn copy_table_range(dst: &mut TableHdu, src: &TableHdu, beg: i64, end: i64) -> Result<()> {
    let has_vla = src.cols.iter().any(|c| c.dtype.vla.is_some());

    if has_vla {
        let mut rows = src.read(beg, end)?;
        let mut cells: Vec<Cell> = src
            .cols
            .iter()
            .map(|c| Cell::natural(&c.dtype))
            .collect();
        while rows.next() {
            rows.scan(&mut cells)?;
            dst.push_row(&cells)?;
        }
        return match rows.err() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        };
    }

    if dst.rowsz != src.rowsz {
        return Err(Error::InvalidArg(format!(
            "row size mismatch: source rows are {} bytes, destination rows {}",
            src.rowsz, dst.rowsz
        )));
    }

    let beg = beg.max(0) as usize;
    let end = (end.max(0) as usize).min(src.nrows);
    if end <= beg {
        return Ok(());
    }
    dst.data
        .extend_from_slice(&src.data[beg * src.rowsz..end * src.rowsz]);
    dst.nrows += end - beg;
    let nrows = dst.nrows;
    dst.hdr.set_axis(1, nrows);
    Ok(())
}
