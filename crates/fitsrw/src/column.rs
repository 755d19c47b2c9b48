//! Table columns and the per-typecode cell codecs for the binary and
//! ASCII row layouts.

use crate::cell::Cell;
use crate::endian::*;
use crate::error::{Error, Result};
use crate::tform::{ColumnType, TextFormat, TypeCode, VlaWidth};

/// The codec a column dispatches through, selected at header-parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Codec {
    /// Binary table row layout (big-endian fixed cells, heap VLAs).
    Binary,
    /// ASCII table row layout (fixed-width text fields).
    Text,
}

/// One column of a FITS table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name (`TTYPEn`).
    pub name: String,
    /// Column format (`TFORMn`).
    pub format: String,
    /// Unit (`TUNITn`).
    pub unit: String,
    /// Null sentinel (`TNULLn`).
    pub null: String,
    /// Scale factor (`TSCALn`).
    pub bscale: f64,
    /// Zero offset (`TZEROn`).
    pub bzero: f64,
    /// Display format (`TDISPn`).
    pub display: String,
    /// Declared dimensions (`TDIMn`).
    pub dim: Vec<i64>,
    /// 1-based starting byte (`TBCOLn`, ASCII tables).
    pub start: i64,

    pub(crate) dtype: ColumnType,
    pub(crate) offset: usize,
    pub(crate) txtfmt: Option<TextFormat>,
    pub(crate) codec: Codec,
}

impl Default for Column {
    fn default() -> Self {
        Column {
            name: String::new(),
            format: String::new(),
            unit: String::new(),
            null: String::new(),
            bscale: 1.0,
            bzero: 0.0,
            display: String::new(),
            dim: Vec::new(),
            start: 0,
            dtype: ColumnType {
                code: TypeCode::U8,
                len: 0,
                dsize: 0,
                hsize: 0,
                vla: None,
            },
            offset: 0,
            txtfmt: None,
            codec: Codec::Binary,
        }
    }
}

impl Column {
    /// A column with the given name and TFORM; the remaining metadata
    /// stays at its defaults until the table schema is built.
    pub fn new(name: &str, format: &str) -> Column {
        Column {
            name: name.into(),
            format: format.into(),
            ..Column::default()
        }
    }

    /// The resolved type descriptor.
    pub fn dtype(&self) -> &ColumnType {
        &self.dtype
    }

    /// Byte offset of this column within a row.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

fn width_check(col: &Column, cell_width: usize, against: usize) -> Result<()> {
    if cell_width != against {
        return Err(Error::TypeMismatch(format!(
            "column {:?} ({}) holds {}-byte elements, sink expects {}",
            col.name, col.format, against, cell_width
        )));
    }
    Ok(())
}

fn row_slice(data: &[u8], beg: usize, len: usize) -> Result<&[u8]> {
    data.get(beg..beg + len)
        .ok_or(Error::Truncated("table data area"))
}

fn row_slice_mut(data: &mut [u8], beg: usize, len: usize) -> Result<&mut [u8]> {
    data.get_mut(beg..beg + len)
        .ok_or(Error::Truncated("table data area"))
}

/// Decode the cell at (`irow`, this column) into `cell`. The existing
/// variant of `cell` selects the sink type, as a typed pointer would.
pub(crate) fn read_cell(
    col: &Column,
    data: &[u8],
    heap: &[u8],
    rowsz: usize,
    irow: usize,
    cell: &mut Cell,
) -> Result<()> {
    match col.codec {
        Codec::Binary => read_bin(col, data, heap, rowsz, irow, cell),
        Codec::Text => read_txt(col, data, rowsz, irow, cell),
    }
}

/// Encode `cell` into (`irow`, this column), growing the heap for
/// variable-length data.
pub(crate) fn write_cell(
    col: &Column,
    data: &mut [u8],
    heap: &mut Vec<u8>,
    rowsz: usize,
    irow: usize,
    cell: &Cell,
) -> Result<()> {
    match col.codec {
        Codec::Binary => write_bin(col, data, heap, rowsz, irow, cell),
        Codec::Text => write_txt(col, data, rowsz, irow, cell),
    }
}

// ── Binary layout ──

fn read_bin(
    col: &Column,
    data: &[u8],
    heap: &[u8],
    rowsz: usize,
    irow: usize,
    cell: &mut Cell,
) -> Result<()> {
    let beg = rowsz * irow + col.offset;

    if let Some(width) = col.dtype.vla {
        return read_bin_vla(col, data, heap, beg, width, cell);
    }

    macro_rules! scalar {
        ($dest:expr, $read:path, $size:expr) => {{
            width_check(col, $size, col.dtype.dsize)?;
            *$dest = $read(row_slice(data, beg, $size)?);
        }};
    }
    macro_rules! vector {
        ($dest:expr, $read:path, $size:expr) => {{
            width_check(col, $size, col.dtype.dsize)?;
            let n = col.dtype.len;
            $dest.clear();
            $dest.resize(n, Default::default());
            $read(row_slice(data, beg, $size * n)?, &mut $dest[..]);
        }};
    }

    match cell {
        Cell::Bool(v) => scalar!(v, read_bool, 1),
        Cell::U8(v) => scalar!(v, read_u8, 1),
        Cell::I8(v) => scalar!(v, read_i8, 1),
        Cell::I16(v) => scalar!(v, read_i16_be, 2),
        Cell::U16(v) => scalar!(v, read_u16_be, 2),
        Cell::I32(v) => scalar!(v, read_i32_be, 4),
        Cell::U32(v) => scalar!(v, read_u32_be, 4),
        Cell::I64(v) => scalar!(v, read_i64_be, 8),
        Cell::U64(v) => scalar!(v, read_u64_be, 8),
        Cell::F32(v) => scalar!(v, read_f32_be, 4),
        Cell::F64(v) => scalar!(v, read_f64_be, 8),
        Cell::C64(re, im) => {
            width_check(col, 8, col.dtype.dsize)?;
            let buf = row_slice(data, beg, 8)?;
            (*re, *im) = read_c64_be(buf);
        }
        Cell::C128(re, im) => {
            width_check(col, 16, col.dtype.dsize)?;
            let buf = row_slice(data, beg, 16)?;
            (*re, *im) = read_c128_be(buf);
        }
        Cell::Str(s) => {
            let raw = row_slice(data, beg, col.dtype.row_bytes())?;
            // Cells written by this codec lead with a NUL byte and pad
            // with NULs; anything else is taken verbatim.
            *s = if raw.first() == Some(&0) {
                let content = &raw[1..];
                let end = content
                    .iter()
                    .rposition(|&b| b != 0)
                    .map(|i| i + 1)
                    .unwrap_or(0);
                String::from_utf8_lossy(&content[..end]).into_owned()
            } else {
                String::from_utf8_lossy(raw).into_owned()
            };
        }
        Cell::BoolVec(v) => vector!(v, read_bools, 1),
        Cell::U8Vec(v) => vector!(v, read_u8s, 1),
        Cell::I8Vec(v) => vector!(v, read_i8s, 1),
        Cell::I16Vec(v) => vector!(v, read_i16s_be, 2),
        Cell::U16Vec(v) => vector!(v, read_u16s_be, 2),
        Cell::I32Vec(v) => vector!(v, read_i32s_be, 4),
        Cell::U32Vec(v) => vector!(v, read_u32s_be, 4),
        Cell::I64Vec(v) => vector!(v, read_i64s_be, 8),
        Cell::U64Vec(v) => vector!(v, read_u64s_be, 8),
        Cell::F32Vec(v) => vector!(v, read_f32s_be, 4),
        Cell::F64Vec(v) => vector!(v, read_f64s_be, 8),
        Cell::C64Vec(v) => vector!(v, read_c64s_be, 8),
        Cell::C128Vec(v) => vector!(v, read_c128s_be, 16),
    }
    Ok(())
}

/// Read a VLA descriptor (length, heap offset) and decode the heap data
/// into the caller's sequence, replacing its contents.
fn read_bin_vla(
    col: &Column,
    data: &[u8],
    heap: &[u8],
    beg: usize,
    width: VlaWidth,
    cell: &mut Cell,
) -> Result<()> {
    if !cell.is_sequence() {
        return Err(Error::TypeMismatch(format!(
            "column {:?} ({}) is variable-length, sink is a {}",
            col.name,
            col.format,
            cell.kind_name()
        )));
    }
    let elem = cell.elem_width().expect("sequence cells have a width");
    width_check(col, elem, col.dtype.hsize)?;

    let (n, off) = match width {
        VlaWidth::P => {
            let buf = row_slice(data, beg, 8)?;
            (read_i32_be(buf) as usize, read_i32_be(&buf[4..]) as usize)
        }
        VlaWidth::Q => {
            let buf = row_slice(data, beg, 16)?;
            (read_i64_be(buf) as usize, read_i64_be(&buf[8..]) as usize)
        }
    };
    let bytes = heap
        .get(off..off + n * elem)
        .ok_or(Error::Truncated("table heap area"))?;

    macro_rules! vector {
        ($dest:expr, $read:path) => {{
            $dest.clear();
            $dest.resize(n, Default::default());
            $read(bytes, &mut $dest[..]);
        }};
    }
    match cell {
        Cell::BoolVec(v) => vector!(v, read_bools),
        Cell::U8Vec(v) => vector!(v, read_u8s),
        Cell::I8Vec(v) => vector!(v, read_i8s),
        Cell::I16Vec(v) => vector!(v, read_i16s_be),
        Cell::U16Vec(v) => vector!(v, read_u16s_be),
        Cell::I32Vec(v) => vector!(v, read_i32s_be),
        Cell::U32Vec(v) => vector!(v, read_u32s_be),
        Cell::I64Vec(v) => vector!(v, read_i64s_be),
        Cell::U64Vec(v) => vector!(v, read_u64s_be),
        Cell::F32Vec(v) => vector!(v, read_f32s_be),
        Cell::F64Vec(v) => vector!(v, read_f64s_be),
        Cell::C64Vec(v) => vector!(v, read_c64s_be),
        Cell::C128Vec(v) => vector!(v, read_c128s_be),
        _ => unreachable!("checked above"),
    }
    Ok(())
}

fn write_bin(
    col: &Column,
    data: &mut [u8],
    heap: &mut Vec<u8>,
    rowsz: usize,
    irow: usize,
    cell: &Cell,
) -> Result<()> {
    let beg = rowsz * irow + col.offset;

    if let Some(width) = col.dtype.vla {
        return write_bin_vla(col, data, heap, beg, width, cell);
    }

    macro_rules! scalar {
        ($val:expr, $write:path, $size:expr) => {{
            width_check(col, $size, col.dtype.dsize)?;
            $write(row_slice_mut(data, beg, $size)?, *$val);
        }};
    }
    macro_rules! vector {
        ($val:expr, $write:path, $size:expr) => {{
            width_check(col, $size, col.dtype.dsize)?;
            if $val.len() != col.dtype.len {
                return Err(Error::TypeMismatch(format!(
                    "column {:?} ({}) holds {} elements, sink has {}",
                    col.name,
                    col.format,
                    col.dtype.len,
                    $val.len()
                )));
            }
            $write(row_slice_mut(data, beg, $size * col.dtype.len)?, $val);
        }};
    }

    match cell {
        Cell::Bool(v) => scalar!(v, write_bool, 1),
        Cell::U8(v) => scalar!(v, write_u8, 1),
        Cell::I8(v) => scalar!(v, write_i8, 1),
        Cell::I16(v) => scalar!(v, write_i16_be, 2),
        Cell::U16(v) => scalar!(v, write_u16_be, 2),
        Cell::I32(v) => scalar!(v, write_i32_be, 4),
        Cell::U32(v) => scalar!(v, write_u32_be, 4),
        Cell::I64(v) => scalar!(v, write_i64_be, 8),
        Cell::U64(v) => scalar!(v, write_u64_be, 8),
        Cell::F32(v) => scalar!(v, write_f32_be, 4),
        Cell::F64(v) => scalar!(v, write_f64_be, 8),
        Cell::C64(re, im) => {
            width_check(col, 8, col.dtype.dsize)?;
            write_c64_be(row_slice_mut(data, beg, 8)?, (*re, *im));
        }
        Cell::C128(re, im) => {
            width_check(col, 16, col.dtype.dsize)?;
            write_c128_be(row_slice_mut(data, beg, 16)?, (*re, *im));
        }
        Cell::Str(s) => {
            // A leading NUL byte, then the content, NUL-padded to the
            // declared width; over-long values truncate at the width.
            let width = col.dtype.row_bytes();
            let buf = row_slice_mut(data, beg, width)?;
            buf.fill(0);
            if width > 0 {
                let n = s.len().min(width - 1);
                buf[1..1 + n].copy_from_slice(&s.as_bytes()[..n]);
            }
        }
        Cell::BoolVec(v) => vector!(v, write_bools, 1),
        Cell::U8Vec(v) => vector!(v, write_u8s, 1),
        Cell::I8Vec(v) => vector!(v, write_i8s, 1),
        Cell::I16Vec(v) => vector!(v, write_i16s_be, 2),
        Cell::U16Vec(v) => vector!(v, write_u16s_be, 2),
        Cell::I32Vec(v) => vector!(v, write_i32s_be, 4),
        Cell::U32Vec(v) => vector!(v, write_u32s_be, 4),
        Cell::I64Vec(v) => vector!(v, write_i64s_be, 8),
        Cell::U64Vec(v) => vector!(v, write_u64s_be, 8),
        Cell::F32Vec(v) => vector!(v, write_f32s_be, 4),
        Cell::F64Vec(v) => vector!(v, write_f64s_be, 8),
        Cell::C64Vec(v) => vector!(v, write_c64s_be, 8),
        Cell::C128Vec(v) => vector!(v, write_c128s_be, 16),
    }
    Ok(())
}

/// Write a VLA cell: append the encoded elements to the heap and store the
/// (length, offset) descriptor in the row.
fn write_bin_vla(
    col: &Column,
    data: &mut [u8],
    heap: &mut Vec<u8>,
    beg: usize,
    width: VlaWidth,
    cell: &Cell,
) -> Result<()> {
    if !cell.is_sequence() {
        return Err(Error::TypeMismatch(format!(
            "column {:?} ({}) is variable-length, value is a {}",
            col.name,
            col.format,
            cell.kind_name()
        )));
    }
    let elem = cell.elem_width().expect("sequence cells have a width");
    width_check(col, elem, col.dtype.hsize)?;

    let n = match cell {
        Cell::BoolVec(v) => v.len(),
        Cell::U8Vec(v) => v.len(),
        Cell::I8Vec(v) => v.len(),
        Cell::I16Vec(v) => v.len(),
        Cell::U16Vec(v) => v.len(),
        Cell::I32Vec(v) => v.len(),
        Cell::U32Vec(v) => v.len(),
        Cell::I64Vec(v) => v.len(),
        Cell::U64Vec(v) => v.len(),
        Cell::F32Vec(v) => v.len(),
        Cell::F64Vec(v) => v.len(),
        Cell::C64Vec(v) => v.len(),
        Cell::C128Vec(v) => v.len(),
        _ => unreachable!("checked above"),
    };
    let off = heap.len();

    match width {
        VlaWidth::P => {
            let buf = row_slice_mut(data, beg, 8)?;
            write_i32_be(buf, n as i32);
            write_i32_be(&mut buf[4..], off as i32);
        }
        VlaWidth::Q => {
            let buf = row_slice_mut(data, beg, 16)?;
            write_i64_be(buf, n as i64);
            write_i64_be(&mut buf[8..], off as i64);
        }
    }

    heap.resize(off + n * elem, 0);
    let dest = &mut heap[off..];
    match cell {
        Cell::BoolVec(v) => write_bools(dest, v),
        Cell::U8Vec(v) => write_u8s(dest, v),
        Cell::I8Vec(v) => write_i8s(dest, v),
        Cell::I16Vec(v) => write_i16s_be(dest, v),
        Cell::U16Vec(v) => write_u16s_be(dest, v),
        Cell::I32Vec(v) => write_i32s_be(dest, v),
        Cell::U32Vec(v) => write_u32s_be(dest, v),
        Cell::I64Vec(v) => write_i64s_be(dest, v),
        Cell::U64Vec(v) => write_u64s_be(dest, v),
        Cell::F32Vec(v) => write_f32s_be(dest, v),
        Cell::F64Vec(v) => write_f64s_be(dest, v),
        Cell::C64Vec(v) => write_c64s_be(dest, v),
        Cell::C128Vec(v) => write_c128s_be(dest, v),
        _ => unreachable!("checked above"),
    }
    Ok(())
}

// ── ASCII layout ──

fn ascii_unsupported(cell: &Cell) -> Option<&'static str> {
    match cell {
        Cell::Bool(_) => Some("boolean"),
        Cell::C64(..) | Cell::C128(..) => Some("complex"),
        c if c.is_sequence() => Some("sequence"),
        _ => None,
    }
}

fn read_txt(col: &Column, data: &[u8], rowsz: usize, irow: usize, cell: &mut Cell) -> Result<()> {
    if let Some(kind) = ascii_unsupported(cell) {
        return Err(Error::UnsupportedAsciiType(kind));
    }

    let beg = rowsz * irow + col.offset;
    let raw = row_slice(data, beg, col.dtype.dsize)?;
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();

    macro_rules! int_cell {
        ($dest:expr, $ty:ty) => {{
            let v = text.parse::<i64>().map_err(|_| {
                Error::InvalidArg(format!("cannot parse ASCII cell {text:?} as an integer"))
            })?;
            *$dest = v as $ty;
        }};
    }
    macro_rules! uint_cell {
        ($dest:expr, $ty:ty) => {{
            let v = text.parse::<u64>().map_err(|_| {
                Error::InvalidArg(format!("cannot parse ASCII cell {text:?} as an integer"))
            })?;
            *$dest = v as $ty;
        }};
    }

    match cell {
        Cell::I8(v) => int_cell!(v, i8),
        Cell::I16(v) => int_cell!(v, i16),
        Cell::I32(v) => int_cell!(v, i32),
        Cell::I64(v) => int_cell!(v, i64),
        Cell::U8(v) => uint_cell!(v, u8),
        Cell::U16(v) => uint_cell!(v, u16),
        Cell::U32(v) => uint_cell!(v, u32),
        Cell::U64(v) => uint_cell!(v, u64),
        Cell::F32(v) => {
            *v = parse_ascii_float(text)? as f32;
        }
        Cell::F64(v) => {
            *v = parse_ascii_float(text)?;
        }
        Cell::Str(s) => *s = text.to_string(),
        _ => unreachable!("rejected above"),
    }
    Ok(())
}

fn parse_ascii_float(text: &str) -> Result<f64> {
    let normalized = text.replacen('D', "E", 1).replacen('d', "e", 1);
    normalized
        .parse::<f64>()
        .map_err(|_| Error::InvalidArg(format!("cannot parse ASCII cell {text:?} as a float")))
}

fn write_txt(col: &Column, data: &mut [u8], rowsz: usize, irow: usize, cell: &Cell) -> Result<()> {
    if let Some(kind) = ascii_unsupported(cell) {
        return Err(Error::UnsupportedAsciiType(kind));
    }
    let fmt = col.txtfmt.ok_or_else(|| {
        Error::InvalidArg(format!("column {:?} has no ASCII format", col.name))
    })?;

    let text = match cell {
        Cell::I8(v) => fmt.format_int(*v as i64),
        Cell::I16(v) => fmt.format_int(*v as i64),
        Cell::I32(v) => fmt.format_int(*v as i64),
        Cell::I64(v) => fmt.format_int(*v),
        Cell::U8(v) => fmt.format_uint(*v as u64),
        Cell::U16(v) => fmt.format_uint(*v as u64),
        Cell::U32(v) => fmt.format_uint(*v as u64),
        Cell::U64(v) => fmt.format_uint(*v),
        Cell::F32(v) => fmt.format_float(*v as f64),
        Cell::F64(v) => fmt.format_float(*v),
        Cell::Str(s) => fmt.format_str(s),
        _ => unreachable!("rejected above"),
    };

    if text.len() != col.dtype.dsize {
        return Err(Error::FormatWidth(format!(
            "column {:?} ({}): formatted value {:?} is {} bytes, field is {}",
            col.name,
            col.format,
            text,
            text.len(),
            col.dtype.dsize
        )));
    }

    let beg = rowsz * irow + col.offset;
    row_slice_mut(data, beg, col.dtype.dsize)?.copy_from_slice(text.as_bytes());
    Ok(())
}
