//! Column type resolution: TFORM grammars for binary and ASCII tables and
//! the fixed-width text formats used when emitting ASCII cells.

use crate::error::{Error, Result};

/// Element type code of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCode {
    /// `L` — logical, one byte.
    Bool,
    /// `X` — bit array, packed to bytes.
    Bit,
    /// `B` — unsigned byte.
    U8,
    /// `I` — 16-bit signed integer.
    I16,
    /// `U` — 16-bit unsigned integer (cfitsio local convention).
    U16,
    /// `J` — 32-bit signed integer.
    I32,
    /// `V` — 32-bit unsigned integer (cfitsio local convention).
    U32,
    /// `K` — 64-bit signed integer.
    I64,
    /// `W` — 64-bit unsigned integer (cfitsio local convention).
    U64,
    /// `E` — 32-bit IEEE float.
    F32,
    /// `D` — 64-bit IEEE float.
    F64,
    /// `C` — pair of 32-bit IEEE floats.
    C64,
    /// `M` — pair of 64-bit IEEE floats.
    C128,
    /// `A` — character data.
    Str,
}

impl TypeCode {
    /// Byte size of one element of this code in a binary table.
    /// `Str` and `Bit` elements are single bytes; their counts come from
    /// the TFORM repeat.
    pub fn elem_size(self) -> usize {
        match self {
            TypeCode::Bool | TypeCode::Bit | TypeCode::U8 | TypeCode::Str => 1,
            TypeCode::I16 | TypeCode::U16 => 2,
            TypeCode::I32 | TypeCode::U32 | TypeCode::F32 => 4,
            TypeCode::I64 | TypeCode::U64 | TypeCode::F64 | TypeCode::C64 => 8,
            TypeCode::C128 => 16,
        }
    }

    /// The binary-table TFORM letter for this code.
    pub fn bin_letter(self) -> char {
        match self {
            TypeCode::Bool => 'L',
            TypeCode::Bit => 'X',
            TypeCode::U8 => 'B',
            TypeCode::I16 => 'I',
            TypeCode::U16 => 'U',
            TypeCode::I32 => 'J',
            TypeCode::U32 => 'V',
            TypeCode::I64 => 'K',
            TypeCode::U64 => 'W',
            TypeCode::F32 => 'E',
            TypeCode::F64 => 'D',
            TypeCode::C64 => 'C',
            TypeCode::C128 => 'M',
            TypeCode::Str => 'A',
        }
    }

    fn from_bin_letter(c: u8) -> Option<TypeCode> {
        Some(match c {
            b'L' => TypeCode::Bool,
            b'X' => TypeCode::Bit,
            b'B' => TypeCode::U8,
            b'I' => TypeCode::I16,
            b'U' => TypeCode::U16,
            b'J' => TypeCode::I32,
            b'V' => TypeCode::U32,
            b'K' => TypeCode::I64,
            b'W' => TypeCode::U64,
            b'E' => TypeCode::F32,
            b'D' => TypeCode::F64,
            b'C' => TypeCode::C64,
            b'M' => TypeCode::C128,
            b'A' => TypeCode::Str,
            _ => return None,
        })
    }
}

/// Width of a variable-length array descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlaWidth {
    /// `P` — 32-bit (length, offset) pair, 8 bytes on the row.
    P,
    /// `Q` — 64-bit (length, offset) pair, 16 bytes on the row.
    Q,
}

impl VlaWidth {
    /// On-row descriptor size in bytes.
    pub fn descriptor_size(self) -> usize {
        match self {
            VlaWidth::P => 8,
            VlaWidth::Q => 16,
        }
    }
}

/// Resolved type descriptor of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnType {
    /// Scalar element code.
    pub code: TypeCode,
    /// Number of elements on the row (1 for strings; byte count for bits).
    pub len: usize,
    /// Bytes per element in the data area. For strings this is the field
    /// width; for variable-length columns, the descriptor size.
    pub dsize: usize,
    /// Bytes per element in the heap area (variable-length columns only).
    pub hsize: usize,
    /// `Some` when the column data live in the heap.
    pub vla: Option<VlaWidth>,
}

impl ColumnType {
    /// Total bytes this column occupies in one row.
    pub fn row_bytes(&self) -> usize {
        self.dsize * self.len
    }

    /// Resolve a binary-table TFORM such as `"1J"`, `"376E"`, `"20A"`,
    /// `"16X"`, `"QD"` or `"1PB(200)"`.
    pub fn from_binary_form(form: &str) -> Result<ColumnType> {
        let s = form.trim();
        // A trailing (max) hint on variable-length columns is ignored.
        let s = s.split('(').next().unwrap_or(s);
        let bytes = s.as_bytes();

        let letter_pos = bytes
            .iter()
            .position(|b| b.is_ascii_uppercase())
            .ok_or_else(|| Error::MalformedCard(format!("invalid TFORM {form:?}")))?;
        let repeat = if letter_pos == 0 {
            1
        } else {
            s[..letter_pos]
                .parse::<usize>()
                .map_err(|_| Error::MalformedCard(format!("invalid TFORM {form:?}")))?
        };

        let (vla, code_byte) = match bytes[letter_pos] {
            b'P' => (Some(VlaWidth::P), bytes.get(letter_pos + 1)),
            b'Q' => (Some(VlaWidth::Q), bytes.get(letter_pos + 1)),
            _ => (None, Some(&bytes[letter_pos])),
        };
        let code_byte = *code_byte
            .ok_or_else(|| Error::MalformedCard(format!("invalid TFORM {form:?}")))?;
        let code = TypeCode::from_bin_letter(code_byte)
            .ok_or_else(|| Error::MalformedCard(format!("invalid TFORM {form:?}")))?;

        let typ = match vla {
            Some(width) => ColumnType {
                code,
                len: repeat,
                dsize: width.descriptor_size(),
                hsize: code.elem_size(),
                vla,
            },
            None => match code {
                // The repeat of a string column is its byte width.
                TypeCode::Str => ColumnType {
                    code,
                    len: 1,
                    dsize: repeat,
                    hsize: 0,
                    vla: None,
                },
                // Bits pack into whole bytes.
                TypeCode::Bit => ColumnType {
                    code,
                    len: repeat.div_ceil(8),
                    dsize: 1,
                    hsize: 0,
                    vla: None,
                },
                _ => ColumnType {
                    code,
                    len: repeat,
                    dsize: code.elem_size(),
                    hsize: 0,
                    vla: None,
                },
            },
        };

        if typ.row_bytes() == 0 && s != "0A" {
            return Err(Error::MalformedCard(format!(
                "TFORM {form:?} describes a zero-sized column"
            )));
        }
        Ok(typ)
    }

    /// Resolve an ASCII-table TFORM such as `"A10"`, `"I6"`, `"F8.2"`,
    /// `"E14.6"` or `"D25.17"`.
    pub fn from_ascii_form(form: &str) -> Result<ColumnType> {
        let s = form.trim();
        let bytes = s.as_bytes();
        if bytes.is_empty() {
            return Err(Error::MalformedCard("empty TFORM".into()));
        }

        let code = match bytes[0] {
            b'A' => TypeCode::Str,
            b'I' => TypeCode::I64,
            b'E' | b'F' | b'D' => TypeCode::F64,
            _ => {
                return Err(Error::MalformedCard(format!(
                    "invalid ASCII TFORM {form:?}"
                )));
            }
        };

        let width_end = s.find('.').unwrap_or(s.len());
        let width = s[1..width_end]
            .parse::<usize>()
            .map_err(|_| Error::MalformedCard(format!("invalid ASCII TFORM {form:?}")))?;
        if width == 0 {
            return Err(Error::MalformedCard(format!(
                "TFORM {form:?} describes a zero-sized column"
            )));
        }

        Ok(ColumnType {
            code,
            len: 1,
            dsize: width,
            hsize: 0,
            vla: None,
        })
    }
}

// ── ASCII text formats ──

/// Fixed-width text format of an ASCII table column, resolved from its
/// TFORM at header-parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFormat {
    /// `Aw` — string, right-aligned in `w` columns.
    Str { w: usize },
    /// `Iw` — decimal integer.
    Int { w: usize },
    /// `Fw.d` — fixed-point float.
    Fixed { w: usize, p: usize },
    /// `Ew.d` / `Dw.d` — scientific float.
    Sci { w: usize, p: Option<usize> },
    /// `Gw.d` — general float.
    Gen { w: usize, p: Option<usize> },
}

impl TextFormat {
    /// The field width in bytes.
    pub fn width(self) -> usize {
        match self {
            TextFormat::Str { w }
            | TextFormat::Int { w }
            | TextFormat::Fixed { w, .. }
            | TextFormat::Sci { w, .. }
            | TextFormat::Gen { w, .. } => w,
        }
    }

    /// Format an integer into the field.
    pub fn format_int(self, v: i64) -> String {
        format!("{v:>w$}", w = self.width())
    }

    /// Format an unsigned integer into the field.
    pub fn format_uint(self, v: u64) -> String {
        format!("{v:>w$}", w = self.width())
    }

    /// Format a float into the field.
    pub fn format_float(self, v: f64) -> String {
        let w = self.width();
        match self {
            TextFormat::Fixed { p, .. } => format!("{v:>w$.p$}"),
            TextFormat::Sci { p: Some(p), .. } => format!("{v:>w$.p$e}"),
            TextFormat::Sci { p: None, .. } => format!("{v:>w$e}"),
            TextFormat::Gen { p: Some(p), .. } => format!("{v:>w$.p$}"),
            _ => format!("{v:>w$}"),
        }
    }

    /// Format a string into the field, right-aligned and truncated at the
    /// field width.
    pub fn format_str(self, v: &str) -> String {
        let w = self.width();
        let v = if v.len() > w { &v[..w] } else { v };
        format!("{v:>w$}")
    }
}

/// Resolve the text format from an ASCII TFORM string.
pub fn text_format(form: &str) -> Option<TextFormat> {
    let s = form.trim();
    let bytes = s.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    let dot = s.find('.');
    let w: usize = s[1..dot.unwrap_or(s.len())].parse().ok()?;
    let p: Option<usize> = dot.and_then(|d| s[d + 1..].parse().ok());
    Some(match bytes[0] {
        b'A' => TextFormat::Str { w },
        b'I' => TextFormat::Int { w },
        b'F' => TextFormat::Fixed { w, p: p.unwrap_or(0) },
        b'E' | b'D' => TextFormat::Sci { w, p },
        b'G' => TextFormat::Gen { w, p },
        _ => return None,
    })
}
