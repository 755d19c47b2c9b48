//! The closed sum type over table cell values, conversions between cells
//! and plain Rust values, and the record derivation macro used by the
//! struct-shaped row sinks.

use crate::error::{Error, Result};
use crate::hdu::HduKind;
use crate::tform::{ColumnType, TypeCode};

/// One table cell: a scalar, a string, or a sequence (fixed array or
/// variable-length array) of scalars.
///
/// Scans are sink-driven: the variant a caller supplies selects how the
/// stored bytes are interpreted, and the element width must match the
/// column's element width.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Bool(bool),
    U8(u8),
    I8(i8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
    F32(f32),
    F64(f64),
    C64(f32, f32),
    C128(f64, f64),
    Str(String),
    BoolVec(Vec<bool>),
    U8Vec(Vec<u8>),
    I8Vec(Vec<i8>),
    I16Vec(Vec<i16>),
    U16Vec(Vec<u16>),
    I32Vec(Vec<i32>),
    U32Vec(Vec<u32>),
    I64Vec(Vec<i64>),
    U64Vec(Vec<u64>),
    F32Vec(Vec<f32>),
    F64Vec(Vec<f64>),
    C64Vec(Vec<(f32, f32)>),
    C128Vec(Vec<(f64, f64)>),
}

impl Cell {
    /// Short name of the variant, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Cell::Bool(_) => "bool",
            Cell::U8(_) => "u8",
            Cell::I8(_) => "i8",
            Cell::I16(_) => "i16",
            Cell::U16(_) => "u16",
            Cell::I32(_) => "i32",
            Cell::U32(_) => "u32",
            Cell::I64(_) => "i64",
            Cell::U64(_) => "u64",
            Cell::F32(_) => "f32",
            Cell::F64(_) => "f64",
            Cell::C64(..) => "c64",
            Cell::C128(..) => "c128",
            Cell::Str(_) => "string",
            Cell::BoolVec(_) => "bool sequence",
            Cell::U8Vec(_) => "u8 sequence",
            Cell::I8Vec(_) => "i8 sequence",
            Cell::I16Vec(_) => "i16 sequence",
            Cell::U16Vec(_) => "u16 sequence",
            Cell::I32Vec(_) => "i32 sequence",
            Cell::U32Vec(_) => "u32 sequence",
            Cell::I64Vec(_) => "i64 sequence",
            Cell::U64Vec(_) => "u64 sequence",
            Cell::F32Vec(_) => "f32 sequence",
            Cell::F64Vec(_) => "f64 sequence",
            Cell::C64Vec(_) => "c64 sequence",
            Cell::C128Vec(_) => "c128 sequence",
        }
    }

    /// Byte width of one element of this cell in a binary table, or `None`
    /// for strings (whose width is the column's).
    pub(crate) fn elem_width(&self) -> Option<usize> {
        Some(match self {
            Cell::Bool(_) | Cell::BoolVec(_) => 1,
            Cell::U8(_) | Cell::U8Vec(_) | Cell::I8(_) | Cell::I8Vec(_) => 1,
            Cell::I16(_) | Cell::I16Vec(_) | Cell::U16(_) | Cell::U16Vec(_) => 2,
            Cell::I32(_) | Cell::I32Vec(_) | Cell::U32(_) | Cell::U32Vec(_) => 4,
            Cell::I64(_) | Cell::I64Vec(_) | Cell::U64(_) | Cell::U64Vec(_) => 8,
            Cell::F32(_) | Cell::F32Vec(_) => 4,
            Cell::F64(_) | Cell::F64Vec(_) => 8,
            Cell::C64(..) | Cell::C64Vec(_) => 8,
            Cell::C128(..) | Cell::C128Vec(_) => 16,
            Cell::Str(_) => return None,
        })
    }

    /// Returns `true` for the sequence variants.
    pub(crate) fn is_sequence(&self) -> bool {
        matches!(
            self,
            Cell::BoolVec(_)
                | Cell::U8Vec(_)
                | Cell::I8Vec(_)
                | Cell::I16Vec(_)
                | Cell::U16Vec(_)
                | Cell::I32Vec(_)
                | Cell::U32Vec(_)
                | Cell::I64Vec(_)
                | Cell::U64Vec(_)
                | Cell::F32Vec(_)
                | Cell::F64Vec(_)
                | Cell::C64Vec(_)
                | Cell::C128Vec(_)
        )
    }

    /// The cell shape a column naturally decodes into when the caller does
    /// not supply one (keyed-map scans of unnamed placeholders).
    pub(crate) fn natural(dtype: &ColumnType) -> Cell {
        let scalar = dtype.vla.is_none() && dtype.len == 1;
        match dtype.code {
            TypeCode::Str => Cell::Str(String::new()),
            TypeCode::Bool if scalar => Cell::Bool(false),
            TypeCode::Bool => Cell::BoolVec(Vec::new()),
            TypeCode::U8 | TypeCode::Bit if scalar => Cell::U8(0),
            TypeCode::U8 | TypeCode::Bit => Cell::U8Vec(Vec::new()),
            TypeCode::I16 if scalar => Cell::I16(0),
            TypeCode::I16 => Cell::I16Vec(Vec::new()),
            TypeCode::U16 if scalar => Cell::U16(0),
            TypeCode::U16 => Cell::U16Vec(Vec::new()),
            TypeCode::I32 if scalar => Cell::I32(0),
            TypeCode::I32 => Cell::I32Vec(Vec::new()),
            TypeCode::U32 if scalar => Cell::U32(0),
            TypeCode::U32 => Cell::U32Vec(Vec::new()),
            TypeCode::I64 if scalar => Cell::I64(0),
            TypeCode::I64 => Cell::I64Vec(Vec::new()),
            TypeCode::U64 if scalar => Cell::U64(0),
            TypeCode::U64 => Cell::U64Vec(Vec::new()),
            TypeCode::F32 if scalar => Cell::F32(0.0),
            TypeCode::F32 => Cell::F32Vec(Vec::new()),
            TypeCode::F64 if scalar => Cell::F64(0.0),
            TypeCode::F64 => Cell::F64Vec(Vec::new()),
            TypeCode::C64 if scalar => Cell::C64(0.0, 0.0),
            TypeCode::C64 => Cell::C64Vec(Vec::new()),
            TypeCode::C128 if scalar => Cell::C128(0.0, 0.0),
            TypeCode::C128 => Cell::C128Vec(Vec::new()),
        }
    }
}

/// Conversion between a plain Rust value and a table [`Cell`], plus the
/// TFORM the schema builder assigns the type.
pub trait ColumnValue: Sized + 'static {
    /// TFORM for a column of this type in the given table kind, or `None`
    /// if the kind cannot hold it.
    fn tform(kind: HduKind) -> Option<String>;

    /// The binary TFORM letter of the scalar, where one exists. Sequence
    /// types derive theirs from the element's letter.
    fn bin_letter() -> Option<char> {
        None
    }

    /// Wrap the value in a cell.
    fn into_cell(self) -> Cell;

    /// Unwrap a cell of the matching variant.
    fn from_cell(cell: Cell) -> Result<Self>;
}

fn mismatch<T>(want: &'static str, got: &Cell) -> Result<T> {
    Err(Error::TypeMismatch(format!(
        "expected a {want} cell, got {}",
        got.kind_name()
    )))
}

macro_rules! scalar_column_value {
    ($ty:ty, $variant:ident, $want:literal, $letter:literal, $bin:expr, $ascii:expr) => {
        impl ColumnValue for $ty {
            fn tform(kind: HduKind) -> Option<String> {
                match kind {
                    HduKind::BinaryTable => $bin,
                    HduKind::AsciiTable => $ascii,
                    _ => None,
                }
            }

            fn bin_letter() -> Option<char> {
                Some($letter)
            }

            fn into_cell(self) -> Cell {
                Cell::$variant(self)
            }

            fn from_cell(cell: Cell) -> Result<Self> {
                match cell {
                    Cell::$variant(v) => Ok(v),
                    other => mismatch($want, &other),
                }
            }
        }
    };
}

scalar_column_value!(bool, Bool, "bool", 'L', Some("L".into()), None);
scalar_column_value!(u8, U8, "u8", 'B', Some("B".into()), Some("I4".into()));
scalar_column_value!(i8, I8, "i8", 'B', Some("B".into()), Some("I4".into()));
scalar_column_value!(i16, I16, "i16", 'I', Some("I".into()), Some("I6".into()));
scalar_column_value!(u16, U16, "u16", 'U', Some("U".into()), Some("I6".into()));
scalar_column_value!(i32, I32, "i32", 'J', Some("J".into()), Some("I11".into()));
scalar_column_value!(u32, U32, "u32", 'V', Some("V".into()), Some("I11".into()));
scalar_column_value!(i64, I64, "i64", 'K', Some("K".into()), Some("I20".into()));
scalar_column_value!(u64, U64, "u64", 'W', Some("W".into()), Some("I20".into()));
scalar_column_value!(f32, F32, "f32", 'E', Some("E".into()), Some("E26.17".into()));
scalar_column_value!(f64, F64, "f64", 'D', Some("D".into()), Some("E26.17".into()));

impl ColumnValue for (f32, f32) {
    fn tform(kind: HduKind) -> Option<String> {
        match kind {
            HduKind::BinaryTable => Some("C".into()),
            _ => None,
        }
    }

    fn bin_letter() -> Option<char> {
        Some('C')
    }

    fn into_cell(self) -> Cell {
        Cell::C64(self.0, self.1)
    }

    fn from_cell(cell: Cell) -> Result<Self> {
        match cell {
            Cell::C64(re, im) => Ok((re, im)),
            other => mismatch("c64", &other),
        }
    }
}

impl ColumnValue for (f64, f64) {
    fn tform(kind: HduKind) -> Option<String> {
        match kind {
            HduKind::BinaryTable => Some("M".into()),
            _ => None,
        }
    }

    fn bin_letter() -> Option<char> {
        Some('M')
    }

    fn into_cell(self) -> Cell {
        Cell::C128(self.0, self.1)
    }

    fn from_cell(cell: Cell) -> Result<Self> {
        match cell {
            Cell::C128(re, im) => Ok((re, im)),
            other => mismatch("c128", &other),
        }
    }
}

impl ColumnValue for String {
    fn tform(kind: HduKind) -> Option<String> {
        match kind {
            HduKind::BinaryTable => Some("80A".into()),
            HduKind::AsciiTable => Some("A80".into()),
            _ => None,
        }
    }

    fn into_cell(self) -> Cell {
        Cell::Str(self)
    }

    fn from_cell(cell: Cell) -> Result<Self> {
        match cell {
            Cell::Str(s) => Ok(s),
            other => mismatch("string", &other),
        }
    }
}

macro_rules! sequence_column_value {
    ($elem:ty, $variant:ident, $want:literal) => {
        impl ColumnValue for Vec<$elem> {
            fn tform(kind: HduKind) -> Option<String> {
                // Runtime-sized sequences become 64-bit VLA descriptors.
                match kind {
                    HduKind::BinaryTable => {
                        Some(format!("Q{}", <$elem as ColumnValue>::bin_letter()?))
                    }
                    _ => None,
                }
            }

            fn into_cell(self) -> Cell {
                Cell::$variant(self)
            }

            fn from_cell(cell: Cell) -> Result<Self> {
                match cell {
                    Cell::$variant(v) => Ok(v),
                    other => mismatch($want, &other),
                }
            }
        }

        impl<const N: usize> ColumnValue for [$elem; N] {
            fn tform(kind: HduKind) -> Option<String> {
                match kind {
                    HduKind::BinaryTable => {
                        Some(format!("{N}{}", <$elem as ColumnValue>::bin_letter()?))
                    }
                    _ => None,
                }
            }

            fn into_cell(self) -> Cell {
                Cell::$variant(self.to_vec())
            }

            fn from_cell(cell: Cell) -> Result<Self> {
                match cell {
                    Cell::$variant(v) => v.try_into().map_err(|v: Vec<$elem>| {
                        Error::TypeMismatch(format!(
                            "expected {N} elements, got {}",
                            v.len()
                        ))
                    }),
                    other => mismatch($want, &other),
                }
            }
        }
    };
}

sequence_column_value!(bool, BoolVec, "bool sequence");
sequence_column_value!(u8, U8Vec, "u8 sequence");
sequence_column_value!(i8, I8Vec, "i8 sequence");
sequence_column_value!(i16, I16Vec, "i16 sequence");
sequence_column_value!(u16, U16Vec, "u16 sequence");
sequence_column_value!(i32, I32Vec, "i32 sequence");
sequence_column_value!(u32, U32Vec, "u32 sequence");
sequence_column_value!(i64, I64Vec, "i64 sequence");
sequence_column_value!(u64, U64Vec, "u64 sequence");
sequence_column_value!(f32, F32Vec, "f32 sequence");
sequence_column_value!(f64, F64Vec, "f64 sequence");
sequence_column_value!((f32, f32), C64Vec, "c64 sequence");
sequence_column_value!((f64, f64), C128Vec, "c128 sequence");

/// A row-shaped value whose fields map to table columns by name.
///
/// Implementations are normally generated with [`fits_record!`]; the
/// cursor caches the field-to-column index mapping per record type on
/// first use.
pub trait Record: Default + 'static {
    /// Column name of each field, in field order.
    fn field_names() -> &'static [&'static str];

    /// TFORM of each field for the given table kind; used by the schema
    /// builder.
    fn field_forms(kind: HduKind) -> Result<Vec<String>>;

    /// The current value of the i-th field as a cell.
    fn load(&self, field: usize) -> Cell;

    /// Overwrite the i-th field from a cell.
    fn store(&mut self, field: usize, cell: Cell) -> Result<()>;
}

/// Define a struct whose fields read from and write to table columns.
///
/// Each field is declared as `"COLUMN" => name: Type`; the string is the
/// column name the field binds to (the equivalent of a `fits:"COLUMN"`
/// tag). Fields without a matching column are silently skipped during
/// scans.
///
/// ```
/// use fitsrw::fits_record;
///
/// fits_record! {
///     pub struct Source {
///         "RA" => ra: f64,
///         "DEC" => dec: f64,
///         "FLUX" => flux: Vec<f32>,
///     }
/// }
/// ```
#[macro_export]
macro_rules! fits_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $( $col:literal => $field:ident : $ty:ty ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, PartialEq)]
        $vis struct $name {
            $( $vis $field: $ty, )+
        }

        impl $crate::Record for $name {
            fn field_names() -> &'static [&'static str] {
                &[ $( $col ),+ ]
            }

            fn field_forms(kind: $crate::HduKind) -> $crate::Result<Vec<String>> {
                let mut forms = Vec::new();
                $(
                    forms.push(<$ty as $crate::ColumnValue>::tform(kind).ok_or_else(
                        || $crate::Error::TypeMismatch(format!(
                            "field {:?} has no representation in a {:?} table",
                            $col, kind,
                        )),
                    )?);
                )+
                Ok(forms)
            }

            fn load(&self, field: usize) -> $crate::Cell {
                let mut index = 0usize;
                $(
                    if field == index {
                        return $crate::ColumnValue::into_cell(self.$field.clone());
                    }
                    index += 1;
                )+
                let _ = index;
                unreachable!("field index out of range")
            }

            fn store(&mut self, field: usize, cell: $crate::Cell) -> $crate::Result<()> {
                let mut index = 0usize;
                $(
                    if field == index {
                        self.$field = $crate::ColumnValue::from_cell(cell)?;
                        return Ok(());
                    }
                    index += 1;
                )+
                let _ = index;
                unreachable!("field index out of range")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_conversions_roundtrip() {
        assert_eq!(i16::from_cell(42i16.into_cell()).unwrap(), 42);
        assert_eq!(u64::from_cell(7u64.into_cell()).unwrap(), 7);
        assert_eq!(f32::from_cell(1.5f32.into_cell()).unwrap(), 1.5);
        assert_eq!(bool::from_cell(true.into_cell()).unwrap(), true);
        assert_eq!(
            String::from_cell(String::from("abc").into_cell()).unwrap(),
            "abc"
        );
        assert_eq!(
            <(f64, f64)>::from_cell((1.0, -2.0).into_cell()).unwrap(),
            (1.0, -2.0)
        );
    }

    #[test]
    fn mismatched_conversion_fails() {
        assert!(matches!(
            i16::from_cell(Cell::I32(1)),
            Err(Error::TypeMismatch(_))
        ));
        assert!(matches!(
            String::from_cell(Cell::F64(0.0)),
            Err(Error::TypeMismatch(_))
        ));
    }

    #[test]
    fn fixed_array_conversion_checks_length() {
        let cell = vec![1.0f64, 2.0].into_cell();
        assert!(matches!(
            <[f64; 3]>::from_cell(cell),
            Err(Error::TypeMismatch(_))
        ));
        let cell = [1.0f64, 2.0].into_cell();
        assert_eq!(<[f64; 2]>::from_cell(cell).unwrap(), [1.0, 2.0]);
    }

    #[test]
    fn tform_assignment_binary() {
        assert_eq!(bool::tform(HduKind::BinaryTable).unwrap(), "L");
        assert_eq!(i16::tform(HduKind::BinaryTable).unwrap(), "I");
        assert_eq!(u32::tform(HduKind::BinaryTable).unwrap(), "V");
        assert_eq!(f64::tform(HduKind::BinaryTable).unwrap(), "D");
        assert_eq!(String::tform(HduKind::BinaryTable).unwrap(), "80A");
        assert_eq!(Vec::<f64>::tform(HduKind::BinaryTable).unwrap(), "QD");
        assert_eq!(<[f32; 4]>::tform(HduKind::BinaryTable).unwrap(), "4E");
    }

    #[test]
    fn tform_assignment_ascii() {
        assert_eq!(i64::tform(HduKind::AsciiTable).unwrap(), "I20");
        assert_eq!(f64::tform(HduKind::AsciiTable).unwrap(), "E26.17");
        assert_eq!(String::tform(HduKind::AsciiTable).unwrap(), "A80");
        assert!(bool::tform(HduKind::AsciiTable).is_none());
        assert!(Vec::<i32>::tform(HduKind::AsciiTable).is_none());
    }

    #[test]
    fn natural_cell_shapes() {
        let t = ColumnType::from_binary_form("1J").unwrap();
        assert_eq!(Cell::natural(&t), Cell::I32(0));
        let t = ColumnType::from_binary_form("4D").unwrap();
        assert_eq!(Cell::natural(&t), Cell::F64Vec(Vec::new()));
        let t = ColumnType::from_binary_form("QE").unwrap();
        assert_eq!(Cell::natural(&t), Cell::F32Vec(Vec::new()));
        let t = ColumnType::from_binary_form("10A").unwrap();
        assert_eq!(Cell::natural(&t), Cell::Str(String::new()));
        let t = ColumnType::from_binary_form("9X").unwrap();
        assert_eq!(Cell::natural(&t), Cell::U8Vec(Vec::new()));
    }

    fits_record! {
        struct Probe {
            "ID" => id: i32,
            "FLUX" => flux: f64,
            "SAMPLES" => samples: Vec<f32>,
        }
    }

    #[test]
    fn record_field_names_and_forms() {
        assert_eq!(Probe::field_names(), &["ID", "FLUX", "SAMPLES"]);
        let forms = Probe::field_forms(HduKind::BinaryTable).unwrap();
        assert_eq!(forms, vec!["J", "D", "QE"]);
        assert!(Probe::field_forms(HduKind::AsciiTable).is_err());
    }

    #[test]
    fn record_load_store() {
        let mut p = Probe {
            id: 7,
            flux: 2.5,
            samples: vec![1.0, 2.0],
        };
        assert_eq!(p.load(0), Cell::I32(7));
        assert_eq!(p.load(2), Cell::F32Vec(vec![1.0, 2.0]));
        p.store(1, Cell::F64(9.0)).unwrap();
        assert_eq!(p.flux, 9.0);
        assert!(p.store(0, Cell::F64(1.0)).is_err());
    }
}
