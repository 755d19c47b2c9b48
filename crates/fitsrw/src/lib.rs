//! Streaming FITS file reader/writer.
//!
//! A FITS file is a sequence of Header-Data Units, each an 80-byte-card
//! header followed by a typed payload: an N-dimensional image, an ASCII
//! table, or a binary table with fixed and variable-length columns.
//! [`File::open`] decodes every HDU from a byte source; [`File::create`]
//! plus [`File::write`] emit them to a byte sink. Table rows are read
//! through the [`Rows`] cursor into positional [`Cell`]s, a name-keyed
//! map, or a struct defined with [`fits_record!`].
//!
//! ```no_run
//! use fitsrw::{Cell, Column, File, HduKind, ImageHdu, TableHdu};
//!
//! # fn main() -> fitsrw::Result<()> {
//! let mut buf = Vec::new();
//! let mut f = File::create(&mut buf);
//! f.write(ImageHdu::new_primary(8, &[])?)?;
//!
//! let mut table = TableHdu::new(
//!     "objects",
//!     vec![Column::new("ID", "1J"), Column::new("FLUX", "1D")],
//!     HduKind::BinaryTable,
//! )?;
//! table.push_row(&[Cell::I32(1), Cell::F64(0.5)])?;
//! f.write(table)?;
//! f.close();
//! # Ok(())
//! # }
//! ```
//!
//! All multi-byte values are big-endian and every structural boundary is
//! padded to a 2880-byte block, so encoded output is bit-exact against
//! the FITS standard. Decoding is strictly sequential; the core never
//! seeks.

/// FITS 2880-byte block arithmetic and constants.
pub mod block;
/// Header card model and the 80-byte line codec.
pub mod card;
/// Table cell values, conversions, and record derivation.
pub mod cell;
/// Table columns and the binary/ASCII cell codecs.
pub mod column;
/// Streaming HDU decoding.
pub mod decode;
/// Image display wrappers.
pub mod display;
/// Big-endian scalar and slice codecs.
pub mod endian;
/// HDU encoding.
pub mod encode;
/// Error types used throughout the crate.
pub mod error;
/// File-level orchestration.
pub mod file;
/// HDU kinds and the unit type.
pub mod hdu;
/// Header container with block decode/encode.
pub mod header;
/// Image HDUs and the pixel codec.
pub mod image;
/// Forward-only row cursor.
pub mod rows;
/// Table HDUs, schemas, and row writes.
pub mod table;
/// TFORM resolution and ASCII text formats.
pub mod tform;

pub use block::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};
pub use card::{Card, Value};
pub use cell::{Cell, ColumnValue, Record};
pub use column::Column;
pub use display::{DisplayImage, FloatGray};
pub use error::{Error, Result};
pub use file::{copy_hdu, File, Mode};
pub use hdu::{Hdu, HduKind};
pub use header::Header;
pub use image::{ImageHdu, Pixel};
pub use rows::Rows;
pub use table::{copy_table, copy_table_range, TableHdu};
pub use tform::{ColumnType, TypeCode, VlaWidth};
