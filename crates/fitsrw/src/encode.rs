//! HDU encoder: header blocks, then the payload padded to a block
//! boundary with the type-appropriate pad byte.

use std::io::Write;

use crate::block::{pad_block, DATA_PAD_BYTE, TEXT_PAD_BYTE};
use crate::error::Result;
use crate::hdu::Hdu;
use crate::image::ImageHdu;
use crate::table::TableHdu;

/// Encode one HDU: header (space-padded), then its payload.
pub fn encode_hdu<W: Write + ?Sized>(w: &mut W, hdu: &Hdu) -> Result<()> {
    hdu.header().encode(w)?;
    match hdu {
        Hdu::Image(img) => encode_image_payload(w, img),
        Hdu::Table(t) => encode_table_payload(w, t),
    }
}

/// Image payloads pad with zero bytes.
fn encode_image_payload<W: Write + ?Sized>(w: &mut W, img: &ImageHdu) -> Result<()> {
    w.write_all(img.raw())?;
    write_padding(w, img.raw().len(), DATA_PAD_BYTE)
}

/// Table payloads are the fixed rows then the heap; binary tables pad
/// with zero bytes, ASCII tables with spaces.
fn encode_table_payload<W: Write + ?Sized>(w: &mut W, t: &TableHdu) -> Result<()> {
    w.write_all(&t.data)?;
    w.write_all(&t.heap)?;
    let pad_byte = if t.binary { DATA_PAD_BYTE } else { TEXT_PAD_BYTE };
    write_padding(w, t.data.len() + t.heap.len(), pad_byte)
}

fn write_padding<W: Write + ?Sized>(w: &mut W, written: usize, pad_byte: u8) -> Result<()> {
    let pad = pad_block(written);
    if pad > 0 {
        w.write_all(&vec![pad_byte; pad])?;
    }
    Ok(())
}
