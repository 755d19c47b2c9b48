//! Streaming HDU decoder: block-aligned header parse, then the payload
//! load for the classified HDU kind.

use std::collections::HashMap;
use std::io::Read;

use crate::block::{align_block, pad_block};
use crate::column::{Codec, Column};
use crate::error::{Error, Result};
use crate::hdu::{Hdu, HduKind};
use crate::header::Header;
use crate::image::ImageHdu;
use crate::table::TableHdu;
use crate::tform::{text_format, ColumnType};

/// Decode the next HDU from the stream, or `None` on a clean end of
/// stream at an HDU boundary.
pub fn decode_hdu<R: Read + ?Sized>(r: &mut R) -> Result<Option<Hdu>> {
    let Some(hdr) = Header::decode(r)? else {
        return Ok(None);
    };

    let hdu = match hdr.kind() {
        HduKind::PrimaryImage | HduKind::ImageExtension => {
            let raw = load_image(&hdr, r)?;
            Hdu::Image(ImageHdu::from_parts(hdr, raw))
        }
        HduKind::AsciiTable | HduKind::BinaryTable => Hdu::Table(load_table(hdr, r)?),
    };
    Ok(Some(hdu))
}

fn read_exact<R: Read + ?Sized>(r: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    let mut off = 0;
    while off < buf.len() {
        let n = r.read(&mut buf[off..])?;
        if n == 0 {
            return Err(Error::Truncated(what));
        }
        off += n;
    }
    Ok(())
}

fn load_image<R: Read + ?Sized>(hdr: &Header, r: &mut R) -> Result<Vec<u8>> {
    let nelmts: usize = if hdr.axes().is_empty() {
        0
    } else {
        hdr.axes().iter().product()
    };
    let pixsz = (hdr.bitpix().unsigned_abs() as usize) / 8;

    let mut raw = vec![0u8; nelmts * pixsz];
    if raw.is_empty() {
        return Ok(raw);
    }
    read_exact(r, &mut raw, "image data area")?;

    // The data array is aligned to 2880-byte blocks; skip the padding.
    let mut pad = vec![0u8; pad_block(raw.len())];
    if !pad.is_empty() {
        read_exact(r, &mut pad, "image data padding")?;
    }
    Ok(raw)
}

fn load_table<R: Read + ?Sized>(hdr: Header, r: &mut R) -> Result<TableHdu> {
    let binary = hdr.kind() == HduKind::BinaryTable;
    if hdr.axes().len() != 2 {
        return Err(Error::InvalidHdu(format!(
            "table header declares {} axes, expected 2",
            hdr.axes().len()
        )));
    }
    let rowsz = hdr.axes()[0];
    let nrows = hdr.axes()[1];
    let ncols = hdr
        .get_int("TFIELDS")
        .ok_or_else(|| Error::MissingKey("TFIELDS".into()))? as usize;
    let heapsz = hdr.get_int("PCOUNT").unwrap_or(0) as usize;
    let gap = hdr.get_int("THEAP").unwrap_or(0) as usize;
    if gap > heapsz {
        return Err(Error::InvalidHdu(format!(
            "THEAP gap {gap} exceeds PCOUNT {heapsz}"
        )));
    }

    let datasz = rowsz * nrows;
    let mut block = vec![0u8; align_block(datasz + heapsz)];
    read_exact(r, &mut block, "table data area")?;

    let data = block[..datasz].to_vec();
    let heap = block[datasz + gap..datasz + heapsz].to_vec();

    let mut cols = Vec::with_capacity(ncols);
    let mut colidx = HashMap::with_capacity(ncols);
    let mut offset = 0usize;
    for i in 0..ncols {
        let n = i + 1;
        let mut col = Column::default();

        col.name = hdr
            .get_str(&format!("TTYPE{n}"))
            .ok_or_else(|| Error::MissingKey(format!("TTYPE{n}")))?
            .trim_end()
            .to_string();
        col.format = hdr
            .get_str(&format!("TFORM{n}"))
            .ok_or_else(|| Error::MissingKey(format!("TFORM{n}")))?
            .trim()
            .to_string();
        if let Some(unit) = hdr.get_str(&format!("TUNIT{n}")) {
            col.unit = unit.trim_end().into();
        }
        if let Some(card) = hdr.get(&format!("TNULL{n}")) {
            if let Some(value) = &card.value {
                col.null = match value {
                    crate::card::Value::Str(s) => s.clone(),
                    crate::card::Value::Int(v) => v.to_string(),
                    other => format!("{other:?}"),
                };
            }
        }
        col.bscale = hdr.get_float(&format!("TSCAL{n}")).unwrap_or(1.0);
        col.bzero = hdr.get_float(&format!("TZERO{n}")).unwrap_or(0.0);
        if let Some(disp) = hdr.get_str(&format!("TDISP{n}")) {
            col.display = disp.trim_end().into();
        }
        if let Some(dims) = hdr.get_str(&format!("TDIM{n}")) {
            col.dim = parse_tdim(dims)?;
        }
        if let Some(start) = hdr.get_int(&format!("TBCOL{n}")) {
            col.start = start;
        }

        if binary {
            col.codec = Codec::Binary;
            col.dtype = ColumnType::from_binary_form(&col.format)?;
            col.offset = offset;
        } else {
            col.codec = Codec::Text;
            col.dtype = ColumnType::from_ascii_form(&col.format)?;
            col.txtfmt = text_format(&col.format);
            // TBCOL is authoritative for the column start when present.
            col.offset = if col.start > 0 {
                (col.start - 1) as usize
            } else {
                offset
            };
        }
        offset = col.offset + col.dtype.row_bytes();

        colidx.insert(col.name.clone(), i);
        cols.push(col);
    }

    if binary && offset != rowsz {
        return Err(Error::InvalidHdu(format!(
            "columns span {offset} bytes per row, NAXIS1 is {rowsz}"
        )));
    }

    Ok(TableHdu {
        hdr,
        binary,
        data,
        heap,
        rowsz,
        nrows,
        cols,
        colidx,
    })
}

/// Parse a TDIM value such as `"(3,4)"`.
fn parse_tdim(s: &str) -> Result<Vec<i64>> {
    let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
    let mut dims = Vec::new();
    for tok in inner.split(',') {
        let tok = tok.trim();
        if tok.is_empty() {
            continue;
        }
        dims.push(tok.parse::<i64>().map_err(|_| {
            Error::MalformedCard(format!("unparseable TDIM value {s:?}"))
        })?);
    }
    Ok(dims)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BLOCK_SIZE;
    use crate::cell::Cell;
    use crate::encode::encode_hdu;
    use std::io::Cursor;

    #[test]
    fn parse_tdim_values() {
        assert_eq!(parse_tdim("(3,4)").unwrap(), vec![3, 4]);
        assert_eq!(parse_tdim("( 5 )").unwrap(), vec![5]);
        assert!(parse_tdim("(a,b)").is_err());
    }

    #[test]
    fn decode_empty_stream_yields_none() {
        let mut cur = Cursor::new(Vec::<u8>::new());
        assert!(decode_hdu(&mut cur).unwrap().is_none());
    }

    #[test]
    fn image_roundtrip_through_stream() {
        let mut img = ImageHdu::new_primary(16, &[3, 2]).unwrap();
        img.write(&[1i16, 2, 3, 4, 5, 6]).unwrap();

        let mut buf = Vec::new();
        encode_hdu(&mut buf, &Hdu::Image(img)).unwrap();
        assert_eq!(buf.len(), 2 * BLOCK_SIZE);

        let hdu = decode_hdu(&mut Cursor::new(&buf)).unwrap().unwrap();
        assert_eq!(hdu.kind(), HduKind::PrimaryImage);
        let mut back: Vec<i16> = Vec::new();
        hdu.as_image().unwrap().read(&mut back).unwrap();
        assert_eq!(back, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn binary_table_roundtrip_through_stream() {
        let mut table = TableHdu::new(
            "events",
            vec![
                crate::column::Column::new("ID", "1J"),
                crate::column::Column::new("E", "1D"),
            ],
            HduKind::BinaryTable,
        )
        .unwrap();
        table.push_row(&[Cell::I32(1), Cell::F64(0.25)]).unwrap();
        table.push_row(&[Cell::I32(2), Cell::F64(0.5)]).unwrap();
        table.freeze().unwrap();

        let mut buf = Vec::new();
        encode_hdu(&mut buf, &Hdu::Table(table)).unwrap();
        assert_eq!(buf.len() % BLOCK_SIZE, 0);

        let hdu = decode_hdu(&mut Cursor::new(&buf)).unwrap().unwrap();
        let t = hdu.as_table().unwrap();
        assert_eq!(t.kind(), HduKind::BinaryTable);
        assert_eq!(t.num_rows(), 2);
        assert_eq!(t.num_cols(), 2);
        assert_eq!(t.index("E"), Some(1));

        let mut rows = t.read(0, 2).unwrap();
        assert!(rows.next());
        let mut cells = vec![Cell::I32(0), Cell::F64(0.0)];
        rows.scan(&mut cells).unwrap();
        assert_eq!(cells, vec![Cell::I32(1), Cell::F64(0.25)]);
    }

    #[test]
    fn truncated_payload_is_error() {
        let mut img = ImageHdu::new_primary(8, &[100]).unwrap();
        img.write(&vec![7u8; 100]).unwrap();
        let mut buf = Vec::new();
        encode_hdu(&mut buf, &Hdu::Image(img)).unwrap();
        buf.truncate(BLOCK_SIZE + 50);
        assert!(matches!(
            decode_hdu(&mut Cursor::new(&buf)),
            Err(Error::Truncated(_))
        ));
    }

    #[test]
    fn table_missing_ttype_fails() {
        let mut table = TableHdu::new(
            "t",
            vec![crate::column::Column::new("A", "1J")],
            HduKind::BinaryTable,
        )
        .unwrap();
        table.freeze().unwrap();
        let mut buf = Vec::new();
        encode_hdu(&mut buf, &Hdu::Table(table)).unwrap();
        // Blank out the TTYPE1 card name.
        let pos = buf
            .windows(6)
            .position(|w| w == b"TTYPE1")
            .expect("TTYPE1 card present");
        buf[pos..pos + 8].copy_from_slice(b"XTYPE1  ");
        assert!(matches!(
            decode_hdu(&mut Cursor::new(&buf)),
            Err(Error::MissingKey(k)) if k == "TTYPE1"
        ));
    }

    #[test]
    fn binary_row_size_mismatch_fails() {
        let mut table = TableHdu::new(
            "t",
            vec![crate::column::Column::new("A", "1J")],
            HduKind::BinaryTable,
        )
        .unwrap();
        table.push_row(&[Cell::I32(5)]).unwrap();
        table.freeze().unwrap();
        let mut buf = Vec::new();
        encode_hdu(&mut buf, &Hdu::Table(table)).unwrap();
        // Rewrite TFORM1 from 1J to 1I so the column span disagrees with
        // NAXIS1.
        let pos = buf
            .windows(4)
            .position(|w| w == b"'1J ")
            .expect("TFORM1 value present");
        buf[pos + 2] = b'I';
        assert!(matches!(
            decode_hdu(&mut Cursor::new(&buf)),
            Err(Error::InvalidHdu(_))
        ));
    }
}
