//! Image HDU behaviour through whole-file cycles: the pixel conversion
//! matrix, multi-HDU files, display wrappers and degenerate shapes.

use std::io::Cursor;

use fitsrw::{
    Card, DisplayImage, Error, File, HduKind, ImageHdu, BLOCK_SIZE,
};

fn cycle(hdus: Vec<ImageHdu>) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut f = File::create(&mut buf);
    for hdu in hdus {
        f.write(hdu).unwrap();
    }
    f.close();
    buf
}

// ── Conversion matrix ──

#[test]
fn bitpix_8_reads_into_both_byte_types() {
    let mut img = ImageHdu::new_primary(8, &[4]).unwrap();
    img.write(&[0u8, 127, 128, 255]).unwrap();
    let buf = cycle(vec![img]);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let img = f.hdu(0).as_image().unwrap();

    let mut unsigned: Vec<u8> = Vec::new();
    img.read(&mut unsigned).unwrap();
    assert_eq!(unsigned, vec![0, 127, 128, 255]);

    // Same width, different signedness: values convert numerically.
    let mut signed: Vec<i8> = Vec::new();
    img.read(&mut signed).unwrap();
    assert_eq!(signed, vec![0, 127, -128, -1]);
}

#[test]
fn bitpix_16_reads_into_unsigned_of_same_width() {
    let mut img = ImageHdu::new_primary(16, &[3]).unwrap();
    img.write(&[-1i16, 0, 257]).unwrap();
    let buf = cycle(vec![img]);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();

    let mut vals: Vec<u16> = Vec::new();
    f.hdu(0).as_image().unwrap().read(&mut vals).unwrap();
    assert_eq!(vals, vec![u16::MAX, 0, 257]);
}

#[test]
fn bitpix_32_reads_into_f32_numerically() {
    let mut img = ImageHdu::new_primary(32, &[3]).unwrap();
    img.write(&[-7i32, 0, 1_000_000]).unwrap();
    let buf = cycle(vec![img]);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();

    // Width matches (4 bytes), so the stored integers convert
    // element-wise rather than being reinterpreted.
    let mut vals: Vec<f32> = Vec::new();
    f.hdu(0).as_image().unwrap().read(&mut vals).unwrap();
    assert_eq!(vals, vec![-7.0, 0.0, 1_000_000.0]);
}

#[test]
fn bitpix_minus_64_rejects_narrow_sink() {
    let mut img = ImageHdu::new_primary(-64, &[2]).unwrap();
    img.write(&[1.0f64, 2.0]).unwrap();
    let buf = cycle(vec![img]);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();

    let mut vals: Vec<f32> = Vec::new();
    assert!(matches!(
        f.hdu(0).as_image().unwrap().read(&mut vals),
        Err(Error::TypeMismatch(_))
    ));
}

#[test]
fn three_dimensional_cube_roundtrips() {
    let mut img = ImageHdu::new_primary(16, &[2, 3, 4]).unwrap();
    let data: Vec<i16> = (0..24).collect();
    img.write(&data).unwrap();
    let buf = cycle(vec![img]);

    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let img = f.hdu(0).as_image().unwrap();
    assert_eq!(img.header().axes(), &[2, 3, 4]);
    assert_eq!(img.num_pixels(), 24);
    let mut back: Vec<i16> = Vec::new();
    img.read(&mut back).unwrap();
    assert_eq!(back, data);
}

// ── Multi-HDU files ──

#[test]
fn several_image_extensions_in_one_file() {
    let primary = ImageHdu::new_primary(8, &[]).unwrap();

    let mut sci = ImageHdu::new(-32, &[4, 2]).unwrap();
    sci.header_mut()
        .append([Card::new("EXTNAME", "SCI", "")])
        .unwrap();
    sci.write(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]).unwrap();

    let mut err = ImageHdu::new(-32, &[4, 2]).unwrap();
    err.header_mut()
        .append([Card::new("EXTNAME", "ERR", "")])
        .unwrap();
    err.write(&[0.1f32; 8]).unwrap();

    let buf = cycle(vec![primary, sci, err]);
    assert_eq!(buf.len(), 5 * BLOCK_SIZE);

    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    assert_eq!(f.hdus().len(), 3);
    assert_eq!(f.hdu(1).kind(), HduKind::ImageExtension);
    assert_eq!(f.hdu(2).kind(), HduKind::ImageExtension);

    let mut sci_back: Vec<f32> = Vec::new();
    f.get("SCI")
        .unwrap()
        .as_image()
        .unwrap()
        .read(&mut sci_back)
        .unwrap();
    assert_eq!(sci_back, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

    let mut err_back: Vec<f32> = Vec::new();
    f.get("ERR")
        .unwrap()
        .as_image()
        .unwrap()
        .read(&mut err_back)
        .unwrap();
    assert_eq!(err_back, vec![0.1; 8]);
}

#[test]
fn extension_headers_carry_image_xtension() {
    let primary = ImageHdu::new_primary(8, &[]).unwrap();
    let mut ext = ImageHdu::new(8, &[2]).unwrap();
    ext.write(&[9u8, 8]).unwrap();
    let buf = cycle(vec![primary, ext]);

    // The second header block begins with the XTENSION card.
    let second = &buf[BLOCK_SIZE..BLOCK_SIZE + 80];
    let text = std::str::from_utf8(second).unwrap();
    assert!(text.starts_with("XTENSION= 'IMAGE   '"), "line: {text:?}");
}

// ── Display wrappers through a cycle ──

#[test]
fn display_from_decoded_float_image() {
    let mut img = ImageHdu::new_primary(-32, &[2, 2]).unwrap();
    img.write(&[0.0f32, 1.0, 2.0, 4.0]).unwrap();
    let buf = cycle(vec![img]);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();

    match f.hdu(0).as_image().unwrap().display().unwrap() {
        DisplayImage::GrayFloat(g) => {
            assert_eq!((g.width(), g.height()), (2, 2));
            assert_eq!(g.min(), 0.0);
            assert_eq!(g.max(), 4.0);
            assert_eq!(g.intensity(1, 0), 0.25);
            assert_eq!(g.intensity(1, 1), 1.0);
        }
        other => panic!("expected GrayFloat, got {other:?}"),
    }
}

#[test]
fn display_from_decoded_gray16() {
    let mut img = ImageHdu::new_primary(16, &[2, 1]).unwrap();
    img.write(&[0x0102i16, 0x0304]).unwrap();
    let buf = cycle(vec![img]);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();

    match f.hdu(0).as_image().unwrap().display().unwrap() {
        DisplayImage::Gray16 { width, height, pix } => {
            assert_eq!((width, height), (2, 1));
            assert_eq!(pix, vec![1, 2, 3, 4]);
        }
        other => panic!("expected Gray16, got {other:?}"),
    }
}

#[test]
fn display_rejected_for_header_only_image() {
    let img = ImageHdu::new_primary(8, &[]).unwrap();
    assert!(matches!(img.display(), Err(Error::InvalidArg(_))));
}

// ── Degenerate and erroneous shapes ──

#[test]
fn zero_length_axis_image_roundtrips_empty() {
    let mut img = ImageHdu::new_primary(-64, &[0, 10]).unwrap();
    img.write::<f64>(&[]).unwrap();
    let buf = cycle(vec![img]);
    assert_eq!(buf.len(), BLOCK_SIZE);

    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let img = f.hdu(0).as_image().unwrap();
    assert_eq!(img.num_pixels(), 0);
    let mut back: Vec<f64> = Vec::new();
    img.read(&mut back).unwrap();
    assert!(back.is_empty());
}

#[test]
fn invalid_bitpix_is_rejected_at_construction() {
    assert!(matches!(
        ImageHdu::new_primary(13, &[2]),
        Err(Error::InvalidArg(_))
    ));
    assert!(matches!(
        ImageHdu::new(-16, &[2]),
        Err(Error::InvalidArg(_))
    ));
}

#[test]
fn too_many_axes_rejected() {
    let axes = vec![1usize; 1000];
    assert!(matches!(
        ImageHdu::new_primary(8, &axes),
        Err(Error::InvalidArg(_))
    ));
}
