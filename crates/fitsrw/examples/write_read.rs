//! Build a small FITS file in memory, read it back, and print what was
//! found: the HDU list, a header listing, and the image pixels.

use std::io::Cursor;

use fitsrw::{Card, File, ImageHdu, Result};

fn main() -> Result<()> {
    let mut buf = Vec::new();

    {
        let mut out = File::create(&mut buf);

        let mut img = ImageHdu::new_primary(16, &[3, 2])?;
        img.header_mut().append([
            Card::new("OBJECT", "M57", "the Ring Nebula"),
            Card::new("EXPTIME", 120.0, "exposure time (s)"),
            Card::comment("written by the write_read example"),
        ])?;
        img.write(&[100i16, 200, 300, 400, 500, 600])?;
        out.write(img)?;
        out.close();
    }

    println!("encoded {} bytes", buf.len());

    let file = File::open(&mut Cursor::new(&buf))?;
    for (i, hdu) in file.hdus().iter().enumerate() {
        println!("HDU #{i}: kind={:?} name={:?}", hdu.kind(), hdu.name());
    }

    let hdu = file.hdu(0);
    print!("{}", hdu.header().text()?);

    let mut pixels: Vec<i16> = Vec::new();
    hdu.as_image().expect("primary is an image").read(&mut pixels)?;
    println!("pixels: {pixels:?}");

    Ok(())
}
