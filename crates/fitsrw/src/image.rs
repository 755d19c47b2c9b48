//! Image HDUs: the raw big-endian pixel block and its typed read/write
//! codec for the six supported pixel formats.

use crate::card::Card;
use crate::endian::*;
use crate::error::{Error, Result};
use crate::hdu::HduKind;
use crate::header::Header;

/// An element type an image payload can be read into or written from.
///
/// Reads permit any implementor whose width matches `|BITPIX| / 8`; the
/// stored canonical value converts element-wise. Writes require the
/// element type to match `BITPIX` exactly.
pub trait Pixel: Copy + Default + 'static {
    /// Element width in bytes.
    const WIDTH: usize;
    /// The BITPIX this type encodes as, if it is a storable type.
    const BITPIX: Option<i64>;

    /// Decode one element from big-endian bytes.
    fn decode_be(buf: &[u8]) -> Self;
    /// Encode one element to big-endian bytes.
    fn encode_be(self, buf: &mut [u8]);

    /// Convert from the canonical stored types, element-wise.
    fn from_u8(v: u8) -> Self;
    fn from_i16(v: i16) -> Self;
    fn from_i32(v: i32) -> Self;
    fn from_i64(v: i64) -> Self;
    fn from_f32(v: f32) -> Self;
    fn from_f64(v: f64) -> Self;
}

macro_rules! pixel_impl {
    ($ty:ty, $width:expr, $bitpix:expr, $read:path, $write:path) => {
        impl Pixel for $ty {
            const WIDTH: usize = $width;
            const BITPIX: Option<i64> = $bitpix;

            fn decode_be(buf: &[u8]) -> Self {
                $read(buf)
            }

            fn encode_be(self, buf: &mut [u8]) {
                $write(buf, self)
            }

            fn from_u8(v: u8) -> Self {
                v as $ty
            }

            fn from_i16(v: i16) -> Self {
                v as $ty
            }

            fn from_i32(v: i32) -> Self {
                v as $ty
            }

            fn from_i64(v: i64) -> Self {
                v as $ty
            }

            fn from_f32(v: f32) -> Self {
                v as $ty
            }

            fn from_f64(v: f64) -> Self {
                v as $ty
            }
        }
    };
}

pixel_impl!(u8, 1, Some(8), read_u8, write_u8);
pixel_impl!(i8, 1, Some(8), read_i8, write_i8);
pixel_impl!(i16, 2, Some(16), read_i16_be, write_i16_be);
pixel_impl!(u16, 2, None, read_u16_be, write_u16_be);
pixel_impl!(i32, 4, Some(32), read_i32_be, write_i32_be);
pixel_impl!(u32, 4, None, read_u32_be, write_u32_be);
pixel_impl!(i64, 8, Some(64), read_i64_be, write_i64_be);
pixel_impl!(u64, 8, None, read_u64_be, write_u64_be);
pixel_impl!(f32, 4, Some(-32), read_f32_be, write_f32_be);
pixel_impl!(f64, 8, Some(-64), read_f64_be, write_f64_be);

/// An image HDU: header plus the raw pixel block, stored big-endian.
#[derive(Debug, Clone)]
pub struct ImageHdu {
    pub(crate) hdr: Header,
    pub(crate) raw: Vec<u8>,
}

impl ImageHdu {
    /// Create an empty image extension with the given pixel format and
    /// axis lengths.
    pub fn new(bitpix: i64, axes: &[usize]) -> Result<ImageHdu> {
        Ok(ImageHdu {
            hdr: Header::new(Vec::new(), HduKind::ImageExtension, bitpix, axes)?,
            raw: Vec::new(),
        })
    }

    /// Create an empty primary image HDU, with `SIMPLE = T` leading the
    /// mandatory cards.
    pub fn new_primary(bitpix: i64, axes: &[usize]) -> Result<ImageHdu> {
        let mut cards = vec![
            Card::new("SIMPLE", true, "file does conform to FITS standard"),
            Card::new("BITPIX", bitpix, "number of bits per data pixel"),
            Card::new("NAXIS", axes.len(), "number of data axes"),
        ];
        for (i, &dim) in axes.iter().enumerate() {
            cards.push(Card::new(
                &format!("NAXIS{}", i + 1),
                dim,
                &format!("length of data axis {}", i + 1),
            ));
        }
        Ok(ImageHdu {
            hdr: Header::bare(cards, HduKind::PrimaryImage, bitpix, axes)?,
            raw: Vec::new(),
        })
    }

    pub(crate) fn from_parts(hdr: Header, raw: Vec<u8>) -> ImageHdu {
        ImageHdu { hdr, raw }
    }

    /// The header of this HDU.
    pub fn header(&self) -> &Header {
        &self.hdr
    }

    /// Mutable access to the header.
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.hdr
    }

    /// The raw big-endian pixel block.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Total number of pixels: the product of the axis lengths, zero when
    /// no axes are declared.
    pub fn num_pixels(&self) -> usize {
        if self.hdr.axes().is_empty() {
            return 0;
        }
        self.hdr.axes().iter().product()
    }

    fn pixel_size(&self) -> usize {
        (self.hdr.bitpix().unsigned_abs() as usize) / 8
    }

    /// Read the pixel block into `dest`, resizing it to the pixel count.
    ///
    /// `T` must have the stored element width; a type other than the
    /// canonical one for the header's BITPIX is converted element-wise.
    pub fn read<T: Pixel>(&self, dest: &mut Vec<T>) -> Result<()> {
        let nelmts = self.num_pixels();
        let pixsz = self.pixel_size();
        if T::WIDTH != pixsz {
            return Err(Error::TypeMismatch(format!(
                "element size {} does not match BITPIX {} (width {})",
                T::WIDTH,
                self.hdr.bitpix(),
                pixsz
            )));
        }
        if self.raw.len() < nelmts * pixsz {
            return Err(Error::Truncated("image data area"));
        }

        dest.clear();
        dest.reserve(nelmts);
        let chunks = self.raw[..nelmts * pixsz].chunks_exact(pixsz);
        match self.hdr.bitpix() {
            8 => dest.extend(chunks.map(|c| T::from_u8(read_u8(c)))),
            16 => dest.extend(chunks.map(|c| T::from_i16(read_i16_be(c)))),
            32 => dest.extend(chunks.map(|c| T::from_i32(read_i32_be(c)))),
            64 => dest.extend(chunks.map(|c| T::from_i64(read_i64_be(c)))),
            -32 => dest.extend(chunks.map(|c| T::from_f32(read_f32_be(c)))),
            -64 => dest.extend(chunks.map(|c| T::from_f64(read_f64_be(c)))),
            other => {
                return Err(Error::InvalidArg(format!("invalid BITPIX value {other}")));
            }
        }
        Ok(())
    }

    /// Replace the pixel block with `src`, serialised big-endian.
    ///
    /// `T` must match the header's BITPIX exactly, and `src` must hold
    /// one value per pixel. An image with no axes accepts no data and
    /// leaves the payload empty.
    pub fn write<T: Pixel>(&mut self, src: &[T]) -> Result<()> {
        if self.hdr.axes().is_empty() {
            return Ok(());
        }
        if T::BITPIX != Some(self.hdr.bitpix()) {
            return Err(Error::TypeMismatch(format!(
                "element type does not encode as BITPIX {}",
                self.hdr.bitpix()
            )));
        }
        let nelmts = self.num_pixels();
        if src.len() != nelmts {
            return Err(Error::InvalidArg(format!(
                "image holds {nelmts} pixels, got {} values",
                src.len()
            )));
        }

        self.raw = vec![0u8; nelmts * T::WIDTH];
        for (chunk, v) in self.raw.chunks_exact_mut(T::WIDTH).zip(src) {
            v.encode_be(chunk);
        }
        Ok(())
    }

    /// Finalise the header before encoding as an extension: prepend
    /// `XTENSION = 'IMAGE'` when absent.
    pub(crate) fn freeze(&mut self) -> Result<()> {
        if self.hdr.get("XTENSION").is_some() {
            return Ok(());
        }
        self.hdr
            .prepend([Card::new("XTENSION", "IMAGE   ", "IMAGE extension")])
    }
}
