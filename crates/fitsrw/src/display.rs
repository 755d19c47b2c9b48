//! Byte-level display wrappers over an image payload.
//!
//! This is the only rendering-adjacent surface of the crate: it exposes
//! the raw bytes reshaped for a viewer, with min/max normalisation for
//! float images. Colour mapping and gamma stay with the caller.

use crate::error::{Error, Result};
use crate::image::ImageHdu;

/// A float-gray plane with the value range scanned at construction.
#[derive(Debug, Clone)]
pub struct FloatGray {
    width: usize,
    height: usize,
    values: Vec<f64>,
    min: f64,
    max: f64,
}

impl FloatGray {
    fn new(width: usize, height: usize, values: Vec<f64>) -> FloatGray {
        let mut min = f64::MAX;
        let mut max = f64::MIN;
        for &v in &values {
            if v < min {
                min = v;
            }
            if v > max {
                max = v;
            }
        }
        FloatGray {
            width,
            height,
            values,
            min,
            max,
        }
    }

    /// Plane width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Plane height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Smallest sample value.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest sample value.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Display intensity at `(x, y)`: the sample mapped linearly from
    /// `[min, max]` onto `[0, 1]`.
    pub fn intensity(&self, x: usize, y: usize) -> f64 {
        let v = self.values[y * self.width + x];
        if self.max == self.min {
            return 0.0;
        }
        ((v - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }
}

/// An image payload reshaped for display.
///
/// Integer formats expose the raw bytes with a row stride; float formats
/// come normalised through [`FloatGray`].
#[derive(Debug, Clone)]
pub enum DisplayImage {
    /// BITPIX 8: one gray byte per pixel.
    Gray8 {
        width: usize,
        height: usize,
        pix: Vec<u8>,
    },
    /// BITPIX 16: big-endian 16-bit gray.
    Gray16 {
        width: usize,
        height: usize,
        pix: Vec<u8>,
    },
    /// BITPIX 32: four bytes per pixel, RGBA-shaped.
    Rgba32 {
        width: usize,
        height: usize,
        pix: Vec<u8>,
    },
    /// BITPIX 64: eight bytes per pixel, wide-RGBA-shaped.
    Rgba64 {
        width: usize,
        height: usize,
        pix: Vec<u8>,
    },
    /// BITPIX -32 or -64: normalised float gray.
    GrayFloat(FloatGray),
}

impl DisplayImage {
    /// Image width in pixels.
    pub fn width(&self) -> usize {
        match self {
            DisplayImage::Gray8 { width, .. }
            | DisplayImage::Gray16 { width, .. }
            | DisplayImage::Rgba32 { width, .. }
            | DisplayImage::Rgba64 { width, .. } => *width,
            DisplayImage::GrayFloat(g) => g.width(),
        }
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        match self {
            DisplayImage::Gray8 { height, .. }
            | DisplayImage::Gray16 { height, .. }
            | DisplayImage::Rgba32 { height, .. }
            | DisplayImage::Rgba64 { height, .. } => *height,
            DisplayImage::GrayFloat(g) => g.height(),
        }
    }
}

impl ImageHdu {
    /// Reshape the payload for display. Requires at least two axes, both
    /// positive. `BSCALE`/`BZERO`, when present, are applied to a scratch
    /// copy of the data; the payload itself is untouched.
    pub fn display(&self) -> Result<DisplayImage> {
        let axes = self.header().axes();
        if axes.len() < 2 || axes[0] == 0 || axes[1] == 0 {
            return Err(Error::InvalidArg(
                "display conversion needs two positive axes".into(),
            ));
        }
        let (w, h) = (axes[0], axes[1]);
        let bscale = self.header().get_float("BSCALE").unwrap_or(1.0);
        let bzero = self.header().get_float("BZERO").unwrap_or(0.0);
        let rescale = bscale != 1.0 || bzero != 0.0;

        let npix = w * h;
        match self.header().bitpix() {
            8 => {
                let mut pix = Vec::with_capacity(npix);
                self.read::<u8>(&mut pix)?;
                pix.truncate(npix);
                if rescale {
                    for v in &mut pix {
                        *v = (*v as f64 * bscale + bzero) as u8;
                    }
                }
                Ok(DisplayImage::Gray8 {
                    width: w,
                    height: h,
                    pix,
                })
            }
            16 => {
                let mut vals: Vec<i16> = Vec::new();
                self.read(&mut vals)?;
                vals.truncate(npix);
                let mut pix = vec![0u8; npix * 2];
                for (chunk, v) in pix.chunks_exact_mut(2).zip(&vals) {
                    let v = if rescale {
                        (*v as f64 * bscale + bzero) as i16
                    } else {
                        *v
                    };
                    chunk.copy_from_slice(&v.to_be_bytes());
                }
                Ok(DisplayImage::Gray16 {
                    width: w,
                    height: h,
                    pix,
                })
            }
            32 => Ok(DisplayImage::Rgba32 {
                width: w,
                height: h,
                pix: self.raw()[..npix * 4].to_vec(),
            }),
            64 => Ok(DisplayImage::Rgba64 {
                width: w,
                height: h,
                pix: self.raw()[..npix * 8].to_vec(),
            }),
            -32 => {
                let mut vals: Vec<f32> = Vec::new();
                self.read(&mut vals)?;
                vals.truncate(npix);
                let values = vals
                    .iter()
                    .map(|&v| v as f64 * bscale + bzero)
                    .collect();
                Ok(DisplayImage::GrayFloat(FloatGray::new(w, h, values)))
            }
            -64 => {
                let mut vals: Vec<f64> = Vec::new();
                self.read(&mut vals)?;
                vals.truncate(npix);
                let values = vals.iter().map(|&v| v * bscale + bzero).collect();
                Ok(DisplayImage::GrayFloat(FloatGray::new(w, h, values)))
            }
            other => Err(Error::InvalidArg(format!("invalid BITPIX value {other}"))),
        }
    }
}
