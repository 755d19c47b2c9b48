//! File orchestration: sequential decode of all HDUs, ordered and
//! name-indexed lookup, and the write path that enforces the
//! primary-HDU-first rule.

use std::io::{Read, Write};

use crate::card::Card;
use crate::decode::decode_hdu;
use crate::encode::encode_hdu;
use crate::error::{Error, Result};
use crate::hdu::{Hdu, HduKind};

/// Access mode of a FITS file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Opened over a byte source; writes are rejected.
    ReadOnly,
    /// Created over a byte sink; holds only HDUs written through it.
    WriteOnly,
    /// Reserved for byte streams that support both directions.
    ReadWrite,
}

/// A FITS file: an ordered sequence of HDUs, the first of which is
/// always a primary image HDU.
///
/// [`File::close`] releases the HDU list and the sink borrow; it is
/// idempotent and never closes the underlying stream.
pub struct File<'io> {
    mode: Mode,
    name: String,
    hdus: Vec<Hdu>,
    sink: Option<&'io mut dyn Write>,
}

impl<'io> File<'io> {
    /// Open a file in read-only mode, eagerly decoding every HDU from
    /// the byte source until a clean end of stream. The primary image
    /// HDU must come first, and only first.
    pub fn open<R: Read + ?Sized>(r: &mut R) -> Result<File<'io>> {
        let mut hdus = Vec::new();
        while let Some(hdu) = decode_hdu(r)? {
            let primary = hdu.kind() == HduKind::PrimaryImage;
            if hdus.is_empty() && !primary {
                return Err(Error::InvalidHdu(
                    "first HDU is not a primary image".into(),
                ));
            }
            if !hdus.is_empty() && primary {
                return Err(Error::InvalidHdu(
                    "primary HDU after the first position".into(),
                ));
            }
            hdus.push(hdu);
        }
        Ok(File {
            mode: Mode::ReadOnly,
            name: String::new(),
            hdus,
            sink: None,
        })
    }

    /// Create an empty file in write-only mode over the byte sink.
    pub fn create(w: &'io mut dyn Write) -> File<'io> {
        File {
            mode: Mode::WriteOnly,
            name: String::new(),
            hdus: Vec::new(),
            sink: Some(w),
        }
    }

    /// The access mode.
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The file name, if one was attached.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attach a name to the file.
    pub fn set_name(&mut self, name: &str) {
        self.name = name.into();
    }

    /// All HDUs in file order.
    pub fn hdus(&self) -> &[Hdu] {
        &self.hdus
    }

    /// The i-th HDU.
    pub fn hdu(&self, i: usize) -> &Hdu {
        &self.hdus[i]
    }

    /// The first HDU named `name`, if any.
    pub fn get(&self, name: &str) -> Option<&Hdu> {
        self.hdus.iter().find(|hdu| hdu.name() == name)
    }

    /// Returns `true` if an HDU named `name` exists.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Write an HDU to the file.
    ///
    /// The first HDU must be an image; a missing `SIMPLE` card is
    /// prepended and the HDU becomes the primary. Later HDUs are frozen
    /// (mandatory extension cards materialised, row counts reconciled)
    /// before encoding. Writing a second primary HDU fails with
    /// [`Error::DuplicatePrimary`].
    pub fn write(&mut self, hdu: impl Into<Hdu>) -> Result<()> {
        let mut hdu = hdu.into();
        if self.mode == Mode::ReadOnly {
            return Err(Error::InvalidArg("file not open for writing".into()));
        }

        if self.hdus.is_empty() {
            let Hdu::Image(img) = &mut hdu else {
                return Err(Error::InvalidArg(
                    "file has no primary HDU; write an image first".into(),
                ));
            };
            if img.header().get("SIMPLE").is_none() {
                img.header_mut()
                    .prepend([Card::new("SIMPLE", true, "primary HDU")])?;
            }
            img.header_mut().set_kind(HduKind::PrimaryImage);
        } else {
            if hdu.kind() == HduKind::PrimaryImage {
                return Err(Error::DuplicatePrimary);
            }
            match &mut hdu {
                Hdu::Image(img) => img.freeze()?,
                Hdu::Table(t) => t.freeze()?,
            }
        }

        let sink = self
            .sink
            .as_deref_mut()
            .ok_or_else(|| Error::InvalidArg("file not open for writing".into()))?;
        encode_hdu(sink, &hdu)?;
        self.hdus.push(hdu);
        Ok(())
    }

    /// Release the HDU list and the sink borrow. Idempotent; the
    /// underlying stream stays open.
    pub fn close(&mut self) {
        self.hdus.clear();
        self.sink = None;
    }
}

/// Copy the i-th HDU of `src` into `dst`, re-encoding it through
/// [`File::write`].
pub fn copy_hdu(dst: &mut File<'_>, src: &File<'_>, i: usize) -> Result<()> {
    let hdu = src
        .hdus()
        .get(i)
        .ok_or_else(|| Error::InvalidArg(format!("no HDU at index {i}")))?;
    dst.write(hdu.clone())
}
