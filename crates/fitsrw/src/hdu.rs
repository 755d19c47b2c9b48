//! Header-Data Unit kinds and the unit type itself.

use crate::header::Header;
use crate::image::ImageHdu;
use crate::table::TableHdu;

/// The kind of a Header-Data Unit, fixed at header parse or construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HduKind {
    /// The first HDU of a file: an image, possibly with zero axes.
    PrimaryImage,
    /// `XTENSION = 'IMAGE'`.
    ImageExtension,
    /// `XTENSION = 'TABLE'` — fixed-width text rows.
    AsciiTable,
    /// `XTENSION = 'BINTABLE'` — binary rows with an optional heap.
    BinaryTable,
}

impl HduKind {
    /// Returns `true` for the two image kinds.
    pub fn is_image(self) -> bool {
        matches!(self, HduKind::PrimaryImage | HduKind::ImageExtension)
    }

    /// Returns `true` for the two table kinds.
    pub fn is_table(self) -> bool {
        matches!(self, HduKind::AsciiTable | HduKind::BinaryTable)
    }
}

/// One Header-Data Unit: a header plus its typed payload.
#[derive(Debug, Clone)]
pub enum Hdu {
    /// An image payload (primary HDU or IMAGE extension).
    Image(ImageHdu),
    /// A table payload (TABLE or BINTABLE extension).
    Table(TableHdu),
}

impl Hdu {
    /// The kind of this HDU.
    pub fn kind(&self) -> HduKind {
        self.header().kind()
    }

    /// The header of this HDU.
    pub fn header(&self) -> &Header {
        match self {
            Hdu::Image(img) => img.header(),
            Hdu::Table(t) => t.header(),
        }
    }

    /// Mutable access to the header.
    pub fn header_mut(&mut self) -> &mut Header {
        match self {
            Hdu::Image(img) => img.header_mut(),
            Hdu::Table(t) => t.header_mut(),
        }
    }

    /// The extension name from `EXTNAME`. The primary HDU defaults to
    /// `"PRIMARY"`, extensions to the empty string.
    pub fn name(&self) -> &str {
        match self.header().get_str("EXTNAME") {
            Some(name) => name,
            None if self.kind() == HduKind::PrimaryImage => "PRIMARY",
            None => "",
        }
    }

    /// The extension version from `EXTVER`, defaulting to 1.
    pub fn version(&self) -> i64 {
        self.header().get_int("EXTVER").unwrap_or(1)
    }

    /// The image payload, if this HDU holds one.
    pub fn as_image(&self) -> Option<&ImageHdu> {
        match self {
            Hdu::Image(img) => Some(img),
            Hdu::Table(_) => None,
        }
    }

    /// The image payload, mutably.
    pub fn as_image_mut(&mut self) -> Option<&mut ImageHdu> {
        match self {
            Hdu::Image(img) => Some(img),
            Hdu::Table(_) => None,
        }
    }

    /// The table payload, if this HDU holds one.
    pub fn as_table(&self) -> Option<&TableHdu> {
        match self {
            Hdu::Image(_) => None,
            Hdu::Table(t) => Some(t),
        }
    }

    /// The table payload, mutably.
    pub fn as_table_mut(&mut self) -> Option<&mut TableHdu> {
        match self {
            Hdu::Image(_) => None,
            Hdu::Table(t) => Some(t),
        }
    }
}

impl From<ImageHdu> for Hdu {
    fn from(img: ImageHdu) -> Hdu {
        Hdu::Image(img)
    }
}

impl From<TableHdu> for Hdu {
    fn from(t: TableHdu) -> Hdu {
        Hdu::Table(t)
    }
}
