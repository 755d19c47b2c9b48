//! Header container: ordered cards plus the derived HDU kind, BITPIX and
//! axes, with block-aligned decode and encode.

use std::io::{Read, Write};

use crate::block::{pad_block, BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE, TEXT_PAD_BYTE};
use crate::card::{make_card_lines, parse_card_line, Card, Value};
use crate::error::{Error, Result};
use crate::hdu::HduKind;

/// Largest number of axes a header may declare.
pub const MAX_AXES: usize = 999;

const VALID_BITPIX: [i64; 6] = [8, 16, 32, 64, -32, -64];

/// The header half of a Header-Data Unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    kind: HduKind,
    bitpix: i64,
    axes: Vec<usize>,
    cards: Vec<Card>,
}

impl Header {
    /// Create a new header of the given kind, appending `cards` and then
    /// inserting any missing mandatory cards (`BITPIX`, `NAXIS`,
    /// `NAXIS1…NAXISn`) ahead of the user keys, directly after a leading
    /// `SIMPLE`/`XTENSION` card when one exists.
    pub fn new(cards: Vec<Card>, kind: HduKind, bitpix: i64, axes: &[usize]) -> Result<Header> {
        if !VALID_BITPIX.contains(&bitpix) {
            return Err(Error::InvalidArg(format!("invalid BITPIX value {bitpix}")));
        }
        if axes.len() > MAX_AXES {
            return Err(Error::InvalidArg(format!(
                "too many axes ({} > {MAX_AXES})",
                axes.len()
            )));
        }

        let mut hdr = Header {
            kind,
            bitpix,
            axes: axes.to_vec(),
            cards: Vec::with_capacity(cards.len()),
        };
        hdr.append(cards)?;

        let mut dcards = Vec::with_capacity(2 + axes.len());
        if hdr.get("BITPIX").is_none() {
            dcards.push(Card::new("BITPIX", bitpix, "number of bits per data pixel"));
        }
        if hdr.get("NAXIS").is_none() {
            dcards.push(Card::new("NAXIS", axes.len(), "number of data axes"));
        }
        for (i, &dim) in axes.iter().enumerate() {
            let key = format!("NAXIS{}", i + 1);
            if hdr.get(&key).is_none() {
                dcards.push(Card::new(
                    &key,
                    dim,
                    &format!("length of data axis {}", i + 1),
                ));
            }
        }
        // Mandatory cards go ahead of user keys, but never ahead of the
        // classification card.
        let pos = hdr
            .cards
            .iter()
            .position(|c| c.name == "SIMPLE" || c.name == "XTENSION")
            .map_or(0, |i| i + 1);
        for (k, card) in dcards.into_iter().enumerate() {
            hdr.cards.insert(pos + k, card);
        }
        Ok(hdr)
    }

    /// Like [`Header::new`] but without materialising mandatory cards;
    /// used by the table builder, whose freeze step prepends the full
    /// mandatory block in canonical order just before encoding.
    pub(crate) fn bare(
        cards: Vec<Card>,
        kind: HduKind,
        bitpix: i64,
        axes: &[usize],
    ) -> Result<Header> {
        if !VALID_BITPIX.contains(&bitpix) {
            return Err(Error::InvalidArg(format!("invalid BITPIX value {bitpix}")));
        }
        if axes.len() > MAX_AXES {
            return Err(Error::InvalidArg(format!(
                "too many axes ({} > {MAX_AXES})",
                axes.len()
            )));
        }
        let mut hdr = Header {
            kind,
            bitpix,
            axes: axes.to_vec(),
            cards: Vec::with_capacity(cards.len()),
        };
        hdr.append(cards)?;
        Ok(hdr)
    }

    /// A default primary-image header: `SIMPLE = T`, `BITPIX = 8`, no axes.
    pub fn default_primary() -> Header {
        Header::new(
            vec![
                Card::new("SIMPLE", true, "file does conform to FITS standard"),
                Card::new("BITPIX", 8, "number of bits per data pixel"),
                Card::new("NAXIS", 0, "number of data axes"),
            ],
            HduKind::PrimaryImage,
            8,
            &[],
        )
        .expect("default header is valid")
    }

    /// The HDU kind derived at construction or decode time.
    pub fn kind(&self) -> HduKind {
        self.kind
    }

    pub(crate) fn set_kind(&mut self, kind: HduKind) {
        self.kind = kind;
    }

    /// The BITPIX value.
    pub fn bitpix(&self) -> i64 {
        self.bitpix
    }

    /// The axis lengths (`NAXIS1…NAXISn`).
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub(crate) fn set_axis(&mut self, i: usize, len: usize) {
        self.axes[i] = len;
    }

    /// All cards in insertion order.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// The i-th card.
    pub fn card(&self, i: usize) -> &Card {
        &self.cards[i]
    }

    /// Number of cards.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if the header holds no cards.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Append cards. A card whose name already exists fails with
    /// [`Error::DuplicateKey`], except the free-form names `COMMENT`,
    /// `HISTORY` and blank; `END` cards are skipped.
    pub fn append(&mut self, cards: impl IntoIterator<Item = Card>) -> Result<()> {
        for card in cards {
            if card.name == "END" {
                continue;
            }
            if !card.is_commentary() && self.get(&card.name).is_some() {
                return Err(Error::DuplicateKey(card.name));
            }
            self.cards.push(card);
        }
        Ok(())
    }

    /// Insert cards at the head of the header so mandatory keys precede
    /// user keys. Duplicate handling matches [`Header::append`].
    pub fn prepend(&mut self, cards: impl IntoIterator<Item = Card>) -> Result<()> {
        let mut head: Vec<Card> = Vec::new();
        for card in cards {
            if card.name == "END" {
                continue;
            }
            if card.is_commentary() {
                self.cards.push(card);
                continue;
            }
            if self.get(&card.name).is_some() || head.iter().any(|c| c.name == card.name) {
                return Err(Error::DuplicateKey(card.name));
            }
            head.push(card);
        }
        head.append(&mut self.cards);
        self.cards = head;
        Ok(())
    }

    /// First card with name `name`, in insertion order.
    pub fn get(&self, name: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.name == name)
    }

    /// Index of the first card with name `name`.
    pub fn index(&self, name: &str) -> Option<usize> {
        self.cards.iter().position(|c| c.name == name)
    }

    /// Update the value and comment of the named card in place, appending
    /// a new card if the name is absent.
    pub fn set(&mut self, name: &str, value: impl Into<Value>, comment: &str) {
        match self.cards.iter_mut().find(|c| c.name == name) {
            Some(card) => {
                card.value = Some(value.into());
                card.comment = comment.into();
            }
            None => self.cards.push(Card::new(name, value, comment)),
        }
    }

    /// Names of all user cards, excluding `COMMENT`, `HISTORY`, blank and
    /// `END`.
    pub fn keys(&self) -> Vec<&str> {
        self.cards
            .iter()
            .filter(|c| !c.is_commentary() && c.name != "END")
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Integer value of the named card, if present.
    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|c| c.value.as_ref()?.as_int())
    }

    /// Float value of the named card (integers convert), if present.
    pub fn get_float(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(|c| c.value.as_ref()?.as_float())
    }

    /// String value of the named card, if present.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|c| c.value.as_ref()?.as_str())
    }

    /// Logical value of the named card, if present.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|c| c.value.as_ref()?.as_bool())
    }

    /// The header rendered as consecutive 80-byte card lines, without the
    /// trailing `END` card or block padding. Handy for listings.
    pub fn text(&self) -> Result<String> {
        let mut out = String::with_capacity(self.cards.len() * CARD_SIZE);
        for card in &self.cards {
            let lines = make_card_lines(card)?;
            out.push_str(&String::from_utf8_lossy(&lines));
        }
        Ok(out)
    }

    // ── Decoding ──

    /// Decode a header from consecutive 2880-byte blocks, stopping at the
    /// `END` card. Returns `None` on a clean end-of-stream before the first
    /// block; a partial block is a [`Error::Truncated`] failure.
    ///
    /// `CONTINUE` records are folded into the preceding card's string
    /// value. Duplicate non-free-form keys are silently dropped, first one
    /// wins; user [`Header::append`] stays strict.
    pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Option<Header>> {
        let mut cards: Vec<Card> = Vec::new();
        let mut block = [0u8; BLOCK_SIZE];
        let mut first = true;

        'blocks: loop {
            match read_block(r, &mut block, first)? {
                BlockRead::CleanEof => return Ok(None),
                BlockRead::Full => {}
            }
            first = false;

            for i in 0..CARDS_PER_BLOCK {
                let line = &block[i * CARD_SIZE..(i + 1) * CARD_SIZE];
                let card = parse_card_line(line)?;
                match card.name.as_str() {
                    "END" => break 'blocks,
                    "CONTINUE" => {
                        if let Some(last) = cards.last_mut() {
                            if let Some(Value::Str(s)) = &mut last.value {
                                if !s.is_empty() {
                                    s.pop(); // drop the '&' marker
                                    s.push_str(&card.comment);
                                }
                            }
                        }
                    }
                    _ => {
                        let dup = !card.is_commentary()
                            && cards.iter().any(|c| c.name == card.name);
                        if !dup {
                            cards.push(card);
                        }
                    }
                }
            }
        }

        let bitpix = find_int(&cards, "BITPIX")
            .ok_or_else(|| Error::MissingKey("BITPIX".into()))?;
        let naxis = find_int(&cards, "NAXIS")
            .ok_or_else(|| Error::MissingKey("NAXIS".into()))? as usize;
        if naxis > MAX_AXES {
            return Err(Error::InvalidArg(format!(
                "too many axes ({naxis} > {MAX_AXES})"
            )));
        }
        let mut axes = Vec::with_capacity(naxis);
        for i in 1..=naxis {
            let key = format!("NAXIS{i}");
            let dim =
                find_int(&cards, &key).ok_or_else(|| Error::MissingKey(key.clone()))?;
            if dim < 0 {
                return Err(Error::InvalidHdu(format!("negative {key}")));
            }
            axes.push(dim as usize);
        }

        let kind = classify(&cards)?;
        Header::new(cards, kind, bitpix, &axes).map(Some)
    }

    // ── Encoding ──

    /// Serialize the header: every card, the `END` card, then ASCII-space
    /// padding up to the next block boundary.
    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity((self.cards.len() + 1) * CARD_SIZE);
        for card in &self.cards {
            buf.extend_from_slice(&make_card_lines(card)?);
        }
        buf.extend_from_slice(&make_card_lines(&Card {
            name: "END".into(),
            ..Card::default()
        })?);
        let pad = pad_block(buf.len());
        buf.extend(std::iter::repeat_n(TEXT_PAD_BYTE, pad));
        w.write_all(&buf)?;
        Ok(())
    }
}

enum BlockRead {
    Full,
    CleanEof,
}

/// Read exactly one block. On the first block of an HDU a clean EOF (zero
/// bytes available) is reported as such; anything short of a full block is
/// a truncation error.
fn read_block<R: Read + ?Sized>(
    r: &mut R,
    block: &mut [u8; BLOCK_SIZE],
    allow_eof: bool,
) -> Result<BlockRead> {
    let mut off = 0;
    while off < BLOCK_SIZE {
        let n = r.read(&mut block[off..])?;
        if n == 0 {
            if off == 0 && allow_eof {
                return Ok(BlockRead::CleanEof);
            }
            return Err(Error::Truncated("header block"));
        }
        off += n;
    }
    Ok(BlockRead::Full)
}

fn find_int(cards: &[Card], name: &str) -> Option<i64> {
    cards
        .iter()
        .find(|c| c.name == name)
        .and_then(|c| c.value.as_ref()?.as_int())
}

/// Classify an HDU from its header cards: the first non-commentary card
/// must be `SIMPLE` (primary image) or `XTENSION` with a recognised type.
fn classify(cards: &[Card]) -> Result<HduKind> {
    for card in cards {
        if card.is_commentary() {
            continue;
        }
        match card.name.as_str() {
            "SIMPLE" => return Ok(HduKind::PrimaryImage),
            "XTENSION" => {
                let ext = card
                    .value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                return match ext.trim_end() {
                    "IMAGE" => Ok(HduKind::ImageExtension),
                    "TABLE" => Ok(HduKind::AsciiTable),
                    "BINTABLE" => Ok(HduKind::BinaryTable),
                    other => Err(Error::InvalidHdu(format!(
                        "unrecognised XTENSION value {other:?}"
                    ))),
                };
            }
            other => {
                return Err(Error::InvalidHdu(format!(
                    "first content card is {other:?}, expected SIMPLE or XTENSION"
                )));
            }
        }
    }
    Err(Error::InvalidHdu(
        "header has neither SIMPLE nor XTENSION".into(),
    ))
}
