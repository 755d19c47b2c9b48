/// FITS block size in bytes (every top-level structure is block-aligned).
pub const BLOCK_SIZE: usize = 2880;

/// FITS header card (keyword record) size in bytes.
pub const CARD_SIZE: usize = 80;

/// Number of cards that fit in a single header block.
pub const CARDS_PER_BLOCK: usize = BLOCK_SIZE / CARD_SIZE;

/// Padding byte for header blocks and ASCII table payloads (ASCII space).
pub const TEXT_PAD_BYTE: u8 = 0x20;

/// Padding byte for image and binary-table payloads (zero).
pub const DATA_PAD_BYTE: u8 = 0x00;

/// Returns `num_bytes` rounded up to the next multiple of [`BLOCK_SIZE`].
pub const fn align_block(num_bytes: usize) -> usize {
    num_bytes + pad_block(num_bytes)
}

/// Returns the number of padding bytes needed to align `num_bytes` to a
/// block boundary.
pub const fn pad_block(num_bytes: usize) -> usize {
    (BLOCK_SIZE - num_bytes % BLOCK_SIZE) % BLOCK_SIZE
}
