/// Cuts a fixed-width hash value into per-level slot indices.
///
/// Level 0 is the head cut of `head_bits` bits. Every following level is an
/// array cut of `array_bits` bits. Bits are consumed most significant first,
/// starting at the first byte.
///
/// The splitter is restartable: [`cut`](#method.cut) computes the index of any
/// level directly from the hash bytes, without replaying the levels above it.
/// The `Iterator` impl walks the levels in order.
#[derive(Clone, Debug)]
pub(crate) struct HashSplitter<'h> {
    bytes: &'h [u8],
    head_bits: usize,
    array_bits: usize,
    level: usize,
}

impl<'h> HashSplitter<'h> {
    pub(crate) fn new(bytes: &'h [u8], head_bits: usize, array_bits: usize) -> Self {
        debug_assert!(head_bits <= usize::BITS as usize);
        debug_assert!(array_bits > 0 && array_bits <= usize::BITS as usize);
        Self {
            bytes,
            head_bits,
            array_bits,
            level: 0,
        }
    }

    /// Returns the index for `level`, or `None` if the hash has no bits left
    /// for it.
    pub(crate) fn cut(&self, level: usize) -> Option<usize> {
        let (offset, width) = self.bit_range(level)?;
        Some(extract_bits(self.bytes, offset, width))
    }

    /// Returns `true` if `level` is the deepest level the hash can address.
    pub(crate) fn is_last_level(&self, level: usize) -> bool {
        self.bit_range(level + 1).is_none()
    }

    /// Returns the bit offset of the cut for `level`.
    pub(crate) fn bit_offset(&self, level: usize) -> usize {
        if level == 0 {
            0
        } else {
            self.head_bits + (level - 1) * self.array_bits
        }
    }

    fn bit_range(&self, level: usize) -> Option<(usize, usize)> {
        let width = if level == 0 {
            self.head_bits
        } else {
            self.array_bits
        };
        let offset = self.bit_offset(level);
        if width == 0 || offset + width > self.bytes.len() * 8 {
            None
        } else {
            Some((offset, width))
        }
    }
}

impl Iterator for HashSplitter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.cut(self.level)?;
        self.level += 1;
        Some(index)
    }
}

/// Reads `count` bits starting at bit `offset` of `bytes`, most significant
/// bit first.
fn extract_bits(bytes: &[u8], offset: usize, count: usize) -> usize {
    let end = offset + count;
    let mut result = 0usize;
    let mut pos = offset;

    while pos < end {
        let byte = bytes[pos / 8];
        let bit_in_byte = pos % 8;
        let take = (8 - bit_in_byte).min(end - pos);
        let shift = 8 - bit_in_byte - take;
        let mask = ((1u16 << take) - 1) as u8;
        let chunk = (byte >> shift) & mask;

        result = (result << take) | chunk as usize;
        pos += take;
    }

    result
}
