//! Fixed-width hash values and the comparators that order them.

use std::cmp::Ordering;

/// A fixed-width hash value, treated as a bit string.
///
/// The trie never hashes anything itself. Items hand out their hash value
/// through the hash accessor given to the builder, and the bits of that value,
/// most significant bit of the first byte first, pick the slot at every level.
///
/// Two items whose hash values compare equal are duplicates: the trie keeps at
/// most one of them.
pub trait HashValue: Send + Sync + 'static {
    /// The width of the hash value in bytes.
    const SIZE: usize;

    /// Returns the bytes of the hash value. The slice is always `SIZE` bytes
    /// long.
    fn as_bytes(&self) -> &[u8];
}

impl<const N: usize> HashValue for [u8; N] {
    const SIZE: usize = N;

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        self
    }
}

/// A three-way comparator over hash values.
///
/// Only `Ordering::Equal` matters to the trie: it decides whether two items are
/// duplicates. The comparator must agree with the bytes of the hash value,
/// i.e. two values that are equal byte-for-byte must compare `Equal` and two
/// values that compare `Equal` must never be told apart by the trie's slot
/// indices.
///
/// Any `Fn(&H, &H) -> Ordering` closure is a comparator.
pub trait HashComparator<H: ?Sized>: Send + Sync {
    fn compare(&self, lhs: &H, rhs: &H) -> Ordering;
}

impl<H, F> HashComparator<H> for F
where
    H: ?Sized,
    F: Fn(&H, &H) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, lhs: &H, rhs: &H) -> Ordering {
        self(lhs, rhs)
    }
}

/// Compares hash values byte-wise, like `memcmp`.
///
/// This is the default comparator.
#[derive(Clone, Copy, Debug, Default)]
pub struct BitwiseComparator;

impl<H: HashValue> HashComparator<H> for BitwiseComparator {
    #[inline]
    fn compare(&self, lhs: &H, rhs: &H) -> Ordering {
        lhs.as_bytes().cmp(rhs.as_bytes())
    }
}
