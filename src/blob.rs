//! Fixed-size opaque byte blobs (signatures, digests, keys).

use serde::{de, ser};

use std::fmt;

/// An opaque, fixed-size byte blob.
///
/// Blobs are copied out of the image verbatim and never byte-swapped. The
/// `Debug` output is a hex string.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Blob<const N: usize>(pub [u8; N]);

/// 256-Byte RSA signature.
pub type Signature = Blob<0x100>;

/// 20-Byte SHA-1 digest.
pub type Digest = Blob<0x14>;

/// 16-Byte key or media ID.
pub type Key = Blob<0x10>;

impl<const N: usize> Blob<N> {
    /// Returns the blob's bytes.
    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> Default for Blob<N> {
    fn default() -> Self {
        Blob([0; N])
    }
}

impl<const N: usize> fmt::Debug for Blob<N> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "0x")?;
        for b in self.0.iter() {
            write!(f, "{:02X}", b)?;
        }
        Ok(())
    }
}

/// Decodes exactly `N` elements of a tuple into a `Blob<N>`.
struct BlobVisitor<const N: usize>;

impl<'de, const N: usize> de::Visitor<'de> for BlobVisitor<N> {
    type Value = Blob<N>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "byte blob ({} Bytes)", N)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut buf = [0; N];
        for (i, byte) in buf.iter_mut().enumerate() {
            *byte = seq
                .next_element()?
                .ok_or_else(|| de::Error::invalid_length(i, &self))?;
        }
        Ok(Blob(buf))
    }
}

impl<'de, const N: usize> de::Deserialize<'de> for Blob<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        // we use tuple instead of seq or bytes here since we know the length
        deserializer.deserialize_tuple(N, BlobVisitor::<N>)
    }
}

impl<const N: usize> ser::Serialize for Blob<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        use serde::ser::SerializeTuple;

        let mut tuple = serializer.serialize_tuple(N)?;
        for b in self.0.iter() {
            tuple.serialize_element(b)?;
        }
        tuple.end()
    }
}
