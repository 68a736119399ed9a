/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! FAST presence map handling.
//!
//! The presence map (PMAP) is a bitmap that indicates which fields are
//! transmitted in a FAST message. It uses stop-bit encoding where the high
//! bit of each byte marks the last byte of the map; the remaining seven bits
//! of each byte are map bits, most significant first.

use crate::error::FastError;
use smallvec::SmallVec;

/// Bits held inline before spilling to the heap (four map bytes).
const INLINE_BITS: usize = 28;

/// FAST presence map.
///
/// Bits are consumed in order as fields are decoded. In strict mode a read
/// past the transmitted bits is an error; otherwise missing bits read as 0,
/// matching encoders that truncate trailing zero bits.
#[derive(Debug, Clone)]
pub struct PresenceMap {
    /// The raw bits of the presence map.
    bits: SmallVec<[bool; INLINE_BITS]>,
    /// Current bit position.
    position: usize,
    /// Whether reading past the end is an error.
    strict: bool,
}

impl PresenceMap {
    /// Creates an empty strict presence map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bits: SmallVec::new(),
            position: 0,
            strict: true,
        }
    }

    /// Creates a presence map from raw bits.
    #[must_use]
    pub fn from_bits(bits: impl IntoIterator<Item = bool>) -> Self {
        Self {
            bits: bits.into_iter().collect(),
            position: 0,
            strict: true,
        }
    }

    /// Sets whether reading past the transmitted bits is an error.
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Decodes a presence map from a byte slice.
    ///
    /// # Arguments
    /// * `data` - The input bytes
    /// * `offset` - Current position in the data (will be updated)
    ///
    /// # Errors
    /// Returns `FastError::UnexpectedEof` if no stop byte is found.
    pub fn decode(data: &[u8], offset: &mut usize) -> Result<Self, FastError> {
        let mut bits = SmallVec::new();

        loop {
            let Some(&byte) = data.get(*offset) else {
                return Err(FastError::UnexpectedEof { offset: *offset });
            };
            *offset += 1;

            for i in (0..7).rev() {
                bits.push((byte >> i) & 1 == 1);
            }

            if byte & 0x80 != 0 {
                break;
            }
        }

        Ok(Self {
            bits,
            position: 0,
            strict: true,
        })
    }

    /// Consumes the next bit.
    ///
    /// # Errors
    /// Returns `FastError::PresenceMapExhausted` if the map is strict and all
    /// transmitted bits have been consumed.
    #[inline]
    pub fn next_bit(&mut self) -> Result<bool, FastError> {
        match self.bits.get(self.position) {
            Some(&bit) => {
                self.position += 1;
                Ok(bit)
            }
            None if self.strict => Err(FastError::PresenceMapExhausted {
                index: self.position,
                available: self.bits.len(),
            }),
            None => {
                self.position += 1;
                Ok(false)
            }
        }
    }

    /// Consumes the next bit, reading 0 past the end regardless of mode.
    #[inline]
    pub fn next_bit_or_zero(&mut self) -> bool {
        let bit = self.bit(self.position);
        self.position += 1;
        bit
    }

    /// Returns the bit at the specified position without consuming it.
    ///
    /// # Arguments
    /// * `index` - The bit position (0-indexed)
    #[must_use]
    pub fn bit(&self, index: usize) -> bool {
        self.bits.get(index).copied().unwrap_or(false)
    }

    /// Returns the number of transmitted bits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Returns true if the presence map holds no bits.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Returns the number of bits consumed so far.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the number of transmitted bits not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bits.len().saturating_sub(self.position)
    }

    /// Resets the position to the beginning.
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Encodes the presence map to bytes, padding the last byte with zeros.
    #[must_use]
    pub fn encode(&self) -> SmallVec<[u8; 4]> {
        let mut result = SmallVec::new();
        if self.bits.is_empty() {
            result.push(0x80);
            return result;
        }

        for (i, chunk) in self.bits.chunks(7).enumerate() {
            let mut byte: u8 = 0;
            for (j, &bit) in chunk.iter().enumerate() {
                if bit {
                    byte |= 1 << (6 - j);
                }
            }
            if (i + 1) * 7 >= self.bits.len() {
                byte |= 0x80;
            }
            result.push(byte);
        }

        result
    }
}

impl Default for PresenceMap {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for constructing presence maps.
#[derive(Debug, Default)]
pub struct PresenceMapBuilder {
    bits: Vec<bool>,
}

impl PresenceMapBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bit to the presence map.
    #[must_use]
    pub fn bit(mut self, present: bool) -> Self {
        self.bits.push(present);
        self
    }

    /// Builds the presence map.
    #[must_use]
    pub fn build(self) -> PresenceMap {
        PresenceMap::from_bits(self.bits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_map_decode_single_byte() {
        // stop bit set, map bits 100_0000
        let data = [0b1100_0000];
        let mut offset = 0;
        let pmap = PresenceMap::decode(&data, &mut offset).unwrap();

        assert_eq!(offset, 1);
        assert_eq!(pmap.len(), 7);
        assert!(pmap.bit(0));
        assert!(!pmap.bit(1));
        assert!(!pmap.bit(2));
    }

    #[test]
    fn test_presence_map_decode_multi_byte() {
        let data = [0b0100_0000, 0b1000_0001];
        let mut offset = 0;
        let pmap = PresenceMap::decode(&data, &mut offset).unwrap();

        assert_eq!(offset, 2);
        assert_eq!(pmap.len(), 14);
        assert!(pmap.bit(0));
        assert!(pmap.bit(13));
    }

    #[test]
    fn test_presence_map_decode_eof() {
        let data = [0b0100_0000];
        let mut offset = 0;
        assert_eq!(
            PresenceMap::decode(&data, &mut offset).unwrap_err(),
            FastError::UnexpectedEof { offset: 1 }
        );
    }

    #[test]
    fn test_presence_map_strict_exhaustion() {
        let mut pmap = PresenceMap::from_bits([true, false, true]);

        assert!(pmap.next_bit().unwrap());
        assert!(!pmap.next_bit().unwrap());
        assert!(pmap.next_bit().unwrap());
        assert_eq!(
            pmap.next_bit(),
            Err(FastError::PresenceMapExhausted {
                index: 3,
                available: 3
            })
        );
    }

    #[test]
    fn test_presence_map_lenient_reads_zero() {
        let mut pmap = PresenceMap::from_bits([true]).with_strict(false);

        assert!(pmap.next_bit().unwrap());
        assert!(!pmap.next_bit().unwrap());
        assert!(!pmap.next_bit().unwrap());
        assert_eq!(pmap.position(), 3);
        assert_eq!(pmap.remaining(), 0);
    }

    #[test]
    fn test_presence_map_encode() {
        let pmap = PresenceMap::from_bits([true, true]);
        assert_eq!(pmap.encode().as_slice(), &[0b1110_0000]);

        let pmap = PresenceMap::from_bits([false; 8].into_iter().chain([true]));
        assert_eq!(pmap.encode().as_slice(), &[0b0000_0000, 0b1010_0000]);

        assert_eq!(PresenceMap::new().encode().as_slice(), &[0x80]);
    }

    #[test]
    fn test_presence_map_builder() {
        let mut pmap = PresenceMapBuilder::new()
            .bit(true)
            .bit(false)
            .bit(true)
            .build();

        assert_eq!(pmap.len(), 3);
        assert!(pmap.next_bit_or_zero());
        assert!(!pmap.next_bit_or_zero());
        assert!(pmap.next_bit_or_zero());
        assert!(!pmap.next_bit_or_zero());
    }
}
