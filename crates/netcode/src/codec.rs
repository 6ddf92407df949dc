//! Fixed-layout binary codec for channel payloads.
//!
//! Records are written field by field in declaration order with fixed-width
//! little-endian numbers. There is no length prefix, tag or version: both ends
//! must agree on the layout.

use glam::Vec3;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("short read: needed {needed} bytes, {remaining} remaining")]
    ShortRead { needed: usize, remaining: usize },
    #[error("invalid value {value} for {field}")]
    InvalidValue { field: &'static str, value: u8 },
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
}

/// Types that write themselves into a byte buffer.
pub trait PacketEncode {
    fn encode(&self, out: &mut Vec<u8>);

    fn encode_to_vec(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.encode(&mut out);
        out
    }
}

/// Types that reconstruct themselves from the front of a byte slice, advancing it.
pub trait PacketDecode: Sized {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError>;

    /// Decode a whole payload, rejecting leftover bytes.
    fn decode_exact(mut inp: &[u8]) -> Result<Self, DecodeError> {
        let value = Self::decode(&mut inp)?;
        if inp.is_empty() {
            Ok(value)
        } else {
            Err(DecodeError::TrailingBytes(inp.len()))
        }
    }
}

pub(crate) fn take<const N: usize>(inp: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    if inp.len() < N {
        return Err(DecodeError::ShortRead { needed: N, remaining: inp.len() });
    }
    let (head, tail) = inp.split_at(N);
    *inp = tail;
    let mut buf = [0u8; N];
    buf.copy_from_slice(head);
    Ok(buf)
}

pub(crate) fn take_slice<'a>(inp: &mut &'a [u8], len: usize) -> Result<&'a [u8], DecodeError> {
    if inp.len() < len {
        return Err(DecodeError::ShortRead { needed: len, remaining: inp.len() });
    }
    let (head, tail) = inp.split_at(len);
    *inp = tail;
    Ok(head)
}

impl PacketEncode for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl PacketDecode for u8 {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(take::<1>(inp)?[0])
    }
}

impl PacketEncode for u16 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl PacketDecode for u16 {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(u16::from_le_bytes(take::<2>(inp)?))
    }
}

impl PacketEncode for f32 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_le_bytes());
    }
}

impl PacketDecode for f32 {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(f32::from_le_bytes(take::<4>(inp)?))
    }
}

impl PacketEncode for bool {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }
}

impl PacketDecode for bool {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        match u8::decode(inp)? {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(DecodeError::InvalidValue { field: "bool", value }),
        }
    }
}

impl PacketEncode for Vec3 {
    fn encode(&self, out: &mut Vec<u8>) {
        self.x.encode(out);
        self.y.encode(out);
        self.z.encode(out);
    }
}

impl PacketDecode for Vec3 {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        let x = f32::decode(inp)?;
        let y = f32::decode(inp)?;
        let z = f32::decode(inp)?;
        Ok(Vec3::new(x, y, z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec3_is_three_le_floats() {
        let bytes = Vec3::new(1.0, -2.5, 0.0).encode_to_vec();
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[4..8], &(-2.5f32).to_le_bytes());
    }

    #[test]
    fn short_read_reports_sizes() {
        let mut inp: &[u8] = &[0, 0, 0];
        assert_eq!(f32::decode(&mut inp), Err(DecodeError::ShortRead { needed: 4, remaining: 3 }));
    }

    #[test]
    fn bool_rejects_values_other_than_zero_and_one() {
        assert_eq!(bool::decode_exact(&[1]), Ok(true));
        assert_eq!(bool::decode_exact(&[2]), Err(DecodeError::InvalidValue { field: "bool", value: 2 }));
    }

    #[test]
    fn decode_exact_rejects_trailing_bytes() {
        assert_eq!(u8::decode_exact(&[1, 2, 3]), Err(DecodeError::TrailingBytes(2)));
    }
}
