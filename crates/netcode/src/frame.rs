//! Envelope framing for channel payloads on the wire.
//!
//! Format (little-endian):
//! - u8  channel kind
//! - u16 channel owner
//! - u16 sender
//! - u16 LEN
//! - [u8; LEN] payload

use crate::channel::{ChannelId, PeerId};
use crate::codec::{take_slice, DecodeError, PacketDecode, PacketEncode};

pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub channel: ChannelId,
    pub sender: PeerId,
    pub payload: Vec<u8>,
}

impl PacketEncode for Envelope {
    /// Callers must keep `payload` within [`MAX_PAYLOAD_LEN`]; longer payloads are
    /// truncated to fit the length field.
    fn encode(&self, out: &mut Vec<u8>) {
        let len = self.payload.len().min(MAX_PAYLOAD_LEN);
        self.channel.encode(out);
        self.sender.encode(out);
        (len as u16).encode(out);
        out.extend_from_slice(&self.payload[..len]);
    }
}

impl PacketDecode for Envelope {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        let channel = ChannelId::decode(inp)?;
        let sender = PeerId::decode(inp)?;
        let len = u16::decode(inp)? as usize;
        let payload = take_slice(inp, len)?.to_vec();
        Ok(Self { channel, sender, payload })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelKind;

    #[test]
    fn envelope_roundtrip() {
        let env = Envelope {
            channel: ChannelId::new(ChannelKind::Rig, PeerId(3)),
            sender: PeerId(3),
            payload: vec![9, 8, 7],
        };
        let bytes = env.encode_to_vec();
        assert_eq!(bytes.len(), 7 + 3);
        assert_eq!(Envelope::decode_exact(&bytes), Ok(env));
    }

    #[test]
    fn rejects_truncated_payload() {
        let mut bytes = Envelope {
            channel: ChannelId::new(ChannelKind::PlayerPrefs, PeerId(1)),
            sender: PeerId(1),
            payload: vec![1, 2, 3, 4],
        }
        .encode_to_vec();
        bytes.truncate(bytes.len() - 2);
        assert_eq!(
            Envelope::decode_exact(&bytes),
            Err(DecodeError::ShortRead { needed: 4, remaining: 2 })
        );
    }

    #[test]
    fn rejects_unknown_kind() {
        let bytes = [42u8, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            Envelope::decode_exact(&bytes),
            Err(DecodeError::InvalidValue { field: "channel kind", value: 42 })
        ));
    }
}
