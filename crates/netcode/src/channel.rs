//! Channel identity: which stream a payload belongs to and who owns it.

use std::fmt;

use crate::codec::{DecodeError, PacketDecode, PacketEncode};

/// Session-scoped peer identifier (the host's client id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(pub u16);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer#{}", self.0)
    }
}

impl PacketEncode for PeerId {
    fn encode(&self, out: &mut Vec<u8>) {
        self.0.encode(out);
    }
}

impl PacketDecode for PeerId {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(PeerId(u16::decode(inp)?))
    }
}

/// Kind of stream carried by a channel.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    /// Client-side preference flags.
    PlayerPrefs = 0,
    /// Full VR rig pose, streamed every frame while alive.
    Rig = 1,
    /// Reduced ghost pose, streamed while dead.
    SpectatorRig = 2,
    /// Charge-station interaction cancel signal.
    ChargeStation = 3,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::PlayerPrefs,
        ChannelKind::Rig,
        ChannelKind::SpectatorRig,
        ChannelKind::ChargeStation,
    ];
}

impl TryFrom<u8> for ChannelKind {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        ChannelKind::ALL
            .into_iter()
            .find(|kind| *kind as u8 == value)
            .ok_or(DecodeError::InvalidValue { field: "channel kind", value })
    }
}

/// A (kind, owner) pair. At most one live channel exists per id in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub kind: ChannelKind,
    pub owner: PeerId,
}

impl ChannelId {
    pub fn new(kind: ChannelKind, owner: PeerId) -> Self {
        Self { kind, owner }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.kind, self.owner)
    }
}

impl PacketEncode for ChannelId {
    fn encode(&self, out: &mut Vec<u8>) {
        (self.kind as u8).encode(out);
        self.owner.encode(out);
    }
}

impl PacketDecode for ChannelId {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        let kind = ChannelKind::try_from(u8::decode(inp)?)?;
        let owner = PeerId::decode(inp)?;
        Ok(Self { kind, owner })
    }
}
