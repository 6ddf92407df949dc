//! Channel table and synchronous packet dispatch.
//!
//! Handlers run inside [`NetworkSystem::dispatch`] on the caller's thread and
//! receive a mutable receive context `C` owned by the caller. They never hold
//! references into that context between frames, so disposing a channel is
//! enough to guarantee no further delivery.

use std::collections::HashMap;

use thiserror::Error;

use crate::channel::{ChannelId, ChannelKind, PeerId};
use crate::codec::{DecodeError, PacketDecode, PacketEncode};
use crate::frame::{Envelope, MAX_PAYLOAD_LEN};
use crate::transport::{Transport, TransportError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetError {
    #[error("channel {0} is not open")]
    ChannelClosed(ChannelId),
    #[error("{local} cannot send on {channel}, owned by another peer")]
    NotOwner { local: PeerId, channel: ChannelId },
    #[error("payload of {0} bytes exceeds the frame limit")]
    PayloadTooLarge(usize),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Receive callback: `(context, sender, payload)`.
pub type PacketHandler<C> = Box<dyn FnMut(&mut C, PeerId, &[u8]) -> Result<(), DecodeError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct ChannelSlot<C> {
    handlers: Vec<(HandlerId, PacketHandler<C>)>,
}

/// Outcome counters for one [`NetworkSystem::dispatch`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Handler invocations that succeeded.
    pub delivered: usize,
    /// Frames for unknown/disposed channels or from a non-owner.
    pub dropped: usize,
    /// Malformed envelopes and handler decode failures.
    pub failed: usize,
}

pub struct NetworkSystem<C> {
    local: PeerId,
    transport: Box<dyn Transport>,
    channels: HashMap<ChannelId, ChannelSlot<C>>,
    next_handler: u64,
}

impl<C> NetworkSystem<C> {
    pub fn new(local: PeerId, transport: Box<dyn Transport>) -> Self {
        Self {
            local,
            transport,
            channels: HashMap::new(),
            next_handler: 0,
        }
    }

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    /// Open the channel for `(kind, owner)`, or return the already open one.
    pub fn create_channel(&mut self, kind: ChannelKind, owner: PeerId) -> ChannelId {
        let id = ChannelId::new(kind, owner);
        self.channels.entry(id).or_insert_with(|| {
            log::debug!("Opened channel {}", id);
            ChannelSlot { handlers: Vec::new() }
        });
        id
    }

    pub fn is_open(&self, channel: ChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn open_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn handler_count(&self, channel: ChannelId) -> usize {
        self.channels.get(&channel).map_or(0, |slot| slot.handlers.len())
    }

    pub fn subscribe<F>(&mut self, channel: ChannelId, handler: F) -> Result<HandlerId, NetError>
    where
        F: FnMut(&mut C, PeerId, &[u8]) -> Result<(), DecodeError> + 'static,
    {
        let slot = self
            .channels
            .get_mut(&channel)
            .ok_or(NetError::ChannelClosed(channel))?;
        let id = HandlerId(self.next_handler);
        self.next_handler += 1;
        slot.handlers.push((id, Box::new(handler)));
        Ok(id)
    }

    pub fn unsubscribe(&mut self, channel: ChannelId, handler: HandlerId) -> bool {
        let Some(slot) = self.channels.get_mut(&channel) else {
            return false;
        };
        let before = slot.handlers.len();
        slot.handlers.retain(|(id, _)| *id != handler);
        slot.handlers.len() != before
    }

    /// Close the channel and drop its handlers. Returns false if it was already
    /// closed; calling it again is harmless.
    pub fn dispose(&mut self, channel: ChannelId) -> bool {
        match self.channels.remove(&channel) {
            Some(slot) => {
                log::debug!("Disposed channel {} ({} handlers)", channel, slot.handlers.len());
                true
            }
            None => false,
        }
    }

    /// Broadcast a raw payload on a channel owned by the local peer.
    pub fn send(&mut self, channel: ChannelId, payload: &[u8]) -> Result<(), NetError> {
        if !self.is_open(channel) {
            return Err(NetError::ChannelClosed(channel));
        }
        if channel.owner != self.local {
            return Err(NetError::NotOwner { local: self.local, channel });
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(NetError::PayloadTooLarge(payload.len()));
        }
        let envelope = Envelope {
            channel,
            sender: self.local,
            payload: payload.to_vec(),
        };
        self.transport.send(envelope.encode_to_vec())?;
        Ok(())
    }

    /// Encode and broadcast a record.
    pub fn send_packet<P: PacketEncode>(&mut self, channel: ChannelId, packet: &P) -> Result<(), NetError> {
        self.send(channel, &packet.encode_to_vec())
    }

    /// Drain the transport and run handlers for every received frame, in arrival
    /// order. Later frames on the same channel simply overwrite what earlier ones
    /// applied.
    pub fn dispatch(&mut self, ctx: &mut C) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(bytes) = self.transport.try_recv() {
            let envelope = match Envelope::decode_exact(&bytes) {
                Ok(envelope) => envelope,
                Err(e) => {
                    log::warn!("Dropping malformed frame ({} bytes): {}", bytes.len(), e);
                    stats.failed += 1;
                    continue;
                }
            };

            let Some(slot) = self.channels.get_mut(&envelope.channel) else {
                log::trace!("No open channel {} for frame from {}", envelope.channel, envelope.sender);
                stats.dropped += 1;
                continue;
            };

            if envelope.sender != envelope.channel.owner {
                log::warn!("{} sent on {} which it does not own", envelope.sender, envelope.channel);
                stats.dropped += 1;
                continue;
            }

            for (_, handler) in slot.handlers.iter_mut() {
                match handler(ctx, envelope.sender, &envelope.payload) {
                    Ok(()) => stats.delivered += 1,
                    Err(e) => {
                        log::warn!("Failed to apply packet on {}: {}", envelope.channel, e);
                        stats.failed += 1;
                    }
                }
            }
        }
        stats
    }
}
