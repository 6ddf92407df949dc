//! Transport abstraction for framed channel bytes.
//!
//! The host networking layer implements [`Transport`]. [`LoopbackHub`] is an
//! in-process broadcast medium for local sessions and tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use thiserror::Error;

use crate::channel::PeerId;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport is disconnected")]
    Disconnected,
}

/// Best-effort broadcast of byte frames to every other peer in the session.
pub trait Transport {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;
    fn try_recv(&mut self) -> Option<Vec<u8>>;
    /// Frames waiting to be received.
    fn depth(&self) -> usize;
}

type Queues = HashMap<PeerId, VecDeque<Vec<u8>>>;

/// Shared in-process medium. Every frame sent by one endpoint is queued for all
/// other connected endpoints.
#[derive(Clone, Default)]
pub struct LoopbackHub {
    queues: Rc<RefCell<Queues>>,
}

impl LoopbackHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `peer` and return its endpoint. Reconnecting drops queued frames.
    pub fn connect(&self, peer: PeerId) -> LoopbackTransport {
        self.queues.borrow_mut().insert(peer, VecDeque::new());
        LoopbackTransport { hub: self.clone(), local: peer }
    }

    pub fn is_connected(&self, peer: PeerId) -> bool {
        self.queues.borrow().contains_key(&peer)
    }

    fn disconnect(&self, peer: PeerId) {
        self.queues.borrow_mut().remove(&peer);
    }
}

/// One peer's endpoint on a [`LoopbackHub`]. Dropping it disconnects the peer.
pub struct LoopbackTransport {
    hub: LoopbackHub,
    local: PeerId,
}

impl LoopbackTransport {
    pub fn local(&self) -> PeerId {
        self.local
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        let mut queues = self.hub.queues.borrow_mut();
        if !queues.contains_key(&self.local) {
            return Err(TransportError::Disconnected);
        }
        for (peer, queue) in queues.iter_mut() {
            if *peer != self.local {
                queue.push_back(frame.clone());
            }
        }
        Ok(())
    }

    fn try_recv(&mut self) -> Option<Vec<u8>> {
        self.hub.queues.borrow_mut().get_mut(&self.local)?.pop_front()
    }

    fn depth(&self) -> usize {
        self.hub.queues.borrow().get(&self.local).map_or(0, VecDeque::len)
    }
}

impl Drop for LoopbackTransport {
    fn drop(&mut self) {
        self.hub.disconnect(self.local);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_reaches_every_other_peer() {
        let hub = LoopbackHub::new();
        let mut a = hub.connect(PeerId(0));
        let mut b = hub.connect(PeerId(1));
        let mut c = hub.connect(PeerId(2));

        a.send(b"pose".to_vec()).unwrap();
        assert_eq!(a.depth(), 0);
        assert_eq!(b.try_recv(), Some(b"pose".to_vec()));
        assert_eq!(c.try_recv(), Some(b"pose".to_vec()));
        assert_eq!(a.try_recv(), None);
    }

    #[test]
    fn dropping_an_endpoint_disconnects_it() {
        let hub = LoopbackHub::new();
        let mut a = hub.connect(PeerId(0));
        let b = hub.connect(PeerId(1));
        drop(b);
        assert!(!hub.is_connected(PeerId(1)));
        a.send(vec![1]).unwrap();
        assert_eq!(a.depth(), 0);
    }
}
