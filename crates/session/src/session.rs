//! Session orchestration: peers, channels and the per-frame update phases.
//!
//! Receive handlers are plain functions over [`SessionWorld`], the context
//! handed to [`NetworkSystem::dispatch`]. A peer that has left has no entry in
//! the world and no open channels, so nothing can reach its torn-down rig.

use std::collections::BTreeMap;

use engine_core::{NodeId, SceneError, SceneGraph};
use glam::Vec3;
use netcode::{
    ChannelId, ChannelKind, DecodeError, DispatchStats, NetError, NetworkSystem, PacketDecode, PeerId, Transport,
};
use thiserror::Error;
use tracking::TrackingState;
use vr_rig::{
    Bones, EquipOutcome, GhostParents, Hand, HostPlayerState, IkSolver, ItemBehaviours, ItemInstanceId, ItemRegistry,
    PlayerPrefs, RigState, SpectatorRigState,
};

use crate::config::SyncConfig;
use crate::peer::RemotePeer;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("peer {0} is not in the session")]
    UnknownPeer(PeerId),
    #[error("peer {0} is the local peer")]
    LocalPeer(PeerId),
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Net(#[from] NetError),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Receive context for packet handlers.
#[derive(Debug)]
pub struct SessionWorld {
    pub scene: SceneGraph,
    pub peers: BTreeMap<PeerId, RemotePeer>,
    /// Ship interior ghosts attach to when their owner is aboard.
    pub ship: NodeId,
    /// Fallback parent for ghosts.
    pub players_container: NodeId,
}

#[derive(Debug, Clone, Copy)]
struct LocalChannels {
    prefs: ChannelId,
    rig: ChannelId,
    spectator: ChannelId,
}

pub struct Session {
    local: PeerId,
    config: SyncConfig,
    net: NetworkSystem<SessionWorld>,
    world: SessionWorld,
    channels: LocalChannels,
    tracking: TrackingState,
    registry: ItemRegistry,
    local_items: ItemBehaviours,
    local_dead: bool,
}

fn on_prefs(world: &mut SessionWorld, sender: PeerId, payload: &[u8]) -> Result<(), DecodeError> {
    let prefs = PlayerPrefs::decode_exact(payload)?;
    if let Some(peer) = world.peers.get_mut(&sender) {
        peer.prefs = prefs;
    }
    Ok(())
}

fn on_rig(world: &mut SessionWorld, sender: PeerId, payload: &[u8]) -> Result<(), DecodeError> {
    let state = RigState::decode_exact(payload)?;
    if let Some(peer) = world.peers.get_mut(&sender) {
        if let Err(e) = peer.reconciler.apply_rig_state(&mut world.scene, &state) {
            log::warn!("Could not apply rig of {}: {}", sender, e);
        }
    }
    Ok(())
}

fn on_spectator_rig(world: &mut SessionWorld, sender: PeerId, payload: &[u8]) -> Result<(), DecodeError> {
    let state = SpectatorRigState::decode_exact(payload)?;
    if let Some(peer) = world.peers.get_mut(&sender) {
        let parents = GhostParents {
            physics_parent: peer.host.physics_parent,
            ship: world.ship,
            default_container: world.players_container,
        };
        if let Err(e) = peer.ghost.apply(&mut world.scene, &state, &parents) {
            log::warn!("Could not apply ghost pose of {}: {}", sender, e);
        }
    }
    Ok(())
}

impl Session {
    pub fn new(local: PeerId, transport: Box<dyn Transport>, config: SyncConfig) -> SessionResult<Self> {
        let mut scene = SceneGraph::new();
        let ship = scene.spawn("Elevator", None)?;
        let players_container = scene.spawn("Players", None)?;

        let mut net = NetworkSystem::new(local, transport);
        let channels = LocalChannels {
            prefs: net.create_channel(ChannelKind::PlayerPrefs, local),
            rig: net.create_channel(ChannelKind::Rig, local),
            spectator: net.create_channel(ChannelKind::SpectatorRig, local),
        };

        log::info!("Session started as {}", local);
        Ok(Self {
            local,
            tracking: TrackingState::new(config.tracking),
            config,
            net,
            world: SessionWorld {
                scene,
                peers: BTreeMap::new(),
                ship,
                players_container,
            },
            channels,
            registry: ItemRegistry::new(),
            local_items: ItemBehaviours::new(),
            local_dead: false,
        })
    }

    pub fn local_peer(&self) -> PeerId {
        self.local
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn scene(&self) -> &SceneGraph {
        &self.world.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneGraph {
        &mut self.world.scene
    }

    pub fn ship(&self) -> NodeId {
        self.world.ship
    }

    pub fn players_container(&self) -> NodeId {
        self.world.players_container
    }

    pub fn network(&self) -> &NetworkSystem<SessionWorld> {
        &self.net
    }

    pub fn tracking(&self) -> &TrackingState {
        &self.tracking
    }

    pub fn tracking_mut(&mut self) -> &mut TrackingState {
        &mut self.tracking
    }

    pub fn registry_mut(&mut self) -> &mut ItemRegistry {
        &mut self.registry
    }

    pub fn peer(&self, id: PeerId) -> Option<&RemotePeer> {
        self.world.peers.get(&id)
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.world.peers.keys().copied().collect()
    }

    pub fn is_local_dead(&self) -> bool {
        self.local_dead
    }

    fn peer_mut(&mut self, id: PeerId) -> SessionResult<&mut RemotePeer> {
        self.world.peers.get_mut(&id).ok_or(SessionError::UnknownPeer(id))
    }

    /// Set up the rig of a remote VR peer. Returns false if the peer was already known.
    pub fn peer_joined(&mut self, id: PeerId, username: &str, bones: Bones) -> SessionResult<bool> {
        if id == self.local {
            return Err(SessionError::LocalPeer(id));
        }
        if self.world.peers.contains_key(&id) {
            return Ok(false);
        }

        let peer = RemotePeer::spawn(&mut self.world.scene, id, username, bones, &self.config)?;

        let prefs = self.net.create_channel(ChannelKind::PlayerPrefs, id);
        let rig = self.net.create_channel(ChannelKind::Rig, id);
        let spectator = self.net.create_channel(ChannelKind::SpectatorRig, id);
        let subscribed = self
            .net
            .subscribe(prefs, on_prefs)
            .and_then(|_| self.net.subscribe(rig, on_rig))
            .and_then(|_| self.net.subscribe(spectator, on_spectator_rig));
        if let Err(e) = subscribed {
            for channel in &peer.channels {
                self.net.dispose(*channel);
            }
            peer.teardown(&mut self.world.scene);
            return Err(e.into());
        }

        log::info!("VR peer {} ({}) joined", username, id);
        self.world.peers.insert(id, peer);
        Ok(true)
    }

    /// Dispose the peer's channels, then release its scene nodes.
    pub fn peer_left(&mut self, id: PeerId) -> bool {
        let Some(peer) = self.world.peers.remove(&id) else {
            return false;
        };
        for channel in &peer.channels {
            self.net.dispose(*channel);
        }
        peer.teardown(&mut self.world.scene);
        true
    }

    /// Receive and apply every pending packet.
    pub fn poll_network(&mut self) -> DispatchStats {
        self.net.dispatch(&mut self.world)
    }

    pub fn set_host_state(&mut self, id: PeerId, host: HostPlayerState) -> SessionResult<()> {
        self.peer_mut(id)?.host = host;
        Ok(())
    }

    /// Place every remote XR origin and head, and fade name labels.
    pub fn early_update(&mut self, dt: f32) {
        let SessionWorld { scene, peers, .. } = &mut self.world;
        for peer in peers.values_mut() {
            if let Err(e) = peer.reconciler.early_update(scene, &peer.bones, &peer.host) {
                log::warn!("Early update of {} failed: {}", peer.id, e);
            }
            peer.ghost.update(dt);
        }
    }

    /// Drive remote arm IK targets and turn name labels toward `viewer`.
    pub fn late_update(&mut self, viewer: Option<Vec3>) {
        let SessionWorld { scene, peers, .. } = &mut self.world;
        for peer in peers.values_mut() {
            if let Err(e) = peer.reconciler.late_update(scene, &peer.bones) {
                log::warn!("Late update of {} failed: {}", peer.id, e);
            }
            if let Some(viewer) = viewer {
                if let Err(e) = peer.ghost.face_viewer(scene, viewer) {
                    log::warn!("Could not turn label of {}: {}", peer.id, e);
                }
            }
        }
    }

    pub fn drive_ik(&mut self, solver: &mut dyn IkSolver) {
        let SessionWorld { scene, peers, .. } = &mut self.world;
        for peer in peers.values() {
            peer.arm_rig.solve(scene, solver);
        }
    }

    /// Tracked finger curls to apply to a remote hand, if that hand tracks fingers this frame.
    pub fn finger_curls(&self, id: PeerId, hand: Hand) -> Option<[f32; 5]> {
        let peer = self.peer(id)?;
        peer.reconciler
            .tracks_fingers(hand, &peer.host)
            .then(|| peer.reconciler.finger_curls(hand))
    }

    /// Broadcast the local rig. Returns false when skipped because nothing changed.
    pub fn send_rig(&mut self) -> SessionResult<bool> {
        if self.config.send_only_on_change && !self.tracking.rig_changed() {
            return Ok(false);
        }
        let rig = self.tracking.sample_rig();
        self.net.send_packet(self.channels.rig, &rig)?;
        Ok(true)
    }

    /// Broadcast the local ghost pose. Only sent while the local player is dead.
    pub fn send_spectator_rig(&mut self, parented_to_ship: bool) -> SessionResult<bool> {
        if !self.local_dead {
            return Ok(false);
        }
        let ghost = self.tracking.sample_spectator(parented_to_ship);
        self.net.send_packet(self.channels.spectator, &ghost)?;
        Ok(true)
    }

    pub fn send_prefs(&mut self) -> SessionResult<()> {
        let prefs = PlayerPrefs { disable_steering_wheel: self.config.disable_steering_wheel };
        self.net.send_packet(self.channels.prefs, &prefs)?;
        Ok(())
    }

    /// The local player died: show the ghosts of everyone already dead.
    pub fn on_local_death(&mut self) {
        self.local_dead = true;
        let SessionWorld { scene, peers, .. } = &mut self.world;
        for peer in peers.values_mut().filter(|peer| peer.dead) {
            peer.ghost.show(scene);
        }
    }

    pub fn on_remote_death(&mut self, id: PeerId) -> SessionResult<()> {
        let local_dead = self.local_dead;
        let SessionWorld { scene, peers, .. } = &mut self.world;
        let peer = peers.get_mut(&id).ok_or(SessionError::UnknownPeer(id))?;
        peer.dead = true;
        if local_dead {
            peer.ghost.show(scene);
        }
        for hand in Hand::BOTH {
            peer.reconciler.release_hand(hand);
        }
        Ok(())
    }

    pub fn on_revive_all(&mut self) {
        self.local_dead = false;
        let SessionWorld { scene, peers, .. } = &mut self.world;
        for peer in peers.values_mut() {
            peer.dead = false;
            peer.ghost.hide(scene);
        }
    }

    /// The local player's gaze hit `node`. Shows the owning ghost's name label.
    pub fn report_gaze_hit(&mut self, node: NodeId) -> bool {
        if !self.local_dead {
            return false;
        }
        let SessionWorld { scene, peers, .. } = &mut self.world;
        match peers.values_mut().find(|peer| peer.ghost.contains_node(scene, node)) {
            Some(peer) => {
                peer.ghost.show_name_billboard(peer.dead);
                peer.dead
            }
            None => false,
        }
    }

    pub fn snap_hand(
        &mut self,
        id: PeerId,
        hand: Hand,
        target: Option<NodeId>,
        position_offset: Option<Vec3>,
        rotation_offset: Option<Vec3>,
    ) -> SessionResult<()> {
        self.peer_mut(id)?
            .reconciler
            .snap_hand(hand, target, position_offset, rotation_offset);
        Ok(())
    }

    pub fn release_hand(&mut self, id: PeerId, hand: Hand) -> SessionResult<()> {
        self.peer_mut(id)?.reconciler.release_hand(hand);
        Ok(())
    }

    /// A player switched to `item_name`; attach or re-enable its VR behaviour.
    pub fn switch_to_item(&mut self, id: PeerId, instance: ItemInstanceId, item_name: &str) -> SessionResult<EquipOutcome> {
        let items = if id == self.local {
            &mut self.local_items
        } else {
            &mut self
                .world
                .peers
                .get_mut(&id)
                .ok_or(SessionError::UnknownPeer(id))?
                .items
        };
        Ok(items.equip(instance, item_name, &self.registry))
    }
}
