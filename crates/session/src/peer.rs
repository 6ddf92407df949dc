//! State kept for one remote VR peer.

use engine_core::{SceneGraph, SceneResult};
use netcode::{ChannelId, ChannelKind, PeerId};
use vr_rig::{
    Bones, HostPlayerState, ItemBehaviours, PlayerPrefs, RigReconciler, SpectatorGhost, VrArmRig,
};

use crate::config::SyncConfig;

/// The channels a remote peer owns, in the order they are opened.
pub const PEER_CHANNELS: [ChannelKind; 3] = [ChannelKind::PlayerPrefs, ChannelKind::Rig, ChannelKind::SpectatorRig];

#[derive(Debug)]
pub struct RemotePeer {
    pub id: PeerId,
    pub username: String,
    /// Skeleton owned by the host; never despawned here.
    pub bones: Bones,
    pub reconciler: RigReconciler,
    pub arm_rig: VrArmRig,
    pub ghost: SpectatorGhost,
    pub prefs: PlayerPrefs,
    pub host: HostPlayerState,
    pub dead: bool,
    pub items: ItemBehaviours,
    pub channels: Vec<ChannelId>,
}

impl RemotePeer {
    /// Build the rig pieces for a joining peer. Nothing is left in the scene on error.
    pub fn spawn(
        scene: &mut SceneGraph,
        id: PeerId,
        username: &str,
        bones: Bones,
        config: &SyncConfig,
    ) -> SceneResult<Self> {
        let reconciler = RigReconciler::new(scene, username, config.rig)?;
        let arm_rig = match VrArmRig::build(scene, &bones) {
            Ok(arm_rig) => arm_rig,
            Err(e) => {
                reconciler.teardown(scene);
                return Err(e);
            }
        };
        let ghost = match SpectatorGhost::spawn(scene, username, config.label_fade_rate) {
            Ok(ghost) => ghost,
            Err(e) => {
                arm_rig.teardown(scene);
                reconciler.teardown(scene);
                return Err(e);
            }
        };

        Ok(Self {
            id,
            username: username.to_string(),
            bones,
            reconciler,
            arm_rig,
            ghost,
            prefs: PlayerPrefs::default(),
            host: HostPlayerState::default(),
            dead: false,
            items: ItemBehaviours::new(),
            channels: PEER_CHANNELS.iter().map(|kind| ChannelId::new(*kind, id)).collect(),
        })
    }

    /// Release every scene node created for this peer.
    pub fn teardown(self, scene: &mut SceneGraph) {
        log::info!("Tearing down VR rig of {} ({})", self.username, self.id);
        self.reconciler.teardown(scene);
        self.arm_rig.teardown(scene);
        self.ghost.despawn(scene);
    }
}
