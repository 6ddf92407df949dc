//! posesync - two simulated VR peers streaming poses over an in-process loopback

use anyhow::Result;
use engine_core::{FrameClock, SceneGraph, Timers, Vec3};
use netcode::{DispatchStats, LoopbackHub, PeerId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use session::{Session, SyncConfig};
use tracking::{ButtonState, TrackedPose};
use vr_rig::{Bones, Hand, IkSolver, IkWeights, TwoBoneChain};

const ALICE: PeerId = PeerId(1);
const BOB: PeerId = PeerId(2);
const TICK_RATE: f32 = 90.0;
const RUN_SECONDS: f32 = 10.0;

/// Pulls each chain's tip onto its target. Stands in for the host's constraint solver.
struct TipSolver;

impl IkSolver for TipSolver {
    fn solve_two_bone_ik(&mut self, scene: &mut SceneGraph, chain: &TwoBoneChain, weights: &IkWeights) {
        let (Ok(target), Ok(tip)) = (scene.world_transform(chain.target), scene.world_transform(chain.tip)) else {
            return;
        };
        let position = tip.position.lerp(target.position, weights.weight * weights.target_position_weight);
        let rotation = tip.rotation.slerp(target.rotation, weights.weight * weights.target_rotation_weight);
        if let Err(e) = scene.set_world_pose(chain.tip, position, rotation) {
            log::warn!("IK solve failed: {}", e);
        }
    }
}

/// Scripted scenario beats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Beat {
    BobCrouch,
    BobStand,
    AliceSnapsBob,
    BobDies,
    AliceDies,
    Revive,
    BobLeaves,
}

/// Simulated headset wearer.
struct Wearer {
    rng: StdRng,
    phase: f32,
}

impl Wearer {
    fn new(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed), phase: 0.0 }
    }

    fn step(&mut self, session: &mut Session, dt: f32) {
        self.phase += dt;
        let sway = Vec3::new(self.phase.sin() * 0.05, 0.0, self.phase.cos() * 0.05);
        let height = 1.7;
        let jitter = Vec3::new(
            self.rng.gen_range(-0.005..0.005),
            self.rng.gen_range(-0.005..0.005),
            self.rng.gen_range(-0.005..0.005),
        );

        let tracking = session.tracking_mut();
        tracking.begin_frame();
        tracking.process_head_pose(TrackedPose::new(
            Vec3::new(0.0, height, 0.0) + sway,
            Vec3::new(0.0, self.phase * 20.0, 0.0),
        ));
        for (hand, side) in [(Hand::Left, -1.0), (Hand::Right, 1.0)] {
            let position = Vec3::new(0.25 * side, height - 0.5, -0.3) + sway + jitter;
            tracking.process_controller_pose(hand, TrackedPose::new(position, Vec3::new(0.0, 0.0, 10.0 * side)));
            let grip = self.rng.gen_range(0.0..1.0);
            tracking.process_finger_curls(hand, [grip; 5]);
        }
    }
}

fn frame(session: &mut Session, wearer: &mut Wearer, dt: f32) -> Result<DispatchStats> {
    wearer.step(session, dt);
    session.send_rig()?;
    session.send_spectator_rig(false)?;

    let stats = session.poll_network();
    session.early_update(dt);
    let viewer = session.tracking().head().position;
    session.late_update(Some(viewer));
    session.drive_ik(&mut TipSolver);
    Ok(stats)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = SyncConfig::load();
    log::info!("Starting posesync simulation ({} Hz, {} s)", TICK_RATE, RUN_SECONDS);

    let hub = LoopbackHub::new();
    let mut alice = Session::new(ALICE, Box::new(hub.connect(ALICE)), config.clone())?;
    let mut bob = Session::new(BOB, Box::new(hub.connect(BOB)), config)?;

    let bob_bones = Bones::spawn_humanoid(alice.scene_mut(), "bob")?;
    alice.peer_joined(BOB, "bob", bob_bones)?;
    let alice_bones = Bones::spawn_humanoid(bob.scene_mut(), "alice")?;
    bob.peer_joined(ALICE, "alice", alice_bones)?;

    alice.send_prefs()?;
    bob.send_prefs()?;

    let door_handle = alice.scene_mut().spawn("Door Handle", None)?;
    alice.scene_mut().set_local_position(door_handle, Vec3::new(0.3, 1.1, -0.5))?;

    let mut beats = Timers::new();
    beats.schedule(Beat::BobCrouch, 1.0, ());
    beats.schedule(Beat::BobStand, 2.0, ());
    beats.schedule(Beat::AliceSnapsBob, 2.5, ());
    beats.schedule(Beat::BobDies, 4.0, ());
    beats.schedule(Beat::AliceDies, 5.0, ());
    beats.schedule(Beat::Revive, 7.0, ());
    beats.schedule(Beat::BobLeaves, 9.0, ());

    let mut clock = FrameClock::fixed(TICK_RATE);
    let mut alice_wearer = Wearer::new(1);
    let mut bob_wearer = Wearer::new(2);
    let mut bob_present = true;
    let mut received = DispatchStats::default();

    while clock.elapsed_seconds() < RUN_SECONDS {
        let dt = clock.tick();

        for (beat, ()) in beats.advance(dt) {
            log::info!("{:.2}s: {:?}", clock.elapsed_seconds(), beat);
            match beat {
                Beat::BobCrouch => {
                    bob.tracking_mut().process_crouch_button(ButtonState::Pressed);
                }
                Beat::BobStand => {
                    bob.tracking_mut().process_crouch_button(ButtonState::Released);
                }
                Beat::AliceSnapsBob => {
                    alice.snap_hand(BOB, Hand::Right, Some(door_handle), None, None)?;
                }
                Beat::BobDies => {
                    bob.on_local_death();
                    alice.on_remote_death(BOB)?;
                }
                Beat::AliceDies => {
                    alice.on_local_death();
                    bob.on_remote_death(ALICE)?;
                    let ghost_head = alice.peer(BOB).map(|peer| peer.ghost.head());
                    if let Some(head) = ghost_head {
                        alice.report_gaze_hit(head);
                    }
                }
                Beat::Revive => {
                    alice.on_revive_all();
                    bob.on_revive_all();
                }
                Beat::BobLeaves => {
                    bob_present = false;
                    alice.peer_left(BOB);
                }
            }
        }

        let stats = frame(&mut alice, &mut alice_wearer, dt)?;
        received.delivered += stats.delivered;
        received.dropped += stats.dropped;
        received.failed += stats.failed;
        if bob_present {
            frame(&mut bob, &mut bob_wearer, dt)?;
        }

        if clock.crossed(1.0) {
            if let Some(peer) = alice.peer(BOB) {
                let target = alice.scene().world_transform(peer.bones.right.rig_target)?;
                log::info!(
                    "{:.1}s: bob crouch={:?} offset={:.2} right hand target=({:.2}, {:.2}, {:.2}) snapped={}",
                    clock.elapsed_seconds(),
                    peer.reconciler.crouch_state(),
                    peer.reconciler.crouch_offset(),
                    target.position.x,
                    target.position.y,
                    target.position.z,
                    peer.reconciler.hand_override(Hand::Right).is_some(),
                );
            }
        }
    }

    log::info!(
        "Alice received {} packets ({} dropped, {} failed) over {} frames",
        received.delivered,
        received.dropped,
        received.failed,
        clock.frame_count()
    );
    Ok(())
}
