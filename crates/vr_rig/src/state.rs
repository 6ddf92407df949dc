//! Pose records streamed over the rig channels.
//!
//! Each record is encoded in field declaration order with no header, so the
//! layouts below are the wire format. Changing field order breaks peers on
//! older builds without any error on their side.

use glam::Vec3;
use netcode::{DecodeError, PacketDecode, PacketEncode};

/// Which hand a value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CrouchState {
    #[default]
    None = 0,
    /// The player physically crouched.
    Roomscale = 1,
    /// The player is holding the crouch button.
    Button = 2,
}

impl TryFrom<u8> for CrouchState {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CrouchState::None),
            1 => Ok(CrouchState::Roomscale),
            2 => Ok(CrouchState::Button),
            value => Err(DecodeError::InvalidValue { field: "crouch state", value }),
        }
    }
}

impl PacketEncode for CrouchState {
    fn encode(&self, out: &mut Vec<u8>) {
        (*self as u8).encode(out);
    }
}

impl PacketDecode for CrouchState {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        CrouchState::try_from(u8::decode(inp)?)
    }
}

/// Per-finger curl, 0 = open and 255 = fully curled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fingers {
    pub thumb: u8,
    pub index: u8,
    pub middle: u8,
    pub ring: u8,
    pub pinky: u8,
}

impl Fingers {
    /// Quantize curl amounts in `[0, 1]` (thumb first).
    pub fn from_curls(curls: [f32; 5]) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            thumb: q(curls[0]),
            index: q(curls[1]),
            middle: q(curls[2]),
            ring: q(curls[3]),
            pinky: q(curls[4]),
        }
    }

    /// Curl amounts in `[0, 1]` (thumb first).
    pub fn curls(&self) -> [f32; 5] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky].map(|b| b as f32 / 255.0)
    }
}

impl PacketEncode for Fingers {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[self.thumb, self.index, self.middle, self.ring, self.pinky]);
    }
}

impl PacketDecode for Fingers {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            thumb: u8::decode(inp)?,
            index: u8::decode(inp)?,
            middle: u8::decode(inp)?,
            ring: u8::decode(inp)?,
            pinky: u8::decode(inp)?,
        })
    }
}

/// Full VR pose of one peer for one frame. Euler angles are in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RigState {
    pub left_hand_position: Vec3,
    pub left_hand_eulers: Vec3,
    pub left_hand_fingers: Fingers,

    pub right_hand_position: Vec3,
    pub right_hand_eulers: Vec3,
    pub right_hand_fingers: Fingers,

    pub camera_eulers: Vec3,
    pub camera_pos_accounted: Vec3,
    pub model_offset: Vec3,
    pub special_animation_offset: Vec3,

    pub crouch_state: CrouchState,
    pub rotation_offset: f32,
    pub camera_floor_offset: f32,
}

impl RigState {
    pub const ENCODED_LEN: usize = 115;

    pub fn hand_position(&self, hand: Hand) -> Vec3 {
        match hand {
            Hand::Left => self.left_hand_position,
            Hand::Right => self.right_hand_position,
        }
    }

    pub fn hand_eulers(&self, hand: Hand) -> Vec3 {
        match hand {
            Hand::Left => self.left_hand_eulers,
            Hand::Right => self.right_hand_eulers,
        }
    }

    pub fn fingers(&self, hand: Hand) -> Fingers {
        match hand {
            Hand::Left => self.left_hand_fingers,
            Hand::Right => self.right_hand_fingers,
        }
    }
}

impl PacketEncode for RigState {
    fn encode(&self, out: &mut Vec<u8>) {
        self.left_hand_position.encode(out);
        self.left_hand_eulers.encode(out);
        self.left_hand_fingers.encode(out);
        self.right_hand_position.encode(out);
        self.right_hand_eulers.encode(out);
        self.right_hand_fingers.encode(out);
        self.camera_eulers.encode(out);
        self.camera_pos_accounted.encode(out);
        self.model_offset.encode(out);
        self.special_animation_offset.encode(out);
        self.crouch_state.encode(out);
        self.rotation_offset.encode(out);
        self.camera_floor_offset.encode(out);
    }
}

impl PacketDecode for RigState {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            left_hand_position: Vec3::decode(inp)?,
            left_hand_eulers: Vec3::decode(inp)?,
            left_hand_fingers: Fingers::decode(inp)?,
            right_hand_position: Vec3::decode(inp)?,
            right_hand_eulers: Vec3::decode(inp)?,
            right_hand_fingers: Fingers::decode(inp)?,
            camera_eulers: Vec3::decode(inp)?,
            camera_pos_accounted: Vec3::decode(inp)?,
            model_offset: Vec3::decode(inp)?,
            special_animation_offset: Vec3::decode(inp)?,
            crouch_state: CrouchState::decode(inp)?,
            rotation_offset: f32::decode(inp)?,
            camera_floor_offset: f32::decode(inp)?,
        })
    }
}

/// Ghost pose streamed while the owning peer is dead. Rotations are euler degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpectatorRigState {
    pub head_position: Vec3,
    pub head_rotation: Vec3,

    pub left_hand_position: Vec3,
    pub left_hand_rotation: Vec3,

    pub right_hand_position: Vec3,
    pub right_hand_rotation: Vec3,

    pub parented_to_ship: bool,
}

impl SpectatorRigState {
    pub const ENCODED_LEN: usize = 73;
}

impl PacketEncode for SpectatorRigState {
    fn encode(&self, out: &mut Vec<u8>) {
        self.head_position.encode(out);
        self.head_rotation.encode(out);
        self.left_hand_position.encode(out);
        self.left_hand_rotation.encode(out);
        self.right_hand_position.encode(out);
        self.right_hand_rotation.encode(out);
        self.parented_to_ship.encode(out);
    }
}

impl PacketDecode for SpectatorRigState {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self {
            head_position: Vec3::decode(inp)?,
            head_rotation: Vec3::decode(inp)?,
            left_hand_position: Vec3::decode(inp)?,
            left_hand_rotation: Vec3::decode(inp)?,
            right_hand_position: Vec3::decode(inp)?,
            right_hand_rotation: Vec3::decode(inp)?,
            parented_to_ship: bool::decode(inp)?,
        })
    }
}

/// Client-side preferences other peers need to honour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerPrefs {
    pub disable_steering_wheel: bool,
}

impl PacketEncode for PlayerPrefs {
    fn encode(&self, out: &mut Vec<u8>) {
        self.disable_steering_wheel.encode(out);
    }
}

impl PacketDecode for PlayerPrefs {
    fn decode(inp: &mut &[u8]) -> Result<Self, DecodeError> {
        Ok(Self { disable_steering_wheel: bool::decode(inp)? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rig() -> RigState {
        RigState {
            left_hand_position: Vec3::new(-0.3, 1.1, 0.2),
            left_hand_eulers: Vec3::new(10.0, 20.0, 30.0),
            left_hand_fingers: Fingers { thumb: 1, index: 2, middle: 3, ring: 4, pinky: 5 },
            right_hand_position: Vec3::new(0.3, 1.2, 0.25),
            right_hand_eulers: Vec3::new(0.0, 90.0, 0.0),
            right_hand_fingers: Fingers { thumb: 255, index: 0, middle: 128, ring: 64, pinky: 32 },
            camera_eulers: Vec3::new(5.0, 180.0, 0.0),
            camera_pos_accounted: Vec3::new(0.1, 1.7, -0.1),
            model_offset: Vec3::new(0.05, 0.0, 0.02),
            special_animation_offset: Vec3::ZERO,
            crouch_state: CrouchState::Roomscale,
            rotation_offset: 45.0,
            camera_floor_offset: 0.2,
        }
    }

    #[test]
    fn rig_state_has_fixed_length_and_left_hand_first() {
        let rig = sample_rig();
        let bytes = rig.encode_to_vec();
        assert_eq!(bytes.len(), RigState::ENCODED_LEN);
        assert_eq!(&bytes[0..4], &(-0.3f32).to_le_bytes());
        // Left fingers follow the two left-hand vectors.
        assert_eq!(&bytes[24..29], &[1, 2, 3, 4, 5]);
        // Crouch state byte sits before the two trailing floats.
        assert_eq!(bytes[RigState::ENCODED_LEN - 9], CrouchState::Roomscale as u8);
        assert_eq!(RigState::decode_exact(&bytes), Ok(rig));
    }

    #[test]
    fn rig_state_rejects_unknown_crouch_state() {
        let mut bytes = sample_rig().encode_to_vec();
        bytes[RigState::ENCODED_LEN - 9] = 7;
        assert_eq!(
            RigState::decode_exact(&bytes),
            Err(DecodeError::InvalidValue { field: "crouch state", value: 7 })
        );
    }

    #[test]
    fn truncated_rig_state_is_an_error() {
        let bytes = sample_rig().encode_to_vec();
        assert!(RigState::decode_exact(&bytes[..100]).is_err());
    }

    #[test]
    fn spectator_state_layout() {
        let state = SpectatorRigState {
            head_position: Vec3::new(0.0, 1.7, 0.0),
            parented_to_ship: true,
            ..Default::default()
        };
        let bytes = state.encode_to_vec();
        assert_eq!(bytes.len(), SpectatorRigState::ENCODED_LEN);
        assert_eq!(bytes[72], 1);
        assert_eq!(SpectatorRigState::decode_exact(&bytes), Ok(state));
    }

    #[test]
    fn prefs_are_one_byte() {
        let prefs = PlayerPrefs { disable_steering_wheel: true };
        assert_eq!(prefs.encode_to_vec(), vec![1]);
        assert_eq!(PlayerPrefs::decode_exact(&[0]), Ok(PlayerPrefs::default()));
    }

    #[test]
    fn finger_curl_quantization() {
        let fingers = Fingers::from_curls([0.0, 1.0, 0.5, 2.0, -1.0]);
        assert_eq!(fingers, Fingers { thumb: 0, index: 255, middle: 128, ring: 255, pinky: 0 });
        let curls = fingers.curls();
        assert!((curls[1] - 1.0).abs() < 1e-6);
        assert!((curls[2] - 128.0 / 255.0).abs() < 1e-6);
    }
}
