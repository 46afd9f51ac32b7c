//! `RobotData`: one complete pose snapshot as streamed by the authority.
//!
//! The snapshot is flat and fully populated: every joint parameter is
//! present in every message.  A missing field is a decoding error, never a
//! partial update.
//!
//! Wire shape (JSON):
//!
//! ```json
//! {
//!   "x": 2.0, "y": 3.0,
//!   "crane":   { "phi": 0.5, "z": 1.0 },
//!   "elbow":   { "phi": 0.2 },
//!   "wrist":   { "phi": -0.1 },
//!   "gripper": { "space": 0.4 }
//! }
//! ```
//!
//! Older authorities used a few alternate keys; they are accepted as aliases:
//! `z` for the base `y`, `y` for `crane.z`, and `phi` for `gripper.space`.
//! A payload that carries both a key and its alias (say `y` and `z` at the
//! top level) is ambiguous and rejected as a duplicate field.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CraneData {
    /// Base rotation (rad).
    pub phi: f32,
    /// Vertical lift of the arm column.
    #[serde(alias = "y")]
    pub z: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElbowData {
    pub phi: f32,
    /// Elbow height, only sent by authorities with a movable elbow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WristData {
    pub phi: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GripperData {
    /// Distance between the two fingers.
    #[serde(alias = "phi")]
    pub space: f32,
}

/// A full pose snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotData {
    pub x: f32,
    #[serde(alias = "z")]
    pub y: f32,
    pub crane: CraneData,
    pub elbow: ElbowData,
    pub wrist: WristData,
    pub gripper: GripperData,
}

impl Default for RobotData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            crane: CraneData { phi: 0.0, z: 0.0 },
            elbow: ElbowData { phi: 0.0, z: None },
            wrist: WristData { phi: 0.0 },
            gripper: GripperData { space: 0.0 },
        }
    }
}

impl RobotData {
    /// Decode and validate a snapshot from a JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let data: RobotData = serde_json::from_value(value)
            .map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Decode and validate a snapshot from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        let data: RobotData =
            serde_json::from_str(text).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Check the value invariants: everything finite, `space >= 0`.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.fields() {
            if !value.is_finite() {
                return Err(Error::NonFinite(name));
            }
        }
        if self.gripper.space < 0.0 {
            return Err(Error::NegativeSpace(self.gripper.space));
        }
        Ok(())
    }

    /// Every scalar in the snapshot with its dotted field name.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, f32)> {
        [
            ("x", Some(self.x)),
            ("y", Some(self.y)),
            ("crane.phi", Some(self.crane.phi)),
            ("crane.z", Some(self.crane.z)),
            ("elbow.phi", Some(self.elbow.phi)),
            ("elbow.z", self.elbow.z),
            ("wrist.phi", Some(self.wrist.phi)),
            ("gripper.space", Some(self.gripper.space)),
        ]
        .into_iter()
        .filter_map(|(name, v)| v.map(|v| (name, v)))
    }
}

impl std::fmt::Display for RobotData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "base=({:.2}, {:.2}) crane(phi={:.3}, z={:.2}) elbow(phi={:.3}",
            self.x, self.y, self.crane.phi, self.crane.z, self.elbow.phi
        )?;
        if let Some(z) = self.elbow.z {
            write!(f, ", z={:.2}", z)?;
        }
        write!(
            f,
            ") wrist(phi={:.3}) gripper(space={:.2})",
            self.wrist.phi, self.gripper.space
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "x": 2.0, "y": 3.0,
            "crane": { "phi": 0.5, "z": 1.0 },
            "elbow": { "phi": 0.2 },
            "wrist": { "phi": -0.1 },
            "gripper": { "space": 0.4 }
        })
    }

    #[test]
    fn decode_full_snapshot() {
        let d = RobotData::from_value(sample()).unwrap();
        assert_eq!(d.x, 2.0);
        assert_eq!(d.y, 3.0);
        assert_eq!(d.crane.phi, 0.5);
        assert_eq!(d.elbow.z, None);
        assert_eq!(d.gripper.space, 0.4);
    }

    #[test]
    fn key_and_alias_together_are_rejected() {
        let mut v = sample();
        v["z"] = json!(4.0);
        let err = RobotData::from_value(v).unwrap_err();
        assert!(
            matches!(&err, Error::InvalidSnapshot(msg) if msg.contains("duplicate field")),
            "{err}"
        );

        let mut v = sample();
        v["crane"]["y"] = json!(1.5);
        assert!(matches!(
            RobotData::from_value(v),
            Err(Error::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn missing_field_is_rejected() {
        let mut v = sample();
        v["wrist"].as_object_mut().unwrap().remove("phi");
        assert!(matches!(
            RobotData::from_value(v),
            Err(Error::InvalidSnapshot(_))
        ));

        let mut v = sample();
        v.as_object_mut().unwrap().remove("gripper");
        assert!(RobotData::from_value(v).is_err());
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let v = json!({
            "x": 1.0, "z": 4.0,
            "crane": { "phi": 0.0, "y": 2.5 },
            "elbow": { "phi": 0.1, "z": 3.0 },
            "wrist": { "phi": 0.0 },
            "gripper": { "phi": 0.6 }
        });
        let d = RobotData::from_value(v).unwrap();
        assert_eq!(d.y, 4.0);
        assert_eq!(d.crane.z, 2.5);
        assert_eq!(d.elbow.z, Some(3.0));
        assert_eq!(d.gripper.space, 0.6);
    }

    #[test]
    fn negative_space_is_rejected() {
        let mut v = sample();
        v["gripper"]["space"] = json!(-0.1);
        assert!(matches!(
            RobotData::from_value(v),
            Err(Error::NegativeSpace(_))
        ));
    }

    #[test]
    fn non_finite_values_fail_validation() {
        let mut d = RobotData::default();
        d.wrist.phi = f32::NAN;
        assert!(matches!(d.validate(), Err(Error::NonFinite("wrist.phi"))));

        let mut d = RobotData::default();
        d.elbow.z = Some(f32::INFINITY);
        assert!(matches!(d.validate(), Err(Error::NonFinite("elbow.z"))));
    }

    #[test]
    fn from_json_text() {
        let d = RobotData::from_json(&sample().to_string()).unwrap();
        assert_eq!(d.wrist.phi, -0.1);
        assert!(RobotData::from_json("{not json").is_err());
    }
}
