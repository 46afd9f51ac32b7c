//! Client ⇄ authority wire protocol.
//!
//! This module owns **every message that crosses the transport** between
//! the client and the authority computing the robot pose.
//!
//! ## Directions
//!
//! | Event                      | Direction          | Args                          |
//! |----------------------------|--------------------|-------------------------------|
//! | `get_robot`                | client → authority | none                          |
//! | `robot_move`               | client → authority | `x, y[, keepOrientation]`     |
//! | `robot_lift`               | client → authority | `z`                           |
//! | `robot_move_elbow`         | client → authority | `z`                           |
//! | `robot_move_crane`         | client → authority | `z, phi`                      |
//! | `robot_rotate_crane`       | client → authority | `phi`                         |
//! | `robot_rotate_elbow`       | client → authority | `phi`                         |
//! | `robot_rotate_wrist`       | client → authority | `phi`                         |
//! | `robot_open_gripper`       | client → authority | `space`                       |
//! | `robot_inverse_kinematic`  | client → authority | `x, y, z`                     |
//! | `robot`                    | authority → client | `RobotData`                   |
//!
//! ## Framing
//!
//! A [`Frame`] is an event name plus positional JSON arguments.  The live
//! authority is a Socket.IO server; the bridge hands frames to the Socket.IO
//! client, which adds the Engine.IO packet prefix (`42["robot_move",1.5,-2.0]`
//! on the wire).  [`Frame::encode`] / [`Frame::decode`] give the bare text
//! form `["robot_move", 1.5, -2.0]`, used by the loopback transport and by
//! [`decode`] for raw text sources.
//!
//! Commands are fire-and-forget; there is no acknowledgement.  Snapshots
//! carry no sequence number, so ordering relies on the transport delivering
//! one connection's messages in send order.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::pose::RobotData;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub mod events {
    pub const GET_ROBOT: &str = "get_robot";
    pub const ROBOT_MOVE: &str = "robot_move";
    pub const ROBOT_LIFT: &str = "robot_lift";
    pub const ROBOT_MOVE_ELBOW: &str = "robot_move_elbow";
    pub const ROBOT_MOVE_CRANE: &str = "robot_move_crane";
    pub const ROBOT_ROTATE_CRANE: &str = "robot_rotate_crane";
    pub const ROBOT_ROTATE_ELBOW: &str = "robot_rotate_elbow";
    pub const ROBOT_ROTATE_WRIST: &str = "robot_rotate_wrist";
    pub const ROBOT_OPEN_GRIPPER: &str = "robot_open_gripper";
    pub const ROBOT_INVERSE_KINEMATIC: &str = "robot_inverse_kinematic";

    /// Authority → client snapshot.
    pub const ROBOT: &str = "robot";

    /// Every command name, in console help order.
    pub const COMMANDS: &[&str] = &[
        GET_ROBOT,
        ROBOT_MOVE,
        ROBOT_LIFT,
        ROBOT_MOVE_ELBOW,
        ROBOT_MOVE_CRANE,
        ROBOT_ROTATE_CRANE,
        ROBOT_ROTATE_ELBOW,
        ROBOT_ROTATE_WRIST,
        ROBOT_OPEN_GRIPPER,
        ROBOT_INVERSE_KINEMATIC,
    ];
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// An event name plus its positional arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub event: String,
    pub args: Vec<Value>,
}

impl Frame {
    pub fn new(event: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            args,
        }
    }

    /// Serialise as `[event, args...]`.
    pub fn encode(&self) -> String {
        let mut items = Vec::with_capacity(self.args.len() + 1);
        items.push(Value::String(self.event.clone()));
        items.extend(self.args.iter().cloned());
        Value::Array(items).to_string()
    }

    pub fn decode(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Array(mut items) = value else {
            return Err(Error::InvalidFrame("expected a JSON array".into()));
        };
        if items.is_empty() {
            return Err(Error::InvalidFrame("empty frame".into()));
        }
        let Value::String(event) = items.remove(0) else {
            return Err(Error::InvalidFrame("event name must be a string".into()));
        };
        Ok(Self { event, args: items })
    }

    fn number(&self, index: usize, name: &'static str) -> Result<f64> {
        self.args
            .get(index)
            .and_then(Value::as_f64)
            .ok_or_else(|| {
                Error::InvalidFrame(format!("{}: argument `{}` must be a number", self.event, name))
            })
    }
}

// ---------------------------------------------------------------------------
// Commands (client → authority)
// ---------------------------------------------------------------------------

/// A fully-parsed motion command.  Payloads are `f64` so user input reaches
/// the authority without an extra rounding step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    GetRobot,
    Move {
        x: f64,
        y: f64,
        /// Hold the end-effector orientation while the base moves.
        keep_orientation: Option<bool>,
    },
    Lift { z: f64 },
    MoveElbow { z: f64 },
    /// Combined lift + swing of the crane.
    MoveCrane { z: f64, phi: f64 },
    RotateCrane { phi: f64 },
    RotateElbow { phi: f64 },
    RotateWrist { phi: f64 },
    OpenGripper { space: f64 },
    InverseKinematic { x: f64, y: f64, z: f64 },
}

impl Command {
    pub fn event(&self) -> &'static str {
        match self {
            Command::GetRobot => events::GET_ROBOT,
            Command::Move { .. } => events::ROBOT_MOVE,
            Command::Lift { .. } => events::ROBOT_LIFT,
            Command::MoveElbow { .. } => events::ROBOT_MOVE_ELBOW,
            Command::MoveCrane { .. } => events::ROBOT_MOVE_CRANE,
            Command::RotateCrane { .. } => events::ROBOT_ROTATE_CRANE,
            Command::RotateElbow { .. } => events::ROBOT_ROTATE_ELBOW,
            Command::RotateWrist { .. } => events::ROBOT_ROTATE_WRIST,
            Command::OpenGripper { .. } => events::ROBOT_OPEN_GRIPPER,
            Command::InverseKinematic { .. } => events::ROBOT_INVERSE_KINEMATIC,
        }
    }

    pub fn args(&self) -> Vec<Value> {
        match *self {
            Command::GetRobot => vec![],
            Command::Move {
                x,
                y,
                keep_orientation,
            } => {
                let mut args = vec![Value::from(x), Value::from(y)];
                if let Some(keep) = keep_orientation {
                    args.push(Value::Bool(keep));
                }
                args
            }
            Command::Lift { z } | Command::MoveElbow { z } => vec![Value::from(z)],
            Command::MoveCrane { z, phi } => vec![Value::from(z), Value::from(phi)],
            Command::RotateCrane { phi }
            | Command::RotateElbow { phi }
            | Command::RotateWrist { phi } => vec![Value::from(phi)],
            Command::OpenGripper { space } => vec![Value::from(space)],
            Command::InverseKinematic { x, y, z } => {
                vec![Value::from(x), Value::from(y), Value::from(z)]
            }
        }
    }

    pub fn to_frame(&self) -> Frame {
        Frame::new(self.event(), self.args())
    }

    /// Parse a command frame (the authority's view of the wire).
    pub fn from_frame(frame: &Frame) -> Result<Self> {
        let cmd = match frame.event.as_str() {
            events::GET_ROBOT => Command::GetRobot,
            events::ROBOT_MOVE => Command::Move {
                x: frame.number(0, "x")?,
                y: frame.number(1, "y")?,
                keep_orientation: match frame.args.get(2) {
                    None => None,
                    Some(Value::Bool(b)) => Some(*b),
                    Some(_) => {
                        return Err(Error::InvalidFrame(
                            "robot_move: keepOrientation must be a bool".into(),
                        ))
                    }
                },
            },
            events::ROBOT_LIFT => Command::Lift {
                z: frame.number(0, "z")?,
            },
            events::ROBOT_MOVE_ELBOW => Command::MoveElbow {
                z: frame.number(0, "z")?,
            },
            events::ROBOT_MOVE_CRANE => Command::MoveCrane {
                z: frame.number(0, "z")?,
                phi: frame.number(1, "phi")?,
            },
            events::ROBOT_ROTATE_CRANE => Command::RotateCrane {
                phi: frame.number(0, "phi")?,
            },
            events::ROBOT_ROTATE_ELBOW => Command::RotateElbow {
                phi: frame.number(0, "phi")?,
            },
            events::ROBOT_ROTATE_WRIST => Command::RotateWrist {
                phi: frame.number(0, "phi")?,
            },
            events::ROBOT_OPEN_GRIPPER => Command::OpenGripper {
                space: frame.number(0, "space")?,
            },
            events::ROBOT_INVERSE_KINEMATIC => Command::InverseKinematic {
                x: frame.number(0, "x")?,
                y: frame.number(1, "y")?,
                z: frame.number(2, "z")?,
            },
            other => return Err(Error::UnknownCommand(other.to_string())),
        };
        Ok(cmd)
    }
}

// ---------------------------------------------------------------------------
// Inbound events (authority → client)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Full snapshot; applied wholesale.
    Robot(RobotData),
    /// Any event this client does not consume.
    Other { event: String },
}

impl Inbound {
    pub fn from_frame(frame: Frame) -> Result<Self> {
        if frame.event != events::ROBOT {
            return Ok(Inbound::Other { event: frame.event });
        }
        let mut args = frame.args.into_iter();
        let payload = args
            .next()
            .ok_or_else(|| Error::InvalidFrame("robot: missing payload".into()))?;
        Ok(Inbound::Robot(RobotData::from_value(payload)?))
    }
}

/// Decode one transport text message into an inbound event.
pub fn decode(text: &str) -> Result<Inbound> {
    Inbound::from_frame(Frame::decode(text)?)
}

/// Encode a snapshot as the authority sends it.
pub fn encode_robot(data: &RobotData) -> Result<String> {
    Ok(Frame::new(events::ROBOT, vec![serde_json::to_value(data)?]).encode())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn move_frame_layout() {
        let cmd = Command::Move {
            x: 1.5,
            y: -2.0,
            keep_orientation: None,
        };
        assert_eq!(cmd.to_frame().encode(), r#"["robot_move",1.5,-2.0]"#);
    }

    #[test]
    fn move_with_flag_appends_bool() {
        let cmd = Command::Move {
            x: 0.0,
            y: 1.0,
            keep_orientation: Some(true),
        };
        assert_eq!(cmd.args().last(), Some(&Value::Bool(true)));
    }

    #[test]
    fn get_robot_has_no_args() {
        assert_eq!(Command::GetRobot.to_frame().encode(), r#"["get_robot"]"#);
    }

    #[test]
    fn every_command_name_parses_back() {
        let cmds = [
            Command::GetRobot,
            Command::Move { x: 1.0, y: 2.0, keep_orientation: Some(false) },
            Command::Lift { z: 0.5 },
            Command::MoveElbow { z: 0.25 },
            Command::MoveCrane { z: 1.0, phi: 0.1 },
            Command::RotateCrane { phi: 0.3 },
            Command::RotateElbow { phi: -0.3 },
            Command::RotateWrist { phi: 3.0 },
            Command::OpenGripper { space: 0.8 },
            Command::InverseKinematic { x: 1.0, y: 2.0, z: 3.0 },
        ];
        assert_eq!(cmds.len(), events::COMMANDS.len());
        for cmd in cmds {
            let frame = Frame::decode(&cmd.to_frame().encode()).unwrap();
            assert_eq!(Command::from_frame(&frame).unwrap(), cmd);
        }
    }

    #[test]
    fn decode_robot_snapshot() {
        let text = json!([
            "robot",
            {
                "x": 1.0, "y": 2.0,
                "crane": {"phi": 0.0, "z": 0.0},
                "elbow": {"phi": 0.0},
                "wrist": {"phi": 0.0},
                "gripper": {"space": 0.2}
            }
        ])
        .to_string();
        match decode(&text).unwrap() {
            Inbound::Robot(d) => assert_eq!(d.gripper.space, 0.2),
            other => panic!("expected Robot, got {:?}", other),
        }
    }

    #[test]
    fn robot_without_payload_is_invalid() {
        assert!(matches!(decode(r#"["robot"]"#), Err(Error::InvalidFrame(_))));
    }

    #[test]
    fn unknown_event_is_other() {
        assert_eq!(
            decode(r#"["status", "ok"]"#).unwrap(),
            Inbound::Other {
                event: "status".into()
            }
        );
    }

    #[test]
    fn malformed_frames() {
        assert!(Frame::decode("{}").is_err());
        assert!(Frame::decode("[]").is_err());
        assert!(Frame::decode("[42]").is_err());
        assert!(Frame::decode("not json").is_err());
    }

    #[test]
    fn encode_robot_decodes_to_same_snapshot() {
        let mut d = RobotData::default();
        d.x = 4.0;
        d.wrist.phi = 0.5;
        assert_eq!(decode(&encode_robot(&d).unwrap()).unwrap(), Inbound::Robot(d));
    }
}
