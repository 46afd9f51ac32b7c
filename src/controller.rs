//! `RobotController`: binds the protocol to the kinematic chain.
//!
//! Inbound: every `robot` snapshot is applied to the chain with exactly one
//! [`KinematicChain::update`] call, in delivery order, and then the same
//! snapshot is published to the display cell.  There is no sequence check:
//! an older snapshot that arrives late replaces a newer one.
//!
//! Snapshots only count while the transport is connected.  Anything still
//! queued when the connection closes, and anything tagged with an earlier
//! session, is dropped; the last applied pose stays on screen.
//!
//! Outbound: typed command helpers take user-facing text, parse every
//! argument, and emit only if all of them parsed.  A bad argument never
//! turns into a default value.

use tokio::sync::watch;

use crate::chain::{ChainDimensions, KinematicChain};
use crate::error::{Error, Result};
use crate::events::{ClientEvent, SessionEvent};
use crate::pose::RobotData;
use crate::protocol::{self, events, Command, Inbound};
use crate::transport::Transport;

pub struct RobotController<T: Transport> {
    chain: KinematicChain,
    transport: T,
    /// Last applied snapshot, for UI display.
    display: watch::Sender<Option<RobotData>>,
}

impl<T: Transport> RobotController<T> {
    pub fn new(transport: T, dimensions: ChainDimensions) -> Self {
        let (display, _) = watch::channel(None);
        Self {
            chain: KinematicChain::construct(dimensions),
            transport,
            display,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn chain(&self) -> &KinematicChain {
        &self.chain
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Observe the last applied snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Option<RobotData>> {
        self.display.subscribe()
    }

    /// Snapshot currently shown, if any has been applied.
    pub fn displayed(&self) -> Option<RobotData> {
        *self.display.borrow()
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    pub fn connect(&mut self) -> Result<()> {
        self.transport.connect()
    }

    /// Stop traffic.  The last applied pose stays on screen.
    pub fn disconnect(&mut self) {
        self.transport.disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    // ------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------

    /// Apply one snapshot: chain first, then the display cell, both from
    /// the same value.  On error neither is touched.  While disconnected the
    /// snapshot is dropped.
    pub fn on_robot(&mut self, data: RobotData) -> Result<()> {
        if !self.transport.is_connected() {
            log::debug!("dropping snapshot received while disconnected");
            return Ok(());
        }
        self.chain.update(&data)?;
        self.display.send_replace(Some(data));
        Ok(())
    }

    pub fn handle_event(&mut self, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::Robot(data) => self.on_robot(data),
            ClientEvent::Connected { endpoint } => {
                log::info!("connected to {}", endpoint);
                Ok(())
            }
            ClientEvent::Disconnected { reason } => {
                log::info!("disconnected ({}); keeping last pose", reason);
                Ok(())
            }
        }
    }

    /// Handle an event from the transport's queue, ignoring anything left
    /// over from an earlier connection.
    pub fn handle_session_event(&mut self, tagged: SessionEvent) -> Result<()> {
        let current = self.transport.session();
        if tagged.session != current {
            log::debug!(
                "dropping {:?} from session {} (current {})",
                tagged.event,
                tagged.session,
                current
            );
            return Ok(());
        }
        self.handle_event(tagged.event)
    }

    /// Decode a raw transport message and apply it.
    pub fn handle_text(&mut self, text: &str) -> Result<()> {
        match protocol::decode(text)? {
            Inbound::Robot(data) => self.on_robot(data),
            Inbound::Other { event } => {
                log::debug!("ignoring event {:?}", event);
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Outbound
    // ------------------------------------------------------------------

    pub fn send(&mut self, command: Command) -> Result<()> {
        log::debug!("emit {:?}", command);
        self.transport.emit(command.to_frame())
    }

    pub fn get_robot(&mut self) -> Result<()> {
        self.send(Command::GetRobot)
    }

    pub fn move_robot(&mut self, x: &str, y: &str) -> Result<()> {
        self.send(Command::Move {
            x: parse_number("x", x)?,
            y: parse_number("y", y)?,
            keep_orientation: None,
        })
    }

    pub fn move_robot_keeping_orientation(&mut self, x: &str, y: &str, keep: &str) -> Result<()> {
        self.send(Command::Move {
            x: parse_number("x", x)?,
            y: parse_number("y", y)?,
            keep_orientation: Some(parse_flag("keepOrientation", keep)?),
        })
    }

    pub fn lift_crane(&mut self, z: &str) -> Result<()> {
        self.send(Command::Lift {
            z: parse_number("z", z)?,
        })
    }

    pub fn move_elbow(&mut self, z: &str) -> Result<()> {
        self.send(Command::MoveElbow {
            z: parse_number("z", z)?,
        })
    }

    pub fn move_crane(&mut self, z: &str, phi: &str) -> Result<()> {
        self.send(Command::MoveCrane {
            z: parse_number("z", z)?,
            phi: parse_number("phi", phi)?,
        })
    }

    pub fn rotate_crane(&mut self, phi: &str) -> Result<()> {
        self.send(Command::RotateCrane {
            phi: parse_number("phi", phi)?,
        })
    }

    pub fn rotate_elbow(&mut self, phi: &str) -> Result<()> {
        self.send(Command::RotateElbow {
            phi: parse_number("phi", phi)?,
        })
    }

    pub fn rotate_wrist(&mut self, phi: &str) -> Result<()> {
        self.send(Command::RotateWrist {
            phi: parse_number("phi", phi)?,
        })
    }

    pub fn open_gripper(&mut self, space: &str) -> Result<()> {
        self.send(Command::OpenGripper {
            space: parse_number("space", space)?,
        })
    }

    pub fn inverse_kinematic(&mut self, x: &str, y: &str, z: &str) -> Result<()> {
        self.send(Command::InverseKinematic {
            x: parse_number("x", x)?,
            y: parse_number("y", y)?,
            z: parse_number("z", z)?,
        })
    }

    /// Parse and send one console line, e.g. `robot_move 1.5 -2`.
    /// Returns the command that was emitted.
    pub fn dispatch_line(&mut self, line: &str) -> Result<Command> {
        let command = parse_line(line)?;
        self.send(command)?;
        Ok(command)
    }
}

// ---------------------------------------------------------------------------
// Input parsing
// ---------------------------------------------------------------------------

/// Parse user text as a finite float.
pub fn parse_number(field: &'static str, input: &str) -> Result<f64> {
    match input.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::InvalidNumber {
            field,
            input: input.to_string(),
        }),
    }
}

/// Parse user text as a boolean flag (`true`/`false`/`1`/`0`).
pub fn parse_flag(field: &'static str, input: &str) -> Result<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::InvalidFlag {
            field,
            input: input.to_string(),
        }),
    }
}

/// Parse a console line (`<command> <args...>`) into a [`Command`].
pub fn parse_line(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let name = words
        .next()
        .ok_or_else(|| Error::UnknownCommand(String::new()))?;
    let args: Vec<&str> = words.collect();

    let (command, max) = match name {
        events::GET_ROBOT => (Command::GetRobot, 0),
        events::ROBOT_MOVE => {
            let x = parse_number("x", arg(&args, 0, events::ROBOT_MOVE, "x")?)?;
            let y = parse_number("y", arg(&args, 1, events::ROBOT_MOVE, "y")?)?;
            let keep_orientation = match args.get(2) {
                Some(flag) => Some(parse_flag("keepOrientation", flag)?),
                None => None,
            };
            (
                Command::Move {
                    x,
                    y,
                    keep_orientation,
                },
                3,
            )
        }
        events::ROBOT_LIFT => (
            Command::Lift {
                z: parse_number("z", arg(&args, 0, events::ROBOT_LIFT, "z")?)?,
            },
            1,
        ),
        events::ROBOT_MOVE_ELBOW => (
            Command::MoveElbow {
                z: parse_number("z", arg(&args, 0, events::ROBOT_MOVE_ELBOW, "z")?)?,
            },
            1,
        ),
        events::ROBOT_MOVE_CRANE => (
            Command::MoveCrane {
                z: parse_number("z", arg(&args, 0, events::ROBOT_MOVE_CRANE, "z")?)?,
                phi: parse_number("phi", arg(&args, 1, events::ROBOT_MOVE_CRANE, "phi")?)?,
            },
            2,
        ),
        events::ROBOT_ROTATE_CRANE => (
            Command::RotateCrane {
                phi: parse_number("phi", arg(&args, 0, events::ROBOT_ROTATE_CRANE, "phi")?)?,
            },
            1,
        ),
        events::ROBOT_ROTATE_ELBOW => (
            Command::RotateElbow {
                phi: parse_number("phi", arg(&args, 0, events::ROBOT_ROTATE_ELBOW, "phi")?)?,
            },
            1,
        ),
        events::ROBOT_ROTATE_WRIST => (
            Command::RotateWrist {
                phi: parse_number("phi", arg(&args, 0, events::ROBOT_ROTATE_WRIST, "phi")?)?,
            },
            1,
        ),
        events::ROBOT_OPEN_GRIPPER => (
            Command::OpenGripper {
                space: parse_number(
                    "space",
                    arg(&args, 0, events::ROBOT_OPEN_GRIPPER, "space")?,
                )?,
            },
            1,
        ),
        events::ROBOT_INVERSE_KINEMATIC => {
            let cmd = events::ROBOT_INVERSE_KINEMATIC;
            (
                Command::InverseKinematic {
                    x: parse_number("x", arg(&args, 0, cmd, "x")?)?,
                    y: parse_number("y", arg(&args, 1, cmd, "y")?)?,
                    z: parse_number("z", arg(&args, 2, cmd, "z")?)?,
                },
                3,
            )
        }
        other => return Err(Error::UnknownCommand(other.to_string())),
    };

    if args.len() > max {
        return Err(Error::TooManyArguments {
            command: command.event(),
            max,
            got: args.len(),
        });
    }
    Ok(command)
}

fn arg<'a>(
    args: &[&'a str],
    index: usize,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or(Error::MissingArgument { command, argument })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::LoopbackTransport;

    fn controller() -> RobotController<LoopbackTransport> {
        let mut c = RobotController::new(LoopbackTransport::new(), ChainDimensions::default());
        c.connect().unwrap();
        c
    }

    #[test]
    fn parse_number_rejects_garbage_and_non_finite() {
        assert_eq!(parse_number("x", " 1.5 ").unwrap(), 1.5);
        assert_eq!(parse_number("x", "-2").unwrap(), -2.0);
        for bad in ["abc", "", "1.5.2", "NaN", "inf", "-infinity", "1e999"] {
            assert!(
                matches!(parse_number("x", bad), Err(Error::InvalidNumber { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn parse_flag_has_no_fallback() {
        assert!(parse_flag("k", "true").unwrap());
        assert!(parse_flag("k", "TRUE").unwrap());
        assert!(!parse_flag("k", "0").unwrap());
        assert!(matches!(parse_flag("k", "yes"), Err(Error::InvalidFlag { .. })));
        assert!(matches!(parse_flag("k", "2.5"), Err(Error::InvalidFlag { .. })));
    }

    #[test]
    fn parse_line_variants() {
        assert_eq!(parse_line("get_robot").unwrap(), Command::GetRobot);
        assert_eq!(
            parse_line("robot_move 1 2 true").unwrap(),
            Command::Move {
                x: 1.0,
                y: 2.0,
                keep_orientation: Some(true)
            }
        );
        assert_eq!(
            parse_line("  robot_inverse_kinematic 1 2 3 ").unwrap(),
            Command::InverseKinematic {
                x: 1.0,
                y: 2.0,
                z: 3.0
            }
        );
        assert!(matches!(
            parse_line("robot_lift"),
            Err(Error::MissingArgument {
                command: "robot_lift",
                argument: "z"
            })
        ));
        assert!(matches!(
            parse_line("robot_lift 1 2"),
            Err(Error::TooManyArguments { max: 1, got: 2, .. })
        ));
        assert!(matches!(parse_line("dance"), Err(Error::UnknownCommand(_))));
        assert!(parse_line("").is_err());
    }

    #[test]
    fn bad_flag_sends_nothing() {
        let mut c = controller();
        assert!(c.move_robot_keeping_orientation("1", "2", "maybe").is_err());
        assert!(c.transport().sent().is_empty());
    }

    #[test]
    fn second_bad_argument_sends_nothing() {
        let mut c = controller();
        assert!(c.inverse_kinematic("1", "2", "z").is_err());
        assert!(c.move_crane("1", "").is_err());
        assert!(c.transport().sent().is_empty());
    }

    #[test]
    fn dispatch_line_emits_parsed_command() {
        let mut c = controller();
        let cmd = c.dispatch_line("robot_open_gripper 0.8").unwrap();
        assert_eq!(cmd, Command::OpenGripper { space: 0.8 });
        assert_eq!(c.transport().sent(), &[cmd.to_frame()]);
    }

    #[test]
    fn handle_text_applies_snapshot() {
        let mut c = controller();
        let mut d = RobotData::default();
        d.elbow.phi = 0.7;
        c.handle_text(&protocol::encode_robot(&d).unwrap()).unwrap();
        assert_eq!(c.displayed(), Some(d));
        assert_eq!(c.chain().update_count(), 1);
    }

    #[test]
    fn snapshot_after_disconnect_is_dropped() {
        let mut c = controller();
        let mut d = RobotData::default();
        d.x = 1.0;
        c.on_robot(d).unwrap();

        c.disconnect();
        let mut late = RobotData::default();
        late.x = 9.0;
        c.handle_event(ClientEvent::Robot(late)).unwrap();

        assert_eq!(c.displayed(), Some(d));
        assert_eq!(c.chain().update_count(), 1);
    }

    #[test]
    fn lifecycle_events_do_not_touch_pose() {
        let mut c = controller();
        c.handle_event(ClientEvent::Connected {
            endpoint: "http://x".into(),
        })
        .unwrap();
        c.handle_event(ClientEvent::Disconnected {
            reason: "bye".into(),
        })
        .unwrap();
        assert_eq!(c.displayed(), None);
        assert_eq!(c.chain().update_count(), 0);
    }
}
