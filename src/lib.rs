//! Robot Arm Sync
//!
//! Client-side pose model and real-time synchronisation for a crane-style
//! robotic arm (base, arm, elbow, wrist, two-finger gripper).  A remote
//! authority computes the pose and streams full snapshots; this crate applies
//! them to a kinematic chain for rendering and sends motion commands back.
//!
//! ## Architecture
//!
//! ```text
//! RobotController  (controller.rs)  ← commands out, snapshots in
//!   ├── KinematicChain  (chain.rs)  ← fixed segment tree, local transforms
//!   │     └── RobotData (pose.rs)   ← one pose snapshot
//!   ├── protocol.rs                 ← event names, frames, commands
//!   └── Transport (transport.rs)
//!         └── SocketIoTransport (bridge.rs, `client` feature)
//! ```
//!
//! Rendering goes through [`scene::SceneRenderer`]; nothing in the core
//! depends on a graphics API.

// Pose / chain / protocol core is always available.
pub mod chain;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod pose;
pub mod protocol;
pub mod scene;
pub mod transport;
pub mod types;

// Live transport requires the `client` feature.
#[cfg(feature = "client")]
pub mod bridge;

#[cfg(feature = "client")]
pub use bridge::SocketIoTransport;
pub use chain::{ChainDimensions, KinematicChain, SegmentId};
pub use config::ClientConfig;
pub use controller::RobotController;
pub use error::{Error, Result};
pub use events::{ClientEvent, SessionEvent};
pub use pose::RobotData;
pub use protocol::{Command, Frame, Inbound};
pub use transport::{LoopbackTransport, Transport};
pub use types::{LocalTransform, Vec3};
