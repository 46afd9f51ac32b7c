//! robot-arm-client binary
//!
//! Connects to the pose authority, keeps the kinematic chain in sync with the
//! streamed snapshots, and reads motion commands from stdin.
//!
//! ## Console
//!
//! ```text
//! get_robot
//! robot_move <x> <y> [keepOrientation]
//! robot_lift <z>            robot_move_elbow <z>
//! robot_move_crane <z> <phi>
//! robot_rotate_crane <phi>  robot_rotate_elbow <phi>  robot_rotate_wrist <phi>
//! robot_open_gripper <space>
//! robot_inverse_kinematic <x> <y> <z>
//! connect | disconnect | status | help | quit
//! ```
//!
//! Configuration: see `robot_arm_sync::config`.  Log level via `RUST_LOG`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use robot_arm_sync::{
    protocol::events,
    scene::{self, Primitive, SceneRenderer},
    ClientConfig, ClientEvent, KinematicChain, LocalTransform, LoopbackTransport, RobotController,
    SegmentId, SessionEvent, SocketIoTransport, Transport, Vec3,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::Instrument;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "robot-arm-client", about = "Robot arm remote-control client", version)]
struct Args {
    /// TOML config file
    #[arg(long, env = "ROBOT_CONFIG")]
    config: Option<PathBuf>,

    /// Authority Socket.IO base URL (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Render loop rate in Hz, at most 1000 (overrides config)
    #[arg(long)]
    render_hz: Option<f32>,

    /// Run without a connection: commands are validated and recorded only
    #[arg(long)]
    offline: bool,
}

// ---------------------------------------------------------------------------
// Text renderer
// ---------------------------------------------------------------------------

/// Logs the end-effector position whenever it moves.
#[derive(Default)]
struct TextRenderer {
    last_tip: Option<Vec3>,
}

impl SceneRenderer for TextRenderer {
    fn create_group(&mut self, id: SegmentId, parent: Option<SegmentId>) {
        log::debug!("group {} (parent {:?})", id, parent.map(SegmentId::name));
    }

    fn create_mesh(&mut self, id: SegmentId, primitive: &Primitive) {
        log::debug!("mesh {}: {:?}", id, primitive.shape);
    }

    fn apply_transform(&mut self, _id: SegmentId, _transform: &LocalTransform) {}

    fn render_frame(&mut self, chain: &KinematicChain) {
        let left = chain.global_transform(SegmentId::GripperLeft).position;
        let right = chain.global_transform(SegmentId::GripperRight).position;
        let tip = Vec3::new(
            (left.x + right.x) / 2.0,
            (left.y + right.y) / 2.0,
            (left.z + right.z) / 2.0,
        );

        let moved = self.last_tip.map_or(true, |last| last.distance(tip) > 1e-4);
        if moved {
            log::info!(
                "end effector at {} (fingers {:.2} apart)",
                tip,
                left.distance(right)
            );
            self.last_tip = Some(tip);
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("robot_arm_sync=info".parse()?)
                .add_directive("robot_arm_client=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut cfg = ClientConfig::load(args.config.as_deref()).context("Failed to load config")?;
    if let Some(endpoint) = args.endpoint {
        cfg.endpoint = endpoint;
    }
    if let Some(hz) = args.render_hz {
        cfg.render_hz = hz;
    }
    cfg.validate().context("Invalid settings")?;

    log::info!(
        "Starting robot-arm-client (endpoint='{}', render_hz={}, offline={})",
        cfg.endpoint,
        cfg.render_hz,
        args.offline
    );

    let span = tracing::info_span!("session", endpoint = %cfg.endpoint);
    if args.offline {
        // Keep the sender alive so the event stream simply stays quiet.
        let (_quiet, events) = mpsc::unbounded_channel();
        let controller = RobotController::new(LoopbackTransport::new(), cfg.dimensions);
        run(controller, events, &cfg).instrument(span).await
    } else {
        let (transport, events) = SocketIoTransport::new(cfg.endpoint.clone());
        let transport = transport.websocket_only(cfg.websocket_only);
        let controller = RobotController::new(transport, cfg.dimensions);
        run(controller, events, &cfg).instrument(span).await
    }
}

// ---------------------------------------------------------------------------
// Session loop
// ---------------------------------------------------------------------------

async fn run<T: Transport>(
    mut controller: RobotController<T>,
    mut events: mpsc::UnboundedReceiver<SessionEvent>,
    cfg: &ClientConfig,
) -> Result<()> {
    // Scene first, traffic second.
    let mut renderer = TextRenderer::default();
    scene::mount(controller.chain(), &mut renderer);

    controller.connect().context("Failed to open connection")?;

    let mut display = controller.subscribe();
    let mut frame = tokio::time::interval(Duration::from_secs_f32(1.0 / cfg.render_hz));
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            _ = frame.tick() => {
                scene::sync(controller.chain(), &mut renderer);
            }

            event = events.recv() => {
                let Some(event) = event else { break };
                let connected = event.session == controller.transport().session()
                    && matches!(event.event, ClientEvent::Connected { .. });
                if let Err(e) = controller.handle_session_event(event) {
                    log::warn!("snapshot rejected: {}", e);
                }
                if connected && cfg.request_on_connect {
                    if let Err(e) = controller.get_robot() {
                        log::warn!("get_robot failed: {}", e);
                    }
                }
            }

            changed = display.changed() => {
                if changed.is_ok() {
                    if let Some(data) = *display.borrow_and_update() {
                        log::debug!("robot: {}", data);
                    }
                }
            }

            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) => {
                    if !console(&mut controller, &line) {
                        break;
                    }
                }
                Ok(None) => {
                    log::info!("stdin closed; still rendering (Ctrl-C to quit)");
                    stdin_open = false;
                }
                Err(e) => {
                    log::warn!("stdin error: {}", e);
                    stdin_open = false;
                }
            },

            _ = tokio::signal::ctrl_c() => {
                log::info!("robot-arm-client shutting down (SIGINT)");
                break;
            }
        }
    }

    controller.disconnect();
    Ok(())
}

/// Handle one console line.  Returns `false` to quit.
fn console<T: Transport>(controller: &mut RobotController<T>, line: &str) -> bool {
    let line = line.trim();
    match line {
        "" => {}
        "quit" | "exit" => return false,
        "help" => {
            println!("commands: {}", events::COMMANDS.join(", "));
            println!("session:  connect, disconnect, status, quit");
        }
        "connect" => {
            if let Err(e) = controller.connect() {
                log::warn!("connect failed: {}", e);
            }
        }
        "disconnect" => controller.disconnect(),
        "status" => {
            println!(
                "connected={} updates={} pose={}",
                controller.is_connected(),
                controller.chain().update_count(),
                controller
                    .displayed()
                    .map_or_else(|| "-".to_string(), |d| d.to_string())
            );
        }
        _ => match controller.dispatch_line(line) {
            Ok(cmd) => log::info!("sent {}", cmd.event()),
            Err(e) => log::warn!("{}", e),
        },
    }
    true
}
