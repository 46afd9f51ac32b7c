//! Socket.IO bridge: the concrete transport for a live authority.
//!
//! ## Threading model
//!
//! ```text
//! controller thread                  │  bridge task (tokio)
//! ─────────────────────────────────  │ ─────────────────────────────
//! SocketIoTransport::emit(frame)     │  outbound.recv()
//!   → outbound.send(frame)           │   → client.emit(event, args)
//!                                    │
//! events.recv()                      │  on("robot") callback
//!   → controller.handle_session_event│   → Inbound::from_frame()
//!                                    │   → events.send(SessionEvent)
//! ```
//!
//! One Socket.IO connection per session.  Engine.IO framing, heartbeats and
//! the namespace handshake belong to `rust_socketio`; this module only maps
//! named events onto [`Frame`]s.  Inbound events travel over an unbounded
//! channel so nothing is dropped or coalesced and arrival order is kept.
//! There is no reconnect or backoff: when the socket closes the bridge
//! reports [`ClientEvent::Disconnected`] and exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::FutureExt;
use rust_socketio::asynchronous::{Client, ClientBuilder};
use rust_socketio::{Event, Payload, TransportType};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::events::{ClientEvent, SessionEvent};
use crate::protocol::{events, Frame, Inbound};
use crate::transport::Transport;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

struct BridgeHandle {
    outbound: mpsc::UnboundedSender<Frame>,
    /// True between a completed handshake and socket close.
    open: Arc<AtomicBool>,
    _task: JoinHandle<()>,
}

// ---------------------------------------------------------------------------
// SocketIoTransport
// ---------------------------------------------------------------------------

/// [`Transport`] over Socket.IO.  Created disconnected.
pub struct SocketIoTransport {
    endpoint: String,
    websocket_only: bool,
    session: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
    bridge: Option<BridgeHandle>,
}

impl SocketIoTransport {
    /// Returns the transport and the receiver the controller loop drains.
    /// `endpoint` is the authority's base URL, e.g. `http://localhost:5000`.
    pub fn new(endpoint: impl Into<String>) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let transport = Self {
            endpoint: endpoint.into(),
            websocket_only: false,
            session: 0,
            events,
            bridge: None,
        };
        (transport, rx)
    }

    /// Skip the HTTP long-polling handshake and open a WebSocket directly.
    pub fn websocket_only(mut self, enabled: bool) -> Self {
        self.websocket_only = enabled;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn client_builder(
        &self,
        session: u64,
        closed: mpsc::UnboundedSender<String>,
    ) -> ClientBuilder {
        let snapshots = self.events.clone();
        let builder = ClientBuilder::new(self.endpoint.as_str())
            .reconnect(false)
            .on(events::ROBOT, move |payload: Payload, _: Client| {
                forward(payload, session, &snapshots);
                async {}.boxed()
            })
            .on(Event::Close, move |_: Payload, _: Client| {
                let _ = closed.send("closed by authority".to_string());
                async {}.boxed()
            })
            .on(Event::Error, |err: Payload, _: Client| {
                log::warn!("[bridge] socket.io error: {:?}", err);
                async {}.boxed()
            });

        if self.websocket_only {
            builder.transport_type(TransportType::Websocket)
        } else {
            builder
        }
    }
}

impl Transport for SocketIoTransport {
    /// Spawn the bridge task on the current tokio runtime.  The handshake
    /// completes asynchronously and is reported as
    /// [`ClientEvent::Connected`].
    fn connect(&mut self) -> Result<()> {
        if let Some(bridge) = &self.bridge {
            if !bridge.outbound.is_closed() {
                return Ok(());
            }
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Transport(format!("no tokio runtime: {}", e)))?;

        self.session += 1;
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (closed, closed_rx) = mpsc::unbounded_channel();
        let open = Arc::new(AtomicBool::new(false));
        let builder = self.client_builder(self.session, closed);

        log::info!("[bridge] session {}: connecting to {}", self.session, self.endpoint);
        let task = runtime.spawn(run_bridge(
            builder,
            Link {
                endpoint: self.endpoint.clone(),
                session: self.session,
                events: self.events.clone(),
                open: open.clone(),
            },
            outbound_rx,
            closed_rx,
        ));

        self.bridge = Some(BridgeHandle {
            outbound,
            open,
            _task: task,
        });
        Ok(())
    }

    /// Dropping the outbound sender makes the bridge close the socket.
    fn disconnect(&mut self) {
        if self.bridge.take().is_some() {
            log::info!("[bridge] session {}: disconnect requested", self.session);
        }
    }

    fn is_connected(&self) -> bool {
        self.bridge
            .as_ref()
            .is_some_and(|b| b.open.load(Ordering::Acquire))
    }

    fn session(&self) -> u64 {
        self.session
    }

    fn emit(&mut self, frame: Frame) -> Result<()> {
        let bridge = self.bridge.as_ref().ok_or(Error::NotConnected)?;
        if !bridge.open.load(Ordering::Acquire) {
            return Err(Error::NotConnected);
        }
        bridge.outbound.send(frame).map_err(|_| Error::NotConnected)
    }
}

// ---------------------------------------------------------------------------
// Bridge task
// ---------------------------------------------------------------------------

/// What the bridge task reports back through.
struct Link {
    endpoint: String,
    session: u64,
    events: mpsc::UnboundedSender<SessionEvent>,
    open: Arc<AtomicBool>,
}

impl Link {
    fn report(&self, event: ClientEvent) {
        let _ = self.events.send(SessionEvent::new(self.session, event));
    }
}

async fn run_bridge(
    builder: ClientBuilder,
    link: Link,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    mut closed: mpsc::UnboundedReceiver<String>,
) {
    let client = match builder.connect().await {
        Ok(client) => client,
        Err(e) => {
            log::error!("[bridge] connect to {} failed: {}", link.endpoint, e);
            link.report(ClientEvent::Disconnected {
                reason: format!("connect failed: {}", e),
            });
            return;
        }
    };

    link.open.store(true, Ordering::Release);
    log::info!("[bridge] session {}: connected to {}", link.session, link.endpoint);
    link.report(ClientEvent::Connected {
        endpoint: link.endpoint.clone(),
    });

    // Outbound first: a client-side close wins over anything still arriving.
    let reason = loop {
        tokio::select! {
            biased;

            out = outbound.recv() => match out {
                Some(Frame { event, args }) => {
                    if let Err(e) = client.emit(event.as_str(), Payload::Text(args)).await {
                        break format!("send failed: {}", e);
                    }
                }
                None => {
                    if let Err(e) = client.disconnect().await {
                        log::debug!("[bridge] disconnect: {}", e);
                    }
                    break "closed by client".to_string();
                }
            },

            reason = closed.recv() => {
                break reason.unwrap_or_else(|| "closed by authority".to_string());
            }
        }
    };

    link.open.store(false, Ordering::Release);
    log::info!("[bridge] session {}: connection closed: {}", link.session, reason);
    link.report(ClientEvent::Disconnected { reason });
}

/// Decode one `robot` payload and pass the snapshot on.  Returns `false`
/// once the receiving side is gone.
fn forward(payload: Payload, session: u64, tx: &mpsc::UnboundedSender<SessionEvent>) -> bool {
    let args = match payload {
        Payload::Text(values) => values,
        other => {
            log::warn!("[bridge] dropping non-JSON robot payload: {:?}", other);
            return true;
        }
    };

    match Inbound::from_frame(Frame::new(events::ROBOT, args)) {
        Ok(Inbound::Robot(data)) => tx
            .send(SessionEvent::new(session, ClientEvent::Robot(data)))
            .is_ok(),
        Ok(Inbound::Other { .. }) => true,
        Err(e) => {
            // Rejected whole: nothing from a malformed snapshot is applied.
            log::warn!("[bridge] dropping malformed snapshot: {}", e);
            true
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainDimensions;
    use crate::controller::RobotController;
    use crate::pose::RobotData;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::{TcpListener, TcpStream};
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::WebSocketStream;

    fn pose_at(x: f32) -> RobotData {
        let mut d = RobotData::default();
        d.x = x;
        d
    }

    #[test]
    fn new_transport_is_disconnected() {
        let (t, _rx) = SocketIoTransport::new("http://127.0.0.1:1");
        assert!(!t.is_connected());
        assert_eq!(t.session(), 0);
        assert_eq!(t.endpoint(), "http://127.0.0.1:1");
    }

    #[test]
    fn emit_before_connect_fails() {
        let (mut t, _rx) = SocketIoTransport::new("http://127.0.0.1:1");
        let err = t.emit(crate::protocol::Command::GetRobot.to_frame()).unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[test]
    fn connect_without_runtime_is_an_error() {
        let (mut t, _rx) = SocketIoTransport::new("http://127.0.0.1:1");
        assert!(matches!(t.connect(), Err(Error::Transport(_))));
    }

    #[test]
    fn forward_keeps_order_and_skips_garbage() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let (a, b) = (pose_at(1.0), pose_at(2.0));

        assert!(forward(Payload::Text(vec![serde_json::to_value(a).unwrap()]), 3, &tx));
        assert!(forward(Payload::Text(vec![json!({ "x": 1 })]), 3, &tx));
        assert!(forward(Payload::Text(vec![]), 3, &tx));
        assert!(forward(Payload::Text(vec![serde_json::to_value(b).unwrap()]), 3, &tx));

        assert_eq!(rx.try_recv().unwrap(), SessionEvent::new(3, ClientEvent::Robot(a)));
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::new(3, ClientEvent::Robot(b)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn forward_accepts_legacy_gripper_key() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let payload = json!({
            "x": 0.0, "y": 0.0,
            "crane": { "phi": 0.0, "z": 0.0 },
            "elbow": { "phi": 0.0 },
            "wrist": { "phi": 0.0 },
            "gripper": { "phi": 0.2 }
        });
        assert!(forward(Payload::Text(vec![payload]), 1, &tx));
        match rx.try_recv().unwrap().event {
            ClientEvent::Robot(d) => assert_eq!(d.gripper.space, 0.2),
            other => panic!("expected Robot, got {:?}", other),
        }
    }

    #[test]
    fn forward_reports_dropped_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let payload = serde_json::to_value(RobotData::default()).unwrap();
        assert!(!forward(Payload::Text(vec![payload]), 1, &tx));
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_disconnect() {
        let (mut t, mut rx) = SocketIoTransport::new("http://127.0.0.1:1");
        t.connect().unwrap();
        let tagged = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tagged.session, 1);
        match tagged.event {
            ClientEvent::Disconnected { reason } => assert!(reason.contains("connect failed")),
            other => panic!("expected Disconnected, got {:?}", other),
        }
        assert!(!t.is_connected());
    }

    // -----------------------------------------------------------------------
    // Live session against a minimal Engine.IO v4 / Socket.IO v5 peer
    // -----------------------------------------------------------------------

    const OPEN: &str = r#"0{"sid":"eio-1","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

    async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.as_str().to_owned(),
                Some(Ok(_)) => continue,
                other => panic!("peer stream ended: {:?}", other),
            }
        }
    }

    /// `42[...]` → the event array.
    fn event_array(packet: &str) -> Value {
        let body = packet.strip_prefix("42").unwrap_or_else(|| panic!("not an event: {packet}"));
        serde_json::from_str(body).unwrap()
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("no event within 10s")
            .expect("event channel closed")
    }

    #[tokio::test]
    async fn live_session_streams_snapshots_and_commands() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (a, b) = (pose_at(1.0), pose_at(2.0));

        let peer = tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();

            ws.send(Message::text(OPEN)).await.unwrap();
            let join = next_text(&mut ws).await;
            assert!(join.starts_with("40"), "namespace connect, got {join}");
            ws.send(Message::text(r#"40{"sid":"ns-1"}"#)).await.unwrap();

            let request = event_array(&next_text(&mut ws).await);
            assert_eq!(request[0], "get_robot");

            for data in [a, b] {
                let packet = json!(["robot", data]);
                ws.send(Message::text(format!("42{}", packet))).await.unwrap();
            }

            let command = event_array(&next_text(&mut ws).await);

            // server-side namespace disconnect, then close
            ws.send(Message::text("41")).await.unwrap();
            let _ = ws.close(None).await;
            command
        });

        let (transport, mut rx) = SocketIoTransport::new(format!("http://{}", addr));
        let mut controller =
            RobotController::new(transport.websocket_only(true), ChainDimensions::default());
        controller.connect().unwrap();

        let connected = next_event(&mut rx).await;
        assert!(matches!(connected.event, ClientEvent::Connected { .. }));
        controller.handle_session_event(connected).unwrap();
        assert!(controller.is_connected());
        controller.get_robot().unwrap();

        for _ in 0..2 {
            let snapshot = next_event(&mut rx).await;
            assert!(matches!(snapshot.event, ClientEvent::Robot(_)));
            controller.handle_session_event(snapshot).unwrap();
        }
        assert_eq!(controller.displayed(), Some(b));
        assert_eq!(controller.chain().update_count(), 2);

        controller.move_robot("1.5", "-2").unwrap();
        let command = peer.await.unwrap();
        assert_eq!(command, json!(["robot_move", 1.5, -2.0]));

        let closed = next_event(&mut rx).await;
        assert!(matches!(closed.event, ClientEvent::Disconnected { .. }));
        controller.handle_session_event(closed).unwrap();
        assert!(!controller.is_connected());
        assert_eq!(controller.displayed(), Some(b));
    }
}
