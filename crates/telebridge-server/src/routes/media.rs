//! Media Routes - carrier media-stream websockets
//!
//! One socket per call. The first `start` frame creates the call session,
//! then an [`AudioBridge`] relays audio between the carrier and the agent.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use telebridge::TelephonyProvider;

use crate::adapters::media_stream::{MediaStreamProtocol, StreamStart, TelephonyEvent};
use crate::application::{AudioBridge, BridgeConfig, HandoffCoordinator};
use crate::AppState;

/// Outbound frames buffered per call before new ones are dropped
const TELEPHONY_BUFFER: usize = 256;

pub async fn telnyx_media(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_media_socket(socket, state, TelephonyProvider::Telnyx))
}

pub async fn twilio_media(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_media_socket(socket, state, TelephonyProvider::Twilio))
}

async fn handle_media_socket(socket: WebSocket, state: AppState, provider: TelephonyProvider) {
    let (sender, receiver) = socket.split();
    serve_media_stream(sender, receiver, state, provider).await
}

/// Drive one carrier media stream until either side hangs up.
async fn serve_media_stream<W, R>(
    mut sender: W,
    mut receiver: R,
    state: AppState,
    provider: TelephonyProvider,
) where
    W: Sink<Message> + Unpin + Send + 'static,
    W::Error: Display,
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    let protocol = MediaStreamProtocol::new(provider);

    let Some(connector) = state.connector.clone() else {
        warn!(provider = %provider, "⚠️  No conversational agent configured - closing media stream");
        let _ = sender.send(Message::Close(None)).await;
        return;
    };

    let start = match timeout(
        state.config.stream_start_timeout,
        wait_for_start(&protocol, &mut receiver),
    )
    .await
    {
        Ok(Some(start)) => start,
        Ok(None) => {
            debug!(provider = %provider, "Media stream closed before start");
            return;
        }
        Err(_) => {
            warn!(
                provider = %provider,
                "No start event within {:?} - closing media stream",
                state.config.stream_start_timeout
            );
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let session = match state.sessions.create(
        &start.call_id,
        &start.caller,
        start.called_number.clone(),
    ) {
        Ok(session) => session,
        Err(e) => {
            warn!(call_id = %start.call_id, error = %e, "Rejecting media stream");
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };
    info!(call_id = %start.call_id, caller = %start.caller, provider = %provider, "🎙️ Media stream started");

    let (telephony_tx, telephony_rx) = mpsc::channel::<String>(TELEPHONY_BUFFER);
    let writer = tokio::spawn(write_loop(sender, telephony_rx));

    let bridge = AudioBridge::new(
        session,
        protocol,
        telephony_tx,
        connector,
        state.tools.clone(),
        BridgeConfig {
            connect_timeout: state.config.agent_connect_timeout,
            end_call_grace: state.config.end_call_grace,
        },
    );

    let mut coordinator = HandoffCoordinator::new(bridge.clone(), state.config.transfer_routing())
        .with_contexts(state.tools.contexts().clone());
    if let Some(transferer) = state.transferer_for(provider) {
        coordinator = coordinator.with_transferer(transferer);
    }
    if let Some(contact_center) = state.contact_center.clone() {
        coordinator = coordinator.with_contact_center(contact_center);
    }
    coordinator.spawn();

    if bridge.start().await.is_err() {
        bridge.stop();
        let _ = writer.await;
        return;
    }
    bridge.handle_telephony_event(TelephonyEvent::Start(start));

    let mut shutdown = bridge.shutdown_signal();
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            message = receiver.next() => match message {
                Some(Ok(Message::Text(text))) => bridge.handle_telephony_message(&text),
                Some(Ok(Message::Close(_))) | None => {
                    debug!(call_id = %bridge.session().call_id(), "Carrier closed media stream");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(call_id = %bridge.session().call_id(), error = %e, "Media stream error");
                    break;
                }
            },
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    bridge.stop();
    let _ = writer.await;
}

/// Read frames until the carrier's `start` event. `None` if the socket closes first.
async fn wait_for_start<R>(protocol: &MediaStreamProtocol, receiver: &mut R) -> Option<StreamStart>
where
    R: Stream<Item = Result<Message, axum::Error>> + Unpin,
{
    while let Some(message) = receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        };
        match protocol.decode(&text) {
            Ok(TelephonyEvent::Start(start)) => return Some(start),
            Ok(TelephonyEvent::Connected) => debug!(provider = %protocol.provider(), "Media stream connected"),
            Ok(other) => debug!(event = ?other, "Ignoring media event before start"),
            Err(e) => warn!(error = %e, "Dropping telephony frame"),
        }
    }
    None
}

async fn write_loop<W>(mut sender: W, mut frames: mpsc::Receiver<String>)
where
    W: Sink<Message> + Unpin,
    W::Error: Display,
{
    while let Some(frame) = frames.recv().await {
        if let Err(e) = sender.send(Message::Text(frame)).await {
            debug!(error = %e, "Carrier socket write failed");
            return;
        }
    }
    let _ = sender.send(Message::Close(None)).await;
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/media/telnyx", get(telnyx_media))
        .route("/media/twilio", get(twilio_media))
}
