// Realtime change feed: a WebSocket subscription decoded into session events.

use crate::interface_adapters::protocol::{SubscribeDto, decode_change};
use crate::interface_adapters::utils::throttle::{log_epoch, should_log};
use crate::use_cases::SessionEvent;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

pub const RECONNECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("websocket error: {0}")]
    Ws(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("failed to encode subscription: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session event channel closed")]
    SessionClosed,
}

/// Runs one subscription until the server closes it.
pub async fn run_feed(url: &str, events: &mpsc::Sender<SessionEvent>) -> Result<(), FeedError> {
    let (socket, _) = connect_async(url).await?;
    info!(%url, "realtime feed connected");
    let (mut write, mut read) = socket.split();

    let subscribe = serde_json::to_string(&SubscribeDto::all_tables())?;
    write.send(Message::Text(subscribe.into())).await?;

    let mut last_decode_log = log_epoch();
    while let Some(message) = read.next().await {
        let text = match message? {
            Message::Text(text) => text,
            Message::Close(frame) => {
                info!(?frame, "realtime feed closed by server");
                break;
            }
            _ => continue,
        };

        match decode_change(text.as_str()) {
            Ok(Some(change)) => events
                .send(SessionEvent::Change(change))
                .await
                .map_err(|_| FeedError::SessionClosed)?,
            Ok(None) => debug!("ignoring change the session does not consume"),
            Err(e) => {
                if should_log(&mut last_decode_log) {
                    warn!(error = %e, "dropping undecodable change");
                }
            }
        }
    }
    Ok(())
}

/// Keeps the subscription alive, reconnecting after drops, until the session goes away.
pub fn spawn_feed(url: String, events: mpsc::Sender<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match run_feed(&url, &events).await {
                Ok(()) => {}
                Err(FeedError::SessionClosed) => break,
                Err(e) => warn!(error = %e, "realtime feed failed"),
            }
            if events.is_closed() {
                break;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
        debug!("realtime feed stopped");
    })
}
