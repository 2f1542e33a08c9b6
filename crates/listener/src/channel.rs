//! Realtime `postgres_changes` subscription.
//!
//! Connects to the realtime WebSocket, joins one channel for the user's
//! `jobs` rows, keeps it alive with heartbeats and turns matching changes
//! into completion signals. Failed sessions are retried under a
//! [`RetryPolicy`]; when it is exhausted [`RealtimeListener::run`] returns
//! [`RealtimeOutcome::GaveUp`] and only polling is left.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use genflow_core::job_events::{ChangeKind, JOBS_TABLE, PUBLIC_SCHEMA};
use genflow_core::realtime::{
    ChangePayload, ChangeSubscription, Frame, JoinConfig, JoinPayload, EVENT_CLOSE, EVENT_ERROR,
    EVENT_HEARTBEAT, EVENT_JOIN, EVENT_LEAVE, EVENT_POSTGRES_CHANGES, EVENT_REPLY, PHOENIX_TOPIC,
    REPLY_OK, TOPIC_PREFIX,
};
use genflow_core::types::DbId;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;

use crate::error::ListenerError;
use crate::messages::{JobRow, MetadataPredicate};
use crate::poller::WatchList;
use crate::reconnect::{Backoff, RetryPolicy};
use crate::signals::SignalBus;

/// How long to wait for the join reply.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection settings for one subscription.
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Full WebSocket URL including any query parameters.
    pub url: String,
    pub access_token: String,
    pub user_id: DbId,
    /// Channel name; the topic is `realtime:<channel>`.
    pub channel: String,
    pub heartbeat_interval: Duration,
    /// Only changes whose `metadata` satisfies this are acted on.
    pub predicate: Option<MetadataPredicate>,
}

impl RealtimeConfig {
    pub fn topic(&self) -> String {
        format!("{TOPIC_PREFIX}{}", self.channel)
    }

    /// The `phx_join` payload subscribing to this user's job rows.
    pub fn join_payload(&self) -> JoinPayload {
        JoinPayload {
            config: JoinConfig {
                postgres_changes: vec![ChangeSubscription {
                    event: "*".into(),
                    schema: PUBLIC_SCHEMA.into(),
                    table: JOBS_TABLE.into(),
                    filter: Some(format!("user_id=eq.{}", self.user_id)),
                    id: None,
                }],
            },
            access_token: Some(self.access_token.clone()),
        }
    }
}

/// How a realtime run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeOutcome {
    /// Shut down on request.
    Cancelled,
    /// Retries exhausted.
    GaveUp,
}

pub struct RealtimeListener {
    config: RealtimeConfig,
    policy: RetryPolicy,
    bus: Arc<SignalBus>,
    watch: Arc<WatchList>,
}

impl RealtimeListener {
    pub fn new(
        config: RealtimeConfig,
        policy: RetryPolicy,
        bus: Arc<SignalBus>,
        watch: Arc<WatchList>,
    ) -> Self {
        Self {
            config,
            policy,
            bus,
            watch,
        }
    }

    /// Keep the subscription alive until cancelled or the retry budget is
    /// spent. A session that joined successfully resets the budget.
    pub async fn run(&self, cancel: CancellationToken) -> RealtimeOutcome {
        let mut backoff = Backoff::new(self.policy);

        loop {
            let error = match self.session(&cancel, &mut backoff).await {
                Ok(()) => return RealtimeOutcome::Cancelled,
                Err(e) => e,
            };

            let Some(delay) = backoff.next_delay() else {
                tracing::error!(
                    error = %error,
                    retries = backoff.retries(),
                    "Realtime subscription failed, giving up",
                );
                return RealtimeOutcome::GaveUp;
            };

            tracing::warn!(
                error = %error,
                retry = backoff.retries(),
                delay_secs = delay.as_secs(),
                "Realtime subscription failed, retrying",
            );

            tokio::select! {
                () = cancel.cancelled() => return RealtimeOutcome::Cancelled,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// One connection: join, then pump frames. `Ok` only on cancellation.
    async fn session(
        &self,
        cancel: &CancellationToken,
        backoff: &mut Backoff,
    ) -> Result<(), ListenerError> {
        let topic = self.config.topic();
        tracing::info!(%topic, "Connecting to realtime");

        let (mut socket, _response) = tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            connected = connect_async(self.config.url.as_str()) => connected?,
        };

        let mut refs = RefCounter::default();
        let join_ref = refs.next();
        let join = Frame::new(
            topic.clone(),
            EVENT_JOIN,
            serde_json::to_value(self.config.join_payload())?,
        )
        .with_ref(Some(join_ref.clone()))
        .with_join_ref(Some(join_ref.clone()));
        send_frame(&mut socket, &join).await?;

        tokio::select! {
            () = cancel.cancelled() => return Ok(()),
            joined = tokio::time::timeout(JOIN_TIMEOUT, await_reply(&mut socket, &join_ref)) => {
                let reply = joined.map_err(|_| ListenerError::JoinRejected("join timed out".into()))??;
                if reply.reply_status() != Some(REPLY_OK) {
                    let reason = reply.payload["response"]["reason"]
                        .as_str()
                        .unwrap_or("join rejected")
                        .to_string();
                    return Err(ListenerError::JoinRejected(reason));
                }
            }
        }

        tracing::info!(%topic, "Realtime channel joined");
        backoff.reset();

        let (mut sink, mut stream) = socket.split();
        let period = self.config.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    let leave = Frame::new(topic.clone(), EVENT_LEAVE, serde_json::json!({}))
                        .with_ref(Some(refs.next()))
                        .with_join_ref(Some(join_ref.clone()));
                    if let Ok(text) = serde_json::to_string(&leave) {
                        let _ = sink.send(Message::Text(text)).await;
                    }
                    let _ = sink.close().await;
                    tracing::info!(%topic, "Realtime channel left");
                    return Ok(());
                }
                _ = heartbeat.tick() => {
                    let beat = Frame::new(PHOENIX_TOPIC, EVENT_HEARTBEAT, serde_json::json!({}))
                        .with_ref(Some(refs.next()));
                    sink.send(Message::Text(serde_json::to_string(&beat)?)).await?;
                    tracing::trace!("Realtime heartbeat sent");
                }
                msg = stream.next() => match msg {
                    Some(Ok(Message::Text(text))) => self.handle_text(&topic, &text)?,
                    Some(Ok(Message::Close(frame))) => {
                        return Err(ListenerError::ChannelClosed(format!("server closed: {frame:?}")));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(ListenerError::ChannelClosed("stream ended".into())),
                },
            }
        }
    }

    /// React to one inbound frame. Errors end the session.
    fn handle_text(&self, topic: &str, text: &str) -> Result<(), ListenerError> {
        let frame: Frame = match serde_json::from_str(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed realtime frame");
                return Ok(());
            }
        };

        match frame.event.as_str() {
            EVENT_POSTGRES_CHANGES if frame.topic == topic => {
                match serde_json::from_value::<ChangePayload>(frame.payload) {
                    Ok(payload) => self.handle_change(payload),
                    Err(e) => tracing::warn!(error = %e, "Ignoring undecodable change payload"),
                }
                Ok(())
            }
            EVENT_ERROR | EVENT_CLOSE if frame.topic == topic => Err(ListenerError::ChannelClosed(
                format!("{} from server", frame.event),
            )),
            EVENT_REPLY if frame.reply_status() != Some(REPLY_OK) => {
                tracing::warn!(topic = %frame.topic, payload = %frame.payload, "Realtime request rejected");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn handle_change(&self, payload: ChangePayload) {
        let data = payload.data;
        if data.table != JOBS_TABLE {
            return;
        }

        if data.kind == ChangeKind::Delete {
            if let Some(id) = data.old_record.get("id").and_then(|v| v.as_str()) {
                if let Ok(id) = id.parse() {
                    self.watch.unwatch(id);
                }
            }
            return;
        }

        let job: JobRow = match serde_json::from_value(data.record) {
            Ok(job) => job,
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring job change without a usable record");
                return;
            }
        };

        if let Some(predicate) = &self.config.predicate {
            if !predicate.matches(&job.metadata) {
                return;
            }
        }

        tracing::debug!(job_id = %job.id, status = %job.status, change = data.kind.as_str(), "Job change received");
        self.watch.observe(&job, &self.bus);
    }
}

/// Message refs, unique per connection.
#[derive(Default)]
struct RefCounter(u64);

impl RefCounter {
    fn next(&mut self) -> String {
        self.0 += 1;
        self.0.to_string()
    }
}

async fn send_frame(socket: &mut Socket, frame: &Frame) -> Result<(), ListenerError> {
    socket.send(Message::Text(serde_json::to_string(frame)?)).await?;
    Ok(())
}

/// Read until the reply for `msg_ref` arrives.
async fn await_reply(socket: &mut Socket, msg_ref: &str) -> Result<Frame, ListenerError> {
    while let Some(message) = socket.next().await {
        if let Message::Text(text) = message? {
            let Ok(frame) = serde_json::from_str::<Frame>(&text) else {
                continue;
            };
            if frame.event == EVENT_REPLY && frame.msg_ref.as_deref() == Some(msg_ref) {
                return Ok(frame);
            }
        }
    }
    Err(ListenerError::ChannelClosed("closed before join reply".into()))
}
