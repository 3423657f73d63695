//! Typed controller facade over a control port.
//!
//! Wraps raw verb calls in ordinary Rust methods: property getters and
//! setters derived from the schema, playback actions, screenshots with
//! binary payloads, proxied fetches, and text-track retrieval. All calls
//! go through the peer; nothing here touches a media element directly.

use bytes::Bytes;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::time::Duration;

use crate::port::{MessagePort, Notification, PortError};
use crate::remote::element::TextTrack;
use crate::remote::fetch::{FetchError, FetchRequest, FetchResponse};
use crate::remote::screenshot::Screenshot;
use crate::remote::session::{
    EXIT_PIP_VERB, FETCH_VERB, GET_TRACK_VERB, PIP_ENABLED_VERB, REQUEST_PIP_VERB, SCREENSHOT_VERB,
};
use crate::schema::{self, PropValue, ValueKind};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Port(#[from] PortError),
    /// The peer answered, but not in the shape this verb promises.
    #[error("unexpected reply for {verb}: {reply}")]
    BadReply { verb: String, reply: String },
}

fn bad_reply(verb: &str, reply: &Value) -> ControllerError {
    ControllerError::BadReply {
        verb: verb.to_string(),
        reply: reply.to_string(),
    }
}

/// Remote control handle for one media element.
#[derive(Clone)]
pub struct MediaController {
    port: MessagePort,
}

impl MediaController {
    #[must_use]
    pub fn new(port: MessagePort) -> Self {
        Self { port }
    }

    #[must_use]
    pub fn port(&self) -> &MessagePort {
        &self.port
    }

    /// Wait for the player side to finish binding its handlers.
    pub async fn ready(&self) -> Result<(), ControllerError> {
        self.port.ready().await.map_err(Into::into)
    }

    /// Like [`ready`](Self::ready) with an explicit timeout.
    pub async fn ready_within(&self, timeout: Duration) -> Result<(), ControllerError> {
        self.port.ready_within(timeout).await.map_err(Into::into)
    }

    /// Notifications pushed by the player (title changes and friends).
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.port.notifications()
    }

    pub async fn close(&self) {
        self.port.close().await;
    }

    // ── state properties ────────────────────────────────────────────

    pub async fn paused(&self) -> Result<bool, ControllerError> {
        self.get_bool("paused").await
    }

    pub async fn duration(&self) -> Result<f64, ControllerError> {
        self.get_f64("duration").await
    }

    pub async fn seeking(&self) -> Result<bool, ControllerError> {
        self.get_bool("seeking").await
    }

    pub async fn ended(&self) -> Result<bool, ControllerError> {
        self.get_bool("ended").await
    }

    pub async fn current_src(&self) -> Result<String, ControllerError> {
        self.get_string("currentSrc").await
    }

    pub async fn buffered(&self) -> Result<Vec<(f64, f64)>, ControllerError> {
        self.get_ranges("buffered").await
    }

    pub async fn played(&self) -> Result<Vec<(f64, f64)>, ControllerError> {
        self.get_ranges("played").await
    }

    pub async fn current_time(&self) -> Result<f64, ControllerError> {
        self.get_f64("currentTime").await
    }

    pub async fn playback_rate(&self) -> Result<f64, ControllerError> {
        self.get_f64("playbackRate").await
    }

    pub async fn volume(&self) -> Result<f64, ControllerError> {
        self.get_f64("volume").await
    }

    pub async fn muted(&self) -> Result<bool, ControllerError> {
        self.get_bool("muted").await
    }

    pub async fn looping(&self) -> Result<bool, ControllerError> {
        self.get_bool("loop").await
    }

    pub async fn autoplay(&self) -> Result<bool, ControllerError> {
        self.get_bool("autoplay").await
    }

    /// Move the playhead, in seconds.
    pub async fn seek(&self, seconds: f64) -> Result<(), ControllerError> {
        self.set("currentTime", json!(seconds)).await
    }

    pub async fn set_playback_rate(&self, rate: f64) -> Result<(), ControllerError> {
        self.set("playbackRate", json!(rate)).await
    }

    pub async fn set_volume(&self, volume: f64) -> Result<(), ControllerError> {
        self.set("volume", json!(volume)).await
    }

    pub async fn set_muted(&self, muted: bool) -> Result<(), ControllerError> {
        self.set("muted", json!(muted)).await
    }

    pub async fn set_looping(&self, looping: bool) -> Result<(), ControllerError> {
        self.set("loop", json!(looping)).await
    }

    pub async fn set_autoplay(&self, autoplay: bool) -> Result<(), ControllerError> {
        self.set("autoplay", json!(autoplay)).await
    }

    // ── actions ─────────────────────────────────────────────────────

    pub async fn play(&self) -> Result<(), ControllerError> {
        self.act("play").await
    }

    pub async fn pause(&self) -> Result<(), ControllerError> {
        self.act("pause").await
    }

    // ── special verbs ───────────────────────────────────────────────

    /// Capture the current video frame in `mime` format.
    ///
    /// `quality` is `0.0..=1.0` and only affects lossy formats.
    pub async fn screenshot(
        &self,
        mime: &str,
        quality: Option<f64>,
    ) -> Result<Screenshot, ControllerError> {
        let args = vec![json!(mime), quality.map_or(Value::Null, |q| json!(q))];
        let mut reply = self.port.call(SCREENSHOT_VERB, args).await?;
        let meta = reply.value.take().unwrap_or(Value::Null);
        if reply.payloads.is_empty() {
            return Err(bad_reply(SCREENSHOT_VERB, &meta));
        }
        let data = reply.payloads.remove(0);
        Ok(Screenshot {
            data,
            mime: meta
                .get("mime")
                .and_then(Value::as_str)
                .unwrap_or(mime)
                .to_string(),
            time: meta.get("time").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    /// Fetch a resource through the player side.
    pub async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, ControllerError> {
        let options = json!({
            "method": request.method,
            "headers": request.headers,
            "gzip": request.gzip,
        });
        let mut reply = self
            .port
            .call(FETCH_VERB, vec![json!(request.url), options])
            .await?;
        let meta = reply.value.take().unwrap_or(Value::Null);
        let body = if reply.payloads.is_empty() {
            Bytes::new()
        } else {
            reply.payloads.remove(0)
        };
        match FetchResponse::from_meta(&meta, body) {
            Ok(response) => Ok(response),
            Err(FetchError::MalformedReply) => Err(bad_reply(FETCH_VERB, &meta)),
            Err(e) => Err(bad_reply(FETCH_VERB, &json!(e.to_string()))),
        }
    }

    /// Look up a text track with its cues, `None` when the id is unknown.
    pub async fn text_track(&self, id: &str) -> Result<Option<TextTrack>, ControllerError> {
        let reply = self.port.call(GET_TRACK_VERB, vec![json!(id)]).await?;
        match reply.value {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match serde_json::from_value::<TextTrack>(value.clone()) {
                Ok(track) => Ok(Some(track)),
                Err(_) => Err(bad_reply(GET_TRACK_VERB, &value)),
            },
        }
    }

    pub async fn pip_enabled(&self) -> Result<bool, ControllerError> {
        let reply = self.port.call(PIP_ENABLED_VERB, vec![]).await?;
        let value = reply.value.unwrap_or(Value::Null);
        value
            .as_bool()
            .ok_or_else(|| bad_reply(PIP_ENABLED_VERB, &value))
    }

    pub async fn request_pip(&self) -> Result<(), ControllerError> {
        self.port.call(REQUEST_PIP_VERB, vec![]).await?;
        Ok(())
    }

    pub async fn exit_pip(&self) -> Result<(), ControllerError> {
        self.port.call(EXIT_PIP_VERB, vec![]).await?;
        Ok(())
    }

    // ── plumbing ────────────────────────────────────────────────────

    async fn get(&self, prop: &str) -> Result<Value, ControllerError> {
        let reply = self.port.call(&schema::getter_verb(prop), vec![]).await?;
        Ok(reply.value.unwrap_or(Value::Null))
    }

    async fn get_f64(&self, prop: &str) -> Result<f64, ControllerError> {
        let value = self.get(prop).await?;
        value
            .as_f64()
            .ok_or_else(|| bad_reply(&schema::getter_verb(prop), &value))
    }

    async fn get_bool(&self, prop: &str) -> Result<bool, ControllerError> {
        let value = self.get(prop).await?;
        value
            .as_bool()
            .ok_or_else(|| bad_reply(&schema::getter_verb(prop), &value))
    }

    async fn get_string(&self, prop: &str) -> Result<String, ControllerError> {
        let value = self.get(prop).await?;
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| bad_reply(&schema::getter_verb(prop), &value))
    }

    async fn get_ranges(&self, prop: &str) -> Result<Vec<(f64, f64)>, ControllerError> {
        let value = self.get(prop).await?;
        match PropValue::from_json(ValueKind::Ranges, &value) {
            Ok(PropValue::Ranges(ranges)) => Ok(ranges),
            _ => Err(bad_reply(&schema::getter_verb(prop), &value)),
        }
    }

    async fn set(&self, prop: &str, value: Value) -> Result<(), ControllerError> {
        self.port
            .call(&schema::setter_verb(prop), vec![value])
            .await?;
        Ok(())
    }

    async fn act(&self, verb: &str) -> Result<(), ControllerError> {
        self.port.call(verb, vec![]).await?;
        Ok(())
    }
}
