//! Player-side session: binds the verb surface to a media element.
//!
//! [`PlayerSession::attach`] walks the property schema and registers one
//! handler per derived verb (`get<Name>`, `set<Name>`, bare actions), plus
//! the special verbs for screenshots, proxied fetches, text tracks, and
//! picture-in-picture. Once everything is bound it announces readiness so
//! the controller's calls start flowing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::element::MediaElement;
use super::fetch::{FetchProxy, FetchRequest};
use super::screenshot;
use crate::port::{Invocation, MessagePort, PortError, Reply, TITLE_CHANGE_EVENT};
use crate::schema::{self, PropValue};

pub const SCREENSHOT_VERB: &str = "screenshot";
pub const FETCH_VERB: &str = "fetch";
pub const GET_TRACK_VERB: &str = "getTrack";
pub const PIP_ENABLED_VERB: &str = "pictureInPictureEnabled";
pub const REQUEST_PIP_VERB: &str = "requestPictureInPicture";
pub const EXIT_PIP_VERB: &str = "exitPictureInPicture";

/// Where the playhead was just before the latest seek, and when the seek
/// was applied. Consumers use it to tell a deliberate jump back from
/// ordinary playback.
#[derive(Debug, Clone, Copy)]
pub struct SeekMarker {
    /// Playback position before the seek, in seconds.
    pub from: f64,
    /// When the seek was applied.
    pub at: Instant,
}

/// Options object accepted by the fetch verb.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FetchArgs {
    method: Option<String>,
    headers: HashMap<String, String>,
    gzip: bool,
}

/// A bound player session.
pub struct PlayerSession {
    port: MessagePort,
    element: Arc<dyn MediaElement>,
    last_seek: Arc<Mutex<Option<SeekMarker>>>,
}

impl PlayerSession {
    /// Bind every verb to `element` and announce readiness to the peer.
    pub async fn attach(
        port: MessagePort,
        element: Arc<dyn MediaElement>,
        proxy: Arc<FetchProxy>,
    ) -> Result<Self, PortError> {
        let last_seek = Arc::new(Mutex::new(None));
        bind_state_props(&port, &element, &last_seek).await;
        bind_actions(&port, &element).await;
        bind_specials(&port, &element, &proxy).await;

        debug!(verbs = port.methods().await.len(), "player session bound");
        port.announce_ready().await?;
        Ok(Self {
            port,
            element,
            last_seek,
        })
    }

    #[must_use]
    pub fn port(&self) -> &MessagePort {
        &self.port
    }

    #[must_use]
    pub fn element(&self) -> &Arc<dyn MediaElement> {
        &self.element
    }

    /// The most recent seek applied through this session, if any.
    pub async fn last_seek(&self) -> Option<SeekMarker> {
        *self.last_seek.lock().await
    }

    /// Push a title change to the peer.
    pub async fn notify_title(&self, title: &str) -> Result<(), PortError> {
        self.port
            .notify(TITLE_CHANGE_EVENT, Some(json!(title)))
            .await
    }

    /// Tear the session down; the peer's port closes with it.
    pub async fn shutdown(&self) {
        self.port.close().await;
    }
}

async fn bind_state_props(
    port: &MessagePort,
    element: &Arc<dyn MediaElement>,
    last_seek: &Arc<Mutex<Option<SeekMarker>>>,
) {
    for desc in schema::state_props() {
        let element = Arc::clone(element);
        port.handle(desc.getter_verb(), move |_inv: Invocation| {
            let element = Arc::clone(&element);
            async move {
                let value = element.get(desc).await?;
                Ok(Reply::value(value.to_json()))
            }
        })
        .await;
    }

    for desc in schema::writable_props() {
        let element = Arc::clone(element);
        let last_seek = Arc::clone(last_seek);
        port.handle(desc.setter_verb(), move |inv: Invocation| {
            let element = Arc::clone(&element);
            let last_seek = Arc::clone(&last_seek);
            async move {
                let value = PropValue::from_json(desc.value, &inv.arg(0))?;
                if desc.name == "currentTime" {
                    // Record where the playhead was before this seek lands.
                    if let Ok(PropValue::Number(from)) = element.get(desc).await {
                        *last_seek.lock().await = Some(SeekMarker {
                            from,
                            at: Instant::now(),
                        });
                    }
                }
                element.set(desc, value).await?;
                Ok(Reply::none())
            }
        })
        .await;
    }
}

async fn bind_actions(port: &MessagePort, element: &Arc<dyn MediaElement>) {
    for desc in schema::action_props() {
        let element = Arc::clone(element);
        let name = desc.name;
        port.handle(name, move |_inv: Invocation| {
            let element = Arc::clone(&element);
            async move {
                match name {
                    "play" => element.play().await?,
                    "pause" => element.pause().await?,
                    other => return Err(format!("no action named {other}").into()),
                }
                Ok(Reply::none())
            }
        })
        .await;
    }
}

async fn bind_specials(
    port: &MessagePort,
    element: &Arc<dyn MediaElement>,
    proxy: &Arc<FetchProxy>,
) {
    let shot_element = Arc::clone(element);
    port.handle(SCREENSHOT_VERB, move |inv: Invocation| {
        let element = Arc::clone(&shot_element);
        async move {
            let mime = match inv.arg(0) {
                Value::String(mime) => mime,
                Value::Null => screenshot::DEFAULT_MIME.to_string(),
                other => {
                    return Err(format!("screenshot format must be a string, got {other}").into())
                }
            };
            let quality = inv.arg(1).as_f64();
            let shot = screenshot::capture(element.as_ref(), &mime, quality).await?;
            Ok(Reply::with_payloads(
                json!({ "mime": shot.mime, "time": shot.time }),
                vec![shot.data],
            ))
        }
    })
    .await;

    let fetch_proxy = Arc::clone(proxy);
    port.handle(FETCH_VERB, move |inv: Invocation| {
        let proxy = Arc::clone(&fetch_proxy);
        async move {
            let url = match inv.arg(0) {
                Value::String(url) => url,
                other => return Err(format!("fetch needs a URL string, got {other}").into()),
            };
            let options: FetchArgs = match inv.arg(1) {
                Value::Null => FetchArgs::default(),
                options => serde_json::from_value(options)?,
            };
            let response = proxy
                .fetch(FetchRequest {
                    url,
                    method: options.method,
                    headers: options.headers,
                    gzip: options.gzip,
                })
                .await?;
            let meta = response.meta();
            Ok(Reply::with_payloads(meta, vec![response.body]))
        }
    })
    .await;

    let track_element = Arc::clone(element);
    port.handle(GET_TRACK_VERB, move |inv: Invocation| {
        let element = Arc::clone(&track_element);
        async move {
            let id = match inv.arg(0) {
                Value::String(id) => id,
                other => return Err(format!("track id must be a string, got {other}").into()),
            };
            let track = element.text_track(&id).await?;
            Ok(Reply::value(serde_json::to_value(track)?))
        }
    })
    .await;

    let pip_element = Arc::clone(element);
    port.handle(PIP_ENABLED_VERB, move |_inv: Invocation| {
        let element = Arc::clone(&pip_element);
        async move { Ok(Reply::value(Value::Bool(element.pip_enabled().await))) }
    })
    .await;

    let pip_element = Arc::clone(element);
    port.handle(REQUEST_PIP_VERB, move |_inv: Invocation| {
        let element = Arc::clone(&pip_element);
        async move {
            element.request_pip().await?;
            Ok(Reply::none())
        }
    })
    .await;

    let pip_element = Arc::clone(element);
    port.handle(EXIT_PIP_VERB, move |_inv: Invocation| {
        let element = Arc::clone(&pip_element);
        async move {
            element.exit_pip().await?;
            Ok(Reply::none())
        }
    })
    .await;
}
