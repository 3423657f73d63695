//! The media element surface a player session drives.
//!
//! [`MediaElement`] is the seam between the control plumbing and whatever
//! actually plays media. Implementations wrap a real playback engine;
//! [`SimulatedPlayer`](super::sim::SimulatedPlayer) backs tests and the
//! demo command.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::{PropDesc, PropValue};

/// What the element fundamentally is. Screenshot capture and
/// picture-in-picture only exist for video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Audio,
    Video,
}

/// Failure reported by the element itself.
#[derive(Debug, Error)]
pub enum ElementError {
    /// The element does not support this property or operation.
    #[error("{0} is not supported by this element")]
    Unsupported(&'static str),
    /// The underlying player is gone.
    #[error("media element detached")]
    Detached,
    /// Engine-specific failure, already phrased for the caller.
    #[error("{0}")]
    Failed(String),
}

/// One decoded video frame, tightly packed RGBA.
#[derive(Debug, Clone)]
pub struct RawFrame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major.
    pub rgba: Bytes,
    /// Playback position the frame was taken at, in seconds.
    pub time: f64,
}

/// A text track with its cues, as returned over the port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextTrack {
    pub id: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub cues: Vec<Cue>,
}

/// A single timed cue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A controllable media element.
///
/// State access goes through the schema: `get`/`set` take the property
/// descriptor so an implementation dispatches on `desc.name` and the verb
/// surface stays defined in one place.
#[async_trait]
pub trait MediaElement: Send + Sync {
    fn kind(&self) -> ElementKind;

    async fn get(&self, desc: &'static PropDesc) -> Result<PropValue, ElementError>;

    /// Apply a validated value to a writable property.
    async fn set(&self, desc: &'static PropDesc, value: PropValue) -> Result<(), ElementError>;

    async fn play(&self) -> Result<(), ElementError>;

    async fn pause(&self) -> Result<(), ElementError>;

    /// Whether picture-in-picture is available for this element.
    async fn pip_enabled(&self) -> bool;

    async fn request_pip(&self) -> Result<(), ElementError>;

    async fn exit_pip(&self) -> Result<(), ElementError>;

    /// Look up a text track by id, cues included.
    async fn text_track(&self, id: &str) -> Result<Option<TextTrack>, ElementError>;

    /// Grab the currently displayed frame. Only meaningful for video.
    async fn capture_frame(&self) -> Result<RawFrame, ElementError>;
}
