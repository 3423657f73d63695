//! In-process media element.
//!
//! Behaves like a small, well-behaved player: state properties with
//! HTML-media-style validation, play/pause, picture-in-picture for video,
//! and synthetic frames for screenshot capture. Backs the demo command
//! and every test that needs a live element without a playback engine.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Mutex;

use super::element::{Cue, ElementError, ElementKind, MediaElement, RawFrame, TextTrack};
use crate::schema::{PropDesc, PropValue};

const FRAME_WIDTH: u32 = 64;
const FRAME_HEIGHT: u32 = 36;

#[derive(Debug)]
struct SimState {
    current_src: String,
    current_time: f64,
    duration: f64,
    playback_rate: f64,
    volume: f64,
    muted: bool,
    looping: bool,
    autoplay: bool,
    paused: bool,
    seeking: bool,
    ended: bool,
    buffered: Vec<(f64, f64)>,
    played: Vec<(f64, f64)>,
    pip_active: bool,
    tracks: Vec<TextTrack>,
}

/// A simulated player element.
pub struct SimulatedPlayer {
    kind: ElementKind,
    state: Mutex<SimState>,
}

impl SimulatedPlayer {
    #[must_use]
    pub fn video(src: &str) -> Self {
        Self::with_kind(ElementKind::Video, src)
    }

    #[must_use]
    pub fn audio(src: &str) -> Self {
        Self::with_kind(ElementKind::Audio, src)
    }

    fn with_kind(kind: ElementKind, src: &str) -> Self {
        Self {
            kind,
            state: Mutex::new(SimState {
                current_src: src.to_string(),
                current_time: 0.0,
                duration: 60.0,
                playback_rate: 1.0,
                volume: 1.0,
                muted: false,
                looping: false,
                autoplay: false,
                paused: true,
                seeking: false,
                ended: false,
                buffered: vec![(0.0, 60.0)],
                played: Vec::new(),
                pip_active: false,
                tracks: Vec::new(),
            }),
        }
    }

    #[must_use]
    pub fn with_duration(mut self, seconds: f64) -> Self {
        let state = self.state.get_mut();
        state.duration = seconds;
        state.buffered = vec![(0.0, seconds)];
        self
    }

    #[must_use]
    pub fn with_track(mut self, track: TextTrack) -> Self {
        self.state.get_mut().tracks.push(track);
        self
    }

    /// Convenience: a player carrying one subtitle track with two cues.
    #[must_use]
    pub fn with_sample_subtitles(self) -> Self {
        self.with_track(TextTrack {
            id: "en".to_string(),
            kind: "subtitles".to_string(),
            label: Some("English".to_string()),
            language: Some("en".to_string()),
            cues: vec![
                Cue {
                    start: 0.0,
                    end: 2.5,
                    text: "Once upon a time".to_string(),
                },
                Cue {
                    start: 2.5,
                    end: 5.0,
                    text: "there was a rabbit".to_string(),
                },
            ],
        })
    }

    /// Move the playhead directly, bypassing validation.
    pub async fn set_position(&self, seconds: f64) {
        self.state.lock().await.current_time = seconds;
    }

    pub async fn position(&self) -> f64 {
        self.state.lock().await.current_time
    }

    pub async fn pip_active(&self) -> bool {
        self.state.lock().await.pip_active
    }
}

#[async_trait]
impl MediaElement for SimulatedPlayer {
    fn kind(&self) -> ElementKind {
        self.kind
    }

    async fn get(&self, desc: &'static PropDesc) -> Result<PropValue, ElementError> {
        let state = self.state.lock().await;
        let value = match desc.name {
            "paused" => PropValue::Bool(state.paused),
            "duration" => PropValue::Number(state.duration),
            "seeking" => PropValue::Bool(state.seeking),
            "ended" => PropValue::Bool(state.ended),
            "currentSrc" => PropValue::Text(state.current_src.clone()),
            "buffered" => PropValue::Ranges(state.buffered.clone()),
            "played" => PropValue::Ranges(state.played.clone()),
            "currentTime" => PropValue::Number(state.current_time),
            "playbackRate" => PropValue::Number(state.playback_rate),
            "volume" => PropValue::Number(state.volume),
            "muted" => PropValue::Bool(state.muted),
            "loop" => PropValue::Bool(state.looping),
            "autoplay" => PropValue::Bool(state.autoplay),
            _ => return Err(ElementError::Unsupported(desc.name)),
        };
        Ok(value)
    }

    async fn set(&self, desc: &'static PropDesc, value: PropValue) -> Result<(), ElementError> {
        let mut state = self.state.lock().await;
        match (desc.name, value) {
            ("currentTime", PropValue::Number(seconds)) => {
                if !seconds.is_finite() {
                    return Err(ElementError::Failed(format!(
                        "cannot seek to {seconds}"
                    )));
                }
                state.current_time = seconds.clamp(0.0, state.duration);
                if state.current_time < state.duration {
                    state.ended = false;
                }
            }
            ("playbackRate", PropValue::Number(rate)) => {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(ElementError::Failed(format!(
                        "playback rate {rate} is not supported"
                    )));
                }
                state.playback_rate = rate;
            }
            ("volume", PropValue::Number(volume)) => {
                if !(0.0..=1.0).contains(&volume) {
                    return Err(ElementError::Failed(format!(
                        "volume {volume} outside [0, 1]"
                    )));
                }
                state.volume = volume;
            }
            ("muted", PropValue::Bool(muted)) => state.muted = muted,
            ("loop", PropValue::Bool(looping)) => state.looping = looping,
            ("autoplay", PropValue::Bool(autoplay)) => state.autoplay = autoplay,
            (name, value) => {
                return Err(ElementError::Failed(format!(
                    "cannot set {name} to {value:?}"
                )))
            }
        }
        Ok(())
    }

    async fn play(&self) -> Result<(), ElementError> {
        let mut state = self.state.lock().await;
        state.paused = false;
        state.ended = false;
        Ok(())
    }

    async fn pause(&self) -> Result<(), ElementError> {
        self.state.lock().await.paused = true;
        Ok(())
    }

    async fn pip_enabled(&self) -> bool {
        self.kind == ElementKind::Video
    }

    async fn request_pip(&self) -> Result<(), ElementError> {
        if self.kind != ElementKind::Video {
            return Err(ElementError::Unsupported("picture-in-picture"));
        }
        self.state.lock().await.pip_active = true;
        Ok(())
    }

    async fn exit_pip(&self) -> Result<(), ElementError> {
        self.state.lock().await.pip_active = false;
        Ok(())
    }

    async fn text_track(&self, id: &str) -> Result<Option<TextTrack>, ElementError> {
        let state = self.state.lock().await;
        Ok(state.tracks.iter().find(|t| t.id == id).cloned())
    }

    async fn capture_frame(&self) -> Result<RawFrame, ElementError> {
        if self.kind != ElementKind::Video {
            return Err(ElementError::Unsupported("frame capture"));
        }
        let state = self.state.lock().await;
        // Synthetic gradient; varies with the playhead so frames differ.
        let tint = (state.current_time * 8.0).rem_euclid(256.0) as u8;
        let mut rgba = Vec::with_capacity((FRAME_WIDTH * FRAME_HEIGHT * 4) as usize);
        for y in 0..FRAME_HEIGHT {
            for x in 0..FRAME_WIDTH {
                rgba.extend_from_slice(&[(x as u8) ^ tint, y as u8, tint, 0xFF]);
            }
        }
        Ok(RawFrame {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            rgba: Bytes::from(rgba),
            time: state.current_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::prop;

    #[tokio::test]
    async fn volume_outside_unit_range_is_rejected() {
        let player = SimulatedPlayer::video("https://example.com/clip.mp4");
        let desc = prop("volume").unwrap();
        let err = player.set(desc, PropValue::Number(1.5)).await.unwrap_err();
        assert!(matches!(err, ElementError::Failed(m) if m.contains("1.5")));
        player.set(desc, PropValue::Number(0.25)).await.unwrap();
        assert_eq!(player.get(desc).await.unwrap(), PropValue::Number(0.25));
    }

    #[tokio::test]
    async fn seek_clamps_to_duration() {
        let player = SimulatedPlayer::video("x").with_duration(10.0);
        let desc = prop("currentTime").unwrap();
        player.set(desc, PropValue::Number(99.0)).await.unwrap();
        assert_eq!(player.position().await, 10.0);
        player.set(desc, PropValue::Number(-5.0)).await.unwrap();
        assert_eq!(player.position().await, 0.0);
    }

    #[tokio::test]
    async fn play_and_pause_flip_paused() {
        let player = SimulatedPlayer::audio("x");
        let desc = prop("paused").unwrap();
        assert_eq!(player.get(desc).await.unwrap(), PropValue::Bool(true));
        player.play().await.unwrap();
        assert_eq!(player.get(desc).await.unwrap(), PropValue::Bool(false));
        player.pause().await.unwrap();
        assert_eq!(player.get(desc).await.unwrap(), PropValue::Bool(true));
    }

    #[tokio::test]
    async fn pip_is_video_only() {
        let video = SimulatedPlayer::video("x");
        assert!(video.pip_enabled().await);
        video.request_pip().await.unwrap();
        assert!(video.pip_active().await);
        video.exit_pip().await.unwrap();
        assert!(!video.pip_active().await);

        let audio = SimulatedPlayer::audio("x");
        assert!(!audio.pip_enabled().await);
        assert!(audio.request_pip().await.is_err());
    }

    #[tokio::test]
    async fn tracks_are_found_by_id() {
        let player = SimulatedPlayer::video("x").with_sample_subtitles();
        let track = player.text_track("en").await.unwrap().unwrap();
        assert_eq!(track.cues.len(), 2);
        assert!(player.text_track("de").await.unwrap().is_none());
    }
}
