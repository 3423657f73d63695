//! Player-side building blocks: the media element seam, screenshot and
//! fetch services, and the session that wires them to a port.

pub mod element;
pub mod fetch;
pub mod screenshot;
pub mod session;
pub mod sim;

pub use element::{Cue, ElementError, ElementKind, MediaElement, RawFrame, TextTrack};
pub use fetch::{FetchError, FetchGate, FetchProxy, FetchRequest, FetchResponse, MAX_CONCURRENT_FETCHES};
pub use screenshot::{Screenshot, ScreenshotError};
pub use session::{PlayerSession, SeekMarker};
pub use sim::SimulatedPlayer;
