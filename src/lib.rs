//! `mediaport` - Remote media control and canonical media URL resolution
//!
//! # Features
//!
//! - **Control port**: request/response correlation over any transport,
//!   readiness gate, symmetric close that rejects in-flight calls
//! - **Schema-driven verbs**: `get<Name>`/`set<Name>`/action surface derived
//!   from one media property table
//! - **Media services**: screenshot capture as binary payloads, proxied
//!   fetch with bounded concurrency and optional gzip
//! - **URL resolution**: per-site canonical forms (YouTube, Vimeo,
//!   bilibili, Coursera) with temporal fragments and stable identity
//!
//! # Example
//!
//! ```rust
//! use mediaport::UrlResolver;
//!
//! let resolver = UrlResolver::new();
//! let a = resolver.resolve_str("https://youtu.be/dQw4w9WgXcQ?t=42").unwrap();
//! let b = resolver.resolve_str("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
//! // Identity ignores the share form and the temporal fragment.
//! assert_eq!(a, b);
//! assert_eq!(a.temp_frag().unwrap().start, Some(42.0));
//! ```

pub mod controller;
pub mod fragment;
pub mod media_url;
pub mod port;
pub mod remote;
pub mod resolve;
pub mod schema;
pub mod title;

pub use controller::{ControllerError, MediaController};
pub use fragment::{format_duration, parse_temp_frag, to_duration_iso_string, TempFragment};
pub use media_url::{compare, MediaHost, MediaKind, MediaUrl};
pub use port::{channel_pair, MessagePort, PortError, PortState, READY_TIMEOUT};
pub use remote::{
    FetchProxy, FetchRequest, FetchResponse, MediaElement, PlayerSession, Screenshot,
    SimulatedPlayer,
};
pub use resolve::{ResolveError, UrlProvider, UrlResolver};
pub use title::clean_title;

/// Version of mediaport
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
