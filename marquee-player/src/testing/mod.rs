//! Test support: host stubs and async assertions.
//!
//! Compiled for this crate's tests and for downstream crates that enable the
//! `testing` feature.

pub mod assertions;
pub mod stubs;

pub use assertions::{
    AsyncAssertions, Eventually, EventuallyExt, assert_event_sequence,
    drain_events,
};
pub use stubs::{
    CallLog, StubBackends, StubFullscreenHost, StubMediaElement,
    StubMediaHost, StubPeerNetwork, StubTorrent, StubYouTubeApi,
    StubYouTubePlayer,
};
