//! Application layer for the server: frame sources and per-session handling.

pub mod frame_source;
pub mod peer_session;

pub use frame_source::{
    FileFrameSource, FrameSource, FrameSourceError, FrameVersion, SourceFrame, StaticFrameSource,
};
pub use peer_session::PeerSession;
