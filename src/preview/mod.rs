//! Live preview of the captured source.
//!
//! The capture track publishes the latest RGBA frame on a watch channel and
//! a local WebSocket server streams it to the viewer web view.

mod frame_ws;

pub use frame_ws::{frame_channel, pack_frame, FrameSender, FrameServer, WSFrame, TRAILER_LEN};
