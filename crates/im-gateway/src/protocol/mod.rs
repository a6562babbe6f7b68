//! WebSocket frame protocol

mod frames;

pub use frames::{
    AuthFrame, ClientFrame, ErrorCode, FrameError, MsgFrame, ReadFrame, ServerFrame, SubFrame,
};
