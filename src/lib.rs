//! Phosphor - distributed tracing frames and concurrency-safe trace accumulation
//!
//! Services taking part in a request emit timestamped frames (RPC legs,
//! timeouts, annotations). This library provides the frame data model and the
//! [`Trace`](trace::Trace) container that many producers append to at once,
//! ready for later span assembly by a consumer.

pub mod cli;
pub mod config;
pub mod error;
pub mod frame;
pub mod load;
pub mod trace;

pub use error::{ConfigError, FrameError, LoadError, TraceError};
pub use frame::{Frame, FrameType, UnrecognizedCode};
pub use trace::{append_frame, Trace, TraceHandle};
