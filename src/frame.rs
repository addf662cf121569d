//! Frame schema: the smallest individually recorded event of a trace
//!
//! A frame is emitted at one point of a request's life (an RPC leg, a
//! timeout, or a developer annotation). Frames sharing a `span_id` describe a
//! single logical operation, and `parent_span_id` links spans into a tree.
//!
//! ```text
//! caller host                          callee host
//! ───────────                          ───────────
//! Req   (span s1) ───── request ────▶  In   (span s1)
//! Rsp   (span s1) ◀──── response ────  Out  (span s1)
//!   or
//! Timeout (span s1)
//! ```
//!
//! Frames are plain data. Nothing here validates field contents: an empty
//! trace id, a negative payload size or an undocumented frame type code are
//! all legal and must survive unchanged. Timestamps are only comparable
//! between frames from the same host.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime};

/// Kind of event a frame records
///
/// The integer codes are stable and shared with every producer. Codes outside
/// the documented set are kept as [`FrameType::Unrecognized`] so consumers
/// see exactly what the producer sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum FrameType {
    /// Sentinel for an unset type, not a real event
    #[default]
    Unknown,

    /// Client dispatched a request
    Req,

    /// Client received a response
    Rsp,

    /// Server received a request
    In,

    /// Server dispatched a response
    Out,

    /// Client gave up waiting for a response
    Timeout,

    /// Developer supplied marker, outside the call protocol
    Annotation,

    /// Code outside the documented enumeration
    ///
    /// Only built through `From<i32>`, so a documented code always maps to
    /// its named variant.
    Unrecognized(UnrecognizedCode),
}

/// Raw frame type code outside the documented range `0..=6`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnrecognizedCode(i32);

impl UnrecognizedCode {
    pub fn get(self) -> i32 {
        self.0
    }
}

impl FrameType {
    /// All documented frame types, in code order
    pub const KNOWN: [FrameType; 7] = [
        FrameType::Unknown,
        FrameType::Req,
        FrameType::Rsp,
        FrameType::In,
        FrameType::Out,
        FrameType::Timeout,
        FrameType::Annotation,
    ];

    /// Stable integer code of this frame type
    pub fn code(self) -> i32 {
        match self {
            FrameType::Unknown => 0,
            FrameType::Req => 1,
            FrameType::Rsp => 2,
            FrameType::In => 3,
            FrameType::Out => 4,
            FrameType::Timeout => 5,
            FrameType::Annotation => 6,
            FrameType::Unrecognized(code) => code.get(),
        }
    }

    /// Variant name, or `None` for unrecognized codes
    pub fn name(self) -> Option<&'static str> {
        match self {
            FrameType::Unknown => Some("Unknown"),
            FrameType::Req => Some("Req"),
            FrameType::Rsp => Some("Rsp"),
            FrameType::In => Some("In"),
            FrameType::Out => Some("Out"),
            FrameType::Timeout => Some("Timeout"),
            FrameType::Annotation => Some("Annotation"),
            FrameType::Unrecognized(_) => None,
        }
    }

    /// Part of the Req/Rsp/In/Out call protocol (timeouts included)
    pub fn is_call(self) -> bool {
        matches!(
            self,
            FrameType::Req | FrameType::Rsp | FrameType::In | FrameType::Out | FrameType::Timeout
        )
    }

    /// Recorded by the calling side of an RPC
    pub fn is_client_side(self) -> bool {
        matches!(self, FrameType::Req | FrameType::Rsp | FrameType::Timeout)
    }

    /// Recorded by the serving side of an RPC
    pub fn is_server_side(self) -> bool {
        matches!(self, FrameType::In | FrameType::Out)
    }

    pub fn is_annotation(self) -> bool {
        self == FrameType::Annotation
    }

    /// Documented, non-sentinel event type
    pub fn is_known(self) -> bool {
        !matches!(self, FrameType::Unknown | FrameType::Unrecognized(_))
    }
}

impl From<i32> for FrameType {
    fn from(code: i32) -> Self {
        match code {
            0 => FrameType::Unknown,
            1 => FrameType::Req,
            2 => FrameType::Rsp,
            3 => FrameType::In,
            4 => FrameType::Out,
            5 => FrameType::Timeout,
            6 => FrameType::Annotation,
            other => FrameType::Unrecognized(UnrecognizedCode(other)),
        }
    }
}

impl From<FrameType> for i32 {
    fn from(frame_type: FrameType) -> Self {
        frame_type.code()
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "FrameType({})", self.code()),
        }
    }
}

impl FromStr for FrameType {
    type Err = FrameError;

    /// Parses a variant name (any case), a bare integer code, or the
    /// `FrameType(n)` form produced by `Display`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();

        if let Ok(code) = trimmed.parse::<i32>() {
            return Ok(FrameType::from(code));
        }

        if let Some(inner) = trimmed
            .strip_prefix("FrameType(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return inner
                .parse::<i32>()
                .map(FrameType::from)
                .map_err(|_| FrameError::UnknownFrameType(s.to_string()));
        }

        FrameType::KNOWN
            .into_iter()
            .find(|t| t.name().is_some_and(|n| n.eq_ignore_ascii_case(trimmed)))
            .ok_or_else(|| FrameError::UnknownFrameType(s.to_string()))
    }
}

/// One traced event
///
/// # Example
///
/// ```
/// use phosphor::frame::{Frame, FrameType};
/// use std::time::Duration;
///
/// let frame = Frame::new("trace-1", "span-1", FrameType::Rsp)
///     .with_parent_span_id("span-0")
///     .with_duration(Duration::from_millis(12))
///     .with_hostname("api-1")
///     .with_origin("com.example.api")
///     .with_destination("com.example.users")
///     .with_payload("{\"id\":42}")
///     .with_key_value("attempt", "1");
///
/// assert_eq!(frame.payload_size, 9);
/// assert!(!frame.is_root());
/// assert!(frame.has_duration());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Global identifier shared by every frame of one request
    pub trace_id: String,

    /// Identifier shared by the frames of one logical operation
    ///
    /// Not unique: one RPC call yields up to four frames with the same id.
    pub span_id: String,

    /// Span id of the enclosing operation; empty for a root span
    pub parent_span_id: String,

    /// When the event occurred, on the originating host's clock
    pub timestamp: SystemTime,

    /// Elapsed time of the operation; zero when not applicable
    pub duration: Duration,

    /// Machine the event originated from
    pub hostname: String,

    /// Fully qualified name of the sending endpoint
    pub origin: String,

    /// Fully qualified name of the receiving endpoint; empty when not applicable
    pub destination: String,

    pub frame_type: FrameType,

    /// Free-form body, e.g. an RPC body or annotation text
    pub payload: String,

    /// Byte count of `payload` as reported by the producer
    pub payload_size: i32,

    /// Arbitrary debug metadata
    pub key_value: HashMap<String, String>,
}

impl Default for Frame {
    fn default() -> Self {
        Self {
            trace_id: String::new(),
            span_id: String::new(),
            parent_span_id: String::new(),
            timestamp: SystemTime::UNIX_EPOCH,
            duration: Duration::ZERO,
            hostname: String::new(),
            origin: String::new(),
            destination: String::new(),
            frame_type: FrameType::Unknown,
            payload: String::new(),
            payload_size: 0,
            key_value: HashMap::new(),
        }
    }
}

impl Frame {
    /// Create a frame stamped with the current time
    pub fn new(
        trace_id: impl Into<String>,
        span_id: impl Into<String>,
        frame_type: FrameType,
    ) -> Self {
        Self {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            frame_type,
            timestamp: SystemTime::now(),
            ..Self::default()
        }
    }

    pub fn with_parent_span_id(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = parent_span_id.into();
        self
    }

    pub fn with_timestamp(mut self, timestamp: SystemTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Set the payload and record its UTF-8 length as `payload_size`
    ///
    /// Lengths beyond `i32::MAX` are clamped.
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self.payload_size = i32::try_from(self.payload.len()).unwrap_or(i32::MAX);
        self
    }

    /// Insert one debug key/value pair, replacing any previous value for `key`
    pub fn with_key_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.key_value.insert(key.into(), value.into());
        self
    }

    /// Root span frames carry no parent span id
    pub fn is_root(&self) -> bool {
        self.parent_span_id.is_empty()
    }

    pub fn has_duration(&self) -> bool {
        !self.duration.is_zero()
    }

    pub fn has_destination(&self) -> bool {
        !self.destination.is_empty()
    }
}
