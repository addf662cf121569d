//! Concurrency-safe accumulation of frames into a trace
//!
//! A [`Trace`] is an append-only bucket of frames for one request. Any number
//! of producers may append to the same trace at once; a mutex owned by the
//! trace linearises the appends, so the final sequence holds every appended
//! frame exactly once, in lock acquisition order.
//!
//! # Design
//!
//! ```text
//!  producer A ──append_frame──┐
//!  producer B ──append_frame──┼──▶ Mutex<Vec<Arc<Frame>>> ──▶ frames() / with_frames()
//!  producer C ──append_frame──┘         (Trace-owned)            (same lock)
//! ```
//!
//! Reads take the same lock as appends, so consumers may read while producers
//! are still appending. A consumer that wants to wait for the population phase
//! to end uses [`TraceHandle::into_frames`], which only succeeds once every
//! other handle to the trace has been dropped.
//!
//! The trace never checks that an appended frame carries its trace id, never
//! reorders, removes or mutates frames, and has no sealed state.

use crate::config::TraceConfig;
use crate::error::{Result, TraceError};
use crate::frame::Frame;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ordered, append-only set of frames collected for one request
///
/// # Example
///
/// ```
/// use phosphor::frame::{Frame, FrameType};
/// use phosphor::trace::Trace;
///
/// let trace = Trace::new();
/// trace.append_frame(Frame::new("t1", "s1", FrameType::Req)).unwrap();
/// trace.append_frame(Frame::new("t1", "s1", FrameType::In)).unwrap();
///
/// let frames = trace.frames();
/// assert_eq!(frames.len(), 2);
/// assert_eq!(frames[0].frame_type, FrameType::Req);
/// ```
pub struct Trace {
    frames: Mutex<Vec<Arc<Frame>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::with_config(&TraceConfig::default())
    }

    /// Create an empty trace with room for `config.initial_capacity` frames
    pub fn with_config(config: &TraceConfig) -> Self {
        tracing::debug!(initial_capacity = config.initial_capacity, "trace created");
        Self {
            frames: Mutex::new(Vec::with_capacity(config.initial_capacity)),
        }
    }

    /// Append a frame to the end of the sequence
    ///
    /// Never fails on a constructed trace: frame content is not inspected.
    /// The `Result` carries the same contract as [`append_frame`] so call
    /// sites holding an optional trace and a concrete one read alike.
    pub fn append_frame(&self, frame: impl Into<Arc<Frame>>) -> Result<()> {
        let frame = frame.into();
        let position = {
            let mut frames = self.lock();
            frames.push(Arc::clone(&frame));
            frames.len() - 1
        };

        tracing::trace!(
            trace_id = %frame.trace_id,
            span_id = %frame.span_id,
            frame_type = %frame.frame_type,
            position,
            "frame appended"
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Trace id of the first appended frame
    ///
    /// Informational only; later frames are not required to match it.
    pub fn trace_id(&self) -> Option<String> {
        self.lock().first().map(|frame| frame.trace_id.clone())
    }

    /// Snapshot of the frame sequence in append order
    pub fn frames(&self) -> Vec<Arc<Frame>> {
        self.lock().clone()
    }

    /// Run `f` over the frame sequence while holding the trace lock
    ///
    /// Appends from other producers wait until `f` returns, so keep it short.
    pub fn with_frames<R>(&self, f: impl FnOnce(&[Arc<Frame>]) -> R) -> R {
        let frames = self.lock();
        f(&frames)
    }

    /// Consume the trace, returning its frames in append order
    pub fn into_frames(self) -> Vec<Arc<Frame>> {
        self.frames
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // A panic while the lock is held cannot leave the Vec half-pushed,
    // so a poisoned lock is recovered rather than propagated.
    fn lock(&self) -> MutexGuard<'_, Vec<Arc<Frame>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("frames", &self.len())
            .finish()
    }
}

/// Append through an optional trace reference
///
/// Returns [`TraceError::InvalidReceiver`] when `trace` is `None`; no state is
/// touched and the frame is dropped.
pub fn append_frame(trace: Option<&Trace>, frame: impl Into<Arc<Frame>>) -> Result<()> {
    trace
        .ok_or(TraceError::InvalidReceiver)?
        .append_frame(frame)
}

/// Shareable reference to a trace that may be absent
///
/// Producers clone handles freely across threads. A handle created with
/// [`TraceHandle::unbound`] (or `Default`) refers to no trace, and every
/// operation through it fails with [`TraceError::InvalidReceiver`].
#[derive(Debug, Clone, Default)]
pub struct TraceHandle {
    trace: Option<Arc<Trace>>,
}

impl TraceHandle {
    pub fn new(trace: Trace) -> Self {
        Self {
            trace: Some(Arc::new(trace)),
        }
    }

    /// Handle bound to no trace
    pub fn unbound() -> Self {
        Self { trace: None }
    }

    pub fn is_bound(&self) -> bool {
        self.trace.is_some()
    }

    pub fn trace(&self) -> Option<&Arc<Trace>> {
        self.trace.as_ref()
    }

    pub fn append_frame(&self, frame: impl Into<Arc<Frame>>) -> Result<()> {
        append_frame(self.trace.as_deref(), frame)
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.bound()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.bound()?.is_empty())
    }

    pub fn frames(&self) -> Result<Vec<Arc<Frame>>> {
        Ok(self.bound()?.frames())
    }

    /// Take the frames once this is the last handle to the trace
    ///
    /// Returns `None` when the handle is unbound or other handles are alive.
    pub fn into_frames(self) -> Option<Vec<Arc<Frame>>> {
        let trace = Arc::try_unwrap(self.trace?).ok()?;
        Some(trace.into_frames())
    }

    fn bound(&self) -> Result<&Trace> {
        self.trace.as_deref().ok_or(TraceError::InvalidReceiver)
    }
}

impl From<Trace> for TraceHandle {
    fn from(trace: Trace) -> Self {
        Self::new(trace)
    }
}

impl From<Arc<Trace>> for TraceHandle {
    fn from(trace: Arc<Trace>) -> Self {
        Self { trace: Some(trace) }
    }
}
