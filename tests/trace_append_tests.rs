//! Integration tests for the append contract
//!
//! - Sequential appends keep call order
//! - Absent traces fail with an invalid-receiver error and change nothing
//! - Frame content is never validated

use phosphor::{append_frame, Frame, FrameType, Trace, TraceError, TraceHandle};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

#[test]
fn test_sequential_req_then_in() {
    let trace = Trace::new();

    let req = Frame {
        frame_type: FrameType::Req,
        span_id: "s1".to_string(),
        ..Frame::default()
    };
    let inbound = Frame {
        frame_type: FrameType::In,
        span_id: "s1".to_string(),
        ..Frame::default()
    };

    trace.append_frame(req.clone()).unwrap();
    trace.append_frame(inbound.clone()).unwrap();

    let frames: Vec<Frame> = trace.frames().iter().map(|f| (**f).clone()).collect();
    assert_eq!(frames, vec![req, inbound]);
}

#[test]
fn test_append_on_absent_trace() {
    let absent: Option<&Trace> = None;
    let frame = Arc::new(Frame::new("t", "s", FrameType::Req));

    let result = append_frame(absent, Arc::clone(&frame));

    assert_eq!(result, Err(TraceError::InvalidReceiver));
    // The frame was not retained anywhere.
    assert_eq!(Arc::strong_count(&frame), 1);
}

#[test]
fn test_unbound_handle_then_retry_on_real_trace() {
    let frame = Arc::new(Frame::new("t", "s", FrameType::Out));

    let unbound = TraceHandle::unbound();
    assert_eq!(
        unbound.append_frame(Arc::clone(&frame)),
        Err(TraceError::InvalidReceiver)
    );

    let bound = TraceHandle::new(Trace::new());
    bound.append_frame(Arc::clone(&frame)).unwrap();
    assert_eq!(bound.len(), Ok(1));
    assert!(Arc::ptr_eq(&bound.frames().unwrap()[0], &frame));
}

#[test]
fn test_unvalidated_frame_round_trips() {
    let trace = Trace::new();
    let frame = Frame {
        trace_id: String::new(),
        frame_type: FrameType::Unknown,
        duration: Duration::ZERO,
        key_value: HashMap::new(),
        ..Frame::default()
    };

    trace.append_frame(frame.clone()).unwrap();

    let stored = trace.frames();
    assert_eq!(stored.len(), 1);
    assert_eq!(*stored[0], frame);
}

#[test]
fn test_out_of_range_and_inconsistent_fields_accepted() {
    let trace = Trace::new();
    let frame = Frame {
        trace_id: "other-trace".to_string(),
        frame_type: FrameType::from(1234),
        payload: "four".to_string(),
        payload_size: -1,
        timestamp: SystemTime::UNIX_EPOCH,
        ..Frame::default()
    };

    trace.append_frame(frame.clone()).unwrap();

    let stored = &trace.frames()[0];
    assert!(!stored.frame_type.is_known());
    assert_eq!(stored.frame_type.code(), 1234);
    assert_eq!(stored.payload_size, -1);
    assert_eq!(**stored, frame);
}

#[test]
fn test_full_rpc_span_frames() {
    let trace = Trace::new();
    let start = SystemTime::now();

    let frames = [
        Frame::new("t", "rpc-1", FrameType::Req).with_destination("svc.users"),
        Frame::new("t", "rpc-1", FrameType::In).with_hostname("users-1"),
        Frame::new("t", "rpc-1", FrameType::Out).with_hostname("users-1"),
        Frame::new("t", "rpc-1", FrameType::Rsp)
            .with_timestamp(start)
            .with_duration(Duration::from_millis(3)),
    ];
    for frame in frames.iter().cloned() {
        trace.append_frame(frame).unwrap();
    }

    trace.with_frames(|stored| {
        assert_eq!(stored.len(), 4);
        assert!(stored.iter().all(|f| f.frame_type.is_call()));
        assert!(stored.iter().all(|f| f.is_root()));
        assert!(stored[3].has_duration());
        assert_eq!(stored[3].timestamp, start);
    });
}
