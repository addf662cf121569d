//! Concurrent ingestion harness
//!
//! Spawns a population of producer threads that append frames to one shared
//! trace, then checks the accumulated sequence:
//!
//! - every frame appended is present exactly once
//! - frames from one producer appear in the order that producer appended them
//!
//! Each producer walks the RPC call protocol (`Req`, `In`, `Out`, `Rsp`) and
//! drops an `Annotation` after every call, so the frame mix resembles a real
//! request fan-out.

use crate::config::TraceConfig;
use crate::error::LoadError;
use crate::frame::{Frame, FrameType};
use crate::trace::{Trace, TraceHandle};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Key under which each generated frame records `producer:sequence`
pub const SEQUENCE_KEY: &str = "phosphor.seq";

const CALL_CYCLE: [FrameType; 5] = [
    FrameType::Req,
    FrameType::In,
    FrameType::Out,
    FrameType::Rsp,
    FrameType::Annotation,
];

/// Shape of a load run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadPlan {
    pub producers: usize,
    pub frames_per_producer: usize,
    pub trace_id: String,
}

impl Default for LoadPlan {
    fn default() -> Self {
        Self {
            producers: 8,
            frames_per_producer: 100,
            trace_id: "phosphor-load".to_string(),
        }
    }
}

impl LoadPlan {
    pub fn expected_frames(&self) -> usize {
        self.producers * self.frames_per_producer
    }
}

/// Outcome of a load run
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    /// Frames the producers attempted to append
    pub expected: usize,
    /// Frames found in the trace afterwards
    pub appended: usize,
    /// Distinct frames found in the trace
    pub unique: usize,
    /// Append calls that returned an error
    pub failed_appends: usize,
    /// Producer threads that panicked
    pub failed_producers: usize,
    /// Whether each producer's frames kept their append order
    pub ordered_per_producer: bool,
    /// Frame count by frame type name
    pub per_type: BTreeMap<String, usize>,
    #[serde(serialize_with = "serialize_duration_micros")]
    pub elapsed: Duration,
}

impl LoadReport {
    /// Every frame present exactly once and every producer completed
    pub fn is_lossless(&self) -> bool {
        self.failed_appends == 0
            && self.failed_producers == 0
            && self.appended == self.expected
            && self.unique == self.expected
    }

    /// Fail on lost frames first, then on per-producer reordering
    pub fn verdict(&self) -> Result<(), LoadError> {
        if !self.is_lossless() {
            return Err(LoadError::FramesLost {
                expected: self.expected,
                appended: self.appended,
                unique: self.unique,
            });
        }
        if !self.ordered_per_producer {
            return Err(LoadError::Reordered);
        }
        Ok(())
    }
}

fn serialize_duration_micros<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed_micros(*duration))
}

/// Whole microseconds in `duration`, clamped to `u64::MAX`
pub fn elapsed_micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Build the `n`th frame a producer emits
pub fn producer_frame(trace_id: &str, producer: usize, n: usize) -> Frame {
    let frame_type = CALL_CYCLE[n % CALL_CYCLE.len()];
    let span_id = format!("p{producer}-s{}", n / CALL_CYCLE.len());

    let frame = Frame::new(trace_id, span_id, frame_type)
        .with_parent_span_id(format!("p{producer}"))
        .with_hostname(format!("producer-{producer}"))
        .with_origin(format!("phosphor.load.producer{producer}"))
        .with_key_value(SEQUENCE_KEY, format!("{producer}:{n}"));

    if frame_type.is_annotation() {
        frame.with_payload(format!("call {} complete", n / CALL_CYCLE.len()))
    } else {
        frame.with_destination(format!("phosphor.load.service{}", n % 3))
    }
}

/// Run `plan` against a fresh trace built from `config`
pub fn run_load(plan: &LoadPlan, config: &TraceConfig) -> LoadReport {
    tracing::info!(
        producers = plan.producers,
        frames_per_producer = plan.frames_per_producer,
        "starting load run"
    );

    let handle = TraceHandle::new(Trace::with_config(config));
    let started = Instant::now();

    let workers: Vec<_> = (0..plan.producers)
        .map(|producer| {
            let handle = handle.clone();
            let trace_id = plan.trace_id.clone();
            let frames = plan.frames_per_producer;
            thread::spawn(move || {
                let failed = (0..frames)
                    .filter(|&n| {
                        handle
                            .append_frame(producer_frame(&trace_id, producer, n))
                            .is_err()
                    })
                    .count();
                tracing::debug!(producer, failed, "producer finished");
                failed
            })
        })
        .collect();

    let mut failed_appends = 0;
    let mut failed_producers = 0;
    for worker in workers {
        match worker.join() {
            Ok(failed) => failed_appends += failed,
            Err(_) => failed_producers += 1,
        }
    }
    let elapsed = started.elapsed();

    // All producer handles are gone once their threads have been joined.
    let frames = handle.into_frames().unwrap_or_default();
    let report = summarize(plan, &frames, failed_appends, failed_producers, elapsed);

    tracing::info!(
        appended = report.appended,
        lossless = report.is_lossless(),
        elapsed_us = elapsed_micros(report.elapsed),
        "load run finished"
    );
    report
}

fn summarize(
    plan: &LoadPlan,
    frames: &[Arc<Frame>],
    failed_appends: usize,
    failed_producers: usize,
    elapsed: Duration,
) -> LoadReport {
    let mut seen = HashSet::with_capacity(frames.len());
    let mut last_seq: HashMap<usize, usize> = HashMap::new();
    let mut ordered_per_producer = true;
    let mut per_type = BTreeMap::new();

    for frame in frames {
        *per_type.entry(frame.frame_type.to_string()).or_insert(0) += 1;

        let Some(tag) = frame.key_value.get(SEQUENCE_KEY) else {
            continue;
        };
        seen.insert(tag.as_str());

        if let Some((producer, n)) = parse_sequence(tag) {
            if let Some(previous) = last_seq.insert(producer, n) {
                ordered_per_producer &= previous < n;
            }
        }
    }

    LoadReport {
        expected: plan.expected_frames(),
        appended: frames.len(),
        unique: seen.len(),
        failed_appends,
        failed_producers,
        ordered_per_producer,
        per_type,
        elapsed,
    }
}

fn parse_sequence(tag: &str) -> Option<(usize, usize)> {
    let (producer, n) = tag.split_once(':')?;
    Some((producer.parse().ok()?, n.parse().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_producer_frame_walks_call_cycle() {
        let types: Vec<FrameType> = (0..5)
            .map(|n| producer_frame("t", 0, n).frame_type)
            .collect();
        assert_eq!(types, CALL_CYCLE.to_vec());
    }

    #[test]
    fn test_producer_frame_groups_spans() {
        let first = producer_frame("t", 3, 0);
        let same_call = producer_frame("t", 3, 3);
        let next_call = producer_frame("t", 3, 5);

        assert_eq!(first.span_id, "p3-s0");
        assert_eq!(first.span_id, same_call.span_id);
        assert_eq!(next_call.span_id, "p3-s1");
        assert_eq!(first.parent_span_id, "p3");
    }

    #[test]
    fn test_annotation_frames_carry_payload_only() {
        let annotation = producer_frame("t", 1, 4);
        assert!(annotation.frame_type.is_annotation());
        assert!(!annotation.has_destination());
        assert_eq!(annotation.payload_size as usize, annotation.payload.len());

        let request = producer_frame("t", 1, 0);
        assert!(request.has_destination());
    }

    #[test]
    fn test_elapsed_micros_clamps() {
        assert_eq!(elapsed_micros(Duration::from_millis(3)), 3_000);
        assert_eq!(elapsed_micros(Duration::MAX), u64::MAX);
    }

    #[test]
    fn test_report_serializes_elapsed_as_micros() {
        let plan = LoadPlan {
            producers: 0,
            ..LoadPlan::default()
        };
        let report = summarize(&plan, &[], 0, 0, Duration::MAX);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["elapsed"], u64::MAX);
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("4:17"), Some((4, 17)));
        assert_eq!(parse_sequence("x:1"), None);
        assert_eq!(parse_sequence("nocolon"), None);
    }

    #[test]
    fn test_run_load_is_lossless() {
        let plan = LoadPlan {
            producers: 4,
            frames_per_producer: 25,
            trace_id: "unit".to_string(),
        };
        let report = run_load(&plan, &TraceConfig::default());

        assert!(report.is_lossless(), "{report:?}");
        assert!(report.ordered_per_producer);
        assert_eq!(report.verdict(), Ok(()));
        assert_eq!(report.appended, 100);
        assert_eq!(report.per_type.get("Annotation"), Some(&20));
        assert_eq!(report.per_type.values().sum::<usize>(), 100);
    }

    #[test]
    fn test_run_load_with_no_producers() {
        let plan = LoadPlan {
            producers: 0,
            ..LoadPlan::default()
        };
        let report = run_load(&plan, &TraceConfig::default());
        assert_eq!(report.expected, 0);
        assert_eq!(report.appended, 0);
        assert!(report.is_lossless());
    }

    #[test]
    fn test_summarize_detects_reordering() {
        let plan = LoadPlan {
            producers: 1,
            frames_per_producer: 2,
            trace_id: "t".to_string(),
        };
        let frames = vec![
            Arc::new(producer_frame("t", 0, 1)),
            Arc::new(producer_frame("t", 0, 0)),
        ];
        let report = summarize(&plan, &frames, 0, 0, Duration::ZERO);

        assert!(report.is_lossless());
        assert!(!report.ordered_per_producer);
        assert_eq!(report.verdict(), Err(LoadError::Reordered));
    }

    #[test]
    fn test_summarize_detects_duplicates() {
        let plan = LoadPlan {
            producers: 1,
            frames_per_producer: 2,
            trace_id: "t".to_string(),
        };
        let frame = Arc::new(producer_frame("t", 0, 0));
        let frames = vec![Arc::clone(&frame), frame];
        let report = summarize(&plan, &frames, 0, 0, Duration::ZERO);

        assert_eq!(report.appended, 2);
        assert_eq!(report.unique, 1);
        assert!(!report.is_lossless());
        assert_eq!(
            report.verdict(),
            Err(LoadError::FramesLost {
                expected: 2,
                appended: 2,
                unique: 1,
            })
        );
    }
}
