//! Integration tests for requesting and releasing pads at runtime.
//!
//! These tests verify that:
//! - Pad names come from the template and serials are never reused
//! - Releasing a pad releases its blocked producer
//! - Releasing the only pad that was not ready lets the others aggregate
//! - Releasing a pad during a flushing seek does not wedge the barrier
//! - Pads can be added and removed continuously while data flows

use parallax_aggregator::aggregator::{Aggregator, AggregatorConfig, BarrierPhase, PadHandle};
use parallax_aggregator::elements::{BufferCombiner, CollectSink, TestUpstream};
use parallax_aggregator::event::SeekEvent;
use parallax_aggregator::{Buffer, ClockTime, Error, Event, FlowStatus};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

fn buffer(data: &[u8]) -> Buffer {
    Buffer::from_bytes(data.to_vec())
}

fn setup() -> (Aggregator, Arc<CollectSink>) {
    let sink = Arc::new(CollectSink::new());
    let aggregator = Aggregator::new(BufferCombiner::new());
    aggregator.link_downstream(sink.clone());
    (aggregator, sink)
}

fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}

/// Submit on `pad` until it stops returning `Ok`; returns the final status.
fn stream(pad: PadHandle) -> JoinHandle<FlowStatus> {
    thread::spawn(move || {
        loop {
            match pad.submit(buffer(&[pad.id().serial() as u8])) {
                FlowStatus::Ok => continue,
                other => return other,
            }
        }
    })
}

#[test]
fn test_pad_names_follow_template() {
    let config = AggregatorConfig::new().with_sink_template("in_%u");
    let aggregator = Aggregator::with_config(config, BufferCombiner::new()).unwrap();

    let a = aggregator.request_pad(None).unwrap();
    let b = aggregator.request_pad(Some("in_3")).unwrap();
    let c = aggregator.request_pad(None).unwrap();
    assert_eq!((a.name(), b.name(), c.name()), ("in_0", "in_3", "in_4"));

    assert!(matches!(
        aggregator.request_pad(Some("in_1")),
        Err(Error::InvalidPadName(_))
    ));
    assert!(matches!(
        aggregator.request_pad(Some("sink_9")),
        Err(Error::InvalidPadName(_))
    ));

    // Released serials are never handed out again.
    aggregator.release_pad(&c).unwrap();
    assert_eq!(aggregator.request_pad(None).unwrap().name(), "in_5");
    assert!(aggregator.request_pad(Some("in_4")).is_err());
}

#[test]
fn test_released_handle_is_inert() {
    let (aggregator, _) = setup();
    let pad = aggregator.request_pad(None).unwrap();
    aggregator.activate().unwrap();
    aggregator.release_pad(&pad).unwrap();

    assert!(!pad.is_registered());
    assert!(pad.is_flushing());
    assert_eq!(pad.submit(buffer(b"x")), FlowStatus::Flushing);
    assert!(!pad.notify_end_of_stream());
    assert!(!pad.send_event(Event::Eos));
    assert!(!pad.link_upstream(Arc::new(TestUpstream::new())));
    assert!(pad.segment().is_none());
    assert!(matches!(
        aggregator.release_pad(&pad),
        Err(Error::PadNotFound(id)) if id == pad.id()
    ));
}

#[test]
fn test_handle_outliving_aggregator() {
    let (aggregator, _) = setup();
    let pad = aggregator.request_pad(None).unwrap();
    aggregator.activate().unwrap();
    drop(aggregator);

    assert!(!pad.is_registered());
    assert_eq!(pad.submit(buffer(b"x")), FlowStatus::Flushing);
    assert!(!pad.notify_flush_start());
}

#[test]
fn test_release_unblocks_producer() {
    let (aggregator, sink) = setup();
    let a = aggregator.request_pad(None).unwrap();
    let _b = aggregator.request_pad(None).unwrap();
    aggregator.activate().unwrap();

    let producer = {
        let a = a.clone();
        thread::spawn(move || a.submit(buffer(b"A")))
    };
    assert!(wait_for(TIMEOUT, || a.has_pending()));

    aggregator.release_pad(&a).unwrap();
    assert_eq!(producer.join().unwrap(), FlowStatus::Flushing);
    assert_eq!(sink.buffer_count(), 0);
    assert_eq!(aggregator.pad_count(), 1);
}

#[test]
fn test_release_makes_others_ready() {
    let (aggregator, sink) = setup();
    let a = aggregator.request_pad(None).unwrap();
    let b = aggregator.request_pad(None).unwrap();
    aggregator.activate().unwrap();

    let producer = {
        let a = a.clone();
        thread::spawn(move || a.submit(buffer(b"A")))
    };
    assert!(wait_for(TIMEOUT, || a.has_pending()));

    aggregator.release_pad(&b).unwrap();
    assert_eq!(producer.join().unwrap(), FlowStatus::Ok);
    assert!(sink.wait_for_buffers(1, TIMEOUT));
    assert_eq!(sink.buffers()[0].as_bytes(), b"A");
}

#[test]
fn test_pad_added_before_activation_waits() {
    let (aggregator, _) = setup();
    let pad = aggregator.request_pad(None).unwrap();
    assert!(pad.is_flushing());
    assert_eq!(pad.submit(buffer(b"early")), FlowStatus::Flushing);

    aggregator.activate().unwrap();
    let late = aggregator.request_pad(None).unwrap();
    assert!(!pad.is_flushing());
    assert!(!late.is_flushing());
}

#[test]
fn test_release_during_flushing_seek() {
    let (aggregator, sink) = setup();
    let a = aggregator.request_pad(None).unwrap();
    let b = aggregator.request_pad(None).unwrap();
    a.link_upstream(Arc::new(TestUpstream::new()));
    b.link_upstream(Arc::new(TestUpstream::new()));
    aggregator.activate().unwrap();

    assert!(aggregator.seek(SeekEvent::new_time(ClockTime::ZERO)));
    assert!(a.notify_flush_start());
    assert!(a.notify_flush_stop());
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Flushing);
    assert_eq!(sink.flush_stop_count(), 0);

    // B never flushes; releasing it completes the barrier.
    aggregator.release_pad(&b).unwrap();
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert_eq!((sink.flush_start_count(), sink.flush_stop_count()), (1, 1));

    assert_eq!(a.submit(buffer(b"A")), FlowStatus::Ok);
    assert_eq!(sink.buffer_count(), 1);
}

#[test]
fn test_release_all_pads_during_seek() {
    let (aggregator, sink) = setup();
    let a = aggregator.request_pad(None).unwrap();
    a.link_upstream(Arc::new(TestUpstream::new()));
    aggregator.activate().unwrap();

    assert!(aggregator.seek(SeekEvent::new_time(ClockTime::ZERO)));
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::AwaitingFlushStart);

    aggregator.release_pad(&a).unwrap();
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert_eq!(sink.flush_start_count(), 0);
    assert_eq!(sink.flush_stop_count(), 0);
}

#[test]
fn test_add_remove_churn() {
    const ITERATIONS: usize = 50;
    let (aggregator, sink) = setup();
    aggregator.activate().unwrap();

    let mut current: Option<(PadHandle, JoinHandle<FlowStatus>)> = None;
    for _ in 0..ITERATIONS {
        let pad = aggregator.request_pad(None).unwrap();
        let producer = stream(pad.clone());

        if let Some((old, old_producer)) = current.take() {
            aggregator.release_pad(&old).unwrap();
            assert_eq!(old_producer.join().unwrap(), FlowStatus::Flushing);
        }
        current = Some((pad, producer));
        assert_eq!(aggregator.pad_count(), 1);
    }

    let Some((last, producer)) = current else {
        panic!("no pad left");
    };
    let produced = sink.buffer_count();
    assert!(sink.wait_for_buffers(produced + 1, TIMEOUT));
    aggregator.release_pad(&last).unwrap();
    assert_eq!(producer.join().unwrap(), FlowStatus::Flushing);
    assert_eq!(aggregator.pad_count(), 0);
    assert_eq!(last.name(), format!("sink_{}", ITERATIONS - 1));
}
