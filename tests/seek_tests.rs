//! Integration tests for seeks and the flush barrier.
//!
//! These tests verify that:
//! - A flushing seek forwards exactly one flush-start and one flush-stop
//! - Aggregation pauses during the barrier and resumes afterwards
//! - A failed seek aborts the barrier without wedging the output
//! - Source-side queries and events are answered as documented

use parallax_aggregator::aggregator::{AggregateContext, Aggregator, BarrierPhase, PadHandle};
use parallax_aggregator::elements::{BufferCombiner, CollectSink, TestUpstream};
use parallax_aggregator::event::{
    FlushStopEvent, NavigationEvent, QosEvent, SeekEvent, SeekFlags, SeekPosition, SegmentFormat,
};
use parallax_aggregator::query::Query;
use parallax_aggregator::element::DownstreamPeer;
use parallax_aggregator::{Buffer, ClockTime, Event, FlowStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn buffer(data: &[u8]) -> Buffer {
    Buffer::from_bytes(data.to_vec())
}

fn flushing_seek() -> SeekEvent {
    SeekEvent::new_time(ClockTime::ZERO)
        .with_stop(SeekPosition::set(ClockTime::from_secs(10).nanos() as i64))
}

/// A combiner aggregator linked to a collecting sink.
fn setup(pads: usize) -> (Aggregator, Arc<CollectSink>, Vec<PadHandle>) {
    let sink = Arc::new(CollectSink::new());
    let aggregator = Aggregator::new(BufferCombiner::new());
    aggregator.link_downstream(sink.clone());
    let pads = (0..pads)
        .map(|_| aggregator.request_pad(None).unwrap())
        .collect();
    (aggregator, sink, pads)
}

/// Link an upstream that answers every seek with a flush-start and a
/// flush-stop on `pad`, like a real source would.
fn link_flushing_upstream(pad: &PadHandle) -> Arc<TestUpstream> {
    let target = pad.clone();
    let upstream = Arc::new(TestUpstream::new().with_reaction(move |event| {
        if let Event::Seek(seek) = event {
            if seek.is_flushing() {
                target.notify_flush_start();
                target.notify_flush_stop();
            }
        }
    }));
    pad.link_upstream(upstream.clone());
    upstream
}

/// Push one buffer on every pad concurrently and return the statuses.
fn push_round(pads: &[PadHandle], tag: u8) -> Vec<FlowStatus> {
    let producers: Vec<_> = pads
        .iter()
        .cloned()
        .map(|pad| thread::spawn(move || pad.submit(buffer(&[tag]))))
        .collect();
    producers
        .into_iter()
        .map(|producer| producer.join().unwrap())
        .collect()
}

#[test]
fn test_flushing_seek() {
    let (aggregator, sink, pads) = setup(2);
    let (pad1, pad2) = (pads[0].clone(), pads[1].clone());
    pad1.link_upstream(Arc::new(TestUpstream::new()));
    pad2.link_upstream(Arc::new(TestUpstream::new()));
    aggregator.activate().unwrap();

    assert!(aggregator.seek(flushing_seek()));
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::AwaitingFlushStart);

    // Flushing starts once an upstream sends the first flush-start.
    assert_eq!(sink.flush_start_count(), 0);
    assert_eq!(sink.flush_stop_count(), 0);

    assert!(pad2.notify_flush_start());
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Flushing);
    assert_eq!(sink.flush_start_count(), 1);

    // Pad 2 is flushing: its buffer is refused.
    assert_eq!(pad2.submit(buffer(b"flushed")), FlowStatus::Flushing);

    assert!(pad1.notify_flush_start());
    assert_eq!(sink.flush_start_count(), 1);
    assert_eq!(sink.flush_stop_count(), 0);

    // The first flush-stop is not forwarded.
    assert!(pad1.notify_flush_stop());
    assert_eq!(sink.flush_start_count(), 1);
    assert_eq!(sink.flush_stop_count(), 0);
    assert!(aggregator.is_flush_seeking());

    // Pad 1 accepts data again but nothing aggregates until the barrier closes.
    let producer = {
        let pad1 = pad1.clone();
        thread::spawn(move || pad1.submit(buffer(b"after-seek")))
    };

    // The last flush-stop closes the barrier and is forwarded.
    assert!(pad2.notify_flush_stop());
    assert_eq!(sink.flush_start_count(), 1);
    assert_eq!(sink.flush_stop_count(), 1);
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);

    let eos = thread::spawn(move || pad2.notify_end_of_stream());
    assert!(sink.wait_for_buffers(1, TIMEOUT));
    assert_eq!(sink.buffers()[0].as_bytes(), b"after-seek");
    assert_eq!(producer.join().unwrap(), FlowStatus::Ok);
    assert!(eos.join().unwrap());
    assert_eq!(sink.flush_stop_count(), 1);
}

#[test]
fn test_flush_forwarded_once_for_many_pads() {
    const PADS: usize = 8;
    let (aggregator, sink, pads) = setup(PADS);
    let upstreams: Vec<_> = pads.iter().map(link_flushing_upstream).collect();
    aggregator.activate().unwrap();

    assert!(aggregator.seek(flushing_seek()));

    assert_eq!(sink.flush_start_count(), 1);
    assert_eq!(sink.flush_stop_count(), 1);
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    for upstream in &upstreams {
        assert_eq!(upstream.seek_count(), 1);
    }

    // The task resumed: a full round aggregates.
    assert!(push_round(&pads, 1).iter().all(|s| *s == FlowStatus::Ok));
    assert_eq!(sink.buffer_count(), 1);
}

#[test]
fn test_seek_resends_segment() {
    let (aggregator, sink, pads) = setup(2);
    for pad in &pads {
        link_flushing_upstream(pad);
    }
    aggregator.activate().unwrap();

    assert!(push_round(&pads, 0).iter().all(|s| *s == FlowStatus::Ok));
    let seek = SeekEvent::new_time(ClockTime::from_secs(2))
        .with_stop(SeekPosition::set(ClockTime::from_secs(10).nanos() as i64));
    assert!(aggregator.seek(seek));
    assert!(push_round(&pads, 1).iter().all(|s| *s == FlowStatus::Ok));

    let segments = sink.segments();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[1].start, ClockTime::from_secs(2).nanos());
    assert_eq!(segments[1].stop, Some(ClockTime::from_secs(10).nanos()));

    let output = aggregator.output_segment();
    assert_eq!(output.start, ClockTime::from_secs(2).nanos());

    // The combiner restarts its timestamps after the flush.
    let buffers = sink.buffers();
    assert_eq!(buffers[1].pts(), ClockTime::ZERO);
}

#[test]
fn test_repeated_seeks_while_streaming() {
    const SEEKS: usize = 100;
    let (aggregator, sink, pads) = setup(2);
    for pad in &pads {
        link_flushing_upstream(pad);
    }
    aggregator.activate().unwrap();

    let stop = Arc::new(AtomicBool::new(false));
    let producers: Vec<_> = pads
        .iter()
        .cloned()
        .map(|pad| {
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let mut sent = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    match pad.submit(buffer(&[0])) {
                        FlowStatus::Ok => sent += 1,
                        FlowStatus::Flushing => thread::yield_now(),
                        other => panic!("unexpected flow status {other}"),
                    }
                }
                sent
            })
        })
        .collect();

    for _ in 0..SEEKS {
        assert!(aggregator.seek(flushing_seek()));
    }
    assert_eq!(sink.flush_start_count(), SEEKS);
    assert_eq!(sink.flush_stop_count(), SEEKS);

    // Still streaming after the last seek.
    let produced = sink.buffer_count();
    assert!(sink.wait_for_buffers(produced + 1, TIMEOUT));

    stop.store(true, Ordering::SeqCst);
    aggregator.deactivate();
    for producer in producers {
        producer.join().unwrap();
    }
}

#[test]
fn test_refused_seek_aborts_barrier() {
    let (aggregator, sink, pads) = setup(2);
    pads[0].link_upstream(Arc::new(TestUpstream::new()));
    pads[1].link_upstream(Arc::new(TestUpstream::refusing()));
    aggregator.activate().unwrap();

    assert!(!aggregator.seek(flushing_seek()));
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert_eq!(sink.flush_start_count(), 0);
    assert_eq!(sink.flush_stop_count(), 0);

    assert!(push_round(&pads, 0).iter().all(|s| *s == FlowStatus::Ok));
    assert_eq!(sink.buffer_count(), 1);
}

#[test]
fn test_refused_seek_after_flush_start_resumes_output() {
    let (aggregator, sink, pads) = setup(2);

    // The first branch flushes but never sends its flush-stop; the second refuses.
    let target = pads[0].clone();
    pads[0].link_upstream(Arc::new(TestUpstream::new().with_reaction(move |event| {
        if matches!(event, Event::Seek(_)) {
            target.notify_flush_start();
        }
    })));
    pads[1].link_upstream(Arc::new(TestUpstream::refusing()));
    aggregator.activate().unwrap();

    assert!(!aggregator.seek(flushing_seek()));
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert_eq!(sink.flush_start_count(), 1);
    assert_eq!(sink.flush_stop_count(), 1);

    // The late flush-stop is a plain pad flush, not forwarded.
    assert!(pads[0].notify_flush_stop());
    assert_eq!(sink.flush_stop_count(), 1);

    assert!(push_round(&pads, 0).iter().all(|s| *s == FlowStatus::Ok));
    assert_eq!(sink.buffer_count(), 1);
}

#[test]
fn test_seek_without_pads_fails() {
    let (aggregator, sink, _) = setup(0);
    aggregator.activate().unwrap();
    assert!(!aggregator.seek(flushing_seek()));
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert_eq!(sink.flush_start_count(), 0);
}

#[test]
fn test_non_flushing_seek_skips_barrier() {
    let (aggregator, sink, pads) = setup(2);
    let upstreams: Vec<_> = pads
        .iter()
        .map(|pad| {
            let upstream = Arc::new(TestUpstream::new());
            pad.link_upstream(upstream.clone());
            upstream
        })
        .collect();
    aggregator.activate().unwrap();

    let seek = SeekEvent::new_time(ClockTime::from_secs(1)).with_flags(SeekFlags::ACCURATE);
    assert!(aggregator.send_src_event(Event::Seek(seek)));
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert!(upstreams.iter().all(|u| u.seek_count() == 1));
    assert_eq!(sink.flush_start_count(), 0);
}

#[test]
fn test_flushing_result_coerced_during_seek() {
    let aggregator = Aggregator::new(|ctx: &mut AggregateContext<'_>| {
        for pad in ctx.pads() {
            ctx.take_buffer(pad);
        }
        FlowStatus::Flushing
    });
    let sink = Arc::new(CollectSink::new());
    aggregator.link_downstream(sink.clone());
    let pads: Vec<_> = (0..2)
        .map(|_| {
            let pad = aggregator.request_pad(None).unwrap();
            pad.link_upstream(Arc::new(TestUpstream::new()));
            pad
        })
        .collect();
    aggregator.activate().unwrap();

    // Barrier open, no flush-start yet: the task still aggregates.
    assert!(aggregator.seek(flushing_seek()));
    assert!(aggregator.is_flush_seeking());
    assert!(push_round(&pads, 0).iter().all(|s| *s == FlowStatus::Ok));
    assert_eq!(aggregator.last_flow_result(), FlowStatus::Ok);

    for pad in &pads {
        assert!(pad.send_event(Event::FlushStart));
        assert!(pad.send_event(Event::FlushStop(FlushStopEvent::new(true))));
    }
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    assert_eq!((sink.flush_start_count(), sink.flush_stop_count()), (1, 1));

    assert!(push_round(&pads, 1).iter().all(|s| *s == FlowStatus::Flushing));
}

#[test]
fn test_output_dropped_while_seeking() {
    let (aggregator, sink, pads) = setup(2);
    for pad in &pads {
        pad.link_upstream(Arc::new(TestUpstream::new()));
    }
    aggregator.activate().unwrap();

    assert!(aggregator.seek(flushing_seek()));
    assert!(push_round(&pads, 0).iter().all(|s| *s == FlowStatus::Ok));
    assert_eq!(sink.buffer_count(), 0);
    assert!(sink.segments().is_empty());
}

#[test]
fn test_src_query_not_seekable() {
    let (aggregator, _, _) = setup(1);
    let mut query = Query::seeking(SegmentFormat::Bytes);
    assert!(aggregator.src_query(&mut query));
    let Query::Seeking(seeking) = query else {
        panic!("query changed type");
    };
    assert_eq!(seeking.format, SegmentFormat::Bytes);
    assert!(!seeking.seekable);
    assert_eq!((seeking.start, seeking.end), (0, -1));

    let mut position = Query::position(SegmentFormat::Time);
    assert!(!aggregator.src_query(&mut position));
}

#[test]
fn test_pad_query_not_seekable() {
    let (_aggregator, _, pads) = setup(1);
    let mut query = Query::seeking(SegmentFormat::Time);
    assert!(pads[0].query(&mut query));
    assert!(matches!(query, Query::Seeking(q) if !q.seekable));
}

#[test]
fn test_src_events() {
    let (aggregator, _, pads) = setup(2);
    let accepting = Arc::new(TestUpstream::new());
    pads[0].link_upstream(accepting.clone());

    assert!(!aggregator.send_src_event(Event::Navigation(NavigationEvent::new(
        "mouse-move",
        1.0,
        1.0
    ))));
    assert!(accepting.events().is_empty());

    // Pad 1 has no upstream and counts as success.
    let qos = Event::Qos(QosEvent::new(0.5, ClockTime::ZERO, ClockTime::ZERO));
    assert!(aggregator.send_src_event(qos.clone()));
    assert_eq!(accepting.events().len(), 1);

    let refusing = Arc::new(TestUpstream::refusing());
    pads[1].link_upstream(refusing.clone());
    assert!(!aggregator.send_src_event(qos.clone()));
    assert_eq!(accepting.events().len(), 2);
    assert_eq!(refusing.events().len(), 1);

    assert!(pads[1].unlink_upstream());
    assert!(aggregator.send_src_event(qos));
    assert_eq!(refusing.events().len(), 1);

    // Downstream-only events never travel upstream.
    assert!(!aggregator.send_src_event(Event::Eos));
    assert!(!aggregator.send_src_event(Event::Segment(Default::default())));
    assert_eq!(accepting.events().len(), 3);
}

#[test]
fn test_src_event_without_pads_fails() {
    let (aggregator, _, _) = setup(0);
    let qos = Event::Qos(QosEvent::new(1.0, ClockTime::ZERO, ClockTime::ZERO));
    assert!(!aggregator.send_src_event(qos));
}

/// Downstream that holds every flush-start until `open` is called.
struct GatedSink {
    inner: CollectSink,
    open: Mutex<bool>,
    opened: Condvar,
    entered: Mutex<Option<mpsc::Sender<()>>>,
}

impl GatedSink {
    fn new(entered: mpsc::Sender<()>) -> Self {
        Self {
            inner: CollectSink::new(),
            open: Mutex::new(false),
            opened: Condvar::new(),
            entered: Mutex::new(Some(entered)),
        }
    }

    fn open(&self) {
        *self.open.lock().unwrap() = true;
        self.opened.notify_all();
    }
}

impl DownstreamPeer for GatedSink {
    fn chain(&self, buffer: Buffer) -> FlowStatus {
        self.inner.chain(buffer)
    }

    fn event(&self, event: Event) -> bool {
        if matches!(event, Event::FlushStart) {
            if let Some(entered) = self.entered.lock().unwrap().take() {
                let _ = entered.send(());
            }
            let mut open = self.open.lock().unwrap();
            while !*open {
                open = self.opened.wait(open).unwrap();
            }
        }
        self.inner.event(event)
    }
}

#[test]
fn test_flush_stop_while_flush_start_is_forwarded() {
    let (entered_tx, entered_rx) = mpsc::channel();
    let sink = Arc::new(GatedSink::new(entered_tx));
    let aggregator = Aggregator::new(BufferCombiner::new());
    aggregator.link_downstream(sink.clone());
    let pad = aggregator.request_pad(None).unwrap();
    pad.link_upstream(Arc::new(TestUpstream::new()));
    aggregator.activate().unwrap();

    assert!(aggregator.seek(flushing_seek()));

    let (done_tx, done_rx) = mpsc::channel();
    let flusher = {
        let pad = pad.clone();
        thread::spawn(move || {
            let handled = pad.notify_flush_start();
            let _ = done_tx.send(());
            handled
        })
    };
    entered_rx.recv_timeout(TIMEOUT).unwrap();

    // The barrier closes and the task restarts before the flush-start
    // thread gets to pause it.
    assert!(pad.notify_flush_stop());
    assert_eq!(aggregator.barrier_phase(), BarrierPhase::Idle);
    sink.open();

    assert!(done_rx.recv_timeout(TIMEOUT).is_ok());
    assert!(flusher.join().unwrap());

    assert_eq!(pad.submit(buffer(b"after")), FlowStatus::Ok);
    assert!(sink.inner.wait_for_buffers(1, TIMEOUT));
    assert_eq!(
        (sink.inner.flush_start_count(), sink.inner.flush_stop_count()),
        (1, 1)
    );
}
