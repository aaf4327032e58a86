use super::*;

fn frame(idx: u64) -> Frame {
    Frame::from_premul_rgba8(FrameIndex(idx), idx as f64 * 10.0, 2, 2, vec![0; 16]).unwrap()
}

fn cfg(frame_count: u64) -> SinkConfig {
    SinkConfig {
        width: 2,
        height: 2,
        fps: Fps::new(30, 1).unwrap(),
        frame_count,
    }
}

#[test]
fn config_reports_duration_and_rejects_empty() {
    assert!((cfg(75).duration_secs() - 2.5).abs() < 1e-9);
    assert!(cfg(0).validate().is_err());
    assert!(
        SinkConfig {
            width: 0,
            ..cfg(1)
        }
        .validate()
        .is_err()
    );
}

#[test]
fn in_memory_sink_captures_in_order() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(3)).unwrap();
    for i in 0..3 {
        sink.push_frame(&frame(i)).unwrap();
    }
    sink.end().unwrap();
    assert_eq!(sink.config(), Some(cfg(3)));
    let idx: Vec<u64> = sink.frames().iter().map(|f| f.index().0).collect();
    assert_eq!(idx, vec![0, 1, 2]);
}

#[test]
fn in_memory_sink_rejects_out_of_order_frames() {
    let mut sink = InMemorySink::new();
    sink.begin(cfg(3)).unwrap();
    sink.push_frame(&frame(1)).unwrap();
    let err = sink.push_frame(&frame(1)).unwrap_err();
    assert!(matches!(err, CountframeError::Encoding(_)));
}

#[test]
fn in_memory_sink_requires_begin_and_clears_on_abort() {
    let mut sink = InMemorySink::new();
    assert!(sink.push_frame(&frame(0)).is_err());
    sink.begin(cfg(2)).unwrap();
    sink.push_frame(&frame(0)).unwrap();
    sink.abort();
    assert!(sink.frames().is_empty());
    assert!(sink.config().is_none());
}
