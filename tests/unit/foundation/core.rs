use super::*;

#[test]
fn frame_count_is_ceil_of_rate_times_duration() {
    let fps = Fps::export(30).unwrap();
    assert_eq!(frame_count(fps, 2.5), 75);
    assert_eq!(frame_count(Fps::export(60).unwrap(), 5.0), 300);
    assert_eq!(frame_count(Fps::export(24).unwrap(), 0.01), 1);
}

#[test]
fn frame_count_tolerates_float_products() {
    // 60 * 0.1 is 6.000000000000001 in f64.
    assert_eq!(frame_count(Fps::export(60).unwrap(), 0.1), 6);
    assert_eq!(frame_count(Fps::export(30).unwrap(), 0.0), 0);
    assert_eq!(frame_count(Fps::export(30).unwrap(), f64::NAN), 0);
}

#[test]
fn unsupported_export_rate_is_rejected() {
    assert!(Fps::export(29).is_err());
    for rate in SUPPORTED_FRAME_RATES {
        assert!(Fps::export(rate).is_ok());
    }
}

#[test]
fn progress_spans_first_to_last_frame() {
    assert_eq!(progress_at(FrameIndex(0), 300), 0.0);
    assert_eq!(progress_at(FrameIndex(299), 300), 1.0);
    assert!((progress_at(FrameIndex(150), 300) - 150.0 / 299.0).abs() < 1e-12);
    assert_eq!(progress_at(FrameIndex(0), 1), 0.0);
}

#[test]
fn timestamps_follow_frame_duration() {
    let fps = Fps::export(25).unwrap();
    assert_eq!(timestamp_ms(FrameIndex(0), fps), 0.0);
    assert!((timestamp_ms(FrameIndex(25), fps) - 1000.0).abs() < 1e-9);
}

#[test]
fn hex_colors_parse_and_format() {
    let c = Rgba8::parse_hex("#ff8800").unwrap();
    assert_eq!(c, Rgba8::rgb(255, 136, 0));
    assert_eq!(c.to_hex(), "#FF8800");

    let c = Rgba8::parse_hex("00ff0080").unwrap();
    assert_eq!(c.a, 0x80);
    assert_eq!(c.to_hex(), "#00FF0080");

    assert!(Rgba8::parse_hex("#fff").is_err());
    assert!(Rgba8::parse_hex("#zzzzzz").is_err());
}

#[test]
fn colors_roundtrip_through_json_strings() {
    let json = serde_json::to_string(&Rgba8::rgba(1, 2, 3, 4)).unwrap();
    assert_eq!(json, "\"#01020304\"");
    let back: Rgba8 = serde_json::from_str(&json).unwrap();
    assert_eq!(back, Rgba8::rgba(1, 2, 3, 4));
}

#[test]
fn premul_scales_channels_by_alpha() {
    let p = Rgba8::rgba(255, 128, 0, 128).premul();
    assert_eq!(p.a, 128);
    assert_eq!(p.r, 128);
    assert_eq!(p.g, 64);
    assert_eq!(p.b, 0);
}

#[test]
fn cancel_token_is_shared_between_clones() {
    let token = CancelToken::new();
    let worker = token.clone();
    assert!(!worker.is_cancelled());
    token.cancel();
    assert!(worker.is_cancelled());
    token.cancel();
    assert!(token.is_cancelled());
}

#[test]
fn cancel_on_drop_raises_token() {
    let token = CancelToken::new();
    let guard = CancelOnDrop(token.clone());
    assert!(!token.is_cancelled());
    drop(guard);
    assert!(token.is_cancelled());
}
