use super::*;

#[test]
fn rejects_wrong_length() {
    assert!(Frame::from_premul_rgba8(FrameIndex(0), 0.0, 2, 2, vec![0; 15]).is_err());
    assert!(Frame::from_premul_rgba8(FrameIndex(0), 0.0, 0, 2, vec![]).is_err());
}

#[test]
fn accessors_and_unpremul() {
    let f = Frame::from_premul_rgba8(FrameIndex(3), 100.0, 1, 1, vec![64, 0, 0, 128]).unwrap();
    assert_eq!(f.index(), FrameIndex(3));
    assert_eq!(f.timestamp_ms(), 100.0);
    assert_eq!(f.canvas(), Canvas { width: 1, height: 1 });
    assert_eq!(f.to_straight_rgba8(), vec![128, 0, 0, 128]);
    assert_eq!(f.into_data(), vec![64, 0, 0, 128]);
}

#[test]
fn fingerprint_tracks_pixels() {
    let a = Frame::from_premul_rgba8(FrameIndex(0), 0.0, 1, 1, vec![1, 2, 3, 4]).unwrap();
    let b = Frame::from_premul_rgba8(FrameIndex(9), 5.0, 1, 1, vec![1, 2, 3, 4]).unwrap();
    let c = Frame::from_premul_rgba8(FrameIndex(0), 0.0, 1, 1, vec![1, 2, 3, 5]).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());
}
