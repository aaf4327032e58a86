use super::*;

#[test]
fn catalog_is_ordered_and_indexed_by_id() {
    let ids: Vec<PresetId> = presets().iter().map(|p| p.id).collect();
    assert_eq!(ids, PresetId::ALL.to_vec());
    for id in PresetId::ALL {
        assert_eq!(id.preset().id, id);
    }
    assert!(PresetId::Draft < PresetId::Ultra);
}

#[test]
fn catalog_values_match_published_table() {
    let draft = PresetId::Draft.preset();
    assert_eq!(draft.canvas(), Canvas { width: 1280, height: 720 });
    assert_eq!(draft.frame_rate, 24);
    assert_eq!(draft.codec, VideoCodec::Vp9);
    assert_eq!(draft.size_mb_per_sec, 0.25);

    let ultra = PresetId::Ultra.preset();
    assert_eq!((ultra.width, ultra.height), (3840, 2160));
    assert_eq!(ultra.bitrate_mbps, 50.0);
    assert_eq!(ultra.codec, VideoCodec::Prores);
    assert_eq!(ultra.time_multiplier, 4.0);
}

#[test]
fn every_preset_uses_a_supported_frame_rate() {
    for p in presets() {
        assert!(p.fps().is_ok(), "{}", p.id);
        assert!(p.video_options().validate().is_ok(), "{}", p.id);
    }
    assert_eq!(PresetId::High.preset().video_options().bitrate_bps(), 16_000_000);
}

#[test]
fn ids_parse_case_insensitively() {
    assert_eq!("Ultra".parse::<PresetId>().unwrap(), PresetId::Ultra);
    assert_eq!(PresetId::Standard.to_string(), "standard");
    assert!("cinema".parse::<PresetId>().is_err());
    assert_eq!(
        serde_json::to_string(&PresetId::High).unwrap(),
        "\"high\""
    );
}
