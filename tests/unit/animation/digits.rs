use super::*;

fn cfg(kind: DigitTransitionKind) -> DigitTransitionConfig {
    DigitTransitionConfig {
        kind,
        duration_ms: 100.0,
        ease: Ease::Linear,
        delay_ms: 0.0,
        stagger_ms: 10.0,
    }
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn local_progress_respects_delay_and_stagger() {
    let c = DigitTransitionConfig {
        delay_ms: 20.0,
        ..cfg(DigitTransitionKind::FadeRoll)
    };
    assert_eq!(c.local_progress(10.0, 0), 0.0);
    assert!(approx(c.local_progress(70.0, 0), 0.5));
    // index 2 starts 20ms later
    assert!(approx(c.local_progress(70.0, 2), 0.3));
    assert_eq!(c.local_progress(10_000.0, 3), 1.0);
    assert!(approx(c.settle_ms(3), 150.0));
}

#[test]
fn zero_duration_jumps_to_end() {
    let c = DigitTransitionConfig {
        duration_ms: 0.0,
        ..cfg(DigitTransitionKind::Scale)
    };
    assert_eq!(c.local_progress(0.0, 0), 0.0);
    assert_eq!(c.local_progress(0.001, 0), 1.0);
}

#[test]
fn validate_rejects_negative_timings() {
    let c = DigitTransitionConfig {
        stagger_ms: -1.0,
        ..cfg(DigitTransitionKind::FadeRoll)
    };
    assert!(c.validate().is_err());
    let c = DigitTransitionConfig {
        duration_ms: f64::INFINITY,
        ..cfg(DigitTransitionKind::FadeRoll)
    };
    assert!(c.validate().is_err());
    assert!(cfg(DigitTransitionKind::Bounce).validate().is_ok());
}

#[test]
fn entering_transforms_end_at_identity() {
    for kind in [
        DigitTransitionKind::None,
        DigitTransitionKind::FadeRoll,
        DigitTransitionKind::FlipDown,
        DigitTransitionKind::SlideVertical,
        DigitTransitionKind::Bounce,
        DigitTransitionKind::Scale,
    ] {
        let t = kind.enter(1.0);
        assert!(approx(t.translate_y, 0.0), "{kind:?}");
        assert!(approx(t.scale_x, 1.0), "{kind:?}");
        assert!(approx(t.effective_scale_y(), 1.0), "{kind:?}");
        assert!(approx(t.opacity, 1.0), "{kind:?}");
    }
}

#[test]
fn entering_transforms_start_offstage() {
    let fade = DigitTransitionKind::FadeRoll.enter(0.0);
    assert!(approx(fade.translate_y, -1.0));
    assert_eq!(fade.opacity, 0.0);

    let slide = DigitTransitionKind::SlideVertical.enter(0.0);
    assert!(approx(slide.translate_y, -1.0));
    assert_eq!(slide.opacity, 1.0);

    let flip = DigitTransitionKind::FlipDown.enter(0.0);
    assert_eq!(flip.origin, TransformOrigin::Top);
    assert!(!flip.is_visible());

    assert!(!DigitTransitionKind::Scale.enter(0.0).is_visible());
}

#[test]
fn bounce_overshoots_then_settles() {
    let k = DigitTransitionKind::Bounce;
    assert!(approx(k.enter(0.5).scale_x, 1.1));
    assert!(approx(k.enter(0.75).scale_x, 0.95));
    assert!(approx(k.enter(0.5).translate_y, 0.1));
    assert!(approx(k.enter(0.25).scale_x, 0.55));
}

#[test]
fn exit_targets() {
    assert!(!DigitTransitionKind::None.exit_target().is_visible());
    let fade = DigitTransitionKind::FadeRoll.exit_target();
    assert!(approx(fade.translate_y, 1.0));
    assert_eq!(fade.opacity, 0.0);
    let flip = DigitTransitionKind::FlipDown.exit_target();
    assert_eq!(flip.origin, TransformOrigin::Bottom);
    assert!(approx(flip.effective_scale_y(), 0.0));
    let slide = DigitTransitionKind::SlideVertical.exit_target();
    assert_eq!(slide.opacity, 1.0);
}

#[test]
fn affine_scales_about_origin() {
    let cell = Rect::new(10.0, 20.0, 30.0, 60.0);
    let t = DigitTransform {
        scale_x: 0.5,
        scale_y: 0.5,
        origin: TransformOrigin::Bottom,
        ..DigitTransform::IDENTITY
    };
    let a = t.to_affine(cell);
    // bottom center is fixed
    let p = a * Point::new(20.0, 60.0);
    assert!(approx(p.x, 20.0) && approx(p.y, 60.0));
    let top = a * Point::new(20.0, 20.0);
    assert!(approx(top.y, 40.0));

    let shifted = DigitTransform {
        translate_y: -1.0,
        ..DigitTransform::IDENTITY
    }
    .to_affine(cell);
    let q = shifted * Point::new(10.0, 60.0);
    assert!(approx(q.y, 20.0));
}

#[test]
fn slot_runs_enter_and_exit_concurrently() {
    let c = cfg(DigitTransitionKind::FadeRoll);
    let mut slot = TransitionSlot::new(Some('1'));
    slot.set_target(Some('2'), 0.0, 0, &c);
    assert!(slot.is_transitioning());

    let layers = slot.layers(50.0, 0, &c);
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].value, '1');
    assert_eq!(layers[0].role, LayerRole::Exiting);
    assert!(approx(layers[0].transform.translate_y, 0.5));
    assert!(approx(layers[0].transform.opacity, 0.5));
    assert_eq!(layers[1].value, '2');
    assert_eq!(layers[1].role, LayerRole::Entering);
    assert!(approx(layers[1].transform.translate_y, -0.5));

    slot.advance(99.0, 0, &c);
    assert!(slot.is_transitioning());
    slot.advance(100.0, 0, &c);
    assert!(!slot.is_transitioning());
    let settled = slot.layers(100.0, 0, &c);
    assert_eq!(settled.len(), 1);
    assert_eq!(settled[0].role, LayerRole::Active);
    assert_eq!(settled[0].transform, DigitTransform::IDENTITY);
}

#[test]
fn same_target_is_a_no_op() {
    let c = cfg(DigitTransitionKind::Scale);
    let mut slot = TransitionSlot::new(Some('7'));
    slot.set_target(Some('7'), 10.0, 0, &c);
    assert!(!slot.is_transitioning());
}

#[test]
fn none_kind_swaps_instantly() {
    let c = cfg(DigitTransitionKind::None);
    let mut slot = TransitionSlot::new(Some('1'));
    slot.set_target(Some('2'), 0.0, 0, &c);
    let layers = slot.layers(0.0, 0, &c);
    assert_eq!(layers.len(), 1);
    assert_eq!(layers[0].value, '2');
}

#[test]
fn retarget_cancels_and_restarts_from_rendered_transform() {
    let c = cfg(DigitTransitionKind::SlideVertical);
    let mut slot = TransitionSlot::new(Some('1'));
    slot.set_target(Some('2'), 0.0, 0, &c);
    slot.set_target(Some('3'), 40.0, 0, &c);

    let layers = slot.layers(40.0, 0, &c);
    assert_eq!(layers.len(), 2);
    // '1' was discarded; '2' exits from where it was drawn (40% into its entry)
    assert_eq!(layers[0].value, '2');
    assert!(approx(layers[0].transform.translate_y, -0.6));
    assert_eq!(layers[1].value, '3');
    assert!(approx(layers[1].transform.translate_y, -1.0));

    // the restarted transition settles relative to the second change
    slot.advance(120.0, 0, &c);
    assert!(slot.is_transitioning());
    slot.advance(140.0, 0, &c);
    assert_eq!(slot.target(), Some(&'3'));
    assert!(!slot.is_transitioning());
}

#[test]
fn track_first_update_is_settled() {
    let mut track = DigitTrack::new(cfg(DigitTransitionKind::FadeRoll));
    track.update("42", 0.0);
    assert!(!track.is_transitioning());
    let cols = track.sample(0.0);
    assert_eq!(cols.len(), 2);
    assert_eq!(cols[0].target, Some('4'));
    assert_eq!(cols[1].target, Some('2'));
}

#[test]
fn track_only_changed_positions_transition() {
    let mut track = DigitTrack::new(cfg(DigitTransitionKind::FadeRoll));
    track.update("120", 0.0);
    track.update("121", 10.0);
    let cols = track.sample(20.0);
    assert_eq!(cols[0].layers.len(), 1);
    assert_eq!(cols[1].layers.len(), 1);
    assert_eq!(cols[2].layers.len(), 2);
}

#[test]
fn track_grows_from_the_left() {
    let mut track = DigitTrack::new(cfg(DigitTransitionKind::Scale));
    track.update("99", 0.0);
    track.update("100", 0.0);
    assert_eq!(track.slot_count(), 3);
    let cols = track.sample(0.0);
    let targets: Vec<_> = cols.iter().map(|c| c.target).collect();
    assert_eq!(targets, vec![Some('1'), Some('0'), Some('0')]);
    assert_eq!(cols[0].index, 0);
    assert_eq!(cols[2].index, 2);
    // new leftmost position enters from blank: no exiting layer
    assert_eq!(cols[0].layers.len(), 1);
    assert_eq!(cols[0].layers[0].role, LayerRole::Entering);
}

#[test]
fn track_drops_exited_positions() {
    let mut track = DigitTrack::new(cfg(DigitTransitionKind::FadeRoll));
    track.update("100", 0.0);
    track.update("99", 0.0);
    assert_eq!(track.slot_count(), 3);
    let cols = track.sample(50.0);
    assert_eq!(cols[0].target, None);
    assert_eq!(cols[0].layers.len(), 1);
    assert_eq!(cols[0].layers[0].role, LayerRole::Exiting);

    track.update("99", 500.0);
    assert_eq!(track.slot_count(), 2);
    assert!(!track.is_transitioning());
}

#[test]
fn block_track_transitions_whole_string() {
    let mut block = BlockTrack::new(cfg(DigitTransitionKind::FadeRoll));
    block.update("1,000", 0.0);
    block.update("1,001", 0.0);
    let layers = block.sample(50.0);
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].value, "1,000");
    assert_eq!(layers[1].value, "1,001");
    block.update("1,001", 100.0);
    assert_eq!(block.sample(100.0).len(), 1);
}
