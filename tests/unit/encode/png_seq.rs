use super::*;
use crate::foundation::core::{Fps, FrameIndex};

fn solid(idx: u64, w: u32, h: u32, px: [u8; 4]) -> Frame {
    let data = px.repeat((w * h) as usize);
    Frame::from_premul_rgba8(FrameIndex(idx), 0.0, w, h, data).unwrap()
}

fn decode(bytes: &[u8]) -> image::DynamicImage {
    image::load_from_memory_with_format(bytes, image::ImageFormat::Png).unwrap()
}

#[test]
fn color_format_serializes_as_bit_count() {
    let opts: PngOptions = serde_json::from_str(r#"{"color_format": 24}"#).unwrap();
    assert_eq!(opts.color_format, ColorFormat::Rgb24);
    assert_eq!(serde_json::to_string(&ColorFormat::Rgb332).unwrap(), "8");
    assert!(serde_json::from_str::<PngOptions>(r#"{"color_format": 16}"#).is_err());
}

#[test]
fn naming_defaults_to_padded_sequence() {
    let naming = NamingConvention::default();
    assert_eq!(naming.file_name(0), "sequence_0001.png");
    assert_eq!(naming.file_name(41), "sequence_0042.png");
    let wide = NamingConvention {
        prefix: "f".to_owned(),
        pad: 2,
        start: 0,
    };
    assert_eq!(wide.file_name(123), "f123.png");
}

#[test]
fn naming_rejects_path_separators() {
    let opts = PngOptions {
        naming: NamingConvention {
            prefix: "../x".to_owned(),
            ..NamingConvention::default()
        },
        ..PngOptions::default()
    };
    assert!(PngSequenceOptimizer::new(opts).is_err());
}

#[test]
fn every_frame_becomes_one_file_at_first_frame_size() {
    let frames = vec![
        solid(0, 8, 6, [255, 0, 0, 255]),
        solid(1, 16, 12, [0, 255, 0, 255]),
        solid(2, 8, 6, [0, 0, 255, 255]),
    ];
    let seq = PngSequenceOptimizer::default().optimize(&frames).unwrap();
    assert_eq!(seq.files.len(), 3);
    assert_eq!(seq.metadata.frame_count, 3);
    assert_eq!(seq.metadata.resized_frames, 1);
    assert_eq!((seq.metadata.width, seq.metadata.height), (8, 6));
    for file in &seq.files {
        let img = decode(&file.bytes);
        assert_eq!((img.width(), img.height()), (8, 6));
    }
    let total: u64 = seq.files.iter().map(|f| f.bytes.len() as u64).sum();
    assert_eq!(seq.metadata.total_bytes, total);
    assert_eq!(seq.files[2].name, "sequence_0003.png");
}

#[test]
fn empty_input_is_rejected() {
    assert!(PngSequenceOptimizer::default().optimize(&[]).is_err());
}

#[test]
fn rgba32_unpremultiplies_pixels() {
    let frames = vec![solid(0, 2, 2, [64, 0, 0, 128])];
    let seq = PngSequenceOptimizer::default().optimize(&frames).unwrap();
    let img = decode(&seq.files[0].bytes).to_rgba8();
    assert_eq!(img.get_pixel(0, 0).0, [128, 0, 0, 128]);
}

#[test]
fn rgb24_drops_alpha() {
    let opts = PngOptions {
        color_format: ColorFormat::Rgb24,
        ..PngOptions::default()
    };
    let frames = vec![solid(0, 2, 2, [64, 0, 0, 128])];
    let seq = PngSequenceOptimizer::new(opts).unwrap().optimize(&frames).unwrap();
    let img = decode(&seq.files[0].bytes);
    assert_eq!(img.color(), image::ColorType::Rgb8);
    assert_eq!(img.to_rgb8().get_pixel(1, 1).0, [128, 0, 0]);
}

#[test]
fn rgb332_quantizes_color_and_keeps_alpha() {
    let opts = PngOptions {
        color_format: ColorFormat::Rgb332,
        ..PngOptions::default()
    };
    let frames = vec![solid(0, 1, 1, [100, 100, 100, 255])];
    let seq = PngSequenceOptimizer::new(opts).unwrap().optimize(&frames).unwrap();
    let px = decode(&seq.files[0].bytes).to_rgba8().get_pixel(0, 0).0;
    // 8 levels for red/green (multiples of 255/7), 4 for blue (multiples of 85).
    assert_eq!(px, [109, 109, 85, 255]);
    assert_eq!(quantize_channel(255, 4), 255);
    assert_eq!(quantize_channel(0, 8), 0);
}

#[test]
fn linear_color_space_darkens_midtones() {
    let opts = PngOptions {
        color_space: ColorSpace::Linear,
        ..PngOptions::default()
    };
    let frames = vec![solid(0, 1, 1, [128, 128, 128, 255])];
    let seq = PngSequenceOptimizer::new(opts).unwrap().optimize(&frames).unwrap();
    let px = decode(&seq.files[0].bytes).to_rgba8().get_pixel(0, 0).0;
    assert!(px[0] < 64, "{px:?}");
    assert_eq!(px[3], 255);
}

#[test]
fn best_compression_is_not_larger_than_none() {
    let frames = vec![solid(0, 64, 64, [10, 20, 30, 255])];
    let encode = |compression| {
        let opts = PngOptions {
            compression,
            ..PngOptions::default()
        };
        PngSequenceOptimizer::new(opts).unwrap().optimize(&frames).unwrap().metadata.total_bytes
    };
    assert!(encode(PngCompression::Best) < encode(PngCompression::None));
}

#[test]
fn sink_optimizes_on_end() {
    let mut sink = PngSequenceSink::new(PngOptions::default()).unwrap();
    sink.begin(SinkConfig {
        width: 4,
        height: 4,
        fps: Fps::new(24, 1).unwrap(),
        frame_count: 2,
    })
    .unwrap();
    sink.push_frame(&solid(0, 4, 4, [0, 0, 0, 0])).unwrap();
    sink.push_frame(&solid(1, 4, 4, [0, 0, 0, 0])).unwrap();
    assert!(sink.push_frame(&solid(1, 4, 4, [0, 0, 0, 0])).is_err());
    sink.end().unwrap();
    let seq = sink.take_sequence().unwrap();
    assert_eq!(seq.files.len(), 2);
    assert!(sink.take_sequence().is_none());
}

#[test]
fn raised_cancel_token_stops_encoding() {
    let frames: Vec<Frame> = (0..4).map(|i| solid(i, 4, 4, [0, 0, 0, 255])).collect();
    let cancel = CancelToken::new();
    let optimizer = PngSequenceOptimizer::default()
        .with_cancel(CancelToken::new())
        .with_cancel(cancel.clone());
    assert_eq!(optimizer.optimize(&frames).unwrap().files.len(), 4);

    cancel.cancel();
    assert!(matches!(
        optimizer.optimize(&frames),
        Err(CountframeError::Encoding(_))
    ));
}
