//! Integration tests for the canon alignment engine

use canon_align::canon::offsets::evaluate_offsets;
use canon_align::features::beat_stack::stack_beat_features;
use canon_align::io::TrackFile;
use canon_align::similarity::SimilarityMatrix;
use canon_align::{
    analyze_batch, compute_canon_alignment, compute_canon_alignment_from_audio, AnalysisError,
    Beat, CanonConfig, FrameFeatures, PrecomputedFeatures, SegmentLabel, TrackInput,
};

const SAMPLE_RATE: u32 = 22050;
const HOP: usize = 441;
const FRAMES_PER_BEAT: usize = 25; // 0.5 s beats at 50 frames/s

fn beats(n: usize) -> Vec<Beat> {
    (0..n)
        .map(|i| Beat {
            start: i as f32 * 0.5,
            duration: 0.5,
            confidence: 1.0,
        })
        .collect()
}

/// Frame features whose content per beat is given by `pattern(beat)`
fn features_from<F: Fn(usize) -> usize>(n_beats: usize, pattern: F) -> FrameFeatures {
    let n_frames = n_beats.max(1) * FRAMES_PER_BEAT;
    let value = |frame: usize, row: usize| {
        let p = pattern(frame / FRAMES_PER_BEAT) as f32;
        ((p + 1.0) * 0.9 + row as f32 * 0.7).sin()
    };
    let matrix = |rows: usize, shift: usize| -> Vec<Vec<f32>> {
        (0..rows)
            .map(|r| (0..n_frames).map(|f| value(f, r + shift)).collect())
            .collect()
    };
    FrameFeatures::from_rows(
        SAMPLE_RATE,
        HOP,
        matrix(12, 0),
        matrix(6, 12),
        matrix(6, 18),
        (0..n_frames).map(|f| value(f, 30).abs()).collect(),
        (0..n_frames).map(|f| 0.5 + 0.2 * value(f, 31)).collect(),
    )
    .unwrap()
}

fn constant_features(n_beats: usize) -> FrameFeatures {
    features_from(n_beats, |_| 0)
}

fn run(n: usize, features: &FrameFeatures, config: &CanonConfig) -> canon_align::AlignmentResult {
    compute_canon_alignment(&beats(n), n as f32 * 0.5, features, config)
        .expect("alignment should succeed")
        .expect("alignment should exist")
}

#[test]
fn test_empty_and_single_beat_return_none() {
    let features = constant_features(4);
    let config = CanonConfig::default();
    assert!(compute_canon_alignment(&[], 0.0, &features, &config).unwrap().is_none());
    assert!(compute_canon_alignment(&beats(1), 0.5, &features, &config)
        .unwrap()
        .is_none());
}

#[test]
fn test_three_beats_take_sequential_fallback() {
    let result = run(3, &features_from(3, |b| b), &CanonConfig::default());
    assert_eq!(result.pairs, vec![1, 2, 0]);
    assert!(result.notes.message.is_some());
    assert!(result.is_sequential_fallback());
    assert_eq!(result.transitions.len(), 3);
    assert!((result.coverage.ratio - 1.0).abs() < 1e-6);
}

#[test]
fn test_periodic_twelve_beats_align_on_bar() {
    let config = CanonConfig {
        context_window: 1,
        ..CanonConfig::default()
    };
    let n = 12;
    let features = features_from(n, |b| b % 4);

    let stacked = stack_beat_features(&beats(n), 6.0, &features, 4, 1);
    let phases: Vec<usize> = stacked.contexts.iter().map(|c| c.phase).collect();
    let ssm = SimilarityMatrix::from_features(&stacked.stacked);
    let offsets = evaluate_offsets(&ssm, &phases, &config);
    let four = offsets
        .iter()
        .find(|s| s.offset == 4)
        .expect("offset 4 should be admissible");
    assert!((four.phase_alignment - 1.0).abs() < 1e-6);
    assert!((four.mean - 1.0).abs() < 1e-4);

    let result = run(n, &features, &config);
    assert_eq!(result.offset, 4);
    assert!(result.notes.message.is_none());
    let on_four: usize = result
        .segments
        .iter()
        .filter(|s| s.offset == 4)
        .map(|s| s.length)
        .sum();
    assert!(on_four * 2 > n, "offset 4 should cover most of the track");
    assert!(result
        .segments
        .iter()
        .any(|s| s.label == SegmentLabel::Primary && s.offset == 4));
}

#[test]
fn test_zero_variance_features_fully_covered() {
    let result = run(16, &constant_features(16), &CanonConfig::default());
    assert!((result.coverage.ratio - 1.0).abs() < 1e-6);
    assert_eq!(result.pairs.len(), 16);
}

#[test]
fn test_structural_invariants_on_sectioned_track() {
    // A A B A with 8-beat phrases inside each 16-beat section
    let n = 64;
    let pattern = |b: usize| {
        let section = if (b / 16) % 4 == 2 { 10 } else { 0 };
        section + b % 8
    };
    let features = features_from(n, pattern);
    let result = run(n, &features, &CanonConfig::default());

    assert_eq!(result.pairs.len(), n);
    assert_eq!(result.pair_similarity.len(), n);
    assert!(result.pairs.iter().all(|&p| p < n));
    assert!((result.coverage.ratio - 1.0).abs() < 1e-6);
    assert_eq!(result.coverage.uncovered, 0);

    // Segments partition [0, n)
    let mut cursor = 0;
    for segment in &result.segments {
        assert_eq!(segment.start, cursor);
        assert_eq!(segment.length, segment.end - segment.start);
        cursor = segment.end;
    }
    assert_eq!(cursor, n);

    // Pairs agree with segment offsets
    for segment in &result.segments {
        for idx in segment.start..segment.end {
            assert_eq!(result.pairs[idx], (idx + segment.offset) % n);
        }
    }

    for edge in &result.loop_candidates {
        assert_ne!(edge.source, edge.target);
        assert!(edge.source.abs_diff(edge.target) > 1);
        assert_eq!(edge.source % 4, edge.target % 4);
    }
    assert_eq!(result.start_index % 4, 0);
    assert!(result.transitions.len() <= n * 6);
}

#[test]
fn test_output_is_deterministic() {
    let n = 48;
    let features = features_from(n, |b| (b % 8) + (b / 24) * 3);
    let config = CanonConfig::default();
    let first = serde_json::to_string(&run(n, &features, &config)).unwrap();
    let second = serde_json::to_string(&run(n, &features, &config)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_invalid_config_and_features_are_errors() {
    let features = constant_features(8);
    let config = CanonConfig {
        beats_per_bar: 0,
        ..CanonConfig::default()
    };
    assert!(matches!(
        compute_canon_alignment(&beats(8), 4.0, &features, &config),
        Err(AnalysisError::InvalidConfig(_))
    ));

    let mut empty = constant_features(8);
    empty.rms = ndarray::Array1::zeros(0);
    assert!(matches!(
        compute_canon_alignment(&beats(8), 4.0, &empty, &CanonConfig::default()),
        Err(AnalysisError::InvalidInput(_))
    ));
}

#[test]
fn test_beats_beyond_feature_frames_are_clamped() {
    // Features cover only half the beats
    let features = features_from(8, |b| b % 4);
    let result = run(16, &features, &CanonConfig::default());
    assert_eq!(result.pairs.len(), 16);
}

#[test]
fn test_alignment_from_audio_uses_feature_source() {
    let n = 16;
    let features = features_from(n, |b| b % 4);
    let source = PrecomputedFeatures(features.clone());
    let samples = vec![0.0f32; n * FRAMES_PER_BEAT * HOP];

    let from_audio = compute_canon_alignment_from_audio(
        &samples,
        SAMPLE_RATE,
        HOP,
        &beats(n),
        8.0,
        &source,
        &CanonConfig::default(),
    )
    .unwrap();
    let direct = compute_canon_alignment(&beats(n), 8.0, &features, &CanonConfig::default()).unwrap();
    assert_eq!(from_audio, direct);

    let err = compute_canon_alignment_from_audio(
        &samples,
        SAMPLE_RATE,
        512,
        &beats(n),
        8.0,
        &source,
        &CanonConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalysisError::FeatureExtraction(_)));
}

#[test]
fn test_batch_preserves_input_order() {
    let track = |n: usize| TrackInput {
        beats: beats(n),
        duration: n as f32 * 0.5,
        features: features_from(n, |b| b % 4),
    };
    let tracks = vec![track(1), track(3), track(32), track(0)];
    let results = analyze_batch(&tracks, &CanonConfig::default());

    assert_eq!(results.len(), 4);
    assert!(results[0].as_ref().unwrap().is_none());
    let fallback = results[1].as_ref().unwrap().as_ref().unwrap();
    assert!(fallback.is_sequential_fallback());
    let normal = results[2].as_ref().unwrap().as_ref().unwrap();
    assert_eq!(normal.n_beats(), 32);
    assert!(!normal.is_sequential_fallback());
    assert!(results[3].as_ref().unwrap().is_none());
}

#[test]
fn test_track_file_round_trip_through_alignment() {
    let json = serde_json::json!({
        "track_id": "loop",
        "duration": 8.0,
        "beats": beats(16),
        "features": {
            "sample_rate": SAMPLE_RATE,
            "hop_length": HOP,
            "chroma": (0..12).map(|r| (0..400).map(|f| ((f / 25 % 4) as f32 + r as f32).cos()).collect::<Vec<f32>>()).collect::<Vec<_>>(),
            "mfcc": (0..4).map(|r| (0..400).map(|f| ((f / 25 % 4) as f32 * r as f32).sin()).collect::<Vec<f32>>()).collect::<Vec<_>>(),
            "mfcc_delta": vec![vec![0.0f32; 400]; 4],
            "onset_strength": (0..400).map(|f| (f % 25) as f32 / 25.0).collect::<Vec<f32>>(),
            "rms": vec![0.4f32; 400],
        }
    });
    let track: TrackFile = serde_json::from_value(json).unwrap();
    let features = track.features.into_features().unwrap();
    let result = compute_canon_alignment(&track.beats, track.duration, &features, &CanonConfig::default())
        .unwrap()
        .unwrap();
    assert_eq!(result.pairs.len(), 16);

    let encoded = serde_json::to_value(&result).unwrap();
    assert!(encoded["notes"].get("message").is_none());
    assert!(encoded["segments"][0]["label"].is_string());
}
