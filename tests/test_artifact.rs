mod common;
use common::{scenario_session, single_channel};
use ephys::{generate, AnalysisConfig, ArtifactParams, Error, Interval, Session, SynthConfig};

/// Isolated triangular bumps of the given heights, 100 samples apart.
fn bumps(heights: &[f64]) -> Vec<f64> {
    let mut x = vec![0.0; 100 * (heights.len() + 1)];
    for (k, &h) in heights.iter().enumerate() {
        let c = 100 * (k + 1);
        for d in 0..10usize {
            let v = h * (1.0 - d as f64 / 10.0);
            x[c - d] = v;
            x[c + d] = v;
        }
    }
    x
}

#[test]
fn scenario_yields_single_interval() {
    let mut s = scenario_session();
    let set = s.detect_artifacts(&ArtifactParams::new(300.0, [0])).unwrap();
    assert_eq!(set.intervals(0), &[Interval { channel: 0, start: 200, end: 210 }]);
    assert_eq!(set.channels().collect::<Vec<_>>(), vec![0]);
    assert!(!set.covers(1));
}

#[test]
fn detection_is_idempotent() {
    let rec = generate(&SynthConfig { n_samples: 3000, ..Default::default() }).unwrap();
    let mut s = Session::new(rec, AnalysisConfig::default()).unwrap();
    let params = ArtifactParams::new(2.0, 0..3);
    let first = s.detect_artifacts(&params).unwrap().clone();
    let second = s.detect_artifacts(&params).unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn redetection_replaces_previous_set() {
    let mut s = scenario_session();
    s.detect_artifacts(&ArtifactParams::new(50.0, [0, 1])).unwrap();
    let set = s.detect_artifacts(&ArtifactParams::new(300.0, [0])).unwrap();
    assert_eq!(set.count(0), 1);
    assert!(!set.covers(1));
    assert_eq!(set.threshold(), 300.0);
}

#[test]
fn raising_threshold_never_adds_intervals_on_isolated_bumps() {
    let x = bumps(&[1.0, 3.0, 2.0, 5.0, 4.0]);
    let mut s = Session::new(single_channel(&x, 1000.0), AnalysisConfig::default()).unwrap();
    let mut prev = usize::MAX;
    for thr in [0.0, 0.5, 1.5, 2.5, 3.5, 4.5, 6.0] {
        let n = s.detect_artifacts(&ArtifactParams::new(thr, [0])).unwrap().count(0);
        assert!(n <= prev, "threshold {thr}: {n} intervals > {prev}");
        prev = n;
    }
    assert_eq!(prev, 0);
}

#[test]
fn raising_threshold_never_grows_coverage() {
    let rec = generate(&SynthConfig { n_samples: 5000, ..Default::default() }).unwrap();
    let mut s = Session::new(rec, AnalysisConfig::default()).unwrap();
    for ch in 0..3 {
        let mut prev = usize::MAX;
        for k in 0..12 {
            let thr = 0.5 * k as f64;
            let covered = s
                .detect_artifacts(&ArtifactParams::new(thr, [ch]))
                .unwrap()
                .total_samples(ch);
            assert!(covered <= prev, "ch {ch} threshold {thr}: {covered} > {prev}");
            prev = covered;
        }
    }
}

#[test]
fn runs_within_merge_gap_are_joined() {
    let mut x = vec![0.0; 200];
    for i in (50..55).chain(60..65).chain(90..95) {
        x[i] = 9.0;
    }
    let mut s = Session::new(single_channel(&x, 1000.0), AnalysisConfig::default()).unwrap();
    let set = s.detect_artifacts(&ArtifactParams::new(1.0, [0])).unwrap();
    // gap 5 < 10 merges; gap 25 does not
    let spans: Vec<_> = set.intervals(0).iter().map(|iv| (iv.start, iv.end)).collect();
    assert_eq!(spans, vec![(50, 65), (90, 95)]);
}

#[test]
fn run_touching_last_sample_ends_at_sample_count() {
    let mut x = vec![0.0; 100];
    x[97..].fill(7.0);
    let mut s = Session::new(single_channel(&x, 1000.0), AnalysisConfig::default()).unwrap();
    let set = s.detect_artifacts(&ArtifactParams::new(1.0, [0])).unwrap();
    assert_eq!(set.intervals(0)[0].end, 100);
}

#[test]
fn invalid_parameters_rejected() {
    let mut s = scenario_session();
    for params in [
        ArtifactParams::new(-0.1, [0]),
        ArtifactParams::new(f64::NAN, [0]),
        ArtifactParams::new(1.0, [2]),
        ArtifactParams::new(1.0, []),
    ] {
        let err = s.detect_artifacts(&params).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)), "{params:?}: {err}");
    }
    assert!(s.artifacts().is_none());
}
