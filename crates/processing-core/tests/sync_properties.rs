use proptest::prelude::*;

use rhythmcam_beat_model::{BeatEvent, TimeOffset, ZoomParameters};
use rhythmcam_processing_core::offset_apply::apply_offset_detailed;
use rhythmcam_processing_core::offset_estimate::estimate_offset_detailed;
use rhythmcam_processing_core::zoom_profile::ZoomProfile;

const HOP: usize = 512;
const SR: u32 = 22050;

/// Random envelope with enough spread that no two windows are collinear.
fn envelope_strategy() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(0.0f32..1.0, 120..400).prop_filter("non-trivial", |v| {
        let max = v.iter().cloned().fold(f32::MIN, f32::max);
        let min = v.iter().cloned().fold(f32::MAX, f32::min);
        max - min > 0.5
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn identical_envelopes_have_zero_offset(env in envelope_strategy()) {
        let estimate = estimate_offset_detailed(&env, &env, HOP, SR, 1.0);
        prop_assert!(estimate.diagnostic.is_none());
        prop_assert_eq!(estimate.offset.secs(), 0.0);
    }

    #[test]
    fn known_shift_is_recovered_within_one_hop(
        reference in envelope_strategy(),
        shift in -30i64..=30,
        gain in 0.1f32..10.0,
    ) {
        // target[i] = gain * reference[i - shift]
        let target: Vec<f32> = if shift >= 0 {
            std::iter::repeat(0.0)
                .take(shift as usize)
                .chain(reference.iter().map(|v| v * gain))
                .collect()
        } else {
            reference[(-shift) as usize..].iter().map(|v| v * gain).collect()
        };

        let estimate = estimate_offset_detailed(&reference, &target, HOP, SR, 1.0);
        let expected = shift as f64 * HOP as f64 / SR as f64;
        let hop_secs = HOP as f64 / SR as f64;
        prop_assert!((estimate.offset.secs() - expected).abs() < hop_secs);
    }

    #[test]
    fn estimate_stays_inside_search_bound(
        reference in envelope_strategy(),
        target in envelope_strategy(),
        max_offset in 0.1f64..3.0,
    ) {
        let estimate = estimate_offset_detailed(&reference, &target, HOP, SR, max_offset);
        prop_assert!(estimate.offset.secs().abs() <= max_offset + 1e-9);
    }

    #[test]
    fn periodic_pulse_delay_is_recovered(
        period in 8usize..40,
        phase_seed in 0usize..40,
        delay in 0usize..60,
        len in 300usize..600,
    ) {
        let phase = phase_seed % period;
        let reference: Vec<f32> = (0..len)
            .map(|i| if i % period == phase { 1.0 } else { 0.0 })
            .collect();
        let mut target = vec![0.0; delay];
        target.extend_from_slice(&reference);

        let estimate = estimate_offset_detailed(&reference, &target, HOP, SR, 2.0);
        prop_assert!(estimate.diagnostic.is_none());
        prop_assert_eq!(estimate.best_lag_frames, delay as i64);
    }

    #[test]
    fn oversized_search_bound_is_capped(
        env in envelope_strategy(),
        max_offset in prop_oneof![1e6f64..1e300, Just(f64::MAX)],
    ) {
        let estimate = estimate_offset_detailed(&env, &env, HOP, SR, max_offset);
        let longest = env.len() as f64 * HOP as f64 / SR as f64;
        prop_assert!(estimate.offset.secs().abs() <= longest);
        prop_assert_eq!(estimate.offset.secs(), 0.0);
    }

    #[test]
    fn applicator_keeps_at_least_a_fifth(
        len in 0usize..5000,
        offset in -10.0f64..10.0,
    ) {
        let out = apply_offset_detailed(vec![0.5; len], 1000, TimeOffset(offset));
        let min_kept = len - (len as f64 * 0.8) as usize;
        prop_assert!(out.samples.len() >= min_kept);
        if out.applied_samples > 0 {
            prop_assert_eq!(out.samples.len(), len + out.applied_samples as usize);
            prop_assert!(out.samples[..out.applied_samples as usize].iter().all(|&s| s == 0.0));
        }
        if !out.clamped {
            prop_assert_eq!(out.applied_samples, out.requested_samples);
        }
    }

    #[test]
    fn zoom_stays_between_bounds(
        times in prop::collection::vec(0.0f64..20.0, 0..40),
        strengths in prop::collection::vec(0.0f64..=1.0, 40),
        zoom_min in 1.0f64..1.5,
        span in 0.0f64..1.0,
        window in 0.01f64..1.0,
        t in -1.0f64..21.0,
    ) {
        let beats: Vec<BeatEvent> = times
            .iter()
            .zip(&strengths)
            .map(|(&time, &strength)| BeatEvent::at(time, strength, 30))
            .collect();
        let params = ZoomParameters::new(zoom_min, zoom_min + span, window).unwrap();
        let profile = ZoomProfile::new(&beats, params);
        let z = profile.zoom_factor_at(t);
        prop_assert!(z >= zoom_min);
        prop_assert!(z <= zoom_min + span + 1e-12);
    }
}

#[test]
fn strong_beat_reaches_max_and_returns_to_min() {
    let params = ZoomParameters::new(1.0, 1.3, 0.2).unwrap();
    let profile = ZoomProfile::new(&[BeatEvent::at(5.0, 0.95, 30)], params);

    assert!((profile.zoom_factor_at(5.0) - 1.3).abs() < 1e-12);
    assert_eq!(profile.zoom_factor_at(5.2), 1.0);
    assert_eq!(profile.zoom_factor_at(4.8), 1.0);
}

#[test]
fn weak_beat_ceiling_is_below_max() {
    let params = ZoomParameters::new(1.0, 1.3, 0.2).unwrap();
    let profile = ZoomProfile::new(&[BeatEvent::at(5.0, 0.3, 30)], params);
    let peak = profile.zoom_factor_at(5.0);
    assert!((peak - (1.0 + 0.6 * 0.3)).abs() < 1e-9);
    assert!(peak < 1.3);
}
