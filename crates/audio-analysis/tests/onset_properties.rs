use proptest::prelude::*;
use rhythmcam_audio_analysis::onset::{frame_count, spectral_flux, OnsetConfig};
use rhythmcam_audio_analysis::{FeatureExtractor, OnsetFeatureExtractor};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn flux_has_one_frame_per_hop(
        samples in prop::collection::vec(-1.0f32..1.0, 1..8000),
    ) {
        let config = OnsetConfig::default();
        let flux = spectral_flux(&samples, &config);
        prop_assert_eq!(flux.len(), frame_count(samples.len(), config.hop_size));
        prop_assert!(flux.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn extracted_beats_lie_inside_envelope(
        samples in prop::collection::vec(-1.0f32..1.0, 0..30000),
    ) {
        let features = OnsetFeatureExtractor::with_defaults()
            .analyze(&samples, 22050)
            .unwrap();
        prop_assert_eq!(features.envelope.len(), frame_count(samples.len(), 512));
        prop_assert!(features.beat_frames.iter().all(|&f| f < features.envelope.len()));
        prop_assert!(features.beat_frames.windows(2).all(|w| w[0] < w[1]));
    }
}
