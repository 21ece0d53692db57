//! The alignment pipeline.
//!
//! ```text
//! INIT → EXTRACT → ESTIMATE → APPLY → RECONCILE → MUX → DONE
//!   └────────┴─────────┴────────┴─────────┴───────┴──→ FAILED
//! ```
//!
//! Estimation problems degrade the offset to `0.0` and are recorded as
//! diagnostics; every other error moves the run to `FAILED`. Intermediates
//! live in a scratch area removed on every exit path, and the muxed file is
//! moved into place only after the mux succeeds.

use std::path::{Path, PathBuf};

use rhythmcam_beat_model::{AlignmentResult, PipelineState, Waveform};
use rhythmcam_common::error::{RhythmError, RhythmResult};
use rhythmcam_media_io::MuxRequest;
use rhythmcam_processing_core::{apply_offset_detailed, OffsetEstimator};

use crate::scratch::{persist, ScratchArea};
use crate::RhythmEngine;

/// Suffix of aligned output files.
pub const ALIGNED_SUFFIX: &str = "_aligned.mp4";

/// One alignment run. Holds the visited-state trace for inspection.
pub struct SyncPipeline<'e> {
    engine: &'e RhythmEngine,
    estimator: OffsetEstimator,
    output_path: Option<PathBuf>,
    state: PipelineState,
    trace: Vec<PipelineState>,
    diagnostics: Vec<String>,
}

impl<'e> SyncPipeline<'e> {
    pub fn new(engine: &'e RhythmEngine) -> Self {
        Self {
            engine,
            estimator: OffsetEstimator::new(),
            output_path: None,
            state: PipelineState::Init,
            trace: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Write the result here instead of `<output_dir>/<stem>_aligned.mp4`.
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// States visited so far, in order.
    pub fn trace(&self) -> &[PipelineState] {
        &self.trace
    }

    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Align `reference` audio to `dance` and mux it onto the dance video.
    pub fn run(&mut self, dance: &Path, reference: &Path, max_offset_secs: f64) -> AlignmentResult {
        self.trace.clear();
        self.diagnostics.clear();
        self.enter(PipelineState::Init);
        tracing::info!(
            dance = %dance.display(),
            reference = %reference.display(),
            max_offset_secs,
            "Starting alignment"
        );

        if !(max_offset_secs > 0.0) || !max_offset_secs.is_finite() {
            return self.fail(
                RhythmError::config(format!("max offset must be positive, got {max_offset_secs}")),
                0.0,
            );
        }

        let engine = self.engine;
        let scratch_base = engine.config().scratch_base.as_deref();
        let scratch = match ScratchArea::create(scratch_base, "rhythmcam-align-") {
            Ok(scratch) => scratch,
            Err(err) => return self.fail(err, 0.0),
        };

        let mut offset = 0.0;
        let outcome = self.run_stages(&scratch, dance, reference, max_offset_secs, &mut offset);
        scratch.close();

        match outcome {
            Ok(path) => {
                self.enter(PipelineState::Done);
                tracing::info!(
                    offset_secs = offset,
                    output = %path.display(),
                    diagnostics = self.diagnostics.len(),
                    "Alignment finished"
                );
                AlignmentResult::succeeded(offset, path, self.diagnostics.clone())
            }
            Err(err) => self.fail(err, offset),
        }
    }

    fn run_stages(
        &mut self,
        scratch: &ScratchArea,
        dance: &Path,
        reference: &Path,
        max_offset_secs: f64,
        offset: &mut f64,
    ) -> RhythmResult<PathBuf> {
        let engine = self.engine;
        let parts = engine.collaborators();
        let sample_rate = engine.config().sample_rate;

        self.enter(PipelineState::Extract);
        let dance_info = parts.video.probe(dance)?;
        if !dance_info.has_video {
            return Err(RhythmError::decode(format!(
                "{} has no video stream",
                dance.display()
            )));
        }
        let dance_audio = parts.audio.decode(dance, sample_rate)?;
        let reference_audio = parts.audio.decode(reference, sample_rate)?;

        self.enter(PipelineState::Estimate);
        tracing::debug!(
            extractor = parts.extractor.name(),
            hop = parts.extractor.hop_size(),
            "analyzing dance and reference audio"
        );
        let dance_features = parts
            .extractor
            .analyze(&dance_audio.samples, dance_audio.sample_rate)?;
        let reference_features = parts
            .extractor
            .analyze(&reference_audio.samples, reference_audio.sample_rate)?;
        let estimate = self.estimator.estimate_detailed(
            &reference_features.envelope,
            &dance_features.envelope,
            max_offset_secs,
        );
        if let Some(diagnostic) = &estimate.diagnostic {
            self.diagnostics.push(diagnostic.to_string());
        }
        *offset = estimate.offset.secs();
        tracing::info!(
            offset_secs = *offset,
            lag_frames = estimate.best_lag_frames,
            score = estimate.peak_score,
            "Offset estimated"
        );

        self.enter(PipelineState::Apply);
        let reference_rate = reference_audio.sample_rate;
        let applied =
            apply_offset_detailed(reference_audio.samples, reference_rate, estimate.offset);
        if let Some(warning) = applied.warning() {
            self.diagnostics.push(warning.to_string());
        }

        self.enter(PipelineState::Reconcile);
        let (audio, max_duration_secs) = reconcile_durations(
            Waveform::new(applied.samples, reference_rate),
            dance_info.duration_secs,
        );

        self.enter(PipelineState::Mux);
        let final_path = self
            .output_path
            .clone()
            .unwrap_or_else(|| engine.output_path_for(dance, ALIGNED_SUFFIX));
        let staged = scratch.join(
            &final_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "aligned.mp4".to_string()),
        );
        parts.muxer.combine(&MuxRequest {
            video_source: dance,
            audio: &audio,
            output_path: &staged,
            max_duration_secs,
            scratch_dir: scratch.path(),
        })?;
        persist(&staged, &final_path)?;

        Ok(final_path)
    }

    fn enter(&mut self, state: PipelineState) {
        tracing::debug!(stage = %state, "pipeline stage");
        self.state = state;
        self.trace.push(state);
    }

    fn fail(&mut self, err: RhythmError, offset: f64) -> AlignmentResult {
        let stage = self.state;
        tracing::error!(stage = %stage, error = %err, "Alignment failed");
        self.state = PipelineState::Failed;
        self.trace.push(PipelineState::Failed);
        AlignmentResult::failed(stage, err.to_string(), offset, self.diagnostics.clone())
    }
}

/// Make the audio and video durations match.
///
/// Audio longer than the video is truncated; a video longer than the audio
/// is capped via the returned duration limit. An unknown video duration
/// (`<= 0`) leaves both untouched.
pub fn reconcile_durations(mut audio: Waveform, video_duration_secs: f64) -> (Waveform, Option<f64>) {
    if !(video_duration_secs > 0.0) || audio.sample_rate == 0 {
        return (audio, None);
    }
    let video_samples = (video_duration_secs * audio.sample_rate as f64).round() as usize;
    if audio.samples.len() >= video_samples {
        audio.samples.truncate(video_samples);
        (audio, Some(video_duration_secs))
    } else {
        let cap = audio.duration_secs();
        tracing::debug!(
            audio_secs = cap,
            video_secs = video_duration_secs,
            "video trimmed to audio length"
        );
        (audio, Some(cap))
    }
}

impl RhythmEngine {
    /// A fresh alignment pipeline bound to this engine.
    pub fn pipeline(&self) -> SyncPipeline<'_> {
        SyncPipeline::new(self)
    }

    /// Align `reference` audio to `dance` and mux. `None` uses the configured max offset.
    pub fn align(
        &self,
        dance: &Path,
        reference: &Path,
        max_offset_secs: Option<f64>,
    ) -> AlignmentResult {
        let max_offset = max_offset_secs.unwrap_or(self.config().max_offset_secs);
        self.pipeline().run(dance, reference, max_offset)
    }
}
