//! Beat-driven zoom rendering.

use std::path::{Path, PathBuf};

use rhythmcam_beat_model::{ZoomParameters, ZoomRenderResult};
use rhythmcam_common::error::{RhythmError, RhythmResult};
use rhythmcam_processing_core::ZoomProfile;
use rhythmcam_render_engine::{compute_compositions, RenderOptions, ZoomComposition};

use crate::scratch::{persist, ScratchArea};
use crate::{EngineConfig, RhythmEngine};

/// Suffix of rendered output files.
pub const RHYTHM_SUFFIX: &str = "_rhythm.mp4";

/// Parameters of one `render_zoom` call.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomRequest {
    pub zoom_min: f64,
    pub zoom_max: f64,
    pub window_half_width: f64,
    pub sensitivity: f64,
}

impl ZoomRequest {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            zoom_min: config.zoom_min,
            zoom_max: config.zoom_max,
            window_half_width: config.window_half_width_secs,
            sensitivity: config.sensitivity,
        }
    }

    pub fn parameters(&self) -> RhythmResult<ZoomParameters> {
        ZoomParameters::new(self.zoom_min, self.zoom_max, self.window_half_width)
            .map_err(|e| RhythmError::config(e.to_string()))
    }
}

impl RhythmEngine {
    /// Render `media` with a zoom pulse on every detected beat.
    pub fn render_zoom(&self, media: &Path, request: &ZoomRequest) -> ZoomRenderResult {
        self.render_zoom_to(media, request, None)
    }

    /// Like [`render_zoom`](Self::render_zoom) with an explicit output path.
    pub fn render_zoom_to(
        &self,
        media: &Path,
        request: &ZoomRequest,
        output: Option<&Path>,
    ) -> ZoomRenderResult {
        match self.try_render_zoom(media, request, output) {
            Ok(path) => ZoomRenderResult::rendered(path),
            Err(err) => {
                tracing::error!(media = %media.display(), error = %err, "Zoom render failed");
                ZoomRenderResult::failed(err.to_string())
            }
        }
    }

    /// Detect beats and build the per-frame zoom plan without rendering.
    pub fn plan_zoom(&self, media: &Path, request: &ZoomRequest) -> RhythmResult<ZoomComposition> {
        let params = request.parameters()?;
        let info = self.collaborators().video.probe(media)?;
        if !info.has_video || info.width == 0 || info.height == 0 {
            return Err(RhythmError::decode(format!(
                "{} has no video stream",
                media.display()
            )));
        }
        let fps = info.fps_or(self.config().fallback_fps);

        let detection = self.detect_beats(media, Some(request.sensitivity), Some(fps));
        let data = match (detection.success, detection.data) {
            (true, Some(data)) => data,
            // Analysis ran but found nothing to zoom on.
            (false, Some(_)) => {
                return Err(RhythmError::no_beats(format!(
                    "{} has no usable beats",
                    media.display()
                )))
            }
            _ => {
                let message = detection
                    .error
                    .unwrap_or_else(|| "beat detection failed".to_string());
                return Err(RhythmError::Other(anyhow::Error::msg(message)));
            }
        };

        let profile = ZoomProfile::new(&data.beats, params);
        let duration_secs = if info.duration_secs > 0.0 {
            info.duration_secs
        } else {
            data.duration
        };
        let frames = compute_compositions(&profile, fps, duration_secs, info.width, info.height);

        Ok(ZoomComposition {
            source: media.to_path_buf(),
            width: info.width,
            height: info.height,
            fps,
            duration_secs,
            frames,
        })
    }

    fn try_render_zoom(
        &self,
        media: &Path,
        request: &ZoomRequest,
        output: Option<&Path>,
    ) -> RhythmResult<PathBuf> {
        let composition = self.plan_zoom(media, request)?;
        let has_audio = self.collaborators().video.probe(media)?.has_audio;

        let final_path = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.output_path_for(media, RHYTHM_SUFFIX));
        let scratch = ScratchArea::create(self.config().scratch_base.as_deref(), "rhythmcam-zoom-")?;
        let staged = scratch.join(
            &final_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "rhythm.mp4".to_string()),
        );

        let renderer = &self.collaborators().renderer;
        tracing::info!(
            backend = renderer.name(),
            frames = composition.total_frames(),
            zoomed = composition.zoomed_frames(),
            "Rendering zoom"
        );
        let options = RenderOptions {
            encoder: self.config().encoder.clone(),
            keep_audio: has_audio,
        };
        renderer.render(&composition, &staged, &options)?;
        persist(&staged, &final_path)?;
        scratch.close();

        tracing::info!(output = %final_path.display(), "Zoom render finished");
        Ok(final_path)
    }
}
