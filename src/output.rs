//! Output types for certificate generation.

use crate::error::Stage;
use crate::pipeline::scratch::CleanupReport;
use serde::Serialize;

/// Result of a successful generation run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutput {
    /// Id naming the published objects.
    pub artifact_id: String,
    /// Key of the published JPEG.
    pub image_key: String,
    /// Key of the published PDF, when PDF publication is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf_key: Option<String>,
    /// Whether a QR picture replaced at least one marker.
    pub qr_embedded: bool,
    /// Number of markers replaced.
    pub qr_placements: usize,
    /// Paragraphs changed by substitution.
    pub paragraphs_changed: usize,
    /// Placeholders still present after substitution.
    pub unresolved_placeholders: Vec<String>,
    /// The template came from an existing local copy.
    pub template_reused: bool,
    pub stats: GenerationStats,
    pub cleanup: CleanupReport,
}

/// Timing and size figures of one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationStats {
    /// Completed stages in execution order.
    pub stages: Vec<StageTiming>,
    pub image_width: u32,
    pub image_height: u32,
    pub image_bytes: usize,
    pub total_duration_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

impl GenerationStats {
    /// Duration of `stage`, if it ran.
    pub fn duration_of(&self, stage: Stage) -> Option<u64> {
        self.stages
            .iter()
            .find(|t| t.stage == stage)
            .map(|t| t.duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_without_pdf_key() {
        let out = GenerationOutput {
            artifact_id: "abc".into(),
            image_key: "certificates/jpg/abc.jpg".into(),
            pdf_key: None,
            qr_embedded: true,
            qr_placements: 1,
            paragraphs_changed: 3,
            unresolved_placeholders: vec![],
            template_reused: false,
            stats: GenerationStats {
                stages: vec![StageTiming {
                    stage: Stage::EmbedQr,
                    duration_ms: 5,
                }],
                ..GenerationStats::default()
            },
            cleanup: CleanupReport::default(),
        };
        let json = serde_json::to_value(&out).unwrap();
        assert!(json.get("pdf_key").is_none());
        assert_eq!(json["stats"]["stages"][0]["stage"], "embed_qr");
        assert_eq!(out.stats.duration_of(Stage::EmbedQr), Some(5));
        assert_eq!(out.stats.duration_of(Stage::Convert), None);
    }
}
