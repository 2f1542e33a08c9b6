//! Generation job type grammar.
//!
//! A job type string has the shape `[sdxl_]<format>_<quality>`, e.g.
//! `image_fast`, `video_high`, `sdxl_image_high`. Parsing yields the output
//! format, the quality tier, and the model variant that will serve the job.
//! The raw string is what clients send and what ends up in the queue payload.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Prefix selecting the SDXL image model instead of the default WAN model.
const SDXL_PREFIX: &str = "sdxl_";

/// Output media kind of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobFormat {
    Image,
    Video,
}

impl JobFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl fmt::Display for JobFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(CoreError::Validation(format!(
                "Unknown format '{other}'. Valid: image, video"
            ))),
        }
    }
}

/// Quality tier of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobQuality {
    Fast,
    High,
}

impl JobQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::High => "high",
        }
    }
}

impl fmt::Display for JobQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobQuality {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fast" => Ok(Self::Fast),
            "high" => Ok(Self::High),
            other => Err(CoreError::Validation(format!(
                "Unknown quality '{other}'. Valid: fast, high"
            ))),
        }
    }
}

/// Model family that serves a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelVariant {
    #[serde(rename = "lustify_sdxl")]
    LustifySdxl,
    #[serde(rename = "wan_2_1_1b")]
    Wan21,
}

impl ModelVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LustifySdxl => "lustify_sdxl",
            Self::Wan21 => "wan_2_1_1b",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed job type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobType {
    pub format: JobFormat,
    pub quality: JobQuality,
    pub model_variant: ModelVariant,
}

impl JobType {
    /// Parse a job type string.
    ///
    /// Rules:
    /// - Optional `sdxl_` prefix, only valid for the `image` format.
    /// - Then exactly `<format>_<quality>`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("jobType is required".into()));
        }

        let (rest, sdxl) = match trimmed.strip_prefix(SDXL_PREFIX) {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };

        let mut parts = rest.split('_');
        let (Some(format), Some(quality), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(CoreError::Validation(format!(
                "Invalid jobType '{trimmed}'. Expected [sdxl_]<format>_<quality>"
            )));
        };

        let format: JobFormat = format.parse()?;
        let quality: JobQuality = quality.parse()?;

        if sdxl && format != JobFormat::Image {
            return Err(CoreError::Validation(format!(
                "Invalid jobType '{trimmed}'. The sdxl model only produces images"
            )));
        }

        let model_variant = if sdxl {
            ModelVariant::LustifySdxl
        } else {
            ModelVariant::Wan21
        };

        Ok(Self {
            format,
            quality,
            model_variant,
        })
    }

    /// Canonical string form (round-trips through [`JobType::parse`]).
    pub fn canonical(&self) -> String {
        let prefix = match self.model_variant {
            ModelVariant::LustifySdxl => SDXL_PREFIX,
            ModelVariant::Wan21 => "",
        };
        format!("{prefix}{}_{}", self.format, self.quality)
    }
}

impl FromStr for JobType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn image_fast_parses_to_wan_image() {
        let jt = JobType::parse("image_fast").unwrap();
        assert_eq!(jt.format, JobFormat::Image);
        assert_eq!(jt.quality, JobQuality::Fast);
        assert_eq!(jt.model_variant, ModelVariant::Wan21);
    }

    #[test]
    fn video_high_parses() {
        let jt = JobType::parse("video_high").unwrap();
        assert_eq!(jt.format.as_str(), "video");
        assert_eq!(jt.quality.as_str(), "high");
    }

    #[test]
    fn sdxl_prefix_selects_sdxl_variant() {
        let jt = JobType::parse("sdxl_image_high").unwrap();
        assert_eq!(jt.model_variant, ModelVariant::LustifySdxl);
        assert_eq!(jt.model_variant.as_str(), "lustify_sdxl");
        assert_eq!(jt.canonical(), "sdxl_image_high");
    }

    #[test]
    fn sdxl_video_is_rejected() {
        assert_matches!(JobType::parse("sdxl_video_fast"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn empty_job_type_is_rejected() {
        assert_matches!(JobType::parse("   "), Err(CoreError::Validation(msg)) if msg.contains("required"));
    }

    #[test]
    fn unknown_segments_are_rejected() {
        assert_matches!(JobType::parse("audio_fast"), Err(CoreError::Validation(_)));
        assert_matches!(JobType::parse("image_medium"), Err(CoreError::Validation(_)));
        assert_matches!(JobType::parse("image"), Err(CoreError::Validation(_)));
        assert_matches!(JobType::parse("image_fast_extra"), Err(CoreError::Validation(_)));
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let jt: JobType = " image_high ".parse().unwrap();
        assert_eq!(jt.canonical(), "image_high");
    }
}
