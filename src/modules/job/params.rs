use tracing::debug;

use super::model::{JobSettings, Quality, SettingValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatFamily {
    /// jpeg-like, inverse 1-31 scale (lower is better).
    RasterLossy,
    /// webp-like, direct 0-100 scale.
    Perceptual,
    /// png-like, compression effort 0-9.
    LosslessCompression,
    /// Other raster formats, inverse scale.
    Generic,
}

impl FormatFamily {
    pub fn of(format: &str) -> Option<Self> {
        match format.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(FormatFamily::RasterLossy),
            "webp" => Some(FormatFamily::Perceptual),
            "png" => Some(FormatFamily::LosslessCompression),
            "gif" | "bmp" | "tiff" => Some(FormatFamily::Generic),
            _ => None,
        }
    }

    pub fn flag(self) -> &'static str {
        match self {
            FormatFamily::RasterLossy | FormatFamily::Generic => "-q:v",
            FormatFamily::Perceptual => "-quality",
            FormatFamily::LosslessCompression => "-compression_level",
        }
    }

    /// Table order is low, medium, high.
    fn table(self) -> [&'static str; 3] {
        match self {
            FormatFamily::RasterLossy => ["25", "15", "3"],
            FormatFamily::Perceptual => ["30", "60", "95"],
            FormatFamily::LosslessCompression => ["0", "6", "9"],
            FormatFamily::Generic => ["25", "15", "5"],
        }
    }

    pub fn value(self, quality: Quality) -> &'static str {
        let [low, medium, high] = self.table();
        match quality {
            Quality::Low => low,
            Quality::Medium => medium,
            Quality::High => high,
        }
    }
}

fn dimension(value: &Option<SettingValue>) -> Option<String> {
    value
        .as_ref()
        .and_then(SettingValue::as_text)
        .filter(|s| !s.is_empty())
}

/// `-vf scale=W:H` when resize is literally `"true"` and both dimensions are
/// non-empty.
pub fn resize_args(settings: Option<&JobSettings>) -> Vec<String> {
    let Some(settings) = settings else {
        return Vec::new();
    };

    let enabled = settings.resize.as_ref().is_some_and(SettingValue::is_literal_true);
    if !enabled {
        debug!("Resize not requested");
        return Vec::new();
    }

    match (dimension(&settings.width), dimension(&settings.height)) {
        (Some(width), Some(height)) => {
            debug!(%width, %height, "Resizing output");
            vec!["-vf".to_string(), format!("scale={}:{}", width, height)]
        }
        (width, height) => {
            debug!(?width, ?height, "Resize requested without both dimensions, skipping");
            Vec::new()
        }
    }
}

pub fn quality_args(output_format: &str, quality: Quality) -> Vec<String> {
    match FormatFamily::of(output_format) {
        Some(family) => {
            let value = family.value(quality);
            debug!(format = output_format, ?quality, flag = family.flag(), value, "Quality resolved");
            vec![family.flag().to_string(), value.to_string()]
        }
        None => {
            debug!(format = output_format, "No quality settings for format");
            Vec::new()
        }
    }
}

/// Resize flags first, then quality flags. Never fails: unknown formats get
/// no quality flag and incomplete resize settings are skipped.
pub fn resolve(output_format: &str, quality: Quality, settings: Option<&JobSettings>) -> Vec<String> {
    let mut args = resize_args(settings);
    args.extend(quality_args(output_format, quality));
    args
}
