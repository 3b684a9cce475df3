use serde::Serialize;
use crate::config::RawConfig;

/// Quality used when the raw config carries no usable value
pub const DEFAULT_QUALITY: u8 = 90;
/// Effort used when the raw config carries no usable value
pub const DEFAULT_EFFORT: u8 = 4;
/// Highest effort level understood by the codec
pub const MAX_EFFORT: u8 = 6;

/// Fully resolved WebP encoding parameters, shared by every item of a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EncodeProfile {
    /// 0-100. Ignored by the codec for lossless encodes but always valid.
    pub quality: u8,
    pub lossless: bool,
    /// Speed/size trade-off, 0 (fastest) to 6 (smallest)
    pub effort: u8,
    /// Quality for the alpha plane, only meaningful for images with transparency
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_quality: Option<u8>,
    /// Sharper RGB to YUV conversion for lossy encodes
    pub smart_subsampling: bool,
}

impl Default for EncodeProfile {
    fn default() -> Self {
        resolve(&RawConfig::default())
    }
}

/// Resolve a loosely specified configuration into an encode profile.
///
/// Never fails: every missing, mistyped or out-of-range field falls back to
/// its default. When `alphaQuality` is enabled the alpha plane gets the
/// resolved quality, unless a valid `alphaQualityLevel` is supplied.
pub fn resolve(raw: &RawConfig) -> EncodeProfile {
    let quality = bounded_int(raw.quality, 100).unwrap_or(DEFAULT_QUALITY);
    let effort = bounded_int(raw.effort, MAX_EFFORT).unwrap_or(DEFAULT_EFFORT);
    let lossless = raw.compression_type.as_deref() == Some("lossless");

    let alpha_quality = if raw.alpha_quality.unwrap_or(false) {
        Some(bounded_int(raw.alpha_quality_level, 100).unwrap_or(quality))
    } else {
        None
    };

    EncodeProfile {
        quality,
        lossless,
        effort,
        alpha_quality,
        smart_subsampling: raw.smart_subsampling != Some(false),
    }
}

/// Round a finite number into `0..=max`, rejecting anything outside it
fn bounded_int(value: Option<f64>, max: u8) -> Option<u8> {
    let value = value?;
    if !value.is_finite() {
        return None;
    }
    let rounded = value.round();
    if rounded < 0.0 || rounded > f64::from(max) {
        return None;
    }
    Some(rounded as u8)
}
