use std::path::{Path, PathBuf};
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Configuration for the converter
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory receiving converted .webp files
    pub output_dir: PathBuf,
    /// Name of the sidecar directory inside `output_dir`
    pub sidecar_dir_name: String,
    /// Path to the cwebp binary
    pub cwebp_bin: PathBuf,
    /// Scratch directory for staging in-memory inputs handed to the codec
    pub staging_dir: PathBuf,
    /// Encoding options applied when nothing overrides them.
    /// Read leniently: mistyped fields are dropped, not rejected.
    #[serde(deserialize_with = "deserialize_lenient")]
    pub encode: RawConfig,
}

fn deserialize_lenient<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<RawConfig, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(RawConfig::from_value(&value))
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::default_config()
    }
}

impl AppConfig {
    /// Create a default configuration with sensible values
    pub fn default_config() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            sidecar_dir_name: ".metadata".to_string(),
            cwebp_bin: PathBuf::from("cwebp"),
            staging_dir: std::env::temp_dir().join("webp-converter"),
            encode: RawConfig::default(),
        }
    }

    /// Load configuration from a file, or return defaults if path is None or file doesn't exist
    pub fn load_config(path: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config();

        if let Some(config_path) = path {
            if config_path.exists() {
                let content = std::fs::read_to_string(config_path)
                    .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

                if config_path.extension().and_then(|s| s.to_str()) == Some("toml") {
                    config = toml::from_str(&content)
                        .with_context(|| format!("Failed to parse TOML config: {}", config_path.display()))?;
                } else {
                    config = serde_json::from_str(&content)
                        .with_context(|| format!("Failed to parse JSON config: {}", config_path.display()))?;
                }
            }
        }

        Ok(config)
    }
}

/// Encoding options as they arrive from a caller: every field optional,
/// nothing validated yet. See [`crate::profile::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    /// `"lossless"` selects lossless encoding, anything else is lossy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compression_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effort: Option<f64>,
    /// Enables an explicit alpha plane quality
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_quality: Option<bool>,
    /// Distinct alpha plane quality; without it the alpha plane reuses `quality`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha_quality_level: Option<f64>,
    #[serde(alias = "smartSubsample", skip_serializing_if = "Option::is_none")]
    pub smart_subsampling: Option<bool>,
}

impl RawConfig {
    /// Leniently pick fields out of an arbitrary JSON value.
    ///
    /// Fields of the wrong type are dropped rather than rejected, so the
    /// result always resolves. Non-object values yield an empty config.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let smart = obj.get("smartSubsampling").or_else(|| obj.get("smartSubsample"));

        Self {
            quality: obj.get("quality").and_then(Value::as_f64),
            compression_type: obj
                .get("compressionType")
                .and_then(Value::as_str)
                .map(str::to_string),
            effort: obj.get("effort").and_then(Value::as_f64),
            alpha_quality: obj.get("alphaQuality").map(is_truthy),
            alpha_quality_level: obj.get("alphaQualityLevel").and_then(Value::as_f64),
            smart_subsampling: smart.and_then(Value::as_bool),
        }
    }
}

/// Loose truthiness for flags coming from untyped callers
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Compression mode selectable from the front end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionType {
    Lossy,
    Lossless,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::Lossy => "lossy",
            CompressionType::Lossless => "lossless",
        }
    }
}

/// Converter settings as edited by a front end.
///
/// Front ends hold one of these and translate user input into setter calls;
/// [`ConverterSettings::to_raw`] produces the config handed to a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConverterSettings {
    quality: u8,
    compression_type: CompressionType,
    effort: u8,
    alpha_quality: bool,
    smart_subsample: bool,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            quality: 100,
            compression_type: CompressionType::Lossless,
            effort: 6,
            alpha_quality: true,
            smart_subsample: true,
        }
    }
}

impl ConverterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    pub fn compression_type(&self) -> CompressionType {
        self.compression_type
    }

    /// Set lossy quality, clamped to 100
    pub fn set_quality(&mut self, quality: u8) {
        self.quality = quality.min(100);
    }

    /// Switch compression mode. Lossless pins quality to 100.
    pub fn set_compression_type(&mut self, compression_type: CompressionType) {
        self.compression_type = compression_type;
        if compression_type == CompressionType::Lossless {
            self.quality = 100;
        }
    }

    pub fn set_effort(&mut self, effort: u8) {
        self.effort = effort.min(crate::profile::MAX_EFFORT);
    }

    pub fn set_alpha_quality(&mut self, enabled: bool) {
        self.alpha_quality = enabled;
    }

    pub fn set_smart_subsample(&mut self, enabled: bool) {
        self.smart_subsample = enabled;
    }

    pub fn to_raw(&self) -> RawConfig {
        RawConfig {
            quality: Some(f64::from(self.quality)),
            compression_type: Some(self.compression_type.as_str().to_string()),
            effort: Some(f64::from(self.effort)),
            alpha_quality: Some(self.alpha_quality),
            alpha_quality_level: None,
            smart_subsampling: Some(self.smart_subsample),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::resolve;
    use serde_json::json;

    #[test]
    fn test_load_config_missing_file_gives_defaults() {
        let config = AppConfig::load_config(Some(Path::new("/nonexistent/webpc.toml"))).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.sidecar_dir_name, ".metadata");
        assert_eq!(config.encode, RawConfig::default());
    }

    #[test]
    fn test_load_config_toml_and_json() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("webpc.toml");
        std::fs::write(
            &toml_path,
            "output_dir = \"converted\"\n[encode]\nquality = 75\ncompressionType = \"lossless\"\n",
        )
        .unwrap();
        let config = AppConfig::load_config(Some(&toml_path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("converted"));
        assert_eq!(config.cwebp_bin, PathBuf::from("cwebp"));
        assert_eq!(config.encode.quality, Some(75.0));
        assert_eq!(config.encode.compression_type.as_deref(), Some("lossless"));

        let json_path = dir.path().join("webpc.json");
        std::fs::write(&json_path, r#"{"encode": {"smartSubsample": false, "effort": 2}}"#).unwrap();
        let config = AppConfig::load_config(Some(&json_path)).unwrap();
        assert_eq!(config.encode.smart_subsampling, Some(false));
        assert_eq!(config.encode.effort, Some(2.0));
    }

    #[test]
    fn test_load_config_tolerates_mistyped_encode_fields() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("loose.json");
        std::fs::write(
            &json_path,
            r#"{"output_dir": "out", "encode": {"quality": "high", "alphaQuality": 1, "effort": 3}}"#,
        )
        .unwrap();
        let config = AppConfig::load_config(Some(&json_path)).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("out"));
        assert_eq!(config.encode.quality, None);
        assert_eq!(config.encode.alpha_quality, Some(true));
        assert_eq!(config.encode.effort, Some(3.0));

        let toml_path = dir.path().join("loose.toml");
        std::fs::write(&toml_path, "[encode]\nquality = \"high\"\nsmartSubsample = false\n").unwrap();
        let config = AppConfig::load_config(Some(&toml_path)).unwrap();
        let profile = resolve(&config.encode);
        assert_eq!(profile.quality, crate::profile::DEFAULT_QUALITY);
        assert!(!profile.smart_subsampling);
    }

    #[test]
    fn test_load_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = AppConfig::load_config(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }

    #[test]
    fn test_from_value_non_object_is_empty() {
        assert_eq!(RawConfig::from_value(&json!(null)), RawConfig::default());
        assert_eq!(RawConfig::from_value(&json!([1, 2, 3])), RawConfig::default());
    }

    #[test]
    fn test_truthiness() {
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(null)));
    }

    #[test]
    fn test_settings_defaults_resolve_to_lossless() {
        let settings = ConverterSettings::new();
        let profile = resolve(&settings.to_raw());
        assert!(profile.lossless);
        assert_eq!(profile.quality, 100);
        assert_eq!(profile.effort, 6);
        assert_eq!(profile.alpha_quality, Some(100));
        assert!(profile.smart_subsampling);
    }

    #[test]
    fn test_switching_to_lossless_pins_quality() {
        let mut settings = ConverterSettings::new();
        settings.set_compression_type(CompressionType::Lossy);
        settings.set_quality(60);
        assert_eq!(settings.quality(), 60);

        settings.set_compression_type(CompressionType::Lossless);
        assert_eq!(settings.quality(), 100);

        settings.set_compression_type(CompressionType::Lossy);
        settings.set_quality(250);
        settings.set_effort(9);
        settings.set_smart_subsample(false);
        settings.set_alpha_quality(false);
        let profile = resolve(&settings.to_raw());
        assert!(!profile.lossless);
        assert_eq!(profile.quality, 100);
        assert_eq!(profile.effort, 6);
        assert!(!profile.smart_subsampling);
        assert_eq!(profile.alpha_quality, None);
    }
}
