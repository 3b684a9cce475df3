use std::future::Future;
use std::path::{Path, PathBuf};
use log::{debug, info};
use tokio::process::Command;
use uuid::Uuid;
use crate::error::CodecError;
use crate::profile::EncodeProfile;

/// What a codec is asked to encode
#[derive(Debug, Clone, Copy)]
pub enum CodecSource<'a> {
    /// An image file on disk
    Path(&'a Path),
    /// An in-memory image; `name` is only a hint (e.g. for its extension)
    Bytes { name: &'a str, data: &'a [u8] },
}

/// An image encoder producing WebP bytes
pub trait Codec: Send + Sync {
    fn encode(
        &self,
        source: CodecSource<'_>,
        profile: &EncodeProfile,
    ) -> impl Future<Output = Result<Vec<u8>, CodecError>> + Send;
}

/// cwebp version information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CwebpVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl CwebpVersion {
    /// Parse the output of `cwebp -version`, e.g. "1.3.2" or "1.4.0\nlibsharpyuv: 0.4.0"
    pub fn parse(version_str: &str) -> Result<Self, CodecError> {
        let version_part = version_str
            .split_whitespace()
            .find(|s| s.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false))
            .ok_or_else(|| CodecError::Unavailable(format!("No version number found in: {}", version_str)))?;

        let mut parts = version_part.split('.').map(|p| {
            p.parse::<u32>()
                .map_err(|_| CodecError::Unavailable(format!("Invalid version format: {}", version_part)))
        });

        let major = parts.next().transpose()?.unwrap_or(0);
        let minor = parts.next().transpose()?.unwrap_or(0);
        let patch = parts.next().transpose()?.unwrap_or(0);

        Ok(CwebpVersion { major, minor, patch })
    }

    /// `-sharp_yuv` appeared in libwebp 0.6
    pub fn supports_sharp_yuv(&self) -> bool {
        self.major >= 1 || self.minor >= 6
    }
}

/// Encodes through libwebp's `cwebp` command-line tool
#[derive(Debug, Clone)]
pub struct CwebpCodec {
    bin: PathBuf,
    staging_dir: PathBuf,
    version: CwebpVersion,
}

impl CwebpCodec {
    /// Locate cwebp and check its version
    pub async fn new(bin: impl Into<PathBuf>, staging_dir: impl Into<PathBuf>) -> Result<Self, CodecError> {
        let bin = bin.into();
        let version = Self::detect_version(&bin).await?;
        info!(
            "Using cwebp {}.{}.{} at {}",
            version.major, version.minor, version.patch, bin.display()
        );
        Ok(CwebpCodec { bin, staging_dir: staging_dir.into(), version })
    }

    pub fn version(&self) -> &CwebpVersion {
        &self.version
    }

    async fn detect_version(bin: &Path) -> Result<CwebpVersion, CodecError> {
        let output = Command::new(bin)
            .arg("-version")
            .output()
            .await
            .map_err(|e| CodecError::Unavailable(format!("Failed to execute cwebp at {}: {}", bin.display(), e)))?;

        if !output.status.success() {
            return Err(CodecError::Unavailable("cwebp version check failed".to_string()));
        }

        CwebpVersion::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Build the cwebp argument list for one encode
    pub fn build_args(&self, input: &Path, output: &Path, profile: &EncodeProfile) -> Vec<String> {
        let mut args = vec!["-quiet".to_string()];

        if profile.lossless {
            args.push("-lossless".to_string());
        } else {
            args.push("-q".to_string());
            args.push(profile.quality.to_string());
            if profile.smart_subsampling && self.version.supports_sharp_yuv() {
                args.push("-sharp_yuv".to_string());
            }
        }

        args.push("-m".to_string());
        args.push(profile.effort.to_string());

        if let Some(alpha) = profile.alpha_quality {
            args.push("-alpha_q".to_string());
            args.push(alpha.to_string());
        }

        args.push(path_arg(input));
        args.push("-o".to_string());
        args.push(path_arg(output));

        args
    }

    async fn run(&self, input: &Path, output: &Path, profile: &EncodeProfile) -> Result<Vec<u8>, CodecError> {
        let args = self.build_args(input, output, profile);
        debug!("Running {} {}", self.bin.display(), args.join(" "));

        let result = Command::new(&self.bin)
            .args(&args)
            .output()
            .await
            .map_err(|e| CodecError::Unavailable(format!("Failed to execute cwebp: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            let message = stderr.trim();
            return Err(CodecError::Rejected(if message.is_empty() {
                format!("cwebp exited with {}", result.status)
            } else {
                message.to_string()
            }));
        }

        Ok(tokio::fs::read(output).await?)
    }

    async fn encode_staged(&self, source: CodecSource<'_>, profile: &EncodeProfile) -> Result<Vec<u8>, CodecError> {
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let id = Uuid::new_v4();
        let output = self.staging_dir.join(format!("{}.webp", id));

        let (input, staged) = match source {
            CodecSource::Path(p) => (p.to_path_buf(), false),
            CodecSource::Bytes { name, data } => {
                let ext = Path::new(name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("img");
                let path = self.staging_dir.join(format!("{}-in.{}", id, ext));
                tokio::fs::write(&path, data).await?;
                (path, true)
            }
        };

        let result = self.run(&input, &output, profile).await;

        if staged {
            let _ = tokio::fs::remove_file(&input).await;
        }
        let _ = tokio::fs::remove_file(&output).await;

        result
    }
}

/// Render a path as an argument cwebp won't mistake for an option
fn path_arg(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if path.is_relative() && rendered.starts_with('-') {
        format!("./{}", rendered)
    } else {
        rendered.to_string()
    }
}

impl Codec for CwebpCodec {
    async fn encode(&self, source: CodecSource<'_>, profile: &EncodeProfile) -> Result<Vec<u8>, CodecError> {
        self.encode_staged(source, profile).await
    }
}
