use std::io;
use std::path::{Path, PathBuf};
use log::{error, info, warn};
use serde::Serialize;
use crate::area::{base_name, OutputArea, OUTPUT_EXTENSION};
use crate::codec::{Codec, CodecSource};
use crate::error::{ConvertError, FailureKind};
use crate::profile::EncodeProfile;
use crate::sidecar::{MetadataSidecar, SidecarStore};

/// Where an input's bytes come from
#[derive(Debug, Clone)]
pub enum InputSource {
    Path(PathBuf),
    Buffer {
        name: String,
        bytes: Vec<u8>,
        /// Size reported by the submitter; falls back to `bytes.len()`
        declared_size: Option<u64>,
    },
}

/// One item submitted for conversion
#[derive(Debug, Clone)]
pub struct ConversionInput {
    pub source: InputSource,
}

impl ConversionInput {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ConversionInput { source: InputSource::Path(path.into()) }
    }

    pub fn from_buffer(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        ConversionInput {
            source: InputSource::Buffer { name: name.into(), bytes, declared_size: None },
        }
    }

    /// Record the size the submitter reports for a buffer input.
    /// No effect on path inputs, whose size is always read from disk.
    pub fn with_declared_size(mut self, size: u64) -> Self {
        if let InputSource::Buffer { declared_size, .. } = &mut self.source {
            *declared_size = Some(size);
        }
        self
    }

    /// File name for paths, the given name for buffers
    pub fn source_name(&self) -> String {
        match &self.source {
            InputSource::Path(p) => p
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            InputSource::Buffer { name, .. } => name.clone(),
        }
    }

    async fn original_size(&self) -> Result<u64, ConvertError> {
        match &self.source {
            InputSource::Path(path) => {
                let metadata = tokio::fs::metadata(path)
                    .await
                    .map_err(|source| ConvertError::Unreadable { path: path.clone(), source })?;
                if !metadata.is_file() {
                    return Err(ConvertError::Unreadable {
                        path: path.clone(),
                        source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                    });
                }
                Ok(metadata.len())
            }
            InputSource::Buffer { bytes, declared_size, .. } => {
                Ok(declared_size.unwrap_or(bytes.len() as u64))
            }
        }
    }

    fn codec_source(&self) -> CodecSource<'_> {
        match &self.source {
            InputSource::Path(p) => CodecSource::Path(p),
            InputSource::Buffer { name, bytes, .. } => CodecSource::Bytes { name, data: bytes },
        }
    }
}

/// Outcome of converting one input. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub success: bool,
    pub source_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Unknown only when the input couldn't be read at all
    pub original_size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_kind: Option<FailureKind>,
}

impl ConversionResult {
    fn converted(source_name: String, output_name: String, output_path: PathBuf, original_size: u64) -> Self {
        ConversionResult {
            success: true,
            source_name,
            output_name: Some(output_name),
            output_path: Some(output_path),
            original_size_bytes: Some(original_size),
            error_description: None,
            failure_kind: None,
        }
    }

    fn failed(source_name: String, original_size: Option<u64>, err: &ConvertError) -> Self {
        ConversionResult {
            success: false,
            source_name,
            output_name: None,
            output_path: None,
            original_size_bytes: original_size,
            error_description: Some(err.to_string()),
            failure_kind: Some(err.kind()),
        }
    }
}

/// Success/failure counts for a finished batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[ConversionResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        BatchSummary { succeeded, failed: results.len() - succeeded }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Converts batches of inputs into the output area, one item at a time
pub struct BatchRunner<C, S> {
    codec: C,
    store: S,
    area: OutputArea,
}

impl<C: Codec, S: SidecarStore> BatchRunner<C, S> {
    pub fn new(codec: C, store: S, area: OutputArea) -> Self {
        BatchRunner { codec, store, area }
    }

    pub fn area(&self) -> &OutputArea {
        &self.area
    }

    /// Convert every input in order. Always returns one result per input,
    /// in input order; a failing item never stops the rest of the batch.
    ///
    /// Inputs sharing a stem map to the same output, so the later one wins.
    pub async fn run_batch(&self, inputs: Vec<ConversionInput>, profile: &EncodeProfile) -> Vec<ConversionResult> {
        info!("Converting {} input(s) with {:?}", inputs.len(), profile);

        if let Err(e) = self.area.ensure() {
            error!(
                "Failed to create output area {}: {}",
                self.area.output_dir().display(),
                e
            );
        }

        let mut results = Vec::with_capacity(inputs.len());
        for input in &inputs {
            results.push(self.convert_one(input, profile).await);
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            "Batch complete: {} converted, {} failed",
            summary.succeeded, summary.failed
        );
        results
    }

    async fn convert_one(&self, input: &ConversionInput, profile: &EncodeProfile) -> ConversionResult {
        let source_name = input.source_name();

        let Some(base) = base_name(&source_name) else {
            warn!("Invalid input name: {:?}", source_name);
            return ConversionResult::failed(source_name, None, &ConvertError::InvalidPath);
        };

        let original_size = match input.original_size().await {
            Ok(size) => size,
            Err(e) => {
                warn!("Cannot read {}: {}", source_name, e);
                return ConversionResult::failed(source_name, None, &e);
            }
        };

        let encoded = match self.codec.encode(input.codec_source(), profile).await {
            Ok(bytes) => bytes,
            Err(e) => {
                let err = ConvertError::from(e);
                warn!("Error converting {}: {}", source_name, err);
                return ConversionResult::failed(source_name, Some(original_size), &err);
            }
        };

        let output_path = self.area.output_path(&base);
        if let Err(source) = tokio::fs::write(&output_path, &encoded).await {
            let err = ConvertError::OutputWrite { path: output_path, source };
            warn!("Error converting {}: {}", source_name, err);
            return ConversionResult::failed(source_name, Some(original_size), &err);
        }

        let sidecar = MetadataSidecar::now(source_name.clone(), original_size);
        if let Err(e) = self.store.write(&base, &sidecar) {
            warn!("Converted {} but its sidecar was not saved: {}", source_name, e);
        }

        info!(
            "Converted {} ({} bytes) -> {} ({} bytes)",
            source_name,
            original_size,
            output_path.display(),
            encoded.len()
        );
        let output_name = output_file_name(&output_path, &base);
        ConversionResult::converted(source_name, output_name, output_path, original_size)
    }
}

fn output_file_name(output_path: &Path, base: &str) -> String {
    output_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| format!("{}.{}", base, OUTPUT_EXTENSION))
}
