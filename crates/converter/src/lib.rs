pub mod area;
pub mod codec;
pub mod config;
pub mod error;
pub mod gallery;
pub mod job;
pub mod profile;
pub mod scan;
pub mod sidecar;

pub use area::OutputArea;
pub use codec::{Codec, CodecSource, CwebpCodec};
pub use config::{AppConfig, CompressionType, ConverterSettings, RawConfig};
pub use error::{CodecError, ConvertError, DeleteError, FailureKind, SidecarError};
pub use gallery::{Gallery, GalleryEntry};
pub use job::{BatchRunner, BatchSummary, ConversionInput, ConversionResult, InputSource};
pub use profile::{resolve, EncodeProfile};
pub use sidecar::{JsonSidecarStore, MetadataSidecar, SidecarStore};
