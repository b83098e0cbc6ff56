//! Hash records and the per-source metadata attached to them.

use crate::core::hasher::Fingerprint;
use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Ad platforms whose creative catalogs can be fingerprinted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdPlatform {
    Meta,
    Google,
}

impl fmt::Display for AdPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdPlatform::Meta => write!(f, "Meta"),
            AdPlatform::Google => write!(f, "Google"),
        }
    }
}

/// Where a record's image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Local filesystem mirror
    Local,
    /// Cloud file store
    Cloud,
    /// An ad-platform catalog
    Platform(AdPlatform),
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Local => write!(f, "local"),
            SourceTag::Cloud => write!(f, "cloud"),
            SourceTag::Platform(AdPlatform::Meta) => write!(f, "meta"),
            SourceTag::Platform(AdPlatform::Google) => write!(f, "google"),
        }
    }
}

impl FromStr for SourceTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(SourceTag::Local),
            "cloud" => Ok(SourceTag::Cloud),
            "meta" => Ok(SourceTag::Platform(AdPlatform::Meta)),
            "google" => Ok(SourceTag::Platform(AdPlatform::Google)),
            other => Err(format!("unknown source '{}'", other)),
        }
    }
}

/// How a platform supplied a creative's image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOrigin {
    /// Inline (base64) asset data
    Embedded,
    /// Downloaded from a URL
    Url,
}

/// Metadata carried with a record, one closed shape per source type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceMetadata {
    LocalFile {
        file_name: String,
        file_path: PathBuf,
        file_size: u64,
    },
    CloudFile {
        file_name: String,
        file_id: String,
        file_size: u64,
        #[serde(default)]
        web_link: Option<String>,
    },
    PlatformCreative {
        platform: AdPlatform,
        creative_name: String,
        #[serde(default)]
        thumbnail_url: Option<String>,
        #[serde(default)]
        asset_name: Option<String>,
        #[serde(default)]
        image_origin: Option<ImageOrigin>,
    },
}

impl SourceMetadata {
    /// The source this metadata shape belongs to
    pub fn source_tag(&self) -> SourceTag {
        match self {
            SourceMetadata::LocalFile { .. } => SourceTag::Local,
            SourceMetadata::CloudFile { .. } => SourceTag::Cloud,
            SourceMetadata::PlatformCreative { platform, .. } => SourceTag::Platform(*platform),
        }
    }

    /// Human-facing name: file name or creative name
    pub fn display_name(&self) -> &str {
        match self {
            SourceMetadata::LocalFile { file_name, .. } => file_name,
            SourceMetadata::CloudFile { file_name, .. } => file_name,
            SourceMetadata::PlatformCreative { creative_name, .. } => creative_name,
        }
    }

    /// Where to find the asset: path, web link or thumbnail URL
    pub fn location(&self) -> Option<String> {
        match self {
            SourceMetadata::LocalFile { file_path, .. } => Some(file_path.display().to_string()),
            SourceMetadata::CloudFile { web_link, .. } => web_link.clone(),
            SourceMetadata::PlatformCreative { thumbnail_url, .. } => thumbnail_url.clone(),
        }
    }

    /// Size in bytes when the source reports one
    pub fn file_size(&self) -> Option<u64> {
        match self {
            SourceMetadata::LocalFile { file_size, .. } => Some(*file_size),
            SourceMetadata::CloudFile { file_size, .. } => Some(*file_size),
            SourceMetadata::PlatformCreative { .. } => None,
        }
    }

    fn validate(&self, identifier: &str) -> Result<(), StoreError> {
        let invalid = |reason: &str| StoreError::InvalidMetadata {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        };

        match self {
            SourceMetadata::LocalFile { file_name, .. } if file_name.trim().is_empty() => {
                Err(invalid("local file name is empty"))
            }
            SourceMetadata::CloudFile { file_id, .. } if file_id.trim().is_empty() => {
                Err(invalid("cloud file id is empty"))
            }
            SourceMetadata::PlatformCreative {
                thumbnail_url: Some(url),
                ..
            } if !is_absolute_url(url) => Err(invalid("thumbnail URL needs a scheme and host")),
            _ => Ok(()),
        }
    }
}

/// True when `url` looks like `scheme://host[/...]`
fn is_absolute_url(url: &str) -> bool {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c))
                && !host.is_empty()
        }
        None => false,
    }
}

/// One fingerprinted image. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    identifier: String,
    fingerprint: Fingerprint,
    metadata: SourceMetadata,
}

impl HashRecord {
    /// Build a record, validating the identifier and metadata
    pub fn new(
        identifier: impl Into<String>,
        fingerprint: Fingerprint,
        metadata: SourceMetadata,
    ) -> Result<Self, StoreError> {
        let identifier = identifier.into();
        if identifier.trim().is_empty() {
            return Err(StoreError::InvalidMetadata {
                identifier,
                reason: "identifier is empty".to_string(),
            });
        }
        metadata.validate(&identifier)?;

        Ok(Self {
            identifier,
            fingerprint,
            metadata,
        })
    }

    /// Source-unique identifier (file name, file id or creative id)
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The perceptual fingerprint
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// The source this record came from
    pub fn source(&self) -> SourceTag {
        self.metadata.source_tag()
    }

    /// Source-specific metadata
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Re-run construction checks on a record that bypassed `new`
    pub(crate) fn revalidate(self) -> Result<Self, StoreError> {
        Self::new(self.identifier, self.fingerprint, self.metadata)
    }
}
