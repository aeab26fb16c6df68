//! Asset uploads: property images, location images, per-area images, and
//! documents.
//!
//! Each pending asset is processed and uploaded as its own multipart
//! request; assets that already carry a server URL are treated as
//! persisted and skipped. One failed asset never aborts its siblings —
//! the caller gets back whatever subset made it, merged with the
//! persisted entries in input order, and reconciles the gap.

use futures::future::join_all;

use payloads::{
    MAX_DOCUMENT_SIZE, MAX_IMAGE_SIZE, UploadedFile, ValuationId,
    responses::{DocumentsUploadResponse, ImagesUploadResponse},
};

use crate::ApiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetCategory {
    PropertyImages,
    LocationImages,
    AreaImages,
    Documents,
}

impl AssetCategory {
    pub fn folder_segment(&self) -> &'static str {
        match self {
            Self::PropertyImages => "property-images",
            Self::LocationImages => "location-images",
            Self::AreaImages => "area-images",
            Self::Documents => "documents",
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            Self::Documents => "documents/upload",
            _ => "images/upload",
        }
    }

    fn field_name(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            _ => "images",
        }
    }

    fn max_size(&self) -> usize {
        match self {
            Self::Documents => MAX_DOCUMENT_SIZE,
            _ => MAX_IMAGE_SIZE,
        }
    }
}

/// A file picked in the form but not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAsset {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// One slot in an asset list: either bytes waiting to be uploaded or the
/// metadata of a previously persisted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Pending(PendingAsset),
    Persisted(UploadedFile),
}

impl Asset {
    pub fn pending(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Pending(PendingAsset {
            name: name.into(),
            bytes,
        })
    }

    pub fn persisted(url: impl Into<String>) -> Self {
        Self::Persisted(UploadedFile {
            url: url.into(),
            name: None,
        })
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ProcessError(pub String);

/// Pre-upload transform applied to each pending asset independently.
/// The production pipeline runs image payloads through a compressor
/// behind this seam; a failure here drops only the one asset.
pub trait FileProcessor: Send + Sync {
    fn process(&self, asset: &PendingAsset) -> Result<Vec<u8>, ProcessError>;
}

/// Hands bytes through untouched.
pub struct Passthrough;

impl FileProcessor for Passthrough {
    fn process(&self, asset: &PendingAsset) -> Result<Vec<u8>, ProcessError> {
        Ok(asset.bytes.clone())
    }
}

/// Logical upload bucket for an asset: derived from the owning record's
/// id and the category, plus the area name for area images.
pub fn folder_path(
    id: &ValuationId,
    category: AssetCategory,
    area: Option<&str>,
) -> String {
    match (category, area) {
        (AssetCategory::AreaImages, Some(area)) => {
            format!("valuations/{id}/area-images/{}", slug(area))
        }
        _ => format!("valuations/{id}/{}", category.folder_segment()),
    }
}

fn slug(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Upload every pending asset in `assets` concurrently, skipping entries
/// that already carry a server URL. Returns persisted entries merged with
/// the successfully uploaded subset, in input order; failed assets are
/// logged and dropped.
pub async fn upload_assets(
    client: &ApiClient,
    id: &ValuationId,
    category: AssetCategory,
    area: Option<&str>,
    assets: &[Asset],
    processor: &dyn FileProcessor,
) -> Vec<UploadedFile> {
    let folder = folder_path(id, category, area);
    let uploads = assets.iter().map(|asset| {
        let folder = folder.clone();
        async move {
            match asset {
                Asset::Persisted(file) => Some(file.clone()),
                Asset::Pending(pending) => {
                    upload_one(client, category, &folder, pending, processor)
                        .await
                }
            }
        }
    });
    join_all(uploads).await.into_iter().flatten().collect()
}

async fn upload_one(
    client: &ApiClient,
    category: AssetCategory,
    folder: &str,
    pending: &PendingAsset,
    processor: &dyn FileProcessor,
) -> Option<UploadedFile> {
    if pending.bytes.len() > category.max_size() {
        tracing::warn!(
            name = %pending.name,
            size = pending.bytes.len(),
            "asset exceeds the size limit, dropping"
        );
        return None;
    }

    let bytes = match processor.process(pending) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                name = %pending.name,
                error = %err,
                "asset processing failed, dropping"
            );
            return None;
        }
    };

    let uploaded = match category {
        AssetCategory::Documents => client
            .post_multipart::<DocumentsUploadResponse>(
                category.endpoint(),
                category.field_name(),
                pending.name.clone(),
                bytes,
                folder.to_string(),
            )
            .await
            .map(|response| response.documents),
        _ => client
            .post_multipart::<ImagesUploadResponse>(
                category.endpoint(),
                category.field_name(),
                pending.name.clone(),
                bytes,
                folder.to_string(),
            )
            .await
            .map(|response| response.images),
    };

    match uploaded {
        Ok(mut files) if !files.is_empty() => Some(files.remove(0)),
        Ok(_) => {
            tracing::warn!(
                name = %pending.name,
                "upload response carried no file metadata, dropping"
            );
            None
        }
        Err(err) => {
            tracing::warn!(
                name = %pending.name,
                error = %err,
                "asset upload failed, dropping"
            );
            None
        }
    }
}
