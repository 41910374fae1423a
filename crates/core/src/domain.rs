use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type ImageId = i64;
pub type BasketId = i64;
pub type FolderId = i64;
pub type UserId = i64;
pub type TagId = i64;

/// Name given to a user's auto-created default basket. The default designation
/// itself lives in the `is_default` column, so a user may also create an ordinary
/// basket with this name without it being mistaken for the default.
pub const DEFAULT_BASKET_NAME: &str = "My Basket";

/// A directory on disk that groups images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    pub id: FolderId,
    pub path: PathBuf,
}

/// A photograph file on disk, as recorded by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: ImageId,
    pub folder_id: FolderId,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub file_creation_date: DateTime<Utc>,
    pub file_last_mod_date: DateTime<Utc>,
    /// Date used for ordering search results.
    pub sort_date: DateTime<Utc>,
    /// Dirty marker. Bumped whenever a cached representation of the image goes stale.
    pub last_updated: DateTime<Utc>,
    pub classification_id: Option<i64>,
    pub classification_score: f64,
}

impl Image {
    pub fn full_path(&self, folder_path: &Path) -> PathBuf {
        full_path(folder_path, &self.file_name)
    }

    pub fn thumb_url(&self, size: ThumbSize) -> String {
        thumb_url(self.id, size, self.last_updated)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.file_name, self.id)
    }
}

/// Fields supplied when registering a new image with the catalog.
#[derive(Debug, Clone)]
pub struct NewImage {
    pub folder_id: FolderId,
    pub file_name: String,
    pub file_size_bytes: u64,
    pub file_creation_date: DateTime<Utc>,
    pub file_last_mod_date: DateTime<Utc>,
    pub sort_date: DateTime<Utc>,
}

impl NewImage {
    /// A new image whose file timestamps and sort date are all `at`.
    pub fn new(folder_id: FolderId, file_name: impl Into<String>, size: u64, at: DateTime<Utc>) -> Self {
        Self {
            folder_id,
            file_name: file_name.into(),
            file_size_bytes: size,
            file_creation_date: at,
            file_last_mod_date: at,
            sort_date: at,
        }
    }
}

/// Descriptive metadata owned 1:1 by an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetaData {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub date_taken: Option<DateTime<Utc>>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub caption: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub keyword: String,
}

/// A machine-learning label that an image may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub id: i64,
    pub label: String,
}

/// A named, optionally user-scoped selection set of images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Basket {
    pub id: BasketId,
    pub name: String,
    /// `None` for a basket not scoped to any single user.
    pub user_id: Option<UserId>,
    pub is_default: bool,
    pub date_added: DateTime<Utc>,
}

/// A single membership fact: one image in one basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasketEntry {
    pub basket_id: BasketId,
    pub image_id: ImageId,
    pub date_added: DateTime<Utc>,
}

/// Requested membership change for a set of images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BasketState {
    Add,
    Remove,
    Toggle,
}

impl BasketState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BasketState::Add => "add",
            BasketState::Remove => "remove",
            BasketState::Toggle => "toggle",
        }
    }
}

impl fmt::Display for BasketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BasketState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "add" => Ok(BasketState::Add),
            "remove" => Ok(BasketState::Remove),
            "toggle" => Ok(BasketState::Toggle),
            other => Err(Error::Validation(format!("unknown basket state: {other}"))),
        }
    }
}

/// Thumbnail size classes used when building thumbnail URLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThumbSize {
    ExtraLarge,
    Large,
    Big,
    Medium,
    Small,
}

impl fmt::Display for ThumbSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThumbSize::ExtraLarge => "ExtraLarge",
            ThumbSize::Large => "Large",
            ThumbSize::Big => "Big",
            ThumbSize::Medium => "Medium",
            ThumbSize::Small => "Small",
        };
        f.write_str(s)
    }
}

/// Payload for creating a basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketCreateRequest {
    pub name: String,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// Payload for changing the membership of several images in one basket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketStateRequest {
    pub basket_id: BasketId,
    pub desired_state: BasketState,
    pub image_ids: Vec<ImageId>,
}

/// Per-image result of a bulk membership change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipOutcome {
    pub added: Vec<ImageId>,
    pub removed: Vec<ImageId>,
    /// Ids whose membership already matched the requested state.
    pub unchanged: Vec<ImageId>,
    /// Ids that do not resolve to an image. Nothing was applied for these.
    pub missing: Vec<ImageId>,
}

impl MembershipOutcome {
    /// Ids whose membership actually changed, in application order.
    pub fn changed(&self) -> Vec<ImageId> {
        let mut ids = Vec::with_capacity(self.added.len() + self.removed.len());
        ids.extend_from_slice(&self.added);
        ids.extend_from_slice(&self.removed);
        ids
    }

    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Full on-disk path of an image, given its folder's path and its file name.
pub fn full_path(folder_path: &Path, file_name: &str) -> PathBuf {
    folder_path.join(file_name)
}

pub fn raw_image_url(id: ImageId) -> String {
    format!("/rawimage/{id}")
}

pub fn download_image_url(id: ImageId) -> String {
    format!("/dlimage/{id}")
}

/// Thumbnail URL carrying the image's dirty marker, so a changed image is
/// always fetched under a new URL.
pub fn thumb_url(id: ImageId, size: ThumbSize, last_updated: DateTime<Utc>) -> String {
    format!(
        "/thumb/{size}/{id}?nocache={}",
        last_updated.format("%Y%m%d%H%M%S")
    )
}
