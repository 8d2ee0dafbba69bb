use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// Metadata for an uploaded blob. The bytes live under their SHA-256 digest,
/// so identical uploads share storage while keeping distinct ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub owner_id: ObjectId,
    pub upload_token: String,
    pub status: FileStatus,
    pub sha256: Option<String>,
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: u64,
    pub upload_expires_at: DateTime,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Pending,
    Ready,
}

impl StoredFile {
    pub const COLLECTION: &'static str = "files";
}
