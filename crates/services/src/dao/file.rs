use bson::{doc, oid::ObjectId, DateTime};
use mongodb::{options::ReturnDocument, Database};
use tracing::debug;
use voxroom_db::models::{FileStatus, StoredFile};

use super::base::{BaseDao, DaoError, DaoResult};

const UPLOAD_TOKEN_LEN: usize = 32;

pub struct FileDao {
    pub base: BaseDao<StoredFile>,
}

impl FileDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, StoredFile::COLLECTION),
        }
    }

    /// Reserves a file id behind a single-use upload token.
    pub async fn create_upload(&self, owner_id: ObjectId, ttl_secs: u64) -> DaoResult<StoredFile> {
        let now = DateTime::now();
        let mut file = StoredFile {
            id: None,
            owner_id,
            upload_token: nanoid::nanoid!(UPLOAD_TOKEN_LEN),
            status: FileStatus::Pending,
            sha256: None,
            content_type: None,
            size: 0,
            upload_expires_at: DateTime::from_millis(
                now.timestamp_millis() + (ttl_secs as i64) * 1000,
            ),
            created_at: now,
            updated_at: now,
        };
        file.id = Some(self.base.insert_one(&file).await?);
        Ok(file)
    }

    /// Checks that `token` may still be used without consuming it.
    pub async fn pending_upload(&self, token: &str) -> DaoResult<StoredFile> {
        let file = self
            .base
            .find_one(doc! { "upload_token": token })
            .await?
            .ok_or(DaoError::Missing("Upload URL"))?;
        if file.status != FileStatus::Pending {
            return Err(DaoError::Conflict("Upload URL was already used".to_string()));
        }
        if DateTime::now() >= file.upload_expires_at {
            return Err(DaoError::Forbidden("Upload URL has expired".to_string()));
        }
        Ok(file)
    }

    /// Consumes the token and marks the file ready. Exactly one caller wins
    /// a given token.
    pub async fn complete_upload(
        &self,
        token: &str,
        sha256: String,
        content_type: Option<String>,
        size: u64,
    ) -> DaoResult<StoredFile> {
        let now = DateTime::now();
        let updated = self
            .base
            .collection()
            .find_one_and_update(
                doc! {
                    "upload_token": token,
                    "status": "pending",
                    "upload_expires_at": { "$gt": now },
                },
                doc! {
                    "$set": {
                        "status": "ready",
                        "sha256": &sha256,
                        "content_type": content_type,
                        "size": size as i64,
                        "updated_at": now,
                    }
                },
            )
            .return_document(ReturnDocument::After)
            .await?;

        match updated {
            Some(file) => {
                debug!(file_id = ?file.id, %sha256, size, "Upload completed");
                Ok(file)
            }
            // Report why the token was rejected
            None => {
                self.pending_upload(token).await?;
                Err(DaoError::Conflict("Upload URL was already used".to_string()))
            }
        }
    }

    pub async fn find_ready(&self, id: ObjectId) -> DaoResult<StoredFile> {
        self.base
            .find_one(doc! { "_id": id, "status": "ready" })
            .await?
            .ok_or(DaoError::Missing("File"))
    }
}
