use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, Regex};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::DocumentStore;

/// One row per gateway key in a single `documents` collection. The payload
/// stays JSON text so the document shape is identical across backends.
#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(rename = "_id")]
    key: String,
    data: String,
}

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self) -> Collection<StoredDocument> {
        self.db.collection("documents")
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let found = self
            .collection()
            .find_one(doc! { "_id": key })
            .await
            .context("Failed to query document")?;
        Ok(found.map(|stored| stored.data))
    }

    async fn put(&self, key: &str, value: String) -> Result<()> {
        let stored = StoredDocument {
            key: key.to_string(),
            data: value,
        };
        self.collection()
            .replace_one(doc! { "_id": key }, &stored)
            .upsert(true)
            .await
            .context("Failed to upsert document")?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let result = self
            .collection()
            .delete_one(doc! { "_id": key })
            .await
            .context("Failed to delete document")?;
        Ok(result.deleted_count > 0)
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let filter = doc! {
            "_id": Regex {
                pattern: format!("^{}", regex::escape(prefix)),
                options: String::new(),
            }
        };

        let mut cursor = self
            .collection()
            .find(filter)
            .sort(doc! { "_id": 1 })
            .await
            .context("Failed to list documents")?;

        let mut values = Vec::new();
        while let Some(stored) = cursor.try_next().await.context("Document cursor error")? {
            values.push(stored.data);
        }
        Ok(values)
    }

    async fn ping(&self) -> Result<()> {
        self.db
            .run_command(doc! { "ping": 1 })
            .await
            .context("MongoDB ping failed")?;
        Ok(())
    }
}
