use anyhow::Result;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub mod memory;
pub mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Key-value gateway holding every persisted record as a JSON text document.
/// Implementations must treat keys as opaque strings; the layout lives in
/// [`keys`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: String) -> Result<()>;
    /// Returns true when a document was actually removed.
    async fn delete(&self, key: &str) -> Result<bool>;
    /// All documents whose key starts with `prefix`, in key order.
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;
    /// Backend liveness probe for the health endpoint.
    async fn ping(&self) -> Result<()>;
}

pub async fn load<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

pub async fn save<T: Serialize + ?Sized>(
    store: &dyn DocumentStore,
    key: &str,
    value: &T,
) -> Result<()> {
    store.put(key, serde_json::to_string(value)?).await
}

/// Loads a list-valued document (submission and attempt records are stored
/// as one JSON array per key); a missing key is an empty list.
pub async fn load_list<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Result<Vec<T>> {
    Ok(load::<Vec<T>>(store, key).await?.unwrap_or_default())
}

pub async fn load_prefix<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    prefix: &str,
) -> Result<Vec<T>> {
    store
        .list(prefix)
        .await?
        .iter()
        .map(|raw| serde_json::from_str(raw).map_err(Into::into))
        .collect()
}

/// Canonical key layout for the document gateway. One record per course,
/// user and enrollment; one list per assignment's submissions and per
/// quiz's attempts.
pub mod keys {
    pub const COURSE_PREFIX: &str = "course_";

    pub fn user(user_id: &str) -> String {
        format!("user_{}", user_id)
    }

    pub fn user_email(email: &str) -> String {
        format!("user_email_{}", email.trim().to_lowercase())
    }

    pub fn course(course_id: &str) -> String {
        format!("course_{}", course_id)
    }

    pub fn enrollment(user_id: &str, course_id: &str) -> String {
        format!("enrollment_{}_{}", user_id, course_id)
    }

    pub fn enrollment_prefix(user_id: &str) -> String {
        format!("enrollment_{}_", user_id)
    }

    pub fn lecture_progress(user_id: &str, course_id: &str) -> String {
        format!("lecture_progress_{}_{}", user_id, course_id)
    }

    pub fn assignment_submissions(assignment_id: &str) -> String {
        format!("assignment_submissions_{}", assignment_id)
    }

    pub fn assignment_index(assignment_id: &str) -> String {
        format!("assignment_index_{}", assignment_id)
    }

    pub fn quiz_index(quiz_id: &str) -> String {
        format!("quiz_index_{}", quiz_id)
    }

    pub fn quiz_attempts(quiz_id: &str) -> String {
        format!("quiz_attempts_{}", quiz_id)
    }

    pub fn quiz_stats(quiz_id: &str, student_id: &str) -> String {
        format!("quiz_stats_{}_{}", quiz_id, student_id)
    }

    pub fn quiz_session(quiz_id: &str, student_id: &str) -> String {
        format!("quiz_session_{}_{}", quiz_id, student_id)
    }

    pub fn refund_notice(notice_id: &str) -> String {
        format!("refund_notice_{}", notice_id)
    }
}
