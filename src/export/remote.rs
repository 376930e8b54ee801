use std::{future::Future, sync::Arc, time::Duration};

use log::{error, info, warn};
use serde::Serialize;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::{error::PersistError, models::AttendanceSnapshot};

pub const DEFAULT_COLLECTION: &str = "attendance";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentId {
    pub collection: String,
    pub key: String,
}

/// Upsert-by-key document storage.
///
/// Writing the same key twice must replace the stored document, not add a second one.
pub trait DocumentStore: Send + Sync + 'static {
    fn upsert(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> impl Future<Output = Result<DocumentId, PersistError>> + Send;
}

pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<String>;
}

/// Fixed identity, typically read from settings.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth(pub Option<String>);

impl AuthProvider for StaticAuth {
    fn current_user(&self) -> Option<String> {
        self.0.clone()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StoredAttendance<'a> {
    #[serde(flatten)]
    snapshot: &'a AttendanceSnapshot,
    saved_by: &'a str,
}

pub struct RemotePersister<S: DocumentStore> {
    store: Arc<S>,
    auth: Arc<dyn AuthProvider>,
    collection: String,
}

impl<S: DocumentStore> Clone for RemotePersister<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            auth: Arc::clone(&self.auth),
            collection: self.collection.clone(),
        }
    }
}

impl<S: DocumentStore> RemotePersister<S> {
    pub fn new(store: Arc<S>, auth: Arc<dyn AuthProvider>, collection: impl Into<String>) -> Self {
        Self {
            store,
            auth,
            collection: collection.into(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn persist_remote(
        &self,
        snapshot: &AttendanceSnapshot,
    ) -> Result<DocumentId, PersistError> {
        let user = self
            .auth
            .current_user()
            .ok_or(PersistError::Unauthenticated)?;

        let document = serde_json::to_value(StoredAttendance {
            snapshot,
            saved_by: &user,
        })
        .map_err(|err| PersistError::Rejected(format!("unserializable snapshot: {err}")))?;

        self.store
            .upsert(&self.collection, snapshot.key(), document)
            .await
    }

    /// Retries `Unreachable` failures; everything else is returned on first sight.
    pub async fn persist_with_retry(
        &self,
        snapshot: &AttendanceSnapshot,
        policy: RetryPolicy,
    ) -> Result<DocumentId, PersistError> {
        let attempts = policy.attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.persist_remote(snapshot).await {
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(
                        "persist attempt {attempt}/{attempts} for {} failed: {err}; retrying",
                        snapshot.key()
                    );
                    tokio::time::sleep(policy.backoff * attempt).await;
                    attempt += 1;
                }
                outcome => return outcome,
            }
        }
    }

    /// Runs the save on its own task so the prediction loop never waits on I/O.
    /// The outcome is logged here and also handed back through the join handle.
    pub fn spawn_persist(
        &self,
        snapshot: AttendanceSnapshot,
        policy: RetryPolicy,
    ) -> JoinHandle<Result<DocumentId, PersistError>> {
        let persister = self.clone();
        tokio::spawn(async move {
            let outcome = persister.persist_with_retry(&snapshot, policy).await;
            match &outcome {
                Ok(id) => info!("attendance saved to {}/{}", id.collection, id.key),
                Err(err) => error!("failed to save attendance {}: {err}", snapshot.key()),
            }
            outcome
        })
    }
}
