//! Single-connection SQLite access.
//!
//! The connection is opened and migrated on the caller's thread, then moved
//! onto a dedicated worker thread that runs queued jobs one at a time. When the
//! last `Database` handle goes away the job queue closes and the worker exits.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};

use anyhow::Context;
use log::{error, info, warn};
use rusqlite::Connection;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::error::PersistError;

use super::migrations::run_migrations;

type Job = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

#[derive(Debug, Error)]
pub enum DbError {
    /// The worker thread has exited (it panicked, or the handle is shutting down).
    #[error("database worker is not running")]
    WorkerGone,
    #[error(transparent)]
    Query(#[from] anyhow::Error),
}

impl From<DbError> for PersistError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::WorkerGone => PersistError::Unreachable(DbError::WorkerGone.to_string()),
            DbError::Query(err) => PersistError::Rejected(format!("{err:#}")),
        }
    }
}

struct Worker {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Worker {
    fn drop(&mut self) {
        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!("attendance-db worker ended with a panic");
            }
        }
    }
}

/// Cheap to clone; every clone queues onto the same connection.
#[derive(Clone)]
pub struct Database {
    // declared before `worker` so the queue closes before the join in `Worker::drop`
    jobs: mpsc::UnboundedSender<Job>,
    worker: Arc<Worker>,
    path: Arc<PathBuf>,
}

impl Database {
    pub fn new(path: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let mut conn = Connection::open(&path)
            .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("WAL journal mode unavailable: {err}");
        }
        run_migrations(&mut conn).context("failed to run database migrations")?;

        let (jobs, queue) = mpsc::unbounded_channel::<Job>();
        let handle = thread::Builder::new()
            .name("attendance-db".into())
            .spawn(move || drain_jobs(conn, queue))
            .context("failed to spawn database worker thread")?;

        info!("attendance database ready at {}", path.display());
        Ok(Self {
            jobs,
            worker: Arc::new(Worker {
                handle: Mutex::new(Some(handle)),
            }),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `task` against the connection on the worker thread.
    pub async fn execute<F, T>(&self, task: F) -> Result<T, DbError>
    where
        F: FnOnce(&mut Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let (reply, answer) = oneshot::channel();
        let job: Job = Box::new(move |conn| {
            // a closed reply means the caller stopped waiting; nothing to do
            let _ = reply.send(task(conn));
        });

        self.jobs.send(job).map_err(|_| DbError::WorkerGone)?;
        let outcome = answer.await.map_err(|_| DbError::WorkerGone)?;
        Ok(outcome?)
    }
}

fn drain_jobs(mut conn: Connection, mut queue: mpsc::UnboundedReceiver<Job>) {
    while let Some(job) = queue.blocking_recv() {
        job(&mut conn);
    }
    if let Err((_, err)) = conn.close() {
        error!("failed to close attendance database: {err}");
    }
    info!("attendance-db worker stopped");
}
