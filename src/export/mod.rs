pub mod local;
pub mod remote;
pub mod snapshot;

pub use local::{log_artifact, snapshot_artifact, write_artifact, FileArtifact};
pub use remote::{
    AuthProvider, DocumentId, DocumentStore, RemotePersister, RetryPolicy, StaticAuth,
    DEFAULT_COLLECTION,
};
pub use snapshot::build_snapshot;
