use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("reconciliation error: {0}")]
    Reconcile(#[from] reckon_reconcile::ReconcileError),

    #[error("store error: {0}")]
    Store(#[from] reckon_store::StoreError),

    #[error("LMDB error: {0}")]
    Lmdb(#[from] reckon_store_lmdb::LmdbError),

    #[error("config error: {0}")]
    Config(String),

    #[error("source snapshot error: {0}")]
    Snapshot(String),

    #[error("reconcile queue of worker {worker} is full")]
    QueueFull { worker: usize },

    #[error("scheduler is shut down")]
    SchedulerStopped,

    #[error("background task failed: {0}")]
    TaskFailed(String),

    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            NodeError::Reconcile(e) => e.is_transient(),
            NodeError::QueueFull { .. } => true,
            _ => false,
        }
    }
}
