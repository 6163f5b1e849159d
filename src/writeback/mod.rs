//! Asynchronous persistence of freshly fetched thumbnails.

mod batch;
mod queue;

pub use batch::WriteBatch;
pub use queue::{
    QueueSettings, QueueState, QueueStats, ShutdownPolicy, WriteBehindQueue, DEFAULT_CAPACITY,
    DEFAULT_ENQUEUE_TIMEOUT,
};
