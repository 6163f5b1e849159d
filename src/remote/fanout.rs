//! Deadline-bounded concurrent fan-out.
//!
//! Each URL gets its own task in a [`JoinSet`]. Tasks report `(index,
//! outcome)` and a single loop writes the outcome into a pre-sized slot, so
//! results line up with the input without any shared appends. When the
//! deadline fires, the unfinished tasks are aborted and their slots stay
//! [`ImageSlot::Pending`].

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Outcome of one download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    Fetched(Bytes),
    Failed(String),
    /// Still running when the deadline elapsed (or the task panicked).
    Pending,
}

impl ImageSlot {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched(_))
    }
}

/// Position-aligned results of a bounded fan-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBatch {
    pub slots: Vec<ImageSlot>,
    /// Whether the deadline elapsed before every task finished.
    pub timed_out: bool,
}

impl ImageBatch {
    pub fn fetched(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_fetched()).count()
    }

    pub fn into_slots(self) -> Vec<ImageSlot> {
        self.slots
    }
}

/// Run `fetch` for every URL concurrently and collect the results until
/// `deadline`.
///
/// A failing URL never cancels its siblings. The call returns no later than
/// `deadline` after it started.
pub async fn fetch_all_bounded<F, Fut>(urls: &[String], deadline: Duration, fetch: F) -> ImageBatch
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = anyhow::Result<Bytes>> + Send + 'static,
{
    let mut slots = vec![ImageSlot::Pending; urls.len()];
    if urls.is_empty() {
        return ImageBatch {
            slots,
            timed_out: false,
        };
    }

    let mut tasks = JoinSet::new();
    for (index, url) in urls.iter().enumerate() {
        let download = fetch(url.clone());
        tasks.spawn(async move { (index, download.await) });
    }

    let collect = async {
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(image))) => slots[index] = ImageSlot::Fetched(image),
                Ok((index, Err(e))) => {
                    debug!(url = %urls[index], error = %e, "Image download failed");
                    slots[index] = ImageSlot::Failed(e.to_string());
                }
                Err(e) => warn!(error = %e, "Image download task did not complete"),
            }
        }
    };

    let timed_out = tokio::time::timeout(deadline, collect).await.is_err();
    if timed_out {
        warn!(
            pending = tasks.len(),
            deadline_ms = deadline.as_millis() as u64,
            "Image downloads exceeded deadline; abandoning the rest"
        );
        tasks.abort_all();
    }

    ImageBatch { slots, timed_out }
}
