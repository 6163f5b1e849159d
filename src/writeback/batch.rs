//! Batches submitted to the write-behind queue.

use std::collections::HashSet;

use thumbcache_common::{Error, Result, ThumbnailRecord, ThumbnailResult};

/// Records persisted together by the write-behind consumer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    records: Vec<ThumbnailRecord>,
}

impl WriteBatch {
    pub fn new(records: Vec<ThumbnailRecord>) -> Self {
        Self { records }
    }

    /// Build a batch from response entries.
    ///
    /// Fails when any entry is a failure: only successful fetches may reach
    /// the cache.
    pub fn from_results<I>(results: I) -> Result<Self>
    where
        I: IntoIterator<Item = ThumbnailResult>,
    {
        let records = results
            .into_iter()
            .map(|result| match result {
                ThumbnailResult::Success(record) => Ok(record),
                ThumbnailResult::Failure(failure) => Err(Error::invalid_input(format!(
                    "write batch contains failed entry '{}'",
                    failure.key
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { records })
    }

    /// Drop repeated identifiers, keeping the first occurrence of each.
    pub fn dedup(self) -> Self {
        let mut seen = HashSet::with_capacity(self.records.len());
        let records = self
            .records
            .into_iter()
            .filter(|record| seen.insert(record.id().clone()))
            .collect();
        Self { records }
    }

    pub fn records(&self) -> &[ThumbnailRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ThumbnailRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thumbcache_common::{FailureKind, ThumbnailMetadata, VideoId};

    fn record(id: &str, title: &str) -> ThumbnailRecord {
        ThumbnailRecord::new(
            ThumbnailMetadata {
                id: VideoId::new(id).unwrap(),
                source_url: String::new(),
                channel_title: String::new(),
                title: title.into(),
                width: 1,
                height: 1,
            },
            b"img".to_vec(),
        )
    }

    #[test]
    fn test_dedup_first_wins() {
        let batch = WriteBatch::new(vec![
            record("a", "first"),
            record("b", "only"),
            record("a", "second"),
        ])
        .dedup();

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.records()[0].metadata.title, "first");
        assert_eq!(batch.records()[1].id().as_str(), "b");
    }

    #[test]
    fn test_from_results_accepts_successes() {
        let batch = WriteBatch::from_results(vec![
            ThumbnailResult::success(record("a", "t")),
            ThumbnailResult::success(record("b", "t")),
        ])
        .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_from_results_rejects_failures() {
        let err = WriteBatch::from_results(vec![
            ThumbnailResult::success(record("a", "t")),
            ThumbnailResult::failure("b", FailureKind::NotFound),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(ref msg) if msg.contains("'b'")));
    }
}
