//! An in-memory [`StorageSink`], primarily for tests and local development.

use async_trait::async_trait;
use hashbrown::HashMap;
use parking_lot::Mutex;
use promhouse_types::{Fingerprint, Label, Sample, WriteRequest};
use tokio_util::sync::CancellationToken;
use tracing::*;

use super::{StorageError, StorageSink};

/// A single series held by a [`MemorySink`].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSeries {
    /// The labels of the first write that created this series.
    pub labels: Vec<Label>,
    /// All samples written to the series, ordered by timestamp.
    pub samples: Vec<Sample>,
}

/// A [`StorageSink`] retaining every series written to it in memory.
///
/// Series are identified by the [`Fingerprint`] of their label set, so
/// writes of the same labels in a different order append to the same series.
/// Samples are kept in timestamp order; samples sharing a timestamp are kept
/// in the order they were written.
///
/// The sink is safe for concurrent use: all writes are serialised by an
/// internal lock, and each write request is applied atomically.
#[derive(Debug, Default)]
pub struct MemorySink {
    series: Mutex<HashMap<Fingerprint, StoredSeries>>,
}

impl MemorySink {
    /// Construct an empty [`MemorySink`].
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of distinct series stored.
    pub fn series_count(&self) -> usize {
        self.series.lock().len()
    }

    /// The total number of samples stored across all series.
    pub fn sample_count(&self) -> usize {
        self.series.lock().values().map(|s| s.samples.len()).sum()
    }

    /// Return a copy of the series identified by `fingerprint`, if any.
    pub fn get(&self, fingerprint: Fingerprint) -> Option<StoredSeries> {
        self.series.lock().get(&fingerprint).cloned()
    }

    /// Return a copy of all stored series, ordered by fingerprint.
    pub fn snapshot(&self) -> Vec<(Fingerprint, StoredSeries)> {
        let mut all: Vec<_> = self
            .series
            .lock()
            .iter()
            .map(|(fp, s)| (*fp, s.clone()))
            .collect();
        all.sort_unstable_by_key(|(fp, _)| *fp);
        all
    }
}

#[async_trait]
impl StorageSink for MemorySink {
    async fn write(
        &self,
        request: WriteRequest,
        cancel: &CancellationToken,
    ) -> Result<(), StorageError> {
        if cancel.is_cancelled() {
            return Err(StorageError::new("write cancelled"));
        }

        let n_series = request.series_count();
        let mut created = 0;

        let mut guard = self.series.lock();
        for series in request.timeseries {
            let fingerprint = series.fingerprint();
            let stored = guard.entry(fingerprint).or_insert_with(|| {
                trace!(%fingerprint, "creating series");
                created += 1;
                StoredSeries {
                    labels: series.labels,
                    samples: Vec::with_capacity(series.samples.len()),
                }
            });

            // Only the newly appended tail (and the sample before it) can be
            // out of order.
            let tail = stored.samples.len().saturating_sub(1);
            stored.samples.extend(series.samples);
            if !stored.samples[tail..].is_sorted_by_key(|s| s.timestamp) {
                stored.samples.sort_by_key(|s| s.timestamp);
            }
        }
        drop(guard);

        trace!(series = n_series, created, "stored write request");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use promhouse_types::TimeSeries;

    use super::*;

    fn series(labels: &[(&str, &str)], samples: &[(f64, i64)]) -> TimeSeries {
        TimeSeries::new(
            labels.iter().map(|(n, v)| Label::new(*n, *v)).collect(),
            samples.iter().map(|(v, t)| Sample::new(*v, *t)).collect(),
        )
    }

    #[tokio::test]
    async fn test_write_appends_to_series() {
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();

        let a = series(&[("__name__", "up"), ("job", "a")], &[(1.0, 1), (2.0, 2)]);
        let b = series(&[("__name__", "up"), ("job", "b")], &[(3.0, 1)]);
        sink.write(WriteRequest::new(vec![a.clone(), b.clone()]), &cancel)
            .await
            .unwrap();

        // Same label set as `a`, different label order.
        let a2 = series(&[("job", "a"), ("__name__", "up")], &[(4.0, 3)]);
        sink.write(WriteRequest::new(vec![a2]), &cancel)
            .await
            .unwrap();

        assert_eq!(sink.series_count(), 2);
        assert_eq!(sink.sample_count(), 4);

        let got = sink.get(a.fingerprint()).expect("series a must exist");
        assert_eq!(got.labels, a.labels);
        assert_eq!(
            got.samples,
            vec![Sample::new(1.0, 1), Sample::new(2.0, 2), Sample::new(4.0, 3)]
        );

        let got = sink.get(b.fingerprint()).expect("series b must exist");
        assert_eq!(got.samples, b.samples);
    }

    #[tokio::test]
    async fn test_out_of_order_samples_are_sorted() {
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();

        let s = series(&[("__name__", "up")], &[(2.0, 20), (1.0, 10)]);
        let fp = s.fingerprint();
        sink.write(WriteRequest::new(vec![s]), &cancel).await.unwrap();

        let s = series(&[("__name__", "up")], &[(0.5, 5), (3.0, 30)]);
        sink.write(WriteRequest::new(vec![s]), &cancel).await.unwrap();

        let got = sink.get(fp).unwrap();
        let timestamps: Vec<_> = got.samples.iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![5, 10, 20, 30]);
    }

    #[tokio::test]
    async fn test_empty_series_is_created() {
        let sink = MemorySink::new();
        sink.write(
            WriteRequest::new(vec![series(&[("__name__", "up")], &[])]),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(sink.series_count(), 1);
        assert_eq!(sink.sample_count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let sink = MemorySink::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sink
            .write(
                WriteRequest::new(vec![series(&[("__name__", "up")], &[(1.0, 1)])]),
                &cancel,
            )
            .await
            .expect_err("cancelled write must fail");
        assert_eq!(err.to_string(), "storage write failed: write cancelled");
        assert_eq!(sink.series_count(), 0);
    }

    #[tokio::test]
    async fn test_snapshot_order() {
        let sink = MemorySink::new();
        let req = WriteRequest::new(
            (0..10)
                .map(|i| series(&[("__name__", "up"), ("i", i.to_string().as_str())], &[(1.0, 1)]))
                .collect(),
        );
        sink.write(req, &CancellationToken::new()).await.unwrap();

        let snapshot = sink.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert!(snapshot.windows(2).all(|w| w[0].0 < w[1].0));
    }
}
