//! The Prometheus remote-write data model.
//!
//! These are the `prompb` messages carried (Snappy-compressed) in the body of
//! a remote-write request:
//!
//! ```text
//! message WriteRequest { repeated TimeSeries timeseries = 1; }
//! message TimeSeries   { repeated Label labels = 1; repeated Sample samples = 2; }
//! message Label        { string name = 1; string value = 2; }
//! message Sample       { double value = 1; int64 timestamp = 2; }
//! ```
//!
//! The message types are derived by hand, not generated at build time.

use std::hash::Hasher;

use twox_hash::XxHash64;

/// The label carrying the metric name of a series.
pub const METRIC_NAME_LABEL: &str = "__name__";

// Separates label names and values when computing a fingerprint. Not a valid
// UTF-8 byte, so it can never appear inside a label name or value.
const FINGERPRINT_SEPARATOR: u8 = 0xff;

/// A batch of time series submitted together; the unit of ingestion.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WriteRequest {
    #[prost(message, repeated, tag = "1")]
    pub timeseries: Vec<TimeSeries>,
}

impl WriteRequest {
    /// Construct a request from `timeseries`.
    pub fn new(timeseries: Vec<TimeSeries>) -> Self {
        Self { timeseries }
    }

    /// The number of series in this request.
    pub fn series_count(&self) -> usize {
        self.timeseries.len()
    }

    /// The total number of samples across all series in this request.
    pub fn sample_count(&self) -> usize {
        self.timeseries.iter().map(|s| s.samples.len()).sum()
    }
}

/// A label set identifying a metric stream, plus its samples.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TimeSeries {
    #[prost(message, repeated, tag = "1")]
    pub labels: Vec<Label>,
    #[prost(message, repeated, tag = "2")]
    pub samples: Vec<Sample>,
}

impl TimeSeries {
    /// Construct a series from its labels and samples.
    pub fn new(labels: Vec<Label>, samples: Vec<Sample>) -> Self {
        Self { labels, samples }
    }

    /// Return the value of the [`METRIC_NAME_LABEL`] label, if present.
    pub fn metric_name(&self) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == METRIC_NAME_LABEL)
            .map(|l| l.value.as_str())
    }

    /// Compute the identity of this series' label set.
    ///
    /// Label order does not affect the result: two series carrying the same
    /// labels in a different order share a fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut labels: Vec<&Label> = self.labels.iter().collect();
        labels.sort_unstable_by(|a, b| a.name.cmp(&b.name).then_with(|| a.value.cmp(&b.value)));

        let mut hasher = XxHash64::with_seed(0);
        for label in labels {
            hasher.write(label.name.as_bytes());
            hasher.write_u8(FINGERPRINT_SEPARATOR);
            hasher.write(label.value.as_bytes());
            hasher.write_u8(FINGERPRINT_SEPARATOR);
        }
        Fingerprint(hasher.finish())
    }
}

/// A name/value pair; label names are unique within a series.
#[derive(Clone, PartialEq, Eq, Hash, ::prost::Message)]
pub struct Label {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub value: String,
}

impl Label {
    /// Construct a label from its name and value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A single observation.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Sample {
    #[prost(double, tag = "1")]
    pub value: f64,
    /// Milliseconds since the UNIX epoch.
    #[prost(int64, tag = "2")]
    pub timestamp: i64,
}

impl Sample {
    /// Construct a sample of `value` observed at `timestamp` milliseconds.
    pub fn new(value: f64, timestamp: i64) -> Self {
        Self { value, timestamp }
    }
}

/// An order-independent hash of a series label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Return the raw hash value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(labels: &[(&str, &str)]) -> TimeSeries {
        TimeSeries::new(
            labels.iter().map(|(n, v)| Label::new(*n, *v)).collect(),
            vec![Sample::new(1.0, 1000)],
        )
    }

    #[test]
    fn test_metric_name() {
        let s = series(&[("code", "200"), ("__name__", "http_requests_total")]);
        assert_eq!(s.metric_name(), Some("http_requests_total"));

        let s = series(&[("code", "200")]);
        assert_eq!(s.metric_name(), None);
    }

    #[test]
    fn test_fingerprint_ignores_label_order() {
        let a = series(&[("__name__", "up"), ("job", "node"), ("instance", "a")]);
        let b = series(&[("instance", "a"), ("__name__", "up"), ("job", "node")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_distinguishes_label_sets() {
        let a = series(&[("__name__", "up"), ("job", "node")]);
        let b = series(&[("__name__", "up"), ("job", "nodes")]);
        assert_ne!(a.fingerprint(), b.fingerprint());

        // Moving bytes between a name and its value must change the identity.
        let a = series(&[("ab", "c")]);
        let b = series(&[("a", "bc")]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_display() {
        let fp = series(&[("__name__", "up")]).fingerprint();
        let got = fp.to_string();
        assert_eq!(got.len(), 16);
        assert_eq!(u64::from_str_radix(&got, 16).unwrap(), fp.get());
    }

    #[test]
    fn test_counts() {
        let req = WriteRequest::new(vec![
            series(&[("__name__", "a")]),
            TimeSeries::new(
                vec![Label::new("__name__", "b")],
                vec![Sample::new(1.0, 1), Sample::new(2.0, 2)],
            ),
        ]);
        assert_eq!(req.series_count(), 2);
        assert_eq!(req.sample_count(), 3);
    }
}
