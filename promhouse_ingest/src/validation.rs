//! Structural validation of decoded write requests.

use hashbrown::HashSet;
use promhouse_clap_blocks::ingest::EmptySeriesPolicy;
use promhouse_types::{TimeSeries, WriteRequest};
use thiserror::Error;

/// The reason a single time series was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidSeries {
    /// The series has no labels, and therefore no identity.
    #[error("series has no labels")]
    NoLabels,

    /// A label name is the empty string.
    #[error("label at position {position} has an empty name")]
    EmptyLabelName {
        /// The position of the offending label within the series.
        position: usize,
    },

    /// The same label name appears more than once.
    #[error("duplicate label name {name:?}")]
    DuplicateLabelName {
        /// The repeated label name.
        name: String,
    },

    /// The series has no samples and [`EmptySeriesPolicy::Reject`] is in
    /// effect.
    #[error("series has no samples")]
    NoSamples,
}

/// A write request failed validation.
///
/// Only the first offending series is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid series at index {index}: {reason}")]
pub struct ValidationError {
    index: usize,
    reason: InvalidSeries,
}

impl ValidationError {
    /// The index of the offending series within the request.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Why the series was rejected.
    pub fn reason(&self) -> &InvalidSeries {
        &self.reason
    }
}

/// Enforces the structural invariants of a [`WriteRequest`]:
///
///   * every series has at least one label
///   * label names are non-empty and unique within a series
///   * series without samples are handled according to the configured
///     [`EmptySeriesPolicy`]
///
/// Label order and sample ordering are not checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator {
    empty_series: EmptySeriesPolicy,
}

impl RequestValidator {
    /// Construct a validator applying `empty_series` to sample-less series.
    pub fn new(empty_series: EmptySeriesPolicy) -> Self {
        Self { empty_series }
    }

    /// The policy applied to series without samples.
    pub fn empty_series_policy(&self) -> EmptySeriesPolicy {
        self.empty_series
    }

    /// Validate `req`, returning the first violation found.
    pub fn check(&self, req: &WriteRequest) -> Result<(), ValidationError> {
        let mut seen = HashSet::new();
        for (index, series) in req.timeseries.iter().enumerate() {
            self.check_series(series, &mut seen)
                .map_err(|reason| ValidationError { index, reason })?;
        }
        Ok(())
    }

    fn check_series<'a>(
        &self,
        series: &'a TimeSeries,
        seen: &mut HashSet<&'a str>,
    ) -> Result<(), InvalidSeries> {
        if series.labels.is_empty() {
            return Err(InvalidSeries::NoLabels);
        }

        seen.clear();
        for (position, label) in series.labels.iter().enumerate() {
            if label.name.is_empty() {
                return Err(InvalidSeries::EmptyLabelName { position });
            }
            if !seen.insert(label.name.as_str()) {
                return Err(InvalidSeries::DuplicateLabelName {
                    name: label.name.clone(),
                });
            }
        }

        if series.samples.is_empty() && self.empty_series == EmptySeriesPolicy::Reject {
            return Err(InvalidSeries::NoSamples);
        }

        Ok(())
    }
}
