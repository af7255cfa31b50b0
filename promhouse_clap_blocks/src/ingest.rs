//! CLI config for the remote-write ingest path.

/// 10 MiB
const DEFAULT_MAX_HTTP_REQUEST_SIZE: &str = "10485760";

/// 64 MiB
const DEFAULT_MAX_DECODED_REQUEST_SIZE: &str = "67108864";

/// What to do with a time series that carries no samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum EmptySeriesPolicy {
    /// Pass the series through to storage unchanged.
    #[default]
    Accept,

    /// Reject the whole write request.
    Reject,
}

/// CLI config for the remote-write ingest handler.
#[derive(Debug, Clone, clap::Parser)]
#[allow(missing_copy_implementations)]
pub struct IngestConfig {
    /// Maximum size, in bytes, of a (compressed) remote-write request body.
    #[clap(
        long = "max-http-request-size",
        env = "PROMHOUSE_MAX_HTTP_REQUEST_SIZE",
        default_value = DEFAULT_MAX_HTTP_REQUEST_SIZE,
        action
    )]
    pub max_http_request_size: usize,

    /// Maximum size, in bytes, a request body may declare it decompresses to.
    ///
    /// Requests declaring a larger decoded size are rejected before any
    /// memory is allocated for them, bounding the memory a single small
    /// request can make the server consume.
    #[clap(
        long = "max-decoded-request-size",
        env = "PROMHOUSE_MAX_DECODED_REQUEST_SIZE",
        default_value = DEFAULT_MAX_DECODED_REQUEST_SIZE,
        action
    )]
    pub max_decoded_request_size: usize,

    /// Whether time series without any samples are accepted or rejected.
    #[clap(
        long = "empty-series-policy",
        env = "PROMHOUSE_EMPTY_SERIES_POLICY",
        default_value = "accept",
        value_enum,
        action
    )]
    pub empty_series_policy: EmptySeriesPolicy,
}
