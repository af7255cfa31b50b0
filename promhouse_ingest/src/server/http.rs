//! HTTP handler for Prometheus remote-write requests.

use bytes::{Bytes, BytesMut};
use hyper::{
    Body, Request, Response, StatusCode,
    body::HttpBody,
    header::{CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HeaderValue},
};
use promhouse_clap_blocks::ingest::{EmptySeriesPolicy, IngestConfig};
use promhouse_types::codec::{self, CodecError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::*;

use crate::{
    storage::{StorageError, StorageSink},
    validation::{RequestValidator, ValidationError},
    wire::{DecodeError, WireDecoder},
};

/// Errors returned by the remote-write HTTP request handler.
#[derive(Debug, Error)]
pub enum Error {
    /// The `Content-Encoding` header is invalid and cannot be read.
    #[error("invalid content-encoding header: {0}")]
    NonUtf8ContentHeader(#[source] hyper::header::ToStrError),

    /// The specified `Content-Encoding` is not acceptable.
    #[error("unacceptable content-encoding: {0}")]
    InvalidContentEncoding(String),

    /// The client disconnected.
    #[error("client disconnected")]
    ClientHangup(#[source] hyper::Error),

    /// The client sent a request body that exceeds the configured maximum.
    #[error("max request size ({0} bytes) exceeded")]
    RequestSizeExceeded(usize),

    /// The request body could not be decompressed.
    #[error("error decoding snappy payload: {0}")]
    Decompression(#[from] DecodeError),

    /// The decompressed body is not a valid write request message.
    #[error("error decoding write request: {0}")]
    MalformedMessage(#[from] CodecError),

    /// The write request violates a structural invariant.
    #[error(transparent)]
    InvalidRequest(#[from] ValidationError),

    /// An error returned from the [`StorageSink`].
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The caller cancelled the request before it completed.
    #[error("request cancelled")]
    Cancelled,
}

/// The category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Reading the request body failed, or the request headers are invalid.
    Transport,
    /// The body is not a valid Snappy block, or decodes to too much data.
    Decompression,
    /// The decompressed body is not a valid write request.
    MalformedMessage,
    /// The write request is structurally invalid.
    InvalidRequest,
    /// The storage sink failed to record the write.
    Storage,
    /// The request was cancelled.
    Cancelled,
}

impl ErrorKind {
    /// Returns true if the error is caused by the request itself, and sending
    /// the same request again cannot succeed.
    pub fn is_client_fault(&self) -> bool {
        match self {
            Self::Transport | Self::Decompression | Self::MalformedMessage | Self::InvalidRequest => {
                true
            }
            Self::Storage | Self::Cancelled => false,
        }
    }
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NonUtf8ContentHeader(_)
            | Self::InvalidContentEncoding(_)
            | Self::ClientHangup(_)
            | Self::RequestSizeExceeded(_) => ErrorKind::Transport,
            Self::Decompression(_) => ErrorKind::Decompression,
            Self::MalformedMessage(_) => ErrorKind::MalformedMessage,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// The index of the offending series, for validation failures.
    pub fn series_index(&self) -> Option<usize> {
        match self {
            Self::InvalidRequest(e) => Some(e.index()),
            _ => None,
        }
    }

    /// Convert the error into an appropriate [`StatusCode`] to be returned to
    /// the end user.
    pub fn as_status_code(&self) -> StatusCode {
        match self {
            Self::NonUtf8ContentHeader(_) => StatusCode::BAD_REQUEST,
            Self::InvalidContentEncoding(_) => {
                // https://www.rfc-editor.org/rfc/rfc7231#section-6.5.13
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            Self::ClientHangup(_) => StatusCode::BAD_REQUEST,
            Self::RequestSizeExceeded(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Decompression(DecodeError::DecodedSizeExceeded { .. }) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            Self::Decompression(DecodeError::Snappy(_)) => StatusCode::BAD_REQUEST,
            Self::MalformedMessage(_) => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Render the error as a plain-text HTTP response carrying a short
    /// diagnostic message.
    pub fn into_response(self) -> Response<Body> {
        let status = self.as_status_code();
        let mut response = Response::new(Body::from(self.to_string()));
        *response.status_mut() = status;
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        response
    }
}

/// This type is responsible for servicing Prometheus remote-write requests,
/// passing each decoded and validated [`WriteRequest`] to the sink `S`.
///
/// Each request runs through a fixed pipeline, stopping at the first failure:
///
///   1. read the (Snappy compressed) body, bounded by `max_request_bytes`
///   2. decompress it, bounded by `max_decoded_bytes`
///   3. decode the protobuf [`WriteRequest`]
///   4. validate it with a [`RequestValidator`]
///   5. hand it to the [`StorageSink`]
///
/// The delegate holds no per-request state and is shared by reference
/// between concurrent requests. Failures of steps 1-4 are client errors;
/// a sink failure is a server error. Nothing is retried.
///
/// [`WriteRequest`]: promhouse_types::WriteRequest
#[derive(Debug)]
pub struct HttpDelegate<S> {
    max_request_bytes: usize,
    decoder: WireDecoder,
    validator: RequestValidator,
    sink: S,
}

impl<S> HttpDelegate<S> {
    /// Initialise a new [`HttpDelegate`] passing valid requests to `sink`.
    ///
    /// Request bodies are limited to `max_request_bytes` in size, and may
    /// decompress to at most `max_decoded_bytes`. Series without samples are
    /// accepted.
    pub fn new(max_request_bytes: usize, max_decoded_bytes: usize, sink: S) -> Self {
        Self {
            max_request_bytes,
            decoder: WireDecoder::new(max_decoded_bytes),
            validator: RequestValidator::default(),
            sink,
        }
    }

    /// Initialise a new [`HttpDelegate`] configured by `config`.
    pub fn from_config(config: &IngestConfig, sink: S) -> Self {
        Self::new(
            config.max_http_request_size,
            config.max_decoded_request_size,
            sink,
        )
        .with_empty_series_policy(config.empty_series_policy)
    }

    /// Apply `policy` to series without samples.
    pub fn with_empty_series_policy(mut self, policy: EmptySeriesPolicy) -> Self {
        self.validator = RequestValidator::new(policy);
        self
    }

    /// Get a reference to the sink requests are written to.
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

impl<S> HttpDelegate<S>
where
    S: StorageSink,
{
    /// Ingest the remote-write request `req`, returning an empty
    /// `204 No Content` response once the sink has accepted it.
    ///
    /// If `cancel` is cancelled the request is abandoned at the next
    /// suspension point, the in-flight sink write (if any) is dropped, and
    /// [`Error::Cancelled`] is returned.
    pub async fn write(
        &self,
        req: Request<Body>,
        cancel: &CancellationToken,
    ) -> Result<Response<Body>, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let body = self.read_body(req, cancel).await?;
        let decoded = self.decoder.decompress(&body)?;
        drop(body);

        let request = codec::decode(&decoded)?;
        drop(decoded);

        self.validator.check(&request)?;

        let series = request.series_count();
        let samples = request.sample_count();
        trace!(series, samples, "processing write request");

        // Decoding does not yield - do not start the write if the caller gave
        // up in the meantime.
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            res = self.sink.write(request, cancel) => res?,
        }

        debug!(series, samples, "write request stored");
        Ok(response_no_content())
    }

    /// Read the request's body into raw bytes, applying the configured size
    /// limit.
    async fn read_body(
        &self,
        req: Request<Body>,
        cancel: &CancellationToken,
    ) -> Result<Bytes, Error> {
        let encoding = req
            .headers()
            .get(&CONTENT_ENCODING)
            .map(|v| v.to_str().map_err(Error::NonUtf8ContentHeader))
            .transpose()?;
        // Content-coding tokens are case-insensitive (RFC 7231 section 3.1.2.1).
        match encoding {
            None => {}
            Some(v) if v.eq_ignore_ascii_case("snappy") => {}
            Some(v) => return Err(Error::InvalidContentEncoding(v.to_string())),
        }

        // The content-length header cannot be trusted, but if it is present
        // and small relative to the limit, preallocate for it.
        let quarter_of_max = self.max_request_bytes / 4;
        let mut body = match req
            .headers()
            .get(&CONTENT_LENGTH)
            .and_then(|len| len.to_str().ok())
            .and_then(|len| len.parse::<usize>().ok())
        {
            Some(len) if len < quarter_of_max => BytesMut::with_capacity(len),
            _ => BytesMut::new(),
        };

        let mut payload = req.into_body();
        loop {
            let chunk = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                chunk = payload.data() => chunk,
            };
            let Some(chunk) = chunk else {
                break;
            };

            let chunk = chunk.map_err(Error::ClientHangup)?;
            // limit max size of in-memory payload
            if (body.len() + chunk.len()) > self.max_request_bytes {
                return Err(Error::RequestSizeExceeded(self.max_request_bytes));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}

fn response_no_content() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}
