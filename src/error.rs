use thiserror::Error;

/// Failure of a single census API operation.
///
/// None of these are fatal: callers either surface them to the user or
/// degrade to bundled fallback data.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS, timeout, or other transport-level failure.
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The server answered with a non-2xx status.
    #[error("request to {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },
    /// The body was not the expected JSON envelope.
    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The envelope came back with `success: false`.
    #[error("census api error: {0}")]
    Unsuccessful(String),
    /// The envelope reported success but carried no `data`.
    #[error("census api response has no data")]
    MissingData,
    #[error("invalid api base url {0:?}")]
    InvalidBaseUrl(String),
    #[error("could not build http client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors while reading or writing the saved language preference.
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("no user configuration directory available")]
    NoConfigDir,
    #[error("language preference io at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
