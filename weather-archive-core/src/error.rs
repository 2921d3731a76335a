use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to one of the remote APIs.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("response is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

/// The archive response does not have the shape the reconciler needs.
#[derive(Debug, Error, PartialEq)]
pub enum DataShapeError {
    #[error("`{section}.{field}` is not an array")]
    NotAnArray {
        section: &'static str,
        field: &'static str,
    },

    #[error("`{section}.{field}[{index}]` has unexpected value {value}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        index: usize,
        value: String,
    },

    #[error(
        "`{section}.{left}` has {left_len} entries but `{section}.{right}` has {right_len}"
    )]
    LengthMismatch {
        section: &'static str,
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("coordinate ({latitude}, {longitude}) is out of range")]
pub struct InvalidCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}
