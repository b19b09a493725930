//! TCloud transport error types

use hcm_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TCloudError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("TCloud API error {code}: {message} (RequestId: {request_id})")]
    Api {
        code: String,
        message: String,
        request_id: String,
    },

    #[error("Malformed TCloud response: {0}")]
    MalformedResponse(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<TCloudError> for CloudError {
    fn from(err: TCloudError) -> Self {
        match err {
            TCloudError::Http(_) | TCloudError::HttpStatus { .. } | TCloudError::Api { .. } => {
                CloudError::VendorTransport(err.to_string())
            }
            TCloudError::MalformedResponse(_) => CloudError::VendorContractViolation(err.to_string()),
            TCloudError::InvalidConfig(_) => CloudError::ClientInit(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TCloudError>;
