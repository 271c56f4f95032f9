//! Error types shared by the routing clients and analysis functions.

/// Errors returned by transport-analyst operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport or status failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider has no equivalent of the requested travel mode.
    #[error("{mode} is an invalid travel mode for {provider}")]
    InvalidMode {
        provider: &'static str,
        mode: String,
    },

    /// Coordinates outside the WGS84 range.
    #[error("invalid WGS84 coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The provider answered but reported a failure in its body.
    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: String,
        message: String,
    },

    /// A census zone lacks a requested attribute.
    #[error("zone {zone} has no field {field}")]
    MissingField { zone: String, field: String },

    #[error("unsupported response format: {0}")]
    UnsupportedFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wraps a request failure without its URL, which carries API keys.
    pub(crate) fn http(err: reqwest::Error) -> Self {
        Error::Http(err.without_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_mode_display() {
        let err = Error::InvalidMode {
            provider: "otp",
            mode: "truck".to_string(),
        };
        assert_eq!(err.to_string(), "truck is an invalid travel mode for otp");
    }

    #[test]
    fn missing_field_display() {
        let err = Error::MissingField {
            zone: "sa1-7".to_string(),
            field: "jobs".to_string(),
        };
        assert_eq!(err.to_string(), "zone sa1-7 has no field jobs");
    }
}
