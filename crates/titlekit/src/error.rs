//! Error types for TitleKit

use std::net::IpAddr;
use thiserror::Error;

/// Friendly message for incomplete or aborted transfers
pub const INCOMPLETE_RESPONSE_MESSAGE: &str = "Received incomplete response from server.";

/// Friendly message for redirect limits, hard or soft
pub const TOO_MANY_REDIRECTS_MESSAGE: &str = "Encountered too many redirects.";

/// Friendly message for connection, DNS and blacklist failures
pub const COULD_NOT_CONNECT_MESSAGE: &str = "Could not connect to server.";

/// Errors that can occur during fetch operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or resolved
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL has invalid scheme
    #[error("Invalid URL: must start with http:// or https://")]
    InvalidUrlScheme,

    /// Host resolved to a loopback, private or link-local address
    #[error("Host {hostname} corresponds to blacklisted IP {address}")]
    BlacklistedHost { hostname: String, address: IpAddr },

    /// Hostname could not be resolved
    #[error("DNS lookup failed for {hostname}: {reason}")]
    DnsFailure { hostname: String, reason: String },

    /// Failed to connect to server
    #[error("Failed to connect to server: {0}")]
    ConnectFailure(String),

    /// Response was incomplete or malformed
    #[error("Received incomplete response: {0}")]
    ResponseFailure(String),

    /// Hard or soft redirect budget exhausted
    #[error("Too many redirects (last location: {location})")]
    TooManyRedirects { location: String },

    /// Summarizer failed internally
    #[error("Extractor {extractor} failed: {reason}")]
    ExtractorFailure {
        extractor: &'static str,
        reason: String,
    },

    /// Failed to build HTTP client
    #[error("Failed to create HTTP client")]
    ClientBuildError(#[source] reqwest::Error),

    /// Fetch deadline expired
    #[error("Request timed out")]
    Timeout,
}

impl FetchError {
    /// Create an error from a reqwest error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_connect() {
            FetchError::ConnectFailure(err.to_string())
        } else {
            FetchError::ResponseFailure(err.to_string())
        }
    }
}

/// Map a common failure to a human-readable description
///
/// Returns `Ok` with a fixed message for connection, DNS, blacklist,
/// incomplete-response and redirect-limit failures. Any other error is
/// handed back unchanged as `Err`.
pub fn describe_error(error: FetchError) -> Result<String, FetchError> {
    match error {
        FetchError::TooManyRedirects { .. } => Ok(TOO_MANY_REDIRECTS_MESSAGE.to_string()),
        FetchError::ResponseFailure(_) => Ok(INCOMPLETE_RESPONSE_MESSAGE.to_string()),
        FetchError::ConnectFailure(_)
        | FetchError::DnsFailure { .. }
        | FetchError::BlacklistedHost { .. } => Ok(COULD_NOT_CONNECT_MESSAGE.to_string()),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            FetchError::InvalidUrlScheme.to_string(),
            "Invalid URL: must start with http:// or https://"
        );
        assert_eq!(
            FetchError::BlacklistedHost {
                hostname: "localhost".to_string(),
                address: "127.0.0.1".parse().unwrap(),
            }
            .to_string(),
            "Host localhost corresponds to blacklisted IP 127.0.0.1"
        );
        assert_eq!(FetchError::Timeout.to_string(), "Request timed out");
    }

    #[test]
    fn test_describe_incomplete_response() {
        let described = describe_error(FetchError::ResponseFailure("reset".to_string()));
        assert_eq!(described.unwrap(), INCOMPLETE_RESPONSE_MESSAGE);
    }

    #[test]
    fn test_describe_connection_failures() {
        let errors = [
            FetchError::ConnectFailure("refused".to_string()),
            FetchError::DnsFailure {
                hostname: "nowhere.test".to_string(),
                reason: "no records".to_string(),
            },
            FetchError::BlacklistedHost {
                hostname: "10.0.0.1".to_string(),
                address: "10.0.0.1".parse().unwrap(),
            },
        ];
        for error in errors {
            assert_eq!(describe_error(error).unwrap(), COULD_NOT_CONNECT_MESSAGE);
        }
    }

    #[test]
    fn test_describe_too_many_redirects() {
        let described = describe_error(FetchError::TooManyRedirects {
            location: "http://loop.test/".to_string(),
        });
        assert_eq!(described.unwrap(), TOO_MANY_REDIRECTS_MESSAGE);
    }

    #[test]
    fn test_unrecognized_errors_pass_through() {
        assert!(matches!(
            describe_error(FetchError::Timeout),
            Err(FetchError::Timeout)
        ));
        assert!(matches!(
            describe_error(FetchError::InvalidUrl("nope".to_string())),
            Err(FetchError::InvalidUrl(ref s)) if s == "nope"
        ));
    }
}
