use std::fmt;

/// Error type for lookup-source operations.
#[derive(Debug)]
pub enum LookupError {
    /// No API key configured
    MissingApiKey,
    /// Network error
    Network(String),
    /// HTTP error with status code
    Http(u16, String),
    /// Still rate limited after retries
    RateLimited(String),
    /// Response body could not be parsed
    Parse(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::MissingApiKey => write!(f, "lookup API key is not configured"),
            LookupError::Network(msg) => write!(f, "Network error: {}", msg),
            LookupError::Http(code, msg) => write!(f, "HTTP {}: {}", code, msg),
            LookupError::RateLimited(msg) => write!(f, "Rate limited: {}", msg),
            LookupError::Parse(msg) => write!(f, "Parse error: {}", msg),
        }
    }
}

impl std::error::Error for LookupError {}

/// Error type for website email scanning.
#[derive(Debug)]
pub enum ScanError {
    InvalidUrl(String),
    /// No candidate page could be fetched
    Unreachable(String),
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::InvalidUrl(msg) => write!(f, "invalid website URL: {}", msg),
            ScanError::Unreachable(msg) => write!(f, "website unreachable: {}", msg),
        }
    }
}

impl std::error::Error for ScanError {}
