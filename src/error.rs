use std::fmt;
use axum::http::StatusCode;

/// Custom error type for tutor requests
/// Implements Clone so provider results can be shared with tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Prompt missing, not a string, empty or too long
    Validation(String)
  , /// Request body over the size limit or unreadable
    PayloadTooLarge
  , /// HTTP method other than POST / OPTIONS
    MethodNotAllowed(String)
  , /// API key is missing for the configured provider
    MissingApiKey(String)
  , /// Invalid configuration value
    InvalidConfiguration(String)
  , /// Upstream answered 429
    RateLimitExceeded
  , /// Upstream rejected our credentials (401 / 403)
    UpstreamAuth(u16)
  , /// Transport-level failure talking to the upstream
    HttpError(String)
  , /// Upstream answered with an unmapped non-2xx status
    ApiError(u16)
  , /// Failed to parse the upstream response
    ParseError(String)
  , /// Upstream response parsed but carried no text
    EmptyResponse
  , /// Internal deadline fired before the upstream answered
    Timeout
  , /// Generic error
    Other(String)
}

impl Error
{   /// HTTP status returned to the caller for this error
    pub fn status(&self) -> StatusCode
    {   match self
        {   Error::Validation(_) => StatusCode::BAD_REQUEST
          , Error::MethodNotAllowed(_) => {
              StatusCode::METHOD_NOT_ALLOWED
            }
          , Error::RateLimitExceeded => {
              StatusCode::TOO_MANY_REQUESTS
            }
          , Error::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE
          , Error::UpstreamAuth(403) => StatusCode::FORBIDDEN
          , _ => StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Message safe to put in the response envelope.
    /// Never echoes upstream bodies or secret names.
    pub fn client_message(&self) -> String
    {   match self
        {   Error::Validation(msg) => msg.clone()
          , Error::MethodNotAllowed(_) => {
              "method not allowed, use POST".to_string()
            }
          , Error::MissingApiKey(_)
          | Error::InvalidConfiguration(_) => {
              "server configuration error".to_string()
            }
          , Error::RateLimitExceeded => {
              "rate limited by the AI service, retry later".to_string()
            }
          , Error::UpstreamAuth(_) => {
              "server authentication with the AI service is misconfigured"
                .to_string()
            }
          , Error::PayloadTooLarge => {
              "request body too large".to_string()
            }
          , _ => {
              "error processing the request, please try again".to_string()
            }
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Validation(msg) => {
              write!(f, "Validation error: {}", msg)
            }
          , Error::PayloadTooLarge => {
              write!(f, "Request body too large")
            }
          , Error::MethodNotAllowed(method) => {
              write!(f, "Method not allowed: {}", method)
            }
          , Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::RateLimitExceeded => {
              write!(f, "Upstream rate limit exceeded")
            }
          , Error::UpstreamAuth(status) => {
              write!(f, "Upstream authentication failed ({})", status)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(status) => {
              write!(f, "API error: status {}", status)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::EmptyResponse => {
              write!(f, "API response contained no text")
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
