use thiserror::Error;

pub mod endpoint;
pub mod source;

pub use endpoint::{Endpoint, Protocol, Scheme};
pub use source::{SourceTemplate, Sources};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed endpoint `{0}`: expected a URL, `user@host:path` or `host/path`")]
    MalformedEndpoint(String),
    #[error("Path segment `{segment}` of `{endpoint}` cannot be mapped to a directory")]
    UnsafePathSegment { segment: String, endpoint: String },
    #[error("Invalid protocol `{0}`")]
    InvalidProtocol(String),
}
