//! Request parsing.
//!
//! Turns the bytes read from a connection into an [`HttpRequest`] the server
//! matches against its route table.

mod error;
mod method;
mod request;
mod version;

pub use error::Error;
pub use method::Method;
pub use request::{find_header_end, parse_query, parse_request, HttpRequest};
pub use version::HttpVersion;
