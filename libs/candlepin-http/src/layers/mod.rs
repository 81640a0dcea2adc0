//! Tower layers for the connection middleware stack
//!
//! - [`DefaultHeadersLayer`] - Adds User-Agent and the default Accept header
//! - [`BasicAuthLayer`] - Sends HTTP Basic credentials with every request

mod basic_auth;
mod default_headers;

pub use basic_auth::{BasicAuthLayer, BasicAuthService};
pub use default_headers::{DEFAULT_ACCEPT, DefaultHeadersLayer, DefaultHeadersService};
