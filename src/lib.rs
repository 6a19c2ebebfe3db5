pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod notify;
pub mod session;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::Client;
pub use error::{ClientError, ErrorKind};
pub use session::{SessionSnapshot, SessionState, SessionStore};
