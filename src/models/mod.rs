//! Wire models for the remote API, split into resource-specific modules.

pub mod build;
pub mod common;
pub mod pipeline;
pub mod project;
pub mod user;

pub use build::*;
pub use common::*;
pub use pipeline::*;
pub use project::*;
pub use user::*;
