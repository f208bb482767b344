//! Python slug compiler.
//!
//! Turns an application source tree into a relocatable virtualenv plus a
//! runtime profile script, reusing the previous build's environment from a
//! persistent cache directory.

pub mod cache;
pub mod config;
pub mod environment;
pub mod error;
pub mod hooks;
pub mod install;
pub mod layout;
pub mod output;
pub mod pipelines;
pub mod profile;
pub mod tools;

pub use error::{BuildError, Result};
