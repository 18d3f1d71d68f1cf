//! Configuration module for Ultimarr.
//!
//! Settings come from the environment only and are loaded once at startup.

mod settings;

pub use settings::{Service, ServiceSettings, Settings};
