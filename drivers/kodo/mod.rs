//! Qiniu Kodo object storage driver / 七牛云Kodo对象存储驱动
//!
//! Kodo is a flat key space. Directory listings are emulated with the `/`
//! delimiter and, when enabled, zero-length keys ending in `/` stand in for
//! directories.

pub mod auth;
pub mod client;
pub mod config;
pub mod driver;
pub mod error;
pub mod factory;
pub mod lister;
pub mod normalize;
pub mod path;
pub mod types;
pub mod vdir;

#[cfg(test)]
pub mod mock;

pub use client::{KodoBackend, KodoClient};
pub use config::KodoConfig;
pub use driver::KodoDriver;
pub use factory::KodoDriverFactory;
