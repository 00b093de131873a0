//! Harbor Core - Foundation types shared by the Harbor plugin host crates.
//!
//! This crate provides:
//! - [`HarborHome`]: resolution of the global state directory and its layout

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod dirs;

pub use dirs::{HOME_ENV_VAR, HarborHome, expand_user_path};
