//! # avl_core
//!
//! Core types shared by every avalanche-rs crate.
//!
//! This crate provides:
//! - [`Seed`] for deterministic random number generation
//! - [`ExperienceMode`] for the train/eval/logging visibility model
//! - [`Transform`] trait with [`Identity`], [`Compose`] and [`FnTransform`]
//! - [`ErrorKind`], the branchable error taxonomy used by all crates
//!
//! ## Example
//!
//! ```rust
//! use avl_core::{ExperienceMode, Seed};
//!
//! let order = Seed::new(42).permutation(5);
//! assert_eq!(order.len(), 5);
//! assert!(ExperienceMode::Logging.grants(false, false));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod mode;
mod seed;
mod transform;

pub use error::{CoreError, ErrorKind, Result};
pub use mode::ExperienceMode;
pub use seed::Seed;
pub use transform::{Compose, FnTransform, Identity, SharedTransform, Transform};
