//! # avl_scenarios
//!
//! Continual-learning benchmarks for avalanche-rs.
//!
//! This crate provides:
//! - [`CLExperience`] with mode-gated attributes ([`ExperienceAttribute`])
//! - [`CLStream`] (lazy) and [`EagerCLStream`] (materialized) streams
//! - [`CLScenario`], a named collection of streams
//! - [`NCScenario`], the class-incremental partition of a classification dataset
//! - [`OnlineCLScenario`] and [`split_online_stream`] for online learning
//! - [`create_multi_dataset_scenario`] for one experience per dataset
//!
//! ## Example
//!
//! ```rust
//! use avl_core::ErrorKind;
//! use avl_data::{ClassificationDataset, VecSource};
//! use avl_scenarios::{NCScenario, NCScenarioConfig};
//!
//! let targets: Vec<i64> = (0..60).map(|i| i % 6).collect();
//! let data = ClassificationDataset::from_source(
//!     VecSource::new(vec![0.0_f32; 60], targets).unwrap(),
//! )
//! .unwrap();
//!
//! let config = NCScenarioConfig::new(3).with_seed(42);
//! let scenario = NCScenario::new(data.clone(), data, &config).unwrap();
//!
//! for exp in scenario.train_stream() {
//!     assert_eq!(exp.classes_in_this_experience().len(), 2);
//!     // The position in the stream is hidden from the training loop.
//!     assert_eq!(exp.current_experience().unwrap_err().kind(), ErrorKind::MaskedAttribute);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod experience;
mod multi_dataset;
mod nc;
mod online;
mod scenario;
mod stream;

pub use error::{Result, ScenarioError};
pub use experience::{CLExperience, ExperienceAttribute};
pub use multi_dataset::create_multi_dataset_scenario;
pub use nc::{NCScenario, NCScenarioConfig, ReproducibilityData};
pub use online::{
    fixed_size_experience_split, split_online_stream, split_online_stream_with,
    ExperienceSplitter, OnlineCLScenario, OnlineSplitConfig, SubExperienceIter, SubExperiences,
};
pub use scenario::{CLScenario, ScenarioStream, StreamFactory};
pub use stream::{CLStream, EagerCLStream, StreamRef};
