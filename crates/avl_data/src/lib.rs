//! # avl_data
//!
//! Dataset composition engine for avalanche-rs continual learning.
//!
//! This crate provides:
//! - [`TransformGroups`] for named, swappable (input, target) transform pipelines
//! - [`DataAttribute`] for per-sample values with a lazy value → indices index
//! - [`AvalancheDataset`] for lazily composed subsets and concatenations
//! - [`ClassificationDataset`] adding targets, task labels and class remapping
//! - [`DataLoader`] for batched iteration with seeded shuffling
//!
//! ## Example
//!
//! ```rust
//! use avl_data::{ClassificationDataset, VecSource};
//!
//! let source = VecSource::new(vec![0.0_f32, 1.0, 2.0, 3.0], vec![0, 1, 0, 1]).unwrap();
//! let dataset = ClassificationDataset::from_source(source).unwrap();
//!
//! let ones = dataset.subset(Some(vec![1, 3])).unwrap();
//! assert_eq!(ones.classes(), vec![1]);
//! assert_eq!(dataset.task_set().keys(), vec![0]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod attribute;
mod classification;
mod dataset;
mod error;
mod loader;
mod sample;
mod source;
mod transform_groups;

pub use attribute::DataAttribute;
pub use classification::{
    concat_datasets_sequentially, ClassMapping, ClassificationDataset,
    ClassificationDatasetBuilder, TaskLabels, TaskSet, TARGETS, TASK_LABELS,
};
pub use dataset::AvalancheDataset;
pub use error::{DataError, Result};
pub use loader::{DataLoader, DataLoaderBuilder, DataLoaderIter};
pub use sample::{Batch, Collate, DefaultCollate, Sample};
pub use source::{ArraySource, SampleSource, VecSource};
pub use transform_groups::{TransformGroups, TransformPair, EVAL_GROUP, TRAIN_GROUP};
