//! # avl_train
//!
//! Experience loop and replay storage for avalanche-rs.
//!
//! This crate provides:
//! - [`Strategy`] driving a caller-provided [`Learner`] over experiences
//! - Plugin system ([`StrategyPlugin`], [`PluginList`]) with lifecycle hooks
//! - [`ReservoirSamplingBuffer`] and [`ReplayPlugin`] for experience replay
//! - [`ProgressPlugin`] and [`HistoryPlugin`] for logging and loss history
//!
//! The loop has no numerics of its own: the learner owns the model and its
//! update rule.
//!
//! ## Example
//!
//! ```rust
//! use avl_data::{Batch, ClassificationDataset, VecSource};
//! use avl_scenarios::{NCScenario, NCScenarioConfig};
//! use avl_train::{BatchOutcome, Learner, ProgressPlugin, Strategy, StrategyConfig};
//!
//! struct Counter(usize);
//!
//! impl Learner<f32> for Counter {
//!     fn train_batch(&mut self, batch: &Batch<f32, i64>) -> avl_train::Result<f32> {
//!         self.0 += batch.len();
//!         Ok(0.0)
//!     }
//!
//!     fn eval_batch(&mut self, _batch: &Batch<f32, i64>) -> avl_train::Result<BatchOutcome> {
//!         Ok(BatchOutcome { loss: 0.0, n_correct: None })
//!     }
//! }
//!
//! let data = || {
//!     let source = VecSource::new(vec![0.0_f32; 8], vec![0, 1, 2, 3, 0, 1, 2, 3]).unwrap();
//!     ClassificationDataset::from_source(source).unwrap()
//! };
//! let scenario = NCScenario::new(data(), data(), &NCScenarioConfig::new(2).with_seed(0)).unwrap();
//!
//! let mut strategy = Strategy::new(Counter(0), StrategyConfig::default().with_seed(0))
//!     .unwrap()
//!     .with_plugin(ProgressPlugin::new());
//! for experience in scenario.train_stream() {
//!     strategy.train(experience).unwrap();
//! }
//! assert_eq!(strategy.learner().0, 8);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod callback;
mod error;
mod replay;
mod strategy;

pub use callback::{HistoryPlugin, PluginList, ProgressPlugin, StrategyContext, StrategyPlugin};
pub use error::{Result, TrainError};
pub use replay::{ReplayPlugin, ReservoirSamplingBuffer};
pub use strategy::{BatchOutcome, EvalResult, Learner, Strategy, StrategyConfig, TrainResult};
