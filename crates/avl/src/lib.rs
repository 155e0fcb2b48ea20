//! # avl
//!
//! Continual learning benchmarks and dataset composition in Rust.
//!
//! avalanche-rs turns a labelled dataset into a sequence of experiences and
//! hands them to a training loop:
//!
//! - **Data**: lazily composed datasets with swappable transform groups
//! - **Scenarios**: class-incremental partitions, online splits, streams
//! - **Training**: a plugin-driven experience loop with replay storage
//!
//! ## Quick Start
//!
//! ```rust
//! use avl::prelude::*;
//!
//! let data = |n: usize| {
//!     let targets: Vec<i64> = (0..n).map(|i| (i % 10) as i64).collect();
//!     let source = VecSource::new((0..n).collect::<Vec<usize>>(), targets).unwrap();
//!     ClassificationDataset::from_source(source).unwrap()
//! };
//!
//! let config = NCScenarioConfig::new(5).with_seed(1234);
//! let scenario = NCScenario::new(data(100), data(50), &config).unwrap();
//!
//! for experience in scenario.train_stream() {
//!     assert_eq!(experience.classes_in_this_experience().len(), 2);
//!     assert_eq!(experience.dataset().len(), 20);
//! }
//!
//! // Training code may not peek at the experience index.
//! let first = scenario.train_stream().get(0).unwrap().train();
//! assert_eq!(
//!     first.current_experience().unwrap_err().kind(),
//!     ErrorKind::MaskedAttribute
//! );
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub use avl_core as core;
pub use avl_data as data;
pub use avl_scenarios as scenarios;
pub use avl_train as train;

/// Prelude module for convenient imports.
///
/// ```rust
/// use avl::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use avl_core::{ErrorKind, ExperienceMode, Seed, Transform};

    // Data
    pub use avl_data::{
        concat_datasets_sequentially, AvalancheDataset, ClassMapping, ClassificationDataset,
        DataAttribute, DataLoader, TransformGroups, TransformPair, VecSource,
    };

    // Scenarios
    pub use avl_scenarios::{
        create_multi_dataset_scenario, CLExperience, CLScenario, CLStream, EagerCLStream,
        NCScenario, NCScenarioConfig, OnlineCLScenario, OnlineSplitConfig, ReproducibilityData,
    };

    // Training
    pub use avl_train::{
        BatchOutcome, Learner, ProgressPlugin, ReplayPlugin, Strategy, StrategyConfig,
        StrategyPlugin,
    };
}

/// All module for importing everything.
pub mod all {
    pub use super::prelude::*;

    // Additional exports
    pub use avl_core::{Compose, FnTransform, Identity, SharedTransform};
    pub use avl_data::{
        ArraySource, Batch, Sample, SampleSource, TaskLabels, TaskSet, EVAL_GROUP, TRAIN_GROUP,
    };
    pub use avl_scenarios::{
        fixed_size_experience_split, split_online_stream, split_online_stream_with,
        ExperienceAttribute, ExperienceSplitter, ScenarioStream, StreamRef, SubExperienceIter,
        SubExperiences,
    };
    pub use avl_train::{
        HistoryPlugin, PluginList, ReservoirSamplingBuffer, StrategyContext, TrainResult,
    };
}
