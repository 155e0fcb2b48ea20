//! Benchmarks as named collections of streams.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Result, ScenarioError};
use crate::stream::{CLStream, EagerCLStream};

/// Builds a fresh lazy stream on every request.
pub type StreamFactory<X> = Arc<dyn Fn() -> CLStream<X> + Send + Sync>;

/// A stream held by a [`CLScenario`].
pub enum ScenarioStream<X> {
    /// A materialized stream.
    Eager(EagerCLStream<X>),
    /// A lazy stream, regenerated for every pass.
    Lazy {
        /// Name of the stream.
        name: String,
        /// Producer of single-pass streams.
        factory: StreamFactory<X>,
    },
}

impl<X: 'static> ScenarioStream<X> {
    /// Name of the stream.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            ScenarioStream::Eager(stream) => stream.name(),
            ScenarioStream::Lazy { name, .. } => name,
        }
    }

    /// A single-pass iterator over the experiences of the stream.
    #[must_use]
    pub fn iter(&self) -> CLStream<X> {
        match self {
            ScenarioStream::Eager(stream) => stream.to_lazy(),
            ScenarioStream::Lazy { factory, .. } => factory(),
        }
    }

    /// The stream, if it is materialized.
    #[must_use]
    pub fn as_eager(&self) -> Option<&EagerCLStream<X>> {
        match self {
            ScenarioStream::Eager(stream) => Some(stream),
            ScenarioStream::Lazy { .. } => None,
        }
    }
}

impl<X> Clone for ScenarioStream<X> {
    fn clone(&self) -> Self {
        match self {
            ScenarioStream::Eager(stream) => ScenarioStream::Eager(stream.clone()),
            ScenarioStream::Lazy { name, factory } => ScenarioStream::Lazy {
                name: name.clone(),
                factory: Arc::clone(factory),
            },
        }
    }
}

impl<X> fmt::Debug for ScenarioStream<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScenarioStream::Eager(stream) => f.debug_tuple("Eager").field(stream).finish(),
            ScenarioStream::Lazy { name, .. } => {
                f.debug_struct("Lazy").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

impl<X> From<EagerCLStream<X>> for ScenarioStream<X> {
    fn from(stream: EagerCLStream<X>) -> Self {
        ScenarioStream::Eager(stream)
    }
}

/// A continual-learning benchmark: streams keyed by `"<name>_stream"`.
///
/// Benchmarks expose past, current and future data and are meant for the
/// code driving an experiment, not for training strategies.
///
/// ```rust
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::{CLExperience, CLScenario, EagerCLStream};
///
/// let data = ClassificationDataset::from_source(
///     VecSource::new(vec![0.0_f32], vec![0]).unwrap(),
/// )
/// .unwrap();
/// let train = EagerCLStream::new("train", vec![CLExperience::new(data, vec![0])]);
/// let scenario = CLScenario::new(vec![train.into()]);
///
/// assert!(scenario.get("train_stream").is_ok());
/// assert!(scenario.stream("valid").is_err());
/// ```
pub struct CLScenario<X> {
    streams: IndexMap<String, ScenarioStream<X>>,
}

impl<X: 'static> CLScenario<X> {
    /// Create a benchmark from its streams.
    ///
    /// A later stream replaces an earlier one with the same name.
    #[must_use]
    pub fn new(streams: Vec<ScenarioStream<X>>) -> Self {
        let streams = streams
            .into_iter()
            .map(|stream| (format!("{}_stream", stream.name()), stream))
            .collect();
        Self { streams }
    }

    /// The stream stored under `key`, e.g. `"train_stream"`.
    pub fn get(&self, key: &str) -> Result<&ScenarioStream<X>> {
        self.streams
            .get(key)
            .ok_or_else(|| ScenarioError::UnknownStream(key.to_string()))
    }

    /// The stream named `name`, e.g. `"train"`.
    pub fn stream(&self, name: &str) -> Result<&ScenarioStream<X>> {
        self.get(&format!("{name}_stream"))
    }

    /// The materialized stream named `name`.
    pub fn eager_stream(&self, name: &str) -> Result<&EagerCLStream<X>> {
        self.stream(name)?
            .as_eager()
            .ok_or_else(|| ScenarioError::UnknownStream(format!("{name} (eager)")))
    }

    /// Keys of all streams, in insertion order.
    pub fn stream_keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.streams.keys().map(String::as_str)
    }

    /// All streams, in insertion order.
    pub fn streams(&self) -> impl Iterator<Item = &ScenarioStream<X>> + '_ {
        self.streams.values()
    }

    /// Number of streams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    /// Check if the benchmark has no streams.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

impl<X> Clone for CLScenario<X> {
    fn clone(&self) -> Self {
        Self {
            streams: self.streams.clone(),
        }
    }
}

impl<X> fmt::Debug for CLScenario<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CLScenario")
            .field("streams", &self.streams.keys().collect::<Vec<_>>())
            .finish()
    }
}
