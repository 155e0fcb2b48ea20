//! Online streams: experiences split into sub-experiences, fixed-size by default.

use std::fmt;
use std::sync::Arc;

use avl_core::Seed;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScenarioError};
use crate::experience::{CLExperience, ExperienceAttribute, OnlineInfo};
use crate::scenario::{CLScenario, ScenarioStream, StreamFactory};
use crate::stream::{CLStream, EagerCLStream};

/// How experiences are split into online sub-experiences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlineSplitConfig {
    /// Number of samples per sub-experience.
    pub experience_size: usize,
    /// Shuffle the samples of an experience before splitting.
    pub shuffle: bool,
    /// Seed used when shuffling.
    pub seed: Option<u64>,
    /// Drop the last sub-experience when it is shorter than
    /// `experience_size`.
    pub drop_last: bool,
    /// Make boundary attributes readable in training mode.
    pub access_task_boundaries: bool,
}

impl Default for OnlineSplitConfig {
    fn default() -> Self {
        Self {
            experience_size: 10,
            shuffle: false,
            seed: None,
            drop_last: false,
            access_task_boundaries: false,
        }
    }
}

impl OnlineSplitConfig {
    /// Default configuration with sub-experiences of `experience_size`.
    #[must_use]
    pub fn new(experience_size: usize) -> Self {
        Self {
            experience_size,
            ..Self::default()
        }
    }

    /// Enable or disable shuffling.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set the shuffling seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable dropping the last short sub-experience.
    #[must_use]
    pub fn with_drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Make boundary attributes readable during training.
    #[must_use]
    pub fn with_access_task_boundaries(mut self, access: bool) -> Self {
        self.access_task_boundaries = access;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.experience_size == 0 {
            return Err(ScenarioError::InvalidConfig(
                "experience_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// The configuration used for the `index`-th experience of a stream.
    fn for_experience(&self, index: usize) -> Self {
        let mut config = self.clone();
        config.seed = self
            .seed
            .map(|seed| Seed::new(seed).derive(&format!("experience-{index}")).value());
        config
    }
}

/// Lazy sequence of the sub-experiences of one experience.
///
/// Created by [`fixed_size_experience_split`].
pub struct SubExperiences<X> {
    origin: CLExperience<X>,
    indices: Vec<usize>,
    experience_size: usize,
    drop_last: bool,
    access_task_boundaries: bool,
    sub_stream_length: usize,
    start: usize,
}

impl<X: 'static> SubExperiences<X> {
    /// Number of sub-experiences this split produces in total.
    #[must_use]
    pub fn sub_stream_length(&self) -> usize {
        self.sub_stream_length
    }

    fn gated<T>(&self, value: T) -> ExperienceAttribute<T> {
        ExperienceAttribute::new(value, self.access_task_boundaries, false)
    }
}

impl<X: 'static> Iterator for SubExperiences<X> {
    type Item = Result<CLExperience<X>>;

    fn next(&mut self) -> Option<Self::Item> {
        let len = self.indices.len();
        if self.start >= len {
            return None;
        }
        let mut end = self.start + self.experience_size;
        let mut is_last = false;
        if end > len {
            if self.drop_last {
                self.start = len;
                return None;
            }
            end = len;
            is_last = true;
        }
        let is_first = self.start == 0;
        let chunk = self.indices[self.start..end].to_vec();
        self.start = end;

        let dataset = match self.origin.dataset().subset(Some(chunk)) {
            Ok(dataset) => dataset,
            Err(e) => return Some(Err(e.into())),
        };
        let classes = dataset.classes();
        let info = OnlineInfo {
            origin_experience: self.gated(self.origin.clone()),
            subexp_size: self.gated(self.experience_size),
            is_first_subexp: self.gated(is_first),
            is_last_subexp: self.gated(is_last),
            sub_stream_length: self.gated(self.sub_stream_length),
        };
        let exp = CLExperience::with_classes(dataset, self.origin.task_labels().to_vec(), classes)
            .with_online(info);
        Some(Ok(exp))
    }
}

impl<X> fmt::Debug for SubExperiences<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubExperiences")
            .field("len", &self.indices.len())
            .field("experience_size", &self.experience_size)
            .field("sub_stream_length", &self.sub_stream_length)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

/// Split `experience` into sub-experiences of `config.experience_size`
/// samples.
///
/// Only a trailing sub-experience shorter than the nominal size is marked
/// as last; it is dropped instead when `drop_last` is set.
///
/// ```rust
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::{fixed_size_experience_split, CLExperience, OnlineSplitConfig};
///
/// let source = VecSource::new(vec![0.0_f32; 25], vec![0; 25]).unwrap();
/// let exp = CLExperience::new(ClassificationDataset::from_source(source).unwrap(), vec![0]);
///
/// let split = fixed_size_experience_split(&exp, &OnlineSplitConfig::new(10)).unwrap();
/// assert_eq!(split.sub_stream_length(), 3);
/// let sizes: Vec<usize> = split.map(|e| e.unwrap().dataset().len()).collect();
/// assert_eq!(sizes, vec![10, 10, 5]);
/// ```
pub fn fixed_size_experience_split<X: 'static>(
    experience: &CLExperience<X>,
    config: &OnlineSplitConfig,
) -> Result<SubExperiences<X>> {
    config.validate()?;
    let len = experience.dataset().len();
    let mut indices: Vec<usize> = (0..len).collect();
    if config.shuffle {
        let seed = config.seed.map_or_else(Seed::from_entropy, Seed::new);
        seed.shuffle(&mut indices);
    }
    let size = config.experience_size;
    let mut sub_stream_length = len / size;
    if !config.drop_last && len % size > 0 {
        sub_stream_length += 1;
    }
    tracing::debug!(len, size, sub_stream_length, "splitting experience");
    Ok(SubExperiences {
        origin: experience.clone(),
        indices,
        experience_size: size,
        drop_last: config.drop_last,
        access_task_boundaries: config.access_task_boundaries,
        sub_stream_length,
        start: 0,
    })
}

/// Sub-experiences produced from one experience.
pub type SubExperienceIter<X> = Box<dyn Iterator<Item = Result<CLExperience<X>>>>;

/// A custom split of one experience into sub-experiences.
///
/// Replaces [`fixed_size_experience_split`] in [`split_online_stream_with`]
/// and [`OnlineCLScenario::with_splitter`].
pub type ExperienceSplitter<X> =
    Arc<dyn Fn(&CLExperience<X>) -> Result<SubExperienceIter<X>> + Send + Sync>;

enum Splitter<X> {
    FixedSize(OnlineSplitConfig),
    Custom(ExperienceSplitter<X>),
}

impl<X: 'static> Splitter<X> {
    fn split(&self, index: usize, experience: &CLExperience<X>) -> Result<SubExperienceIter<X>> {
        match self {
            Splitter::FixedSize(config) => {
                let split = fixed_size_experience_split(experience, &config.for_experience(index))?;
                Ok(Box::new(split))
            }
            Splitter::Custom(split) => split(experience),
        }
    }
}

impl<X> Clone for Splitter<X> {
    fn clone(&self) -> Self {
        match self {
            Splitter::FixedSize(config) => Splitter::FixedSize(config.clone()),
            Splitter::Custom(split) => Splitter::Custom(Arc::clone(split)),
        }
    }
}

impl<X> fmt::Debug for Splitter<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Splitter::FixedSize(config) => f.debug_tuple("FixedSize").field(config).finish(),
            Splitter::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// A lazy online stream with the sub-experiences of every experience of
/// `stream`, in order. The stream keeps the original name.
pub fn split_online_stream<X: 'static>(
    stream: CLStream<X>,
    config: &OnlineSplitConfig,
) -> Result<CLStream<X>> {
    config.validate()?;
    Ok(online_stream(stream, Splitter::FixedSize(config.clone())))
}

/// Like [`split_online_stream`], with sub-experience boundaries chosen by
/// `splitter`.
///
/// ```rust
/// use std::sync::Arc;
///
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::{
///     split_online_stream_with, CLExperience, EagerCLStream, ExperienceSplitter, SubExperienceIter,
/// };
///
/// let source = VecSource::new(vec![0.0_f32; 5], vec![0; 5]).unwrap();
/// let exp = CLExperience::new(ClassificationDataset::from_source(source).unwrap(), vec![0]);
/// let stream = EagerCLStream::new("train", vec![exp]);
///
/// // the first sample alone, then the rest
/// let splitter: ExperienceSplitter<f32> = Arc::new(
///     |exp: &CLExperience<f32>| -> avl_scenarios::Result<SubExperienceIter<f32>> {
///         let len = exp.dataset().len();
///         let head = exp.dataset().subset(Some(vec![0]))?;
///         let tail = exp.dataset().subset(Some((1..len).collect()))?;
///         let labels = exp.task_labels().to_vec();
///         Ok(Box::new(
///             vec![
///                 Ok(CLExperience::new(head, labels.clone())),
///                 Ok(CLExperience::new(tail, labels)),
///             ]
///             .into_iter(),
///         ))
///     },
/// );
///
/// let sizes: Vec<usize> = split_online_stream_with(stream.to_lazy(), splitter)
///     .map(|e| e.unwrap().dataset().len())
///     .collect();
/// assert_eq!(sizes, vec![1, 4]);
/// ```
pub fn split_online_stream_with<X: 'static>(
    stream: CLStream<X>,
    splitter: ExperienceSplitter<X>,
) -> CLStream<X> {
    online_stream(stream, Splitter::Custom(splitter))
}

fn online_stream<X: 'static>(stream: CLStream<X>, splitter: Splitter<X>) -> CLStream<X> {
    let name = stream.name().to_string();
    let experiences = stream.enumerate().flat_map(move |(index, exp)| {
        let iter: SubExperienceIter<X> = match exp.and_then(|exp| splitter.split(index, &exp)) {
            Ok(split) => split,
            Err(e) => Box::new(std::iter::once(Err(e))),
        };
        iter
    });
    CLStream::new(name, experiences)
}

/// A benchmark whose training stream is an online split of another
/// benchmark's training stream.
///
/// Every original stream is kept under `original_<name>`; the online
/// `train` stream is regenerated on each request.
pub struct OnlineCLScenario<X> {
    scenario: CLScenario<X>,
    splitter: Splitter<X>,
}

impl<X: 'static> OnlineCLScenario<X> {
    /// Split the `train` stream among `original_streams`.
    pub fn new(original_streams: Vec<EagerCLStream<X>>, config: OnlineSplitConfig) -> Result<Self> {
        config.validate()?;
        let train = Self::find_train(&original_streams)?.clone();
        Ok(Self::build(original_streams, train, Splitter::FixedSize(config)))
    }

    /// Split the `train` stream among `original_streams` with `splitter`.
    pub fn with_splitter(
        original_streams: Vec<EagerCLStream<X>>,
        splitter: ExperienceSplitter<X>,
    ) -> Result<Self> {
        let train = Self::find_train(&original_streams)?.clone();
        Ok(Self::build(original_streams, train, Splitter::Custom(splitter)))
    }

    /// Split `experiences` instead of the original `train` stream, which
    /// must still be present.
    pub fn from_experiences(
        original_streams: Vec<EagerCLStream<X>>,
        experiences: Vec<CLExperience<X>>,
        config: OnlineSplitConfig,
    ) -> Result<Self> {
        config.validate()?;
        Self::find_train(&original_streams)?;
        let source = EagerCLStream::without_stream_info("train", experiences);
        Ok(Self::build(original_streams, source, Splitter::FixedSize(config)))
    }

    fn find_train(streams: &[EagerCLStream<X>]) -> Result<&EagerCLStream<X>> {
        streams
            .iter()
            .find(|stream| stream.name() == "train")
            .ok_or_else(|| {
                ScenarioError::InvalidConfig("the original streams have no train stream".to_string())
            })
    }

    fn build(
        original_streams: Vec<EagerCLStream<X>>,
        source: EagerCLStream<X>,
        splitter: Splitter<X>,
    ) -> Self {
        let stream_splitter = splitter.clone();
        let factory: StreamFactory<X> =
            Arc::new(move || online_stream(source.to_lazy(), stream_splitter.clone()));

        let mut streams = vec![ScenarioStream::Lazy {
            name: "train".to_string(),
            factory,
        }];
        streams.extend(original_streams.iter().map(|stream| {
            ScenarioStream::Eager(stream.renamed(format!("original_{}", stream.name())))
        }));
        tracing::info!(
            ?splitter,
            n_original_streams = original_streams.len(),
            "created online scenario"
        );
        Self {
            scenario: CLScenario::new(streams),
            splitter,
        }
    }

    /// A fresh online training stream.
    pub fn train_stream(&self) -> Result<CLStream<X>> {
        Ok(self.scenario.stream("train")?.iter())
    }

    /// The original stream named `name`.
    pub fn original_stream(&self, name: &str) -> Result<&EagerCLStream<X>> {
        self.scenario.eager_stream(&format!("original_{name}"))
    }

    /// The fixed-size split configuration; `None` with a custom splitter.
    #[must_use]
    pub fn config(&self) -> Option<&OnlineSplitConfig> {
        match &self.splitter {
            Splitter::FixedSize(config) => Some(config),
            Splitter::Custom(_) => None,
        }
    }

    /// The generic benchmark view.
    #[must_use]
    pub fn scenario(&self) -> &CLScenario<X> {
        &self.scenario
    }
}

impl<X> fmt::Debug for OnlineCLScenario<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnlineCLScenario")
            .field("scenario", &self.scenario)
            .field("splitter", &self.splitter)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avl_core::ErrorKind;
    use avl_data::{ClassificationDataset, VecSource};

    fn experience(len: usize, task: i64) -> CLExperience<usize> {
        let targets: Vec<i64> = (0..len).map(|i| (i % 3) as i64).collect();
        let source = VecSource::new((0..len).collect(), targets).unwrap();
        CLExperience::new(ClassificationDataset::from_source(source).unwrap(), vec![task])
    }

    fn streams() -> Vec<EagerCLStream<usize>> {
        vec![
            EagerCLStream::new("train", vec![experience(25, 0), experience(10, 1)]),
            EagerCLStream::new("test", vec![experience(5, 0)]),
        ]
    }

    #[test]
    fn test_split_sizes_and_flags() {
        let exp = experience(25, 4);
        let subs: Vec<_> = fixed_size_experience_split(&exp, &OnlineSplitConfig::new(10))
            .unwrap()
            .map(|e| e.unwrap().logging())
            .collect();
        assert_eq!(subs.len(), 3);
        assert!(subs[0].is_first_subexp().unwrap());
        assert!(!subs[1].is_first_subexp().unwrap());
        assert!(!subs[1].is_last_subexp().unwrap());
        assert!(subs[2].is_last_subexp().unwrap());
        assert_eq!(subs[2].sub_stream_length().unwrap(), 3);
        assert_eq!(subs[2].subexp_size().unwrap(), 10);
        assert_eq!(subs[2].task_labels(), &[4]);
        assert_eq!(subs[0].classes_in_this_experience(), &[0, 1, 2]);
        assert_eq!(subs[0].origin_experience().unwrap().dataset().len(), 25);
    }

    #[test]
    fn test_drop_last() {
        let exp = experience(25, 0);
        let config = OnlineSplitConfig::new(10).with_drop_last(true);
        let split = fixed_size_experience_split(&exp, &config).unwrap();
        assert_eq!(split.sub_stream_length(), 2);
        assert_eq!(split.count(), 2);
    }

    #[test]
    fn test_boundaries_hidden_in_training() {
        let exp = experience(4, 0);
        let sub = fixed_size_experience_split(&exp, &OnlineSplitConfig::new(2))
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        let err = sub.train().is_first_subexp().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MaskedAttribute);
        assert!(sub.inference().subexp_size().is_err());

        let config = OnlineSplitConfig::new(2).with_access_task_boundaries(true);
        let sub = fixed_size_experience_split(&exp, &config)
            .unwrap()
            .next()
            .unwrap()
            .unwrap();
        assert!(sub.train().is_first_subexp().unwrap());
    }

    #[test]
    fn test_seeded_shuffle_covers_all_samples() {
        let exp = experience(30, 0);
        let config = OnlineSplitConfig::new(7).with_shuffle(true).with_seed(11);
        let collect = || -> Vec<usize> {
            fixed_size_experience_split(&exp, &config)
                .unwrap()
                .flat_map(|e| {
                    let e = e.unwrap();
                    (0..e.dataset().len())
                        .map(|i| e.dataset().get(i).unwrap().input)
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        let a = collect();
        assert_eq!(a, collect());
        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn test_online_stream_is_stamped() {
        let train = streams().remove(0);
        let online = split_online_stream(train.to_lazy(), &OnlineSplitConfig::new(10)).unwrap();
        assert_eq!(online.name(), "train");
        let exps: Vec<_> = online.map(|e| e.unwrap().logging()).collect();
        assert_eq!(exps.len(), 4);
        assert_eq!(exps[3].current_experience().unwrap(), 3);
        assert_eq!(exps[3].task_labels(), &[1]);
    }

    #[test]
    fn test_online_scenario() {
        let scenario = OnlineCLScenario::new(streams(), OnlineSplitConfig::new(5)).unwrap();
        assert_eq!(scenario.config().map(|c| c.experience_size), Some(5));
        assert_eq!(scenario.train_stream().unwrap().count(), 7);
        assert_eq!(scenario.train_stream().unwrap().count(), 7);
        assert_eq!(scenario.original_stream("test").unwrap().len(), 1);
        assert_eq!(scenario.original_stream("train").unwrap().len(), 2);
        let keys: Vec<_> = scenario.scenario().stream_keys().collect();
        assert_eq!(
            keys,
            vec!["train_stream", "original_train_stream", "original_test_stream"]
        );
    }

    #[test]
    fn test_online_scenario_from_experiences() {
        let scenario = OnlineCLScenario::from_experiences(
            streams(),
            vec![experience(6, 2)],
            OnlineSplitConfig::new(4),
        )
        .unwrap();
        let sizes: Vec<usize> = scenario
            .train_stream()
            .unwrap()
            .map(|e| e.unwrap().dataset().len())
            .collect();
        assert_eq!(sizes, vec![4, 2]);
    }

    /// Chunks of 1, 2, 3, ... samples; the last chunk takes what is left.
    fn growing_splitter() -> ExperienceSplitter<usize> {
        Arc::new(|exp: &CLExperience<usize>| -> Result<SubExperienceIter<usize>> {
            let len = exp.dataset().len();
            let mut chunks: Vec<Result<CLExperience<usize>>> = Vec::new();
            let (mut start, mut size) = (0, 1);
            while start < len {
                let end = (start + size).min(len);
                let dataset = exp.dataset().subset(Some((start..end).collect()))?;
                chunks.push(Ok(CLExperience::new(dataset, exp.task_labels().to_vec())));
                start = end;
                size += 1;
            }
            Ok(Box::new(chunks.into_iter()))
        })
    }

    #[test]
    fn test_custom_splitter_stream() {
        let train = streams().remove(0);
        let online = split_online_stream_with(train.to_lazy(), growing_splitter());
        assert_eq!(online.name(), "train");
        let exps: Vec<_> = online.map(|e| e.unwrap().logging()).collect();
        let sizes: Vec<usize> = exps.iter().map(|e| e.dataset().len()).collect();
        assert_eq!(sizes, vec![1, 2, 3, 4, 5, 6, 4, 1, 2, 3, 4]);
        assert_eq!(exps[6].task_labels(), &[0]);
        assert_eq!(exps[7].task_labels(), &[1]);
        assert_eq!(exps[10].current_experience().unwrap(), 10);
        let first_inputs: Vec<usize> = (0..3)
            .map(|i| exps[2].dataset().get(i).unwrap().input)
            .collect();
        assert_eq!(first_inputs, vec![3, 4, 5]);
    }

    #[test]
    fn test_online_scenario_with_splitter() {
        let scenario = OnlineCLScenario::with_splitter(streams(), growing_splitter()).unwrap();
        assert!(scenario.config().is_none());
        let sizes: Vec<usize> = scenario
            .train_stream()
            .unwrap()
            .map(|e| e.unwrap().dataset().len())
            .collect();
        assert_eq!(sizes, vec![1, 2, 3, 4, 5, 6, 4, 1, 2, 3, 4]);
        assert_eq!(scenario.train_stream().unwrap().count(), 11);
        assert_eq!(scenario.original_stream("test").unwrap().len(), 1);

        let no_train = vec![EagerCLStream::new("test", vec![experience(5, 0)])];
        let err = OnlineCLScenario::with_splitter(no_train, growing_splitter()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_splitter_errors_reach_the_stream() {
        let failing: ExperienceSplitter<usize> =
            Arc::new(|exp: &CLExperience<usize>| -> Result<SubExperienceIter<usize>> {
                let len = exp.dataset().len();
                let dataset = exp.dataset().subset(Some(vec![len]))?;
                Ok(Box::new(std::iter::once(Ok(CLExperience::new(dataset, vec![0])))))
            });
        let train = streams().remove(0);
        let mut online = split_online_stream_with(train.to_lazy(), failing);
        assert!(online.next().unwrap().is_err());
    }

    #[test]
    fn test_invalid_online_configs() {
        let no_train = vec![EagerCLStream::new("test", vec![experience(5, 0)])];
        let err = OnlineCLScenario::new(no_train, OnlineSplitConfig::new(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = OnlineCLScenario::new(streams(), OnlineSplitConfig::new(0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
