//! Class-incremental ("new classes") scenarios.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use avl_core::Seed;
use avl_data::{ClassMapping, ClassificationDataset, DataAttribute, DataError};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScenarioError};
use crate::experience::CLExperience;
use crate::scenario::CLScenario;
use crate::stream::EagerCLStream;

/// Configuration of an [`NCScenario`].
///
/// ```rust
/// use avl_scenarios::NCScenarioConfig;
///
/// let config = NCScenarioConfig::new(5)
///     .with_seed(1234)
///     .with_class_ids_from_zero_from_first_exp(true);
/// assert!(config.validate().is_ok());
/// assert!(config.with_class_ids_from_zero_in_each_exp(true).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NCScenarioConfig {
    /// Number of experiences.
    pub n_experiences: usize,
    /// Give every experience its own task label (its index).
    pub task_labels: bool,
    /// Shuffle the class order. Ignored when a fixed order is given.
    pub shuffle: bool,
    /// Seed used when shuffling.
    pub seed: Option<u64>,
    /// Explicit class order; may leave out classes of the dataset.
    pub fixed_class_order: Option<Vec<i64>>,
    /// Class count of some experiences; the rest is split evenly.
    pub per_experience_classes: Option<BTreeMap<usize, usize>>,
    /// Remap class ids to `0..n_classes` following the class order.
    pub class_ids_from_zero_from_first_exp: bool,
    /// Remap class ids to `0..k` inside each experience.
    pub class_ids_from_zero_in_each_exp: bool,
    /// Replay a previous partition, overriding every other option.
    pub reproducibility_data: Option<ReproducibilityData>,
}

impl Default for NCScenarioConfig {
    fn default() -> Self {
        Self {
            n_experiences: 1,
            task_labels: false,
            shuffle: true,
            seed: None,
            fixed_class_order: None,
            per_experience_classes: None,
            class_ids_from_zero_from_first_exp: false,
            class_ids_from_zero_in_each_exp: false,
            reproducibility_data: None,
        }
    }
}

impl NCScenarioConfig {
    /// Default configuration with `n_experiences` experiences.
    #[must_use]
    pub fn new(n_experiences: usize) -> Self {
        Self {
            n_experiences,
            ..Self::default()
        }
    }

    /// Set the number of experiences.
    #[must_use]
    pub fn with_n_experiences(mut self, n_experiences: usize) -> Self {
        self.n_experiences = n_experiences;
        self
    }

    /// Enable or disable per-experience task labels.
    #[must_use]
    pub fn with_task_labels(mut self, task_labels: bool) -> Self {
        self.task_labels = task_labels;
        self
    }

    /// Enable or disable class order shuffling.
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

    /// Set an explicit class order.
    #[must_use]
    pub fn with_fixed_class_order(mut self, order: Vec<i64>) -> Self {
        self.fixed_class_order = Some(order);
        self
    }

    /// Set the class count of some experiences.
    #[must_use]
    pub fn with_per_experience_classes(mut self, classes: BTreeMap<usize, usize>) -> Self {
        self.per_experience_classes = Some(classes);
        self
    }

    /// Remap class ids to `0..n_classes` following the class order.
    #[must_use]
    pub fn with_class_ids_from_zero_from_first_exp(mut self, enabled: bool) -> Self {
        self.class_ids_from_zero_from_first_exp = enabled;
        self
    }

    /// Remap class ids to `0..k` inside each experience.
    #[must_use]
    pub fn with_class_ids_from_zero_in_each_exp(mut self, enabled: bool) -> Self {
        self.class_ids_from_zero_in_each_exp = enabled;
        self
    }

    /// Replay a previous partition.
    #[must_use]
    pub fn with_reproducibility_data(mut self, data: ReproducibilityData) -> Self {
        self.reproducibility_data = Some(data);
        self
    }

    /// Check the options that do not depend on the dataset.
    pub fn validate(&self) -> Result<()> {
        if self.class_ids_from_zero_from_first_exp && self.class_ids_from_zero_in_each_exp {
            return Err(ScenarioError::InvalidConfig(
                "class_ids_from_zero_from_first_exp and class_ids_from_zero_in_each_exp \
                 are mutually exclusive"
                    .to_string(),
            ));
        }
        let n_experiences = self
            .reproducibility_data
            .as_ref()
            .map_or(self.n_experiences, |data| data.n_experiences);
        if n_experiences < 1 {
            return Err(ScenarioError::InvalidConfig(
                "n_experiences must be greater than 0".to_string(),
            ));
        }
        if let Some(data) = &self.reproducibility_data {
            data.validate()?;
        }
        Ok(())
    }
}

/// Everything needed to rebuild the same partition without re-seeding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReproducibilityData {
    /// `class_mapping[original] = remapped`, or `-1` for excluded classes.
    pub class_mapping: Vec<i64>,
    /// Class count of each experience.
    pub n_classes_per_exp: Vec<usize>,
    /// Whether ids were remapped following the class order.
    pub class_ids_from_zero_from_first_exp: bool,
    /// Whether ids were remapped inside each experience.
    pub class_ids_from_zero_in_each_exp: bool,
    /// Class order, remapped ids.
    pub classes_order: Vec<i64>,
    /// Class order, original ids.
    pub classes_order_original_ids: Vec<i64>,
    /// Number of experiences.
    pub n_experiences: usize,
    /// Whether experiences carry their index as task label.
    #[serde(default)]
    pub task_labels: bool,
}

impl ReproducibilityData {
    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse from JSON and check consistency.
    pub fn from_json(json: &str) -> Result<Self> {
        let data: Self = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    /// Check that the payload describes a well-formed partition.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ScenarioError::InvalidReproducibilityData(msg));
        if self.n_experiences < 1 {
            return invalid("n_experiences must be greater than 0".to_string());
        }
        if self.class_ids_from_zero_from_first_exp && self.class_ids_from_zero_in_each_exp {
            return invalid("both remapping policies are set".to_string());
        }
        if self.n_classes_per_exp.len() != self.n_experiences {
            return invalid(format!(
                "{} class counts for {} experiences",
                self.n_classes_per_exp.len(),
                self.n_experiences
            ));
        }
        let n_classes: usize = self.n_classes_per_exp.iter().sum();
        if self.classes_order.len() != n_classes
            || self.classes_order_original_ids.len() != n_classes
        {
            return invalid(format!(
                "class orders must contain {n_classes} classes, got {} and {}",
                self.classes_order.len(),
                self.classes_order_original_ids.len()
            ));
        }
        let mut seen = HashSet::with_capacity(n_classes);
        for (&original, &remapped) in self
            .classes_order_original_ids
            .iter()
            .zip(&self.classes_order)
        {
            if original < 0 || !seen.insert(original) {
                return invalid(format!("class {original} is negative or repeated"));
            }
            let mapped = usize::try_from(original)
                .ok()
                .and_then(|i| self.class_mapping.get(i).copied());
            if mapped != Some(remapped) {
                return invalid(format!(
                    "class {original} maps to {mapped:?} but the order says {remapped}"
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Remap {
    Identity,
    FromFirstExp,
    InEachExp,
}

impl Remap {
    fn from_flags(from_first: bool, in_each: bool) -> Self {
        match (from_first, in_each) {
            (true, _) => Remap::FromFirstExp,
            (false, true) => Remap::InEachExp,
            (false, false) => Remap::Identity,
        }
    }
}

/// A class-incremental benchmark.
///
/// The classes of the training set are ordered (sorted, shuffled or fixed),
/// cut into consecutive runs, one per experience, and every train and test
/// sample goes to the experience owning its class. Class ids can be remapped
/// to start from zero, either globally or inside each experience.
///
/// ```rust
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::{NCScenario, NCScenarioConfig};
///
/// let targets: Vec<i64> = (0..40).map(|i| i % 4).collect();
/// let source = VecSource::new(vec![0.0_f32; 40], targets).unwrap();
/// let data = ClassificationDataset::from_source(source).unwrap();
///
/// let config = NCScenarioConfig::new(2).with_shuffle(false);
/// let scenario = NCScenario::new(data.clone(), data, &config).unwrap();
///
/// assert_eq!(scenario.n_classes_per_exp(), &[2, 2]);
/// assert_eq!(scenario.train_stream().get(1).unwrap().classes_in_this_experience(), &[2, 3]);
/// assert_eq!(scenario.train_stream().get(1).unwrap().dataset().len(), 20);
/// ```
pub struct NCScenario<X> {
    n_experiences: usize,
    task_labels: bool,
    remap: Remap,
    classes_order: Vec<i64>,
    classes_order_original_ids: Vec<i64>,
    class_mapping: ClassMapping,
    n_classes_per_exp: Vec<usize>,
    classes_in_experience: Vec<BTreeSet<i64>>,
    original_classes_in_exp: Vec<BTreeSet<i64>>,
    train_exps_patterns_assignment: Vec<Vec<usize>>,
    test_exps_patterns_assignment: Vec<Vec<usize>>,
    original_train_dataset: ClassificationDataset<X>,
    original_test_dataset: ClassificationDataset<X>,
    train_stream: EagerCLStream<X>,
    test_stream: EagerCLStream<X>,
}

impl<X: 'static> NCScenario<X> {
    /// Partition `train` and `test` into class-incremental experiences.
    ///
    /// Construction is all-or-nothing: any invalid option fails before a
    /// scenario is returned.
    pub fn new(
        train: ClassificationDataset<X>,
        test: ClassificationDataset<X>,
        config: &NCScenarioConfig,
    ) -> Result<Self> {
        config.validate()?;
        let dataset_classes = train.classes();
        if let Some(&class) = dataset_classes.first().filter(|&&c| c < 0) {
            return Err(DataError::InvalidValue(format!(
                "class ids must be non-negative, found {class}"
            ))
            .into());
        }

        let partition = match &config.reproducibility_data {
            Some(data) => Partition::replay(data),
            None => Partition::compute(&dataset_classes, config)?,
        };
        let Partition {
            n_experiences,
            task_labels,
            remap,
            classes_order,
            classes_order_original_ids,
            class_mapping,
            n_classes_per_exp,
        } = partition;

        let mut classes_in_experience: Vec<BTreeSet<i64>> = Vec::with_capacity(n_experiences);
        let mut original_classes_in_exp: Vec<BTreeSet<i64>> = Vec::with_capacity(n_experiences);
        let mut start = 0;
        for &count in &n_classes_per_exp {
            let end = start + count;
            classes_in_experience.push(classes_order[start..end].iter().copied().collect());
            original_classes_in_exp.push(classes_order_original_ids[start..end].iter().copied().collect());
            start = end;
        }

        let owner: HashMap<i64, usize> = original_classes_in_exp
            .iter()
            .enumerate()
            .flat_map(|(exp, classes)| classes.iter().map(move |&class| (class, exp)))
            .collect();
        let train_exps_patterns_assignment = assign_patterns(train.targets(), &owner, n_experiences);
        let test_exps_patterns_assignment = assign_patterns(test.targets(), &owner, n_experiences);

        let class_mapping = ClassMapping::new(class_mapping);
        let build_stream = |name: &str,
                            dataset: &ClassificationDataset<X>,
                            assignment: &[Vec<usize>]|
         -> Result<EagerCLStream<X>> {
            let mut experiences = Vec::with_capacity(n_experiences);
            for (exp, indices) in assignment.iter().enumerate() {
                let label = if task_labels { exp as i64 } else { 0 };
                let subset = dataset
                    .subset_with_mapping(Some(indices.clone()), Some(&class_mapping))?
                    .with_task_labels(label)?;
                let classes = classes_in_experience[exp].iter().copied().collect();
                experiences.push(CLExperience::with_classes(subset, vec![label], classes));
            }
            Ok(EagerCLStream::new(name, experiences))
        };
        let train_stream = build_stream("train", &train, &train_exps_patterns_assignment)?;
        let test_stream = build_stream("test", &test, &test_exps_patterns_assignment)?;

        tracing::info!(
            n_experiences,
            n_classes = classes_order.len(),
            task_labels,
            train_len = train.len(),
            test_len = test.len(),
            "created class-incremental scenario"
        );

        Ok(Self {
            n_experiences,
            task_labels,
            remap,
            classes_order,
            classes_order_original_ids,
            class_mapping,
            n_classes_per_exp,
            classes_in_experience,
            original_classes_in_exp,
            train_exps_patterns_assignment,
            test_exps_patterns_assignment,
            original_train_dataset: train,
            original_test_dataset: test,
            train_stream,
            test_stream,
        })
    }

    /// Rebuild a scenario from exported reproducibility data.
    pub fn from_reproducibility_data(
        train: ClassificationDataset<X>,
        test: ClassificationDataset<X>,
        data: ReproducibilityData,
    ) -> Result<Self> {
        let config = NCScenarioConfig::default().with_reproducibility_data(data);
        Self::new(train, test, &config)
    }

    /// Number of experiences.
    #[must_use]
    pub fn n_experiences(&self) -> usize {
        self.n_experiences
    }

    /// Number of classes in the scenario.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes_order.len()
    }

    /// Whether experiences carry their index as task label.
    #[must_use]
    pub fn task_labels(&self) -> bool {
        self.task_labels
    }

    /// Class order, remapped ids.
    #[must_use]
    pub fn classes_order(&self) -> &[i64] {
        &self.classes_order
    }

    /// Class order, original ids.
    #[must_use]
    pub fn classes_order_original_ids(&self) -> &[i64] {
        &self.classes_order_original_ids
    }

    /// Mapping from original to remapped class ids.
    #[must_use]
    pub fn class_mapping(&self) -> &ClassMapping {
        &self.class_mapping
    }

    /// Class count of each experience.
    #[must_use]
    pub fn n_classes_per_exp(&self) -> &[usize] {
        &self.n_classes_per_exp
    }

    /// Remapped classes of each experience.
    #[must_use]
    pub fn classes_in_experience(&self) -> &[BTreeSet<i64>] {
        &self.classes_in_experience
    }

    /// Original classes of each experience.
    #[must_use]
    pub fn original_classes_in_exp(&self) -> &[BTreeSet<i64>] {
        &self.original_classes_in_exp
    }

    /// Training set indices of each experience.
    #[must_use]
    pub fn train_exps_patterns_assignment(&self) -> &[Vec<usize>] {
        &self.train_exps_patterns_assignment
    }

    /// Test set indices of each experience.
    #[must_use]
    pub fn test_exps_patterns_assignment(&self) -> &[Vec<usize>] {
        &self.test_exps_patterns_assignment
    }

    /// The training set the scenario was built from.
    #[must_use]
    pub fn original_train_dataset(&self) -> &ClassificationDataset<X> {
        &self.original_train_dataset
    }

    /// The test set the scenario was built from.
    #[must_use]
    pub fn original_test_dataset(&self) -> &ClassificationDataset<X> {
        &self.original_test_dataset
    }

    /// Remapped classes of experiences `start..end` (`start..` when `end`
    /// is `None`), in experience order. Out-of-range bounds are clamped.
    #[must_use]
    pub fn classes_in_exp_range(&self, start: usize, end: Option<usize>) -> Vec<i64> {
        let end = end.unwrap_or(self.n_experiences).min(self.n_experiences);
        let start = start.min(end);
        self.classes_in_experience[start..end]
            .iter()
            .flat_map(|classes| classes.iter().copied())
            .collect()
    }

    /// Export the partition.
    #[must_use]
    pub fn get_reproducibility_data(&self) -> ReproducibilityData {
        ReproducibilityData {
            class_mapping: self.class_mapping.as_slice().to_vec(),
            n_classes_per_exp: self.n_classes_per_exp.clone(),
            class_ids_from_zero_from_first_exp: self.remap == Remap::FromFirstExp,
            class_ids_from_zero_in_each_exp: self.remap == Remap::InEachExp,
            classes_order: self.classes_order.clone(),
            classes_order_original_ids: self.classes_order_original_ids.clone(),
            n_experiences: self.n_experiences,
            task_labels: self.task_labels,
        }
    }

    /// The training stream.
    #[must_use]
    pub fn train_stream(&self) -> &EagerCLStream<X> {
        &self.train_stream
    }

    /// The test stream.
    #[must_use]
    pub fn test_stream(&self) -> &EagerCLStream<X> {
        &self.test_stream
    }

    /// The generic benchmark view, with `train_stream` and `test_stream`.
    #[must_use]
    pub fn to_scenario(&self) -> CLScenario<X> {
        CLScenario::new(vec![
            self.train_stream.clone().into(),
            self.test_stream.clone().into(),
        ])
    }
}

impl<X: 'static> From<NCScenario<X>> for CLScenario<X> {
    fn from(scenario: NCScenario<X>) -> Self {
        CLScenario::new(vec![scenario.train_stream.into(), scenario.test_stream.into()])
    }
}

impl<X> fmt::Debug for NCScenario<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NCScenario")
            .field("n_experiences", &self.n_experiences)
            .field("task_labels", &self.task_labels)
            .field("remap", &self.remap)
            .field("n_classes_per_exp", &self.n_classes_per_exp)
            .field("classes_order_original_ids", &self.classes_order_original_ids)
            .finish_non_exhaustive()
    }
}

/// The dataset-independent outcome of the partition algorithm.
struct Partition {
    n_experiences: usize,
    task_labels: bool,
    remap: Remap,
    classes_order: Vec<i64>,
    classes_order_original_ids: Vec<i64>,
    class_mapping: Vec<i64>,
    n_classes_per_exp: Vec<usize>,
}

impl Partition {
    fn replay(data: &ReproducibilityData) -> Self {
        tracing::debug!(
            n_experiences = data.n_experiences,
            "replaying class partition from reproducibility data"
        );
        Self {
            n_experiences: data.n_experiences,
            task_labels: data.task_labels,
            remap: Remap::from_flags(
                data.class_ids_from_zero_from_first_exp,
                data.class_ids_from_zero_in_each_exp,
            ),
            classes_order: data.classes_order.clone(),
            classes_order_original_ids: data.classes_order_original_ids.clone(),
            class_mapping: data.class_mapping.clone(),
            n_classes_per_exp: data.n_classes_per_exp.clone(),
        }
    }

    /// `dataset_classes` is sorted, distinct and non-negative.
    fn compute(dataset_classes: &[i64], config: &NCScenarioConfig) -> Result<Self> {
        let n_experiences = config.n_experiences;
        let remap = Remap::from_flags(
            config.class_ids_from_zero_from_first_exp,
            config.class_ids_from_zero_in_each_exp,
        );
        let n_original_classes = dataset_classes.last().map_or(0, |&max| max as usize + 1);

        let order = class_order(dataset_classes, config)?;
        tracing::debug!(?order, "class order");
        let n_classes_per_exp = classes_per_experience(
            order.len(),
            n_experiences,
            config.per_experience_classes.as_ref(),
        )?;
        let (classes_order, class_mapping) =
            remap_classes(&order, &n_classes_per_exp, n_original_classes, remap);

        Ok(Self {
            n_experiences,
            task_labels: config.task_labels,
            remap,
            classes_order,
            classes_order_original_ids: order,
            class_mapping,
            n_classes_per_exp,
        })
    }
}

fn class_order(dataset_classes: &[i64], config: &NCScenarioConfig) -> Result<Vec<i64>> {
    if let Some(fixed) = &config.fixed_class_order {
        let known: HashSet<i64> = dataset_classes.iter().copied().collect();
        let mut seen = HashSet::with_capacity(fixed.len());
        for &class in fixed {
            if !known.contains(&class) {
                return Err(ScenarioError::InvalidConfig(format!(
                    "fixed_class_order contains class {class}, which is not in the dataset"
                )));
            }
            if !seen.insert(class) {
                return Err(ScenarioError::InvalidConfig(format!(
                    "fixed_class_order contains class {class} more than once"
                )));
            }
        }
        if fixed.len() < dataset_classes.len() {
            let excluded: Vec<i64> = dataset_classes
                .iter()
                .copied()
                .filter(|class| !seen.contains(class))
                .collect();
            tracing::warn!(
                ?excluded,
                "fixed_class_order leaves out some classes; their samples are dropped"
            );
        }
        return Ok(fixed.clone());
    }

    let mut order = dataset_classes.to_vec();
    if config.shuffle {
        let seed = config.seed.map_or_else(Seed::from_entropy, Seed::new);
        seed.shuffle(&mut order);
    }
    Ok(order)
}

fn classes_per_experience(
    n_classes: usize,
    n_experiences: usize,
    per_experience: Option<&BTreeMap<usize, usize>>,
) -> Result<Vec<usize>> {
    if n_classes == 0 {
        return Err(ScenarioError::InvalidConfig(
            "the training set contains no classes".to_string(),
        ));
    }
    let Some(per_experience) = per_experience.filter(|map| !map.is_empty()) else {
        if n_classes % n_experiences != 0 {
            return Err(ScenarioError::InvalidConfig(format!(
                "{n_classes} classes cannot be divided evenly into {n_experiences} experiences"
            )));
        }
        return Ok(vec![n_classes / n_experiences; n_experiences]);
    };

    if let Some((&exp, _)) = per_experience.iter().find(|(&exp, _)| exp >= n_experiences) {
        return Err(ScenarioError::InvalidConfig(format!(
            "per_experience_classes refers to experience {exp}, must be in [0, {n_experiences})"
        )));
    }
    let assigned: usize = per_experience.values().sum();
    if assigned > n_classes {
        return Err(ScenarioError::InvalidConfig(format!(
            "per_experience_classes assigns {assigned} classes, only {n_classes} are available"
        )));
    }
    let remaining_classes = n_classes - assigned;
    let remaining_experiences = n_experiences - per_experience.len();
    let default_count = if remaining_experiences == 0 {
        if remaining_classes > 0 {
            return Err(ScenarioError::InvalidConfig(format!(
                "per_experience_classes leaves {remaining_classes} classes unassigned"
            )));
        }
        0
    } else {
        if remaining_classes % remaining_experiences != 0 {
            return Err(ScenarioError::InvalidConfig(format!(
                "{remaining_classes} remaining classes cannot be divided evenly into \
                 {remaining_experiences} experiences"
            )));
        }
        if remaining_classes == 0 {
            return Err(ScenarioError::InvalidConfig(format!(
                "no classes left for the {remaining_experiences} experiences \
                 missing from per_experience_classes"
            )));
        }
        remaining_classes / remaining_experiences
    };

    let mut counts = vec![default_count; n_experiences];
    for (&exp, &count) in per_experience {
        counts[exp] = count;
    }
    Ok(counts)
}

/// Returns the remapped class order and `mapping[original] = remapped`.
fn remap_classes(
    order: &[i64],
    n_classes_per_exp: &[usize],
    n_original_classes: usize,
    remap: Remap,
) -> (Vec<i64>, Vec<i64>) {
    match remap {
        Remap::Identity => (
            order.to_vec(),
            (0..n_original_classes as i64).collect(),
        ),
        Remap::FromFirstExp => {
            let mut mapping = vec![ClassMapping::EXCLUDED; n_original_classes];
            for (position, &class) in order.iter().enumerate() {
                mapping[class as usize] = position as i64;
            }
            ((0..order.len() as i64).collect(), mapping)
        }
        Remap::InEachExp => {
            let mut mapping = vec![ClassMapping::EXCLUDED; n_original_classes];
            let mut remapped = Vec::with_capacity(order.len());
            let mut start = 0;
            for &count in n_classes_per_exp {
                for (local, &class) in order[start..start + count].iter().enumerate() {
                    mapping[class as usize] = local as i64;
                    remapped.push(local as i64);
                }
                start += count;
            }
            (remapped, mapping)
        }
    }
}

/// One pass over the targets; samples of classes without an owner are
/// left out.
fn assign_patterns(
    targets: &DataAttribute,
    owner: &HashMap<i64, usize>,
    n_experiences: usize,
) -> Vec<Vec<usize>> {
    let mut assignment = vec![Vec::new(); n_experiences];
    for (idx, class) in targets.iter().enumerate() {
        if let Some(&exp) = owner.get(class) {
            assignment[exp].push(idx);
        }
    }
    assignment
}
