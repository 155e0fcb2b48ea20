//! Benchmarks with one experience per dataset.

use avl_data::ClassificationDataset;

use crate::error::{Result, ScenarioError};
use crate::experience::CLExperience;
use crate::scenario::CLScenario;
use crate::stream::EagerCLStream;

/// Build a benchmark where every training dataset is one experience.
///
/// Datasets keep their targets; each training dataset (and its paired test
/// dataset) gets the corresponding entry of `task_labels`. With
/// `complete_test_set_only`, `test` must hold exactly one dataset, which
/// becomes the single experience of the test stream and keeps its own task
/// labels.
///
/// ```rust
/// use avl_data::{ClassificationDataset, VecSource};
/// use avl_scenarios::create_multi_dataset_scenario;
///
/// let data = |class: i64| {
///     ClassificationDataset::from_source(VecSource::new(vec![0.0_f32; 3], vec![class; 3]).unwrap())
///         .unwrap()
/// };
/// let scenario = create_multi_dataset_scenario(
///     vec![data(0), data(1)],
///     vec![data(0), data(1)],
///     &[0, 1],
///     false,
/// )
/// .unwrap();
///
/// let train = scenario.eager_stream("train").unwrap();
/// assert_eq!(train.get(1).unwrap().task_labels(), &[1]);
/// ```
pub fn create_multi_dataset_scenario<X: 'static>(
    train: Vec<ClassificationDataset<X>>,
    test: Vec<ClassificationDataset<X>>,
    task_labels: &[i64],
    complete_test_set_only: bool,
) -> Result<CLScenario<X>> {
    if train.len() != task_labels.len() {
        return Err(ScenarioError::InvalidConfig(format!(
            "{} training datasets but {} task labels",
            train.len(),
            task_labels.len()
        )));
    }
    if complete_test_set_only && test.len() != 1 {
        return Err(ScenarioError::InvalidConfig(format!(
            "the complete test set must be a single dataset, got {}",
            test.len()
        )));
    }
    if !complete_test_set_only && test.len() != train.len() {
        return Err(ScenarioError::InvalidConfig(format!(
            "{} training datasets but {} test datasets",
            train.len(),
            test.len()
        )));
    }

    let train_stream = EagerCLStream::new("train", experiences(train, task_labels)?);
    let test_experiences = if complete_test_set_only {
        test.into_iter()
            .map(|dataset| {
                let labels = dataset.task_set().keys();
                CLExperience::new(dataset, labels)
            })
            .collect()
    } else {
        experiences(test, task_labels)?
    };
    let test_stream = EagerCLStream::new("test", test_experiences);

    tracing::info!(
        n_experiences = train_stream.len(),
        complete_test_set_only,
        "created multi-dataset scenario"
    );
    Ok(CLScenario::new(vec![train_stream.into(), test_stream.into()]))
}

/// One experience per dataset, each a contiguous slice of their
/// concatenation.
fn experiences<X: 'static>(
    datasets: Vec<ClassificationDataset<X>>,
    task_labels: &[i64],
) -> Result<Vec<CLExperience<X>>> {
    let labelled = datasets
        .into_iter()
        .zip(task_labels)
        .map(|(dataset, &label)| dataset.with_task_labels(label))
        .collect::<avl_data::Result<Vec<_>>>()?;
    let lengths: Vec<usize> = labelled.iter().map(ClassificationDataset::len).collect();
    let all = ClassificationDataset::concat(labelled)?;

    let mut experiences = Vec::with_capacity(lengths.len());
    let mut start = 0;
    for (len, &label) in lengths.into_iter().zip(task_labels) {
        let slice = all.subset(Some((start..start + len).collect()))?;
        experiences.push(CLExperience::new(slice, vec![label]));
        start += len;
    }
    Ok(experiences)
}
