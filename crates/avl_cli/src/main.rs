//! avalanche-rs CLI for building and inspecting class-incremental benchmarks.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avl_data::{ClassificationDataset, VecSource};
use avl_scenarios::{
    NCScenario, NCScenarioConfig, OnlineCLScenario, OnlineSplitConfig, ReproducibilityData,
};

#[derive(Parser)]
#[command(name = "avl")]
#[command(author, version)]
#[command(about = "Build and inspect class-incremental benchmarks over synthetic data")]
#[command(long_about = "avl: partition a labelled dataset into class-incremental experiences.

The dataset is synthetic: CLASSES classes with N samples each, in the train
and in the test split. Sample i of the train split has class i / N.

EXAMPLES:
  # Five experiences of two classes each
  avl nc --samples-per-class 10 --classes 10 --experiences 5 --seed 1

  # Task-incremental split with per-experience class ids
  avl nc --classes 6 --experiences 3 --task-labels --remap each

  # Export the partition, then rebuild it without the seed
  avl nc --classes 10 --experiences 5 --seed 7 --export split.json
  avl replay split.json --classes 10

  # Online sub-experiences of 4 samples
  avl online --classes 4 --experiences 2 --experience-size 4")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a new-classes scenario and print its partition
    Nc {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        split: SplitArgs,

        /// Write the reproducibility data as JSON to this file
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
    /// Rebuild a scenario from exported reproducibility data
    Replay {
        /// Reproducibility JSON written by `avl nc --export`
        file: PathBuf,

        #[command(flatten)]
        data: DataArgs,
    },
    /// Split the train stream of a scenario into online sub-experiences
    Online {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        split: SplitArgs,

        /// Samples per sub-experience
        #[arg(long, default_value = "10", value_name = "K")]
        experience_size: usize,

        /// Shuffle each experience before splitting
        #[arg(long)]
        shuffle_samples: bool,

        /// Drop a trailing sub-experience shorter than K
        #[arg(long)]
        drop_last: bool,
    },
}

/// Shape of the synthetic dataset.
#[derive(Args, Debug, Clone)]
struct DataArgs {
    /// Samples per class in the train split
    #[arg(long, default_value = "10", value_name = "N")]
    samples_per_class: usize,

    /// Number of classes
    #[arg(long, default_value = "10", value_name = "C")]
    classes: usize,

    /// Samples per class in the test split (defaults to N)
    #[arg(long, value_name = "N")]
    test_samples_per_class: Option<usize>,
}

/// Options of the class partition.
#[derive(Args, Debug, Clone)]
struct SplitArgs {
    /// Number of experiences
    #[arg(long, default_value = "1", value_name = "E")]
    experiences: usize,

    /// Seed for the class order
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Keep the classes in ascending order
    #[arg(long)]
    no_shuffle: bool,

    /// Label each experience with its own task
    #[arg(long)]
    task_labels: bool,

    /// Class id remapping
    #[arg(long, value_enum, default_value_t = Remap::Identity)]
    remap: Remap,

    /// Fixed number of classes for an experience, as EXP=COUNT
    #[arg(long = "per-exp", value_name = "EXP=COUNT", value_parser = parse_per_exp)]
    per_exp: Vec<(usize, usize)>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Remap {
    /// Keep the original class ids
    #[value(name = "none")]
    Identity,
    /// Number classes from zero in order of appearance
    First,
    /// Number classes from zero within each experience
    Each,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Nc {
            data,
            split,
            export,
        } => handle_nc(&data, &split, export.as_deref()),
        Commands::Replay { file, data } => handle_replay(&file, &data),
        Commands::Online {
            data,
            split,
            experience_size,
            shuffle_samples,
            drop_last,
        } => {
            let mut online = OnlineSplitConfig::new(experience_size)
                .with_shuffle(shuffle_samples)
                .with_drop_last(drop_last);
            if let Some(seed) = split.seed {
                online = online.with_seed(seed);
            }
            handle_online(&data, &split, online)
        }
    }
}

/// Parse an `EXP=COUNT` pair.
fn parse_per_exp(value: &str) -> std::result::Result<(usize, usize), String> {
    let (exp, count) = value
        .split_once('=')
        .ok_or_else(|| format!("expected EXP=COUNT, got '{value}'"))?;
    let exp = exp
        .trim()
        .parse()
        .map_err(|e| format!("invalid experience '{exp}': {e}"))?;
    let count = count
        .trim()
        .parse()
        .map_err(|e| format!("invalid class count '{count}': {e}"))?;
    Ok((exp, count))
}

/// Build the train and test splits. Sample `i` of a split has class
/// `i / samples_per_class` and input `i`.
fn synthetic_datasets(
    args: &DataArgs,
) -> Result<(ClassificationDataset<usize>, ClassificationDataset<usize>)> {
    if args.classes == 0 || args.samples_per_class == 0 {
        bail!("--classes and --samples-per-class must be positive");
    }
    let split = |per_class: usize| -> Result<ClassificationDataset<usize>> {
        let n = per_class * args.classes;
        let targets: Vec<i64> = (0..n).map(|i| (i / per_class) as i64).collect();
        let source = VecSource::new((0..n).collect::<Vec<usize>>(), targets)?;
        Ok(ClassificationDataset::from_source(source)?)
    };
    let test_per_class = args
        .test_samples_per_class
        .unwrap_or(args.samples_per_class);
    Ok((split(args.samples_per_class)?, split(test_per_class)?))
}

fn nc_config(split: &SplitArgs) -> NCScenarioConfig {
    let mut config = NCScenarioConfig::new(split.experiences)
        .with_shuffle(!split.no_shuffle)
        .with_task_labels(split.task_labels)
        .with_class_ids_from_zero_from_first_exp(split.remap == Remap::First)
        .with_class_ids_from_zero_in_each_exp(split.remap == Remap::Each);
    if let Some(seed) = split.seed {
        config = config.with_seed(seed);
    }
    if !split.per_exp.is_empty() {
        let per_exp: BTreeMap<usize, usize> = split.per_exp.iter().copied().collect();
        config = config.with_per_experience_classes(per_exp);
    }
    config
}

fn build_nc(data: &DataArgs, split: &SplitArgs) -> Result<NCScenario<usize>> {
    let (train, test) = synthetic_datasets(data)?;
    NCScenario::new(train, test, &nc_config(split)).context("Failed to build the scenario")
}

/// One line per experience, followed by the class order.
fn summary(scenario: &NCScenario<usize>) -> Vec<String> {
    let mut lines = vec![format!(
        "{} experiences, {} classes, task labels: {}",
        scenario.n_experiences(),
        scenario.n_classes(),
        scenario.task_labels()
    )];
    for (index, classes) in scenario.classes_in_experience().iter().enumerate() {
        let original = &scenario.original_classes_in_exp()[index];
        lines.push(format!(
            "  exp {:>3}: classes {:?} (original {:?}), train {}, test {}",
            index,
            classes,
            original,
            scenario.train_exps_patterns_assignment()[index].len(),
            scenario.test_exps_patterns_assignment()[index].len(),
        ));
    }
    lines.push(format!(
        "class order: {:?}",
        scenario.classes_order_original_ids()
    ));
    lines
}

fn handle_nc(data: &DataArgs, split: &SplitArgs, export: Option<&Path>) -> Result<()> {
    let scenario = build_nc(data, split)?;
    for line in summary(&scenario) {
        println!("{line}");
    }
    if let Some(path) = export {
        write_reproducibility(&scenario, path)?;
        println!("\nReproducibility data written to {}", path.display());
    }
    Ok(())
}

fn write_reproducibility(scenario: &NCScenario<usize>, path: &Path) -> Result<()> {
    let json = scenario.get_reproducibility_data().to_json()?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn load_nc(file: &Path, data: &DataArgs) -> Result<NCScenario<usize>> {
    let json = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let repro = ReproducibilityData::from_json(&json)
        .with_context(|| format!("Invalid reproducibility data in {}", file.display()))?;
    let (train, test) = synthetic_datasets(data)?;
    Ok(NCScenario::from_reproducibility_data(train, test, repro)?)
}

fn handle_replay(file: &Path, data: &DataArgs) -> Result<()> {
    let scenario = load_nc(file, data)?;
    for line in summary(&scenario) {
        println!("{line}");
    }
    Ok(())
}

/// Sizes of the online sub-experiences, grouped by origin experience.
fn online_sizes(
    data: &DataArgs,
    split: &SplitArgs,
    config: OnlineSplitConfig,
) -> Result<Vec<(usize, Vec<usize>)>> {
    let scenario = build_nc(data, split)?;
    let online = OnlineCLScenario::new(
        vec![
            scenario.train_stream().clone(),
            scenario.test_stream().clone(),
        ],
        config,
    )?;

    let mut sizes: Vec<(usize, Vec<usize>)> = Vec::new();
    for experience in online.train_stream()? {
        let experience = experience?.logging();
        let origin = experience.origin_experience()?.logging().current_experience()?;
        let size = experience.dataset().len();
        if let Some((last, chunk)) = sizes.last_mut() {
            if *last == origin {
                chunk.push(size);
                continue;
            }
        }
        sizes.push((origin, vec![size]));
    }
    Ok(sizes)
}

fn handle_online(data: &DataArgs, split: &SplitArgs, config: OnlineSplitConfig) -> Result<()> {
    let experience_size = config.experience_size;
    let sizes = online_sizes(data, split, config)?;
    println!(
        "{} sub-experiences of up to {} samples",
        sizes.iter().map(|(_, s)| s.len()).sum::<usize>(),
        experience_size
    );
    for (origin, chunk) in sizes {
        println!("  exp {:>3}: {:?}", origin, chunk);
    }
    Ok(())
}
