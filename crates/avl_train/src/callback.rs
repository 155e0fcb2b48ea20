//! Plugin system for the experience loop.

use avl_data::ClassificationDataset;
use avl_scenarios::CLExperience;

use crate::error::Result;

/// State of the experience loop, shared with plugins.
pub struct StrategyContext<X> {
    /// The experience being trained on or evaluated, in the strategy's view.
    pub experience: CLExperience<X>,
    /// The data the loop iterates; plugins may replace it while adapting.
    pub dataset: ClassificationDataset<X>,
    /// Whether this is a training (rather than evaluation) pass.
    pub is_training: bool,
    /// Current epoch (0-indexed).
    pub epoch: usize,
    /// Total number of epochs.
    pub n_epochs: usize,
    /// Current iteration within the epoch (0-indexed).
    pub iteration: usize,
    /// Total number of batches per epoch.
    pub n_batches: usize,
    /// Loss of the last batch.
    pub loss: Option<f32>,
    /// Mean loss of the last completed epoch.
    pub epoch_loss: Option<f32>,
    /// Whether to stop training on this experience.
    pub stop_training: bool,
}

impl<X: 'static> StrategyContext<X> {
    /// Create a context for `experience`, iterating its dataset.
    pub fn new(experience: CLExperience<X>, is_training: bool, n_epochs: usize) -> Self {
        let dataset = if is_training {
            experience.dataset().train()
        } else {
            experience.dataset().eval()
        };
        Self {
            experience,
            dataset,
            is_training,
            epoch: 0,
            n_epochs,
            iteration: 0,
            n_batches: 0,
            loss: None,
            epoch_loss: None,
            stop_training: false,
        }
    }

    /// Get progress over the experience as a fraction (0.0 to 1.0).
    pub fn progress(&self) -> f32 {
        let total = self.n_epochs * self.n_batches;
        if total == 0 {
            return 0.0;
        }
        let current = self.epoch * self.n_batches + self.iteration;
        current as f32 / total as f32
    }
}

/// Hooks into the experience loop.
///
/// Every hook does nothing by default.
pub trait StrategyPlugin<X>: Send {
    /// Called before training on an experience.
    fn before_training_exp(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called once per experience to adapt `ctx.dataset` before batching.
    fn adapt_train_dataset(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called before each training epoch.
    fn before_training_epoch(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called before each training batch.
    fn before_training_iteration(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called after each training batch.
    fn after_training_iteration(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called after each training epoch.
    fn after_training_epoch(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called after training on an experience.
    fn after_training_exp(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called before evaluating an experience.
    fn before_eval_exp(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called after each evaluation batch.
    fn after_eval_iteration(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Called after evaluating an experience.
    fn after_eval_exp(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        Ok(())
    }

    /// Get the plugin name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A list of plugins, called in insertion order.
pub struct PluginList<X> {
    plugins: Vec<Box<dyn StrategyPlugin<X>>>,
}

impl<X> Default for PluginList<X> {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
        }
    }
}

macro_rules! dispatch {
    ($($hook:ident),* $(,)?) => {
        $(
            #[doc = concat!("Call `", stringify!($hook), "` on all plugins.")]
            pub fn $hook(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
                for plugin in &mut self.plugins {
                    plugin.$hook(ctx)?;
                }
                Ok(())
            }
        )*
    };
}

impl<X: 'static> PluginList<X> {
    /// Create a new empty plugin list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin.
    pub fn add<P: StrategyPlugin<X> + 'static>(&mut self, plugin: P) {
        self.plugins.push(Box::new(plugin));
    }

    /// Number of plugins.
    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    /// Check if there are no plugins.
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Names of the plugins, in call order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    dispatch!(
        before_training_exp,
        adapt_train_dataset,
        before_training_epoch,
        before_training_iteration,
        after_training_iteration,
        after_training_epoch,
        after_training_exp,
        before_eval_exp,
        after_eval_iteration,
        after_eval_exp,
    );
}

/// Logs the progress of the loop with `tracing`.
///
/// Experiences are described through a logging view, so the position and
/// origin stream are always readable here.
#[derive(Debug, Default)]
pub struct ProgressPlugin;

impl ProgressPlugin {
    /// Create a new progress plugin.
    pub fn new() -> Self {
        Self
    }
}

impl<X: 'static> StrategyPlugin<X> for ProgressPlugin {
    fn before_training_exp(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        let exp = ctx.experience.logging();
        let stream = exp
            .origin_stream()
            .map(|s| s.name().to_string())
            .unwrap_or_default();
        tracing::info!(
            experience = ?exp.current_experience().ok(),
            stream = %stream,
            classes = ?exp.classes_in_this_experience(),
            n_samples = exp.dataset().len(),
            "Start training on experience"
        );
        Ok(())
    }

    fn after_training_epoch(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        let loss = ctx.epoch_loss.map(|l| format!("{:.4}", l)).unwrap_or_default();
        tracing::info!("Epoch {}/{}: train_loss={}", ctx.epoch + 1, ctx.n_epochs, loss);
        Ok(())
    }

    fn after_training_exp(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        let exp = ctx.experience.logging();
        tracing::info!(
            experience = ?exp.current_experience().ok(),
            "Training on experience completed"
        );
        Ok(())
    }

    fn after_eval_exp(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        let exp = ctx.experience.logging();
        let loss = ctx.epoch_loss.map(|l| format!("{:.4}", l)).unwrap_or_default();
        tracing::info!(
            experience = ?exp.current_experience().ok(),
            n_samples = ctx.dataset.len(),
            "Evaluation: loss={}",
            loss
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "ProgressPlugin"
    }
}

/// Records the mean training loss of every epoch, per experience.
#[derive(Debug, Default)]
pub struct HistoryPlugin {
    train_losses: Vec<Vec<f32>>,
    eval_losses: Vec<f32>,
}

impl HistoryPlugin {
    /// Create a new history plugin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mean epoch losses, one list per trained experience.
    pub fn train_losses(&self) -> &[Vec<f32>] {
        &self.train_losses
    }

    /// Mean evaluation loss of every evaluated experience.
    pub fn eval_losses(&self) -> &[f32] {
        &self.eval_losses
    }
}

impl<X: 'static> StrategyPlugin<X> for HistoryPlugin {
    fn before_training_exp(&mut self, _ctx: &mut StrategyContext<X>) -> Result<()> {
        self.train_losses.push(Vec::new());
        Ok(())
    }

    fn after_training_epoch(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        if let (Some(loss), Some(losses)) = (ctx.epoch_loss, self.train_losses.last_mut()) {
            losses.push(loss);
        }
        Ok(())
    }

    fn after_eval_exp(&mut self, ctx: &mut StrategyContext<X>) -> Result<()> {
        if let Some(loss) = ctx.epoch_loss {
            self.eval_losses.push(loss);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "HistoryPlugin"
    }
}
