use burn::train::renderer::{MetricState, MetricsRenderer, TrainingProgress};
use derive_new::new;

/// A renderer that reports training progress through the log, for runs without the TUI
#[derive(new)]
pub struct Simple {}

impl Simple {
    fn log_progress(split: &str, item: &TrainingProgress) {
        log::info!(
            "{split}: epoch {}/{}, iteration {}, {}/{} items",
            item.epoch,
            item.epoch_total,
            item.iteration,
            item.progress.items_processed,
            item.progress.items_total
        );
    }

    fn log_metric(split: &str, state: &MetricState) {
        match state {
            MetricState::Numeric(entry, _) | MetricState::Generic(entry) => {
                log::debug!("{split} {}: {}", entry.name, entry.formatted);
            }
        }
    }
}

impl MetricsRenderer for Simple {
    fn update_train(&mut self, state: MetricState) {
        Self::log_metric("train", &state);
    }

    fn update_valid(&mut self, state: MetricState) {
        Self::log_metric("valid", &state);
    }

    fn render_train(&mut self, item: TrainingProgress) {
        Self::log_progress("train", &item);
    }

    fn render_valid(&mut self, item: TrainingProgress) {
        Self::log_progress("valid", &item);
    }
}
