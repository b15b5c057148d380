use std::{fmt::Display, fs::File, sync::Arc};

use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    lr_scheduler::constant::ConstantLr,
    module::{AutodiffModule, Module},
    optim::AdamWConfig,
    record::{CompactRecorder, Recorder},
    tensor::backend::{AutodiffBackend, Backend},
    train::{
        metric::{AccuracyMetric, LearningRateMetric, LossMetric},
        ClassificationOutput, LearnerBuilder, TrainStep, ValidStep,
    },
    LearningRate,
};

use crate::{
    models::{ArchitectureName, ModelConfig},
    utils::renderer::Simple,
    vocab::{Tokenizer, Vocabulary},
};

use super::{batcher::Train, Batcher, Item, Model};

/// Define configuration struct for the experiment
#[derive(burn::config::Config)]
pub struct Config {
    /// Batch size
    #[config(default = 64)]
    pub batch_size: usize,

    /// Number of epochs
    #[config(default = 10)]
    pub num_epochs: usize,

    /// Adam epsilon
    #[config(default = 1e-8)]
    pub adam_epsilon: f32,

    /// Learning rate, held constant for the whole run
    #[config(default = 1e-3)]
    pub learning_rate: LearningRate,

    /// Seed for data loader shuffling
    #[config(default = 42)]
    pub seed: u64,

    /// Reviews are truncated to this many tokens
    #[config(default = 400)]
    pub max_seq_length: usize,

    /// Number of data loader workers
    #[config(default = 4)]
    pub num_workers: usize,

    /// The location of the top-level data directory
    #[config(default = "\"data\".to_string()")]
    pub data_dir: String,

    /// Where to write checkpoints and artifacts, if not under the data directory
    pub artifact_dir: Option<String>,

    /// Show the TUI dashboard while training
    #[config(default = true)]
    pub use_tui: bool,
}

impl Config {
    /// The artifact directory for an architecture
    pub fn artifact_dir(&self, architecture: ArchitectureName) -> String {
        match &self.artifact_dir {
            Some(dir) => dir.clone(),
            None => format!("{}/{}/{}", self.data_dir, super::PIPELINE, architecture),
        }
    }
}

/// Train a model, then save its config, weights, vocabulary and classes to the artifact directory
#[allow(clippy::too_many_arguments)]
pub fn train<B, M, I, D>(
    devices: Vec<B::Device>,    // Devices on which to perform computation (e.g., CPU or CUDA device)
    model: M,                   // Freshly initialized model
    model_config: &ModelConfig, // The config the model was built from
    vocab: Arc<Vocabulary>,     // Vocabulary the model's embedding table was built from
    classes: &[String],         // Class labels, in class id order
    dataset_train: D,           // Training dataset
    dataset_valid: D,           // Validation dataset
    config: &Config,            // Experiment configuration
) -> anyhow::Result<M>
where
    B: AutodiffBackend,
    M: Model<B>
        + AutodiffModule<B>
        + TrainStep<Train<B>, ClassificationOutput<B>>
        + Display
        + 'static,
    M::InnerModule: ValidStep<
        Train<<B as AutodiffBackend>::InnerBackend>,
        ClassificationOutput<<B as AutodiffBackend>::InnerBackend>,
    >,
    I: Item + 'static,
    D: Dataset<I> + 'static,
{
    let device = devices
        .first()
        .ok_or_else(|| anyhow!("At least one training device is required"))?;

    if model.n_classes() != classes.len() {
        return Err(anyhow!(
            "Model predicts {} classes, but {} labels were given",
            model.n_classes(),
            classes.len()
        ));
    }

    let artifact_dir = config.artifact_dir(model_config.name());
    std::fs::create_dir_all(&artifact_dir)?;

    log::info!(
        "Training {} on {} items, validating on {} items",
        model_config.name(),
        dataset_train.len(),
        dataset_valid.len()
    );

    let tokenizer = Tokenizer::default();
    let min_seq_length = model.min_seq_length();

    // Initialize batchers for training and validation data
    let batcher_train = Batcher::<B>::new(tokenizer.clone(), vocab.clone(), device.clone())
        .with_max_seq_length(Some(config.max_seq_length))
        .with_min_seq_length(min_seq_length);
    let batcher_valid = Batcher::<B::InnerBackend>::new(tokenizer, vocab.clone(), device.clone())
        .with_max_seq_length(Some(config.max_seq_length))
        .with_min_seq_length(min_seq_length);

    // Initialize data loaders for training and validation data
    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_valid = DataLoaderBuilder::new(batcher_valid)
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_valid);

    // Initialize optimizer
    let optimizer = AdamWConfig::new().with_epsilon(config.adam_epsilon).init();

    // Initialize learner
    let mut builder = LearnerBuilder::new(&artifact_dir)
        .metric_train_numeric(AccuracyMetric::new())
        .metric_valid_numeric(AccuracyMetric::new())
        .metric_train_numeric(LossMetric::new())
        .metric_valid_numeric(LossMetric::new())
        .metric_train_numeric(LearningRateMetric::new())
        .with_file_checkpointer(CompactRecorder::new())
        .devices(devices.clone())
        .num_epochs(config.num_epochs)
        .summary();

    if !config.use_tui {
        builder = builder.renderer(Simple::new());
    }

    let learner = builder.build(model, optimizer, ConstantLr::new(config.learning_rate));

    // Train the model
    let model_trained = learner.fit(dataloader_train, dataloader_valid);

    save_artifacts(
        &artifact_dir,
        model_trained.clone(),
        model_config,
        &vocab,
        classes,
    )?;

    log::info!("Saved artifacts to {artifact_dir}");

    Ok(model_trained)
}

/// Save everything inference needs: `config.json`, `model`, `vocab.json` and `classes.json`
pub fn save_artifacts<B: Backend, M: Module<B>>(
    artifact_dir: &str,
    model: M,
    model_config: &ModelConfig,
    vocab: &Vocabulary,
    classes: &[String],
) -> anyhow::Result<()> {
    model_config
        .save(format!("{artifact_dir}/config.json"))
        .map_err(|e| anyhow!("Unable to save model config: {}", e))?;

    CompactRecorder::new()
        .record(model.into_record(), format!("{artifact_dir}/model").into())
        .map_err(|e| anyhow!("Unable to save model weights: {}", e))?;

    vocab
        .save(format!("{artifact_dir}/vocab.json"))
        .map_err(|e| anyhow!("Unable to save vocabulary: {}", e))?;

    let file = File::create(format!("{artifact_dir}/classes.json"))?;
    serde_json::to_writer_pretty(file, classes)?;

    Ok(())
}
