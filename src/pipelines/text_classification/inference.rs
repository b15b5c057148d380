use std::{fs::File, io::BufReader};

use burn::tensor::backend::Backend;

use crate::{
    classifier::{Prediction, TextClassifier},
    models::{Architecture, ModelConfig},
    vocab::Vocabulary,
};

/// Load a classifier from the artifacts saved by training
pub fn load<B: Backend>(
    device: B::Device,
    artifact_dir: &str,
) -> anyhow::Result<TextClassifier<B>> {
    // Load experiment configuration
    let config = ModelConfig::load(format!("{artifact_dir}/config.json"))
        .map_err(|e| anyhow!("Unable to load config file: {}", e))?;

    let vocab = Vocabulary::load(format!("{artifact_dir}/vocab.json"))
        .map_err(|e| anyhow!("Unable to load vocabulary: {}", e))?;

    let classes: Vec<String> = serde_json::from_reader(BufReader::new(File::open(format!(
        "{artifact_dir}/classes.json"
    ))?))?;

    log::debug!("Loading {} weights from {artifact_dir}", config.name());

    let model = config.load_model::<B>(artifact_dir, &device)?;

    Ok(TextClassifier::new(
        vocab,
        Architecture::Prebuilt(model),
        classes,
        device,
    )?)
}

/// Define inference function
pub fn infer<B: Backend>(
    device: B::Device,  // Device on which to perform computation (e.g., CPU or CUDA device)
    artifact_dir: &str, // Directory containing the saved artifacts
    samples: &[String], // Text samples for inference
) -> anyhow::Result<Vec<Prediction>> {
    let classifier = load::<B>(device, artifact_dir)?;

    log::info!("Running inference on {} samples", samples.len());

    Ok(classifier.predict_batch(samples)?)
}
