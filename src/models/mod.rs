use std::{fmt::Display, path::Path};

use burn::{
    module::Module,
    record::{CompactRecorder, Recorder},
    tensor::{backend::Backend, Tensor},
};
use serde::{Deserialize, Serialize};

use crate::{
    pipelines::text_classification::{self, batcher::Infer, Model as _},
    vocab::Vocabulary,
};

/// Embedding lookup shared by the architectures
pub mod embedding;

/// Convolutional classifier
pub mod cnn2d;

/// Bidirectional LSTM classifier with attention
pub mod seq2seq_attention;

pub use cnn2d::{Config as Cnn2dConfig, Model as Cnn2d};
pub use seq2seq_attention::{
    Config as Seq2SeqAttentionConfig, Model as Seq2SeqAttention,
    Overrides as Seq2SeqAttentionOverrides,
};

/// Available architectures, by name
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ArchitectureName {
    /// Convolutional classifier
    Cnn2d,

    /// Bidirectional LSTM classifier with attention
    Seq2SeqAttention,
}

impl TryFrom<&str> for ArchitectureName {
    type Error = ModelError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value == cnn2d::ARCHITECTURE {
            Ok(ArchitectureName::Cnn2d)
        } else if value == seq2seq_attention::ARCHITECTURE {
            Ok(ArchitectureName::Seq2SeqAttention)
        } else {
            Err(ModelError::UnknownArchitecture(value.to_string()))
        }
    }
}

impl Display for ArchitectureName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ArchitectureName::Cnn2d => cnn2d::ARCHITECTURE,
            ArchitectureName::Seq2SeqAttention => seq2seq_attention::ARCHITECTURE,
        };

        write!(f, "{}", name)
    }
}

/// The configuration of any available architecture
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "architecture", rename_all = "kebab-case")]
pub enum ModelConfig {
    /// Convolutional classifier
    Cnn2d(cnn2d::Config),

    /// Bidirectional LSTM classifier with attention
    Seq2SeqAttention(seq2seq_attention::Config),
}

impl ModelConfig {
    /// The default configuration for an architecture, sized from the vocabulary
    pub fn named(
        name: ArchitectureName,
        vocab: &Vocabulary,
        n_classes: usize,
    ) -> Result<Self, ModelError> {
        let config = match name {
            ArchitectureName::Cnn2d => ModelConfig::Cnn2d(cnn2d::Config::new(
                vocab.len(),
                vocab.embedding_dim(),
                n_classes,
                vocab.pad_id(),
            )),
            ArchitectureName::Seq2SeqAttention => ModelConfig::Seq2SeqAttention(
                seq2seq_attention::Config::new(vocab.len(), n_classes)
                    .with_embedding_dim(vocab.embedding_dim())
                    .with_pad_id(vocab.pad_id()),
            ),
        };

        config.validate(vocab, n_classes)?;

        Ok(config)
    }

    /// The architecture this config builds
    pub fn name(&self) -> ArchitectureName {
        match self {
            ModelConfig::Cnn2d(_) => ArchitectureName::Cnn2d,
            ModelConfig::Seq2SeqAttention(_) => ArchitectureName::Seq2SeqAttention,
        }
    }

    /// Check the hyperparameters, and that the dimensions agree with the vocabulary and classes
    pub fn validate(&self, vocab: &Vocabulary, n_classes: usize) -> Result<(), ModelError> {
        let (vocab_size, embedding_dim, pad_id, configured_classes) = match self {
            ModelConfig::Cnn2d(config) => {
                config.validate()?;

                (
                    config.vocab_size,
                    config.embedding_dim,
                    config.pad_id,
                    config.n_classes,
                )
            }
            ModelConfig::Seq2SeqAttention(config) => {
                config.validate()?;

                (
                    config.vocab_size,
                    config.embedding_dim,
                    config.pad_id,
                    config.n_classes,
                )
            }
        };

        check_dimension("vocab_size", vocab.len(), vocab_size)?;
        check_dimension("embedding_dim", vocab.embedding_dim(), embedding_dim)?;
        check_dimension("pad_id", vocab.pad_id(), pad_id)?;
        check_dimension("n_classes", n_classes, configured_classes)?;

        Ok(())
    }

    /// Validate, then initialize the model with the vocabulary's vectors as its embedding table
    pub fn init<B: Backend>(
        &self,
        vocab: &Vocabulary,
        n_classes: usize,
        device: &B::Device,
    ) -> Result<AnyModel<B>, ModelError> {
        self.validate(vocab, n_classes)?;

        let vectors = vocab.to_tensor::<B>(device);

        log::info!(
            "Initializing {} for {} tokens and {} classes",
            self.name(),
            vocab.len(),
            n_classes
        );

        let model: AnyModel<B> = match self {
            ModelConfig::Cnn2d(config) => config.init_with_vectors(vectors, device)?.into(),
            ModelConfig::Seq2SeqAttention(config) => {
                config.init_with_vectors(vectors, device)?.into()
            }
        };

        Ok(model)
    }

    /// Save the config as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        Ok(())
    }

    /// Load a config written with [`ModelConfig::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let file = std::fs::File::open(path)?;

        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Restore trained weights saved under `{artifact_dir}/model`
    pub fn load_model<B: Backend>(
        &self,
        artifact_dir: &str,
        device: &B::Device,
    ) -> Result<AnyModel<B>, ModelError> {
        let path = format!("{artifact_dir}/model");

        let model: AnyModel<B> = match self {
            ModelConfig::Cnn2d(config) => {
                let record = CompactRecorder::new()
                    .load(path.into(), device)
                    .map_err(|e| ModelError::Record(e.to_string()))?;

                config.init::<B>(device)?.load_record(record).into()
            }
            ModelConfig::Seq2SeqAttention(config) => {
                let record = CompactRecorder::new()
                    .load(path.into(), device)
                    .map_err(|e| ModelError::Record(e.to_string()))?;

                config.init::<B>(device)?.load_record(record).into()
            }
        };

        Ok(model)
    }
}

pub(crate) fn check_dimension(
    dimension: &'static str,
    expected: usize,
    actual: usize,
) -> Result<(), ModelError> {
    if expected != actual {
        return Err(ModelError::DimensionMismatch {
            dimension,
            expected,
            actual,
        });
    }

    Ok(())
}

/// Any available model, behind the text classification interface
#[derive(Debug)]
pub enum AnyModel<B: Backend> {
    /// Convolutional classifier
    Cnn2d(cnn2d::Model<B>),

    /// Bidirectional LSTM classifier with attention
    Seq2SeqAttention(seq2seq_attention::Model<B>),
}

impl<B: Backend> AnyModel<B> {
    /// The architecture of the wrapped model
    pub fn name(&self) -> ArchitectureName {
        match self {
            AnyModel::Cnn2d(_) => ArchitectureName::Cnn2d,
            AnyModel::Seq2SeqAttention(_) => ArchitectureName::Seq2SeqAttention,
        }
    }

    /// Length of the embedding vectors the model was built for
    pub fn embedding_dim(&self) -> usize {
        match self {
            AnyModel::Cnn2d(model) => model.embedding.embedding_dim(),
            AnyModel::Seq2SeqAttention(model) => model.embedding.embedding_dim(),
        }
    }
}

impl<B: Backend> From<cnn2d::Model<B>> for AnyModel<B> {
    fn from(model: cnn2d::Model<B>) -> Self {
        AnyModel::Cnn2d(model)
    }
}

impl<B: Backend> From<seq2seq_attention::Model<B>> for AnyModel<B> {
    fn from(model: seq2seq_attention::Model<B>) -> Self {
        AnyModel::Seq2SeqAttention(model)
    }
}

impl<B: Backend> text_classification::Model<B> for AnyModel<B> {
    fn infer(&self, input: Infer<B>) -> Tensor<B, 2> {
        match self {
            AnyModel::Cnn2d(model) => model.infer(input),
            AnyModel::Seq2SeqAttention(model) => model.infer(input),
        }
    }

    fn n_classes(&self) -> usize {
        match self {
            AnyModel::Cnn2d(model) => model.n_classes,
            AnyModel::Seq2SeqAttention(model) => model.n_classes,
        }
    }

    fn vocab_size(&self) -> usize {
        match self {
            AnyModel::Cnn2d(model) => model.embedding.vocab_size(),
            AnyModel::Seq2SeqAttention(model) => model.embedding.vocab_size(),
        }
    }

    fn min_seq_length(&self) -> usize {
        match self {
            AnyModel::Cnn2d(model) => model.min_seq_length,
            AnyModel::Seq2SeqAttention(_) => 1,
        }
    }
}

/// How to obtain the model for a classifier: build one from a configuration, or use a model
/// that has already been built
#[derive(Debug)]
pub enum Architecture<B: Backend> {
    /// Build a new model from this configuration
    Config(ModelConfig),

    /// Use this model as-is
    Prebuilt(AnyModel<B>),
}

impl<B: Backend> Architecture<B> {
    /// The default configuration of a named architecture, sized from the vocabulary
    pub fn named(name: &str, vocab: &Vocabulary, n_classes: usize) -> Result<Self, ModelError> {
        let name = ArchitectureName::try_from(name)?;

        Ok(Architecture::Config(ModelConfig::named(name, vocab, n_classes)?))
    }

    /// Produce a model for the vocabulary and class count, failing on any dimension mismatch
    pub fn resolve(
        self,
        vocab: &Vocabulary,
        n_classes: usize,
        device: &B::Device,
    ) -> Result<AnyModel<B>, ModelError> {
        match self {
            Architecture::Config(config) => config.init(vocab, n_classes, device),
            Architecture::Prebuilt(model) => {
                check_dimension("vocab_size", vocab.len(), model.vocab_size())?;
                check_dimension("embedding_dim", vocab.embedding_dim(), model.embedding_dim())?;
                check_dimension("n_classes", n_classes, model.n_classes())?;

                Ok(model)
            }
        }
    }
}

impl<B: Backend> From<ModelConfig> for Architecture<B> {
    fn from(config: ModelConfig) -> Self {
        Architecture::Config(config)
    }
}

impl<B: Backend> From<AnyModel<B>> for Architecture<B> {
    fn from(model: AnyModel<B>) -> Self {
        Architecture::Prebuilt(model)
    }
}

/// Model Error
#[derive(thiserror::Error, Debug)]
pub enum ModelError {
    /// No architecture found for the given string
    #[error("no architecture found for {0}")]
    UnknownArchitecture(String),

    /// A configured dimension disagrees with the vocabulary, the classes, or a prebuilt model
    #[error("{dimension} mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The name of the mismatched dimension
        dimension: &'static str,
        /// The value required by the vocabulary or classes
        expected: usize,
        /// The value found in the configuration or model
        actual: usize,
    },

    /// Hyperparameters that cannot describe a model
    #[error("invalid model configuration: {0}")]
    Invalid(String),

    /// Trained weights could not be loaded
    #[error("unable to load trained model weights: {0}")]
    Record(String),

    /// YAML failure
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// JSON failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use crate::utils::tensors::int_tensor;

    use super::*;

    type TestBackend = NdArray<f32>;

    fn vocab() -> Vocabulary {
        let entries = ["a", "great", "terrible", "movie", "plot", "acting"]
            .iter()
            .enumerate()
            .map(|(i, token)| (token.to_string(), vec![i as f32 * 0.1; 4]));

        Vocabulary::from_entries(4, entries).unwrap()
    }

    #[test]
    fn parses_architecture_names() {
        assert_eq!(
            ArchitectureName::try_from("cnn2d").unwrap(),
            ArchitectureName::Cnn2d
        );
        assert_eq!(
            ArchitectureName::try_from("seq2seq-attention").unwrap(),
            ArchitectureName::Seq2SeqAttention
        );
        assert_eq!(ArchitectureName::Cnn2d.to_string(), "cnn2d");
        assert!(matches!(
            ArchitectureName::try_from("transformer"),
            Err(ModelError::UnknownArchitecture(_))
        ));
    }

    #[test]
    fn named_configs_are_sized_from_the_vocabulary() {
        let vocab = vocab();

        let ModelConfig::Cnn2d(config) =
            ModelConfig::named(ArchitectureName::Cnn2d, &vocab, 2).unwrap()
        else {
            panic!("expected a cnn2d config");
        };

        assert_eq!(config.vocab_size, vocab.len());
        assert_eq!(config.embedding_dim, 4);
        assert_eq!(config.n_classes, 2);
        assert_eq!(config.pad_id, vocab.pad_id());
        assert_eq!(config.n_filters, 100);
        assert_eq!(config.filter_sizes, vec![3, 4, 5]);
    }

    #[test]
    fn embedding_dim_mismatch_fails_fast() {
        let vocab = vocab();
        let config = ModelConfig::Seq2SeqAttention(
            Seq2SeqAttentionConfig::new(vocab.len(), 2).with_embedding_dim(300),
        );

        let err = config
            .init::<TestBackend>(&vocab, 2, &Default::default())
            .unwrap_err();

        assert!(matches!(
            err,
            ModelError::DimensionMismatch {
                dimension: "embedding_dim",
                expected: 4,
                actual: 300
            }
        ));
        assert!(err.to_string().contains("embedding_dim"));
    }

    #[test]
    fn class_count_mismatch_fails_fast() {
        let vocab = vocab();
        let config = ModelConfig::named(ArchitectureName::Seq2SeqAttention, &vocab, 2).unwrap();

        let err = config.validate(&vocab, 3).unwrap_err();

        assert!(matches!(
            err,
            ModelError::DimensionMismatch {
                dimension: "n_classes",
                ..
            }
        ));
    }

    #[test]
    fn resolves_names_and_prebuilt_models() {
        let device = Default::default();
        let vocab = vocab();

        let model = Architecture::<TestBackend>::named("seq2seq-attention", &vocab, 2)
            .unwrap()
            .resolve(&vocab, 2, &device)
            .unwrap();
        assert_eq!(model.name(), ArchitectureName::Seq2SeqAttention);

        let model = Architecture::Prebuilt(model).resolve(&vocab, 2, &device).unwrap();
        assert_eq!(text_classification::Model::n_classes(&model), 2);

        let err = Architecture::Prebuilt(model)
            .resolve(&vocab, 3, &device)
            .unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { .. }));
    }

    #[test]
    fn uniform_interface_scores_both_architectures() {
        let device = Default::default();
        let vocab = vocab();

        for name in ["cnn2d", "seq2seq-attention"] {
            let model = Architecture::<TestBackend>::named(name, &vocab, 2)
                .unwrap()
                .resolve(&vocab, 2, &device)
                .unwrap();

            let values = (0..40).map(|i| i % vocab.len()).collect();
            let input = Infer::new(
                int_tensor(values, [10, 4], &device),
                int_tensor(vec![10; 4], [4], &device),
            );

            let scores = text_classification::Model::infer(&model, input);
            assert_eq!(scores.dims(), [4, 2], "{name}");
        }
    }

    #[test]
    fn copies_pretrained_vectors_into_the_embedding() {
        let device = Default::default();
        let vocab = vocab();
        let config = ModelConfig::named(ArchitectureName::Cnn2d, &vocab, 2).unwrap();

        let AnyModel::Cnn2d(model) = config.init::<TestBackend>(&vocab, 2, &device).unwrap() else {
            panic!("expected a cnn2d model");
        };

        let row = vocab.id("movie").unwrap();
        let weights = model
            .embedding
            .embedding
            .weight
            .val()
            .slice([row..row + 1, 0..4])
            .into_data()
            .convert::<f32>()
            .value;

        assert_eq!(weights, vocab.vector("movie").unwrap().to_vec());
    }

    #[test]
    fn config_json_round_trip_keeps_the_architecture() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let vocab = vocab();
        let config = ModelConfig::named(ArchitectureName::Seq2SeqAttention, &vocab, 2).unwrap();

        config.save(&path).unwrap();
        let loaded = ModelConfig::load(&path).unwrap();

        assert_eq!(loaded.name(), ArchitectureName::Seq2SeqAttention);
        assert!(loaded.validate(&vocab, 2).is_ok());
    }

    #[test]
    fn restores_saved_weights() {
        let dir = tempfile::tempdir().unwrap();
        let artifact_dir = dir.path().to_string_lossy().to_string();
        let device = Default::default();
        let vocab = vocab();
        let config = ModelConfig::named(ArchitectureName::Seq2SeqAttention, &vocab, 2).unwrap();

        let AnyModel::Seq2SeqAttention(model) =
            config.init::<TestBackend>(&vocab, 2, &device).unwrap()
        else {
            panic!("expected a seq2seq-attention model");
        };

        CompactRecorder::new()
            .record(model.clone().into_record(), format!("{artifact_dir}/model").into())
            .unwrap();

        let AnyModel::Seq2SeqAttention(restored) =
            config.load_model::<TestBackend>(&artifact_dir, &device).unwrap()
        else {
            panic!("expected a seq2seq-attention model");
        };

        // The compact recorder stores half-precision floats
        let original = model.output.weight.val().into_data().convert::<f32>().value;
        let restored = restored.output.weight.val().into_data().convert::<f32>().value;
        assert_eq!(original.len(), restored.len());
        for (original, restored) in original.iter().zip(&restored) {
            assert!(
                (original - restored).abs() < 1e-3,
                "{original} restored as {restored}"
            );
        }
    }
}
