use std::{collections::HashMap, path::Path};

use burn::tensor::{backend::Backend, Data, Shape, Tensor};
use serde::{Deserialize, Serialize};

use crate::utils::files::read_file;

/// Tokenizer adapter for the vocabulary
pub mod tokenizer;

pub use tokenizer::{Encoding, Tokenizer};

/// The reserved padding token
pub static PAD_TOKEN: &str = "@pad@";

/// The reserved out-of-vocabulary token
pub static OOV_TOKEN: &str = "@oov@";

/// A token table mapping each token to a row index and a dense embedding vector
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "VocabularyRecord")]
pub struct Vocabulary {
    /// The tokens, in row order
    tokens: Vec<String>,

    /// Row-major embedding vectors: `tokens.len() * embedding_dim` values
    vectors: Vec<f32>,

    /// Length of each embedding vector
    embedding_dim: usize,

    #[serde(skip)]
    index: HashMap<String, usize>,
}

/// The serialized form of a [`Vocabulary`], without the token index
#[derive(Deserialize)]
struct VocabularyRecord {
    tokens: Vec<String>,
    vectors: Vec<f32>,
    embedding_dim: usize,
}

impl TryFrom<VocabularyRecord> for Vocabulary {
    type Error = VocabError;

    fn try_from(record: VocabularyRecord) -> Result<Self, Self::Error> {
        let expected = record.tokens.len() * record.embedding_dim;
        if record.vectors.len() != expected {
            return Err(VocabError::Parse {
                line: 0,
                message: format!(
                    "expected {} vector values, found {}",
                    expected,
                    record.vectors.len()
                ),
            });
        }

        let index = record
            .tokens
            .iter()
            .enumerate()
            .map(|(row, token)| (token.clone(), row))
            .collect();

        let mut vocab = Self {
            tokens: record.tokens,
            vectors: record.vectors,
            embedding_dim: record.embedding_dim,
            index,
        };
        vocab.ensure_reserved();

        Ok(vocab)
    }
}

impl Vocabulary {
    /// Create an empty vocabulary containing only the reserved tokens
    pub fn new(embedding_dim: usize) -> Self {
        let mut vocab = Self {
            tokens: Vec::new(),
            vectors: Vec::new(),
            embedding_dim,
            index: HashMap::new(),
        };

        vocab.ensure_reserved();
        vocab
    }

    /// Create a vocabulary from `(token, vector)` entries. Later duplicates overwrite earlier ones.
    pub fn from_entries<I>(embedding_dim: usize, entries: I) -> Result<Self, VocabError>
    where
        I: IntoIterator<Item = (String, Vec<f32>)>,
    {
        let mut vocab = Self::new(embedding_dim);

        for (token, vector) in entries {
            vocab.set_vector(&token, vector)?;
        }

        Ok(vocab)
    }

    /// Load pretrained vectors from a GloVe or word2vec text file.
    ///
    /// Each line is a token followed by its vector components separated by spaces. A leading
    /// word2vec `count dim` header is skipped.
    pub async fn load_text<P: AsRef<Path>>(path: P) -> Result<Self, VocabError> {
        let lines = read_file(path).await?;

        let mut entries = Vec::with_capacity(lines.len());
        let mut embedding_dim = None;

        for (number, line) in lines.iter().enumerate() {
            let mut parts = line.split_whitespace();

            let Some(token) = parts.next() else {
                continue;
            };

            let vector = parts
                .map(|v| v.parse::<f32>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| VocabError::Parse {
                    line: number + 1,
                    message: e.to_string(),
                })?;

            if number == 0 && vector.len() == 1 && token.parse::<usize>().is_ok() {
                continue;
            }

            let dim = *embedding_dim.get_or_insert(vector.len());
            if vector.len() != dim {
                return Err(VocabError::DimensionMismatch {
                    token: token.to_string(),
                    expected: dim,
                    actual: vector.len(),
                });
            }

            entries.push((token.to_string(), vector));
        }

        let embedding_dim = embedding_dim.ok_or(VocabError::Parse {
            line: 0,
            message: "no vectors found".to_string(),
        })?;

        let vocab = Self::from_entries(embedding_dim, entries)?;

        log::info!(
            "Loaded vocabulary with {} tokens of dimension {}",
            vocab.len(),
            vocab.embedding_dim
        );

        Ok(vocab)
    }

    /// Make sure the padding and out-of-vocabulary tokens exist and have all-zero vectors
    pub fn ensure_reserved(&mut self) {
        let zeros = vec![0.0; self.embedding_dim];

        for token in [PAD_TOKEN, OOV_TOKEN] {
            self.insert(token, zeros.clone());
        }
    }

    /// Set the vector for a token, adding the token if it is new
    pub fn set_vector(&mut self, token: &str, vector: Vec<f32>) -> Result<usize, VocabError> {
        if vector.len() != self.embedding_dim {
            return Err(VocabError::DimensionMismatch {
                token: token.to_string(),
                expected: self.embedding_dim,
                actual: vector.len(),
            });
        }

        Ok(self.insert(token, vector))
    }

    fn insert(&mut self, token: &str, vector: Vec<f32>) -> usize {
        if let Some(&row) = self.index.get(token) {
            let start = row * self.embedding_dim;
            self.vectors[start..start + self.embedding_dim].copy_from_slice(&vector);

            return row;
        }

        let row = self.tokens.len();
        self.tokens.push(token.to_string());
        self.vectors.extend(vector);
        self.index.insert(token.to_string(), row);

        row
    }

    /// Look up the row index of a token
    pub fn id(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Look up the row index of a token, falling back to the out-of-vocabulary row
    pub fn id_or_oov(&self, token: &str) -> usize {
        self.id(token).unwrap_or_else(|| self.oov_id())
    }

    /// Return the token stored at a row
    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// Return the vector for a token
    pub fn vector(&self, token: &str) -> Option<&[f32]> {
        self.id(token).map(|row| {
            let start = row * self.embedding_dim;
            &self.vectors[start..start + self.embedding_dim]
        })
    }

    /// The row index of the padding token
    pub fn pad_id(&self) -> usize {
        // Every constructor reserves the padding token, first in a fresh vocabulary
        self.id(PAD_TOKEN).unwrap_or(0)
    }

    /// The row index of the out-of-vocabulary token
    pub fn oov_id(&self) -> usize {
        self.id(OOV_TOKEN).unwrap_or(1)
    }

    /// Number of rows, reserved tokens included
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether the vocabulary has no rows
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Length of each embedding vector
    pub fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    /// The embedding matrix as a `[len, embedding_dim]` tensor
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        let data = Data::new(self.vectors.clone(), Shape::new([self.len(), self.embedding_dim]));

        Tensor::from_data(data.convert::<B::FloatElem>(), device)
    }

    /// Save the vocabulary as JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VocabError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;

        Ok(())
    }

    /// Load a vocabulary previously written with [`Vocabulary::save`]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VocabError> {
        let file = std::fs::File::open(path)?;

        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}

/// Vocabulary Error
#[derive(thiserror::Error, Debug)]
pub enum VocabError {
    /// A vector did not match the embedding dimension
    #[error("vector for {token:?} has length {actual}, expected embedding_dim {expected}")]
    DimensionMismatch {
        /// The offending token
        token: String,
        /// The vocabulary's embedding dimension
        expected: usize,
        /// The length of the vector provided
        actual: usize,
    },

    /// A vectors file could not be parsed
    #[error("unable to parse vectors at line {line}: {message}")]
    Parse {
        /// 1-based line number, or 0 for whole-file problems
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::from_entries(
            3,
            vec![
                ("good".to_string(), vec![1.0, 2.0, 3.0]),
                ("bad".to_string(), vec![-1.0, -2.0, -3.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn reserved_tokens_are_zero_vectors() {
        for dim in [1, 3, 50] {
            let vocab = Vocabulary::new(dim);

            assert_eq!(vocab.vector(PAD_TOKEN), Some(vec![0.0; dim].as_slice()));
            assert_eq!(vocab.vector(OOV_TOKEN), Some(vec![0.0; dim].as_slice()));
        }

        let vocab = vocab();
        assert_eq!(vocab.vector(PAD_TOKEN), Some([0.0; 3].as_slice()));
        assert_eq!(vocab.vector(OOV_TOKEN), Some([0.0; 3].as_slice()));
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn reserved_tokens_are_reset_when_ensured() {
        let mut vocab = vocab();
        vocab.set_vector(PAD_TOKEN, vec![9.0, 9.0, 9.0]).unwrap();

        vocab.ensure_reserved();

        assert_eq!(vocab.vector(PAD_TOKEN), Some([0.0; 3].as_slice()));
        assert_eq!(vocab.len(), 4);
    }

    #[test]
    fn rejects_vectors_of_the_wrong_length() {
        let mut vocab = vocab();

        let err = vocab.set_vector("ugly", vec![1.0]).unwrap_err();

        assert!(matches!(
            err,
            VocabError::DimensionMismatch {
                expected: 3,
                actual: 1,
                ..
            }
        ));
        assert!(err.to_string().contains("embedding_dim"));
    }

    #[test]
    fn unknown_tokens_fall_back_to_oov() {
        let vocab = vocab();

        assert_eq!(vocab.id_or_oov("good"), vocab.id("good").unwrap());
        assert_eq!(vocab.id_or_oov("missing"), vocab.oov_id());
        assert_eq!(vocab.token(vocab.pad_id()), Some(PAD_TOKEN));
    }

    #[test]
    fn builds_embedding_matrix() {
        let vocab = vocab();
        let device = Default::default();

        let tensor = vocab.to_tensor::<NdArray<f32>>(&device);

        assert_eq!(tensor.dims(), [4, 3]);

        let row = vocab.id("bad").unwrap();
        let values = tensor
            .slice([row..row + 1, 0..3])
            .into_data()
            .convert::<f32>()
            .value;
        assert_eq!(values, vec![-1.0, -2.0, -3.0]);
    }

    #[tokio::test]
    async fn loads_glove_and_word2vec_text() {
        let dir = tempfile::tempdir().unwrap();

        let glove = dir.path().join("glove.txt");
        std::fs::write(&glove, "the 0.1 0.2\nmovie 0.3 0.4\n").unwrap();
        let vocab = Vocabulary::load_text(&glove).await.unwrap();
        assert_eq!(vocab.embedding_dim(), 2);
        assert_eq!(vocab.vector("movie"), Some([0.3, 0.4].as_slice()));

        let word2vec = dir.path().join("word2vec.txt");
        std::fs::write(&word2vec, "2 2\nthe 0.1 0.2\nmovie 0.3 0.4\n").unwrap();
        let vocab = Vocabulary::load_text(&word2vec).await.unwrap();
        assert_eq!(vocab.len(), 4);
        assert_eq!(vocab.id("2"), None);
    }

    #[tokio::test]
    async fn rejects_ragged_vectors_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.txt");
        std::fs::write(&path, "the 0.1 0.2\nmovie 0.3\n").unwrap();

        let err = Vocabulary::load_text(&path).await.unwrap_err();

        assert!(matches!(err, VocabError::DimensionMismatch { .. }));
    }

    #[test]
    fn json_round_trip_restores_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        let vocab = vocab();

        vocab.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();

        assert_eq!(loaded, vocab);
        assert_eq!(loaded.id("bad"), vocab.id("bad"));
    }

    #[test]
    fn deserializing_rebuilds_the_index() {
        let json = serde_json::to_string(&Vocabulary::new(2)).unwrap();

        let vocab: Vocabulary = serde_json::from_str(&json).unwrap();

        assert_eq!(vocab.id(PAD_TOKEN), Some(0));
        assert_eq!(vocab.pad_id(), 0);
        assert_eq!(vocab.oov_id(), 1);
        assert_eq!(vocab.id_or_oov("unseen"), 1);
    }

    #[test]
    fn deserializing_adds_missing_reserved_tokens() {
        let json = r#"{"tokens":["film"],"vectors":[0.5,0.5],"embedding_dim":2}"#;

        let vocab: Vocabulary = serde_json::from_str(json).unwrap();

        assert_eq!(vocab.id("film"), Some(0));
        assert_eq!(vocab.vector(PAD_TOKEN), Some([0.0, 0.0].as_slice()));
        assert_eq!(vocab.pad_id(), 1);
        assert_eq!(vocab.oov_id(), 2);
    }

    #[test]
    fn deserializing_rejects_a_truncated_table() {
        let json = r#"{"tokens":["film","plot"],"vectors":[0.5,0.5],"embedding_dim":2}"#;

        let err = serde_json::from_str::<Vocabulary>(json).unwrap_err();

        assert!(err.to_string().contains("vector values"));
    }
}
