use std::fmt::Display;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::Serialize;

///  The IMDB movie review dataset
pub mod imdb;

/// The Dataset enum
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DatasetName {
    /// IMDB dataset
    Imdb,
}

impl TryFrom<&str> for DatasetName {
    type Error = DatasetError;

    /// Try to convert a string to a Dataset
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        if value.to_lowercase() == imdb::DATASET {
            Ok(DatasetName::Imdb)
        } else {
            Err(Self::Error::Unknown(value.to_string()))
        }
    }
}

impl Display for DatasetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DatasetName::Imdb => imdb::DATASET,
        };

        write!(f, "{}", name)
    }
}

/// The portion of a dataset to load
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Subset {
    /// The training data, split further into train and validation
    Train,

    /// The held-out test data
    Test,
}

impl TryFrom<&str> for Subset {
    type Error = DatasetError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "train" => Ok(Subset::Train),
            "test" => Ok(Subset::Test),
            _ => Err(DatasetError::UnknownSubset(value.to_string())),
        }
    }
}

/// Texts and their class ids, positionally aligned
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Split {
    /// Raw texts
    data: Vec<String>,

    /// Class ids, indexing into the dataset's labels
    target: Vec<usize>,
}

impl Split {
    /// Pair texts with class ids. Both must have the same length.
    pub fn new(data: Vec<String>, target: Vec<usize>) -> Result<Self, DatasetError> {
        if data.len() != target.len() {
            return Err(DatasetError::Misaligned {
                data: data.len(),
                target: target.len(),
            });
        }

        Ok(Self { data, target })
    }

    /// Raw texts
    pub fn data(&self) -> &[String] {
        &self.data
    }

    /// Class ids, aligned with [`Split::data`]
    pub fn target(&self) -> &[usize] {
        &self.target
    }

    /// Number of examples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the split has no examples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Append a text with its class id
    pub fn push(&mut self, text: String, target: usize) {
        self.data.push(text);
        self.target.push(target);
    }

    /// Collapse into `(text, class_id)` pairs
    pub fn into_pairs(self) -> Vec<(String, usize)> {
        self.data.into_iter().zip(self.target).collect()
    }

    /// Shuffle with a fixed seed and split into `(train, validation)`, where validation holds
    /// `ceil(len * validation_ratio)` examples
    pub fn train_validation_split(self, validation_ratio: f64, seed: u64) -> (Split, Split) {
        let len = self.len();
        let n_validation = ((len as f64) * validation_ratio).ceil() as usize;
        let n_validation = n_validation.min(len);

        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let mut rank = vec![0; len];
        for (position, index) in order.into_iter().enumerate() {
            rank[index] = position;
        }

        let mut shuffled: Vec<(usize, String, usize)> = self
            .data
            .into_iter()
            .zip(self.target)
            .zip(rank)
            .map(|((text, target), position)| (position, text, target))
            .collect();
        shuffled.sort_unstable_by_key(|(position, _, _)| *position);

        let mut train = Split::default();
        let mut validation = Split::default();

        for (position, text, target) in shuffled {
            if position < n_validation {
                validation.push(text, target);
            } else {
                train.push(text, target);
            }
        }

        log::debug!(
            "Dataset split: {} training, {} validation",
            train.len(),
            validation.len()
        );

        (train, validation)
    }
}

/// A loaded subset
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Loaded {
    /// The training subset, split into train and validation
    Train {
        /// Training examples
        train: Split,
        /// Validation examples
        validation: Split,
    },

    /// The test subset, unsplit
    Test {
        /// Test examples
        test: Split,
    },
}

/// A loaded subset as `(text, class_id)` pairs
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LoadedPairs {
    /// The training subset, split into train and validation
    Train {
        /// Training examples
        train: Vec<(String, usize)>,
        /// Validation examples
        validation: Vec<(String, usize)>,
    },

    /// The test subset, unsplit
    Test {
        /// Test examples
        test: Vec<(String, usize)>,
    },
}

impl From<Loaded> for LoadedPairs {
    fn from(loaded: Loaded) -> Self {
        match loaded {
            Loaded::Train { train, validation } => LoadedPairs::Train {
                train: train.into_pairs(),
                validation: validation.into_pairs(),
            },
            Loaded::Test { test } => LoadedPairs::Test {
                test: test.into_pairs(),
            },
        }
    }
}

/// Dataset Error
#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    /// No dataset found for the given string
    #[error("no dataset found for {0}")]
    Unknown(String),

    /// The subset name is not one of "train" or "test"
    #[error("no such subset {0:?}, expected \"train\" or \"test\"")]
    UnknownSubset(String),

    /// A class directory is missing from the extracted dataset
    #[error("class directory not found: {0}")]
    MissingClass(String),

    /// Texts and class ids of different lengths
    #[error("{data} texts but {target} class ids")]
    Misaligned {
        /// Number of texts
        data: usize,
        /// Number of class ids
        target: usize,
    },

    /// A file could not be decoded as UTF-8
    #[error("file is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// The archive could not be downloaded
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    /// I/O failure
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn split(n: usize) -> Split {
        let mut split = Split::default();
        for i in 0..n {
            split.push(format!("review {i}"), i % 2);
        }
        split
    }

    #[test]
    fn parses_dataset_names() {
        assert_eq!(DatasetName::try_from("IMDB").unwrap(), DatasetName::Imdb);
        assert_eq!(DatasetName::Imdb.to_string(), "imdb");
        assert!(matches!(
            DatasetName::try_from("sst2"),
            Err(DatasetError::Unknown(_))
        ));
    }

    #[test]
    fn validation_is_not_a_subset() {
        assert_eq!(Subset::try_from("train").unwrap(), Subset::Train);
        assert_eq!(Subset::try_from("test").unwrap(), Subset::Test);

        let err = Subset::try_from("validation").unwrap_err();
        assert!(matches!(err, DatasetError::UnknownSubset(ref name) if name == "validation"));
    }

    #[test]
    fn split_is_eighty_twenty_and_aligned() {
        let (train, validation) = split(10).train_validation_split(0.2, 42);

        assert_eq!(train.len(), 8);
        assert_eq!(validation.len(), 2);
        assert_eq!(train.data().len(), train.target().len());
        assert_eq!(validation.data().len(), validation.target().len());

        for part in [&train, &validation] {
            for (text, target) in part.data().iter().zip(part.target()) {
                let i: usize = text.trim_start_matches("review ").parse().unwrap();
                assert_eq!(*target, i % 2);
            }
        }
    }

    #[test]
    fn split_is_deterministic_per_seed() {
        let first = split(100).train_validation_split(0.2, 7);
        let second = split(100).train_validation_split(0.2, 7);
        let other = split(100).train_validation_split(0.2, 8);

        assert_eq!(first, second);
        assert_ne!(first, other);
    }

    #[test]
    fn split_keeps_every_example() {
        let (train, validation) = split(11).train_validation_split(0.2, 1);

        assert_eq!(validation.len(), 3);

        let mut all: Vec<_> = train.data().iter().chain(validation.data()).cloned().collect();
        all.sort();
        let mut expected = split(11).data().to_vec();
        expected.sort();
        assert_eq!(all, expected);
    }

    #[test]
    fn misaligned_texts_and_targets_are_rejected() {
        let err = Split::new(
            vec!["a".to_string(), "b".to_string(), "c".to_string()],
            vec![0],
        )
        .unwrap_err();

        assert!(matches!(
            err,
            DatasetError::Misaligned {
                data: 3,
                target: 1
            }
        ));

        let split = Split::new(vec!["a".to_string()], vec![1]).unwrap();
        assert_eq!(split.target(), &[1]);
    }

    #[test]
    fn collapses_into_pairs() {
        let loaded = Loaded::Test { test: split(2) };

        assert_eq!(
            LoadedPairs::from(loaded),
            LoadedPairs::Test {
                test: vec![("review 0".to_string(), 0), ("review 1".to_string(), 1)]
            }
        );
    }
}
