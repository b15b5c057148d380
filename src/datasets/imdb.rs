use std::path::{Path, PathBuf};

use burn::data::dataset::{self, InMemDataset};
use derive_new::new;
use serde::{Deserialize, Serialize};
use tokio::{fs, io::AsyncWriteExt};

use crate::{pipelines::text_classification, utils::files::list_files};

use super::{DatasetError, Loaded, LoadedPairs, Split, Subset};

/// The name of the IMDB dataset
pub static DATASET: &str = "imdb";

/// Where the archive is downloaded from
pub static DOWNLOAD_URL: &str = "https://ai.stanford.edu/~amaas/data/sentiment/aclImdb_v1.tar.gz";

/// The directory the archive extracts to
pub static ARCHIVE_DIR: &str = "aclImdb";

/// Written inside the extracted directory once extraction has finished
pub static COMPLETE_MARKER: &str = ".complete";

/// Class labels, in class id order
pub static LABELS: [&str; 2] = ["neg", "pos"];

/// Share of the training subset held out for validation
pub static VALIDATION_RATIO: f64 = 0.2;

/// Class labels as owned strings
pub fn labels() -> Vec<String> {
    LABELS.iter().map(|l| l.to_string()).collect()
}

/// A single movie review
#[derive(Clone, Debug, Serialize, Deserialize, new)]
pub struct Item {
    /// The review text
    pub text: String,

    /// The class id (0 for "neg", 1 for "pos")
    pub label: usize,
}

impl text_classification::Item for Item {
    fn text(&self) -> &str {
        &self.text
    }

    fn class_id(&self) -> usize {
        self.label
    }
}

/// Struct for the IMDB dataset
pub struct Dataset {
    /// Underlying In-Memory dataset
    dataset: InMemDataset<Item>,
}

/// Implement the Dataset trait for the IMDB dataset
impl dataset::Dataset<Item> for Dataset {
    /// Returns a specific item from the dataset
    fn get(&self, index: usize) -> Option<Item> {
        self.dataset.get(index)
    }

    /// Returns the length of the dataset
    fn len(&self) -> usize {
        self.dataset.len()
    }
}

impl Dataset {
    /// Wrap a split as a dataset
    pub fn from_split(split: Split) -> Self {
        let items = split
            .into_pairs()
            .into_iter()
            .map(|(text, label)| Item::new(text, label))
            .collect();

        Self {
            dataset: InMemDataset::new(items),
        }
    }
}

/// Both subsets of the extracted archive
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parsed {
    /// The training subset
    pub train: Split,

    /// The test subset
    pub test: Split,
}

/// Download and extract the archive into `dataset_dir`, unless a previous run completed
pub async fn download<P: AsRef<Path>>(dataset_dir: P) -> Result<PathBuf, DatasetError> {
    download_from(DOWNLOAD_URL, dataset_dir).await
}

/// Download the archive from `url` and extract it into `dataset_dir`.
///
/// The extracted tree is trusted only when its completion marker exists. A tree without the
/// marker is left over from an interrupted run, so it is fetched and extracted again.
pub async fn download_from<P: AsRef<Path>>(
    url: &str,
    dataset_dir: P,
) -> Result<PathBuf, DatasetError> {
    let dataset_dir = dataset_dir.as_ref();
    let target_dir = dataset_dir.join(ARCHIVE_DIR);
    let marker = target_dir.join(COMPLETE_MARKER);

    if fs::try_exists(&marker).await? {
        log::debug!("Found {}, skipping download", marker.display());

        return Ok(target_dir);
    }

    fs::create_dir_all(dataset_dir).await?;

    log::info!("Downloading {} to {}", url, dataset_dir.display());

    let mut response = reqwest::get(url).await?.error_for_status()?;

    let archive = dataset_dir.join(format!("{}.tar.gz", DATASET));
    let mut file = fs::File::create(&archive).await?;
    let mut written = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len();
    }
    file.flush().await?;

    log::info!("Downloaded {} bytes", written);

    extract(&archive, dataset_dir).await?;

    fs::write(&marker, b"").await?;
    fs::remove_file(&archive).await?;

    Ok(target_dir)
}

/// Unpack a gzip-compressed tar archive into a directory
pub async fn extract(archive: &Path, into: &Path) -> Result<(), DatasetError> {
    log::info!("Extracting {} to {}", archive.display(), into.display());

    let archive = archive.to_path_buf();
    let into = into.to_path_buf();

    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let file = std::fs::File::open(&archive)?;
        let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(file));

        archive.unpack(&into)
    })
    .await
    .map_err(std::io::Error::other)??;

    Ok(())
}

/// Read the `train` and `test` subsets from an extracted `aclImdb` directory.
///
/// Each subset has one directory per label, holding one review per file. The class id is the
/// label's position in [`LABELS`].
pub async fn parse<P: AsRef<Path>>(target_dir: P) -> Result<Parsed, DatasetError> {
    let target_dir = target_dir.as_ref();

    let parsed = Parsed {
        train: read_subset(&target_dir.join("train")).await?,
        test: read_subset(&target_dir.join("test")).await?,
    };

    log::info!(
        "Parsed {} training and {} test reviews",
        parsed.train.len(),
        parsed.test.len()
    );

    Ok(parsed)
}

async fn read_subset(subset_dir: &Path) -> Result<Split, DatasetError> {
    let mut split = Split::default();

    for (class_id, label) in LABELS.iter().enumerate() {
        let class_dir = subset_dir.join(label);

        if !fs::try_exists(&class_dir).await? {
            return Err(DatasetError::MissingClass(class_dir.display().to_string()));
        }

        for path in list_files(&class_dir).await? {
            let bytes = fs::read(&path).await?;
            let text = String::from_utf8(bytes)
                .map_err(|_| DatasetError::InvalidUtf8(path.display().to_string()))?;

            split.push(text, class_id);
        }
    }

    Ok(split)
}

/// Load a subset, downloading the archive into `dataset_dir` first if needed.
///
/// The training subset is shuffled with `seed` and split 80/20 into train and validation. The
/// test subset is returned as-is.
pub async fn load<P: AsRef<Path>>(
    dataset_dir: P,
    subset: Subset,
    seed: u64,
) -> Result<Loaded, DatasetError> {
    let target_dir = download(dataset_dir).await?;
    let parsed = parse(&target_dir).await?;

    let loaded = match subset {
        Subset::Train => {
            let (train, validation) = parsed.train.train_validation_split(VALIDATION_RATIO, seed);

            Loaded::Train { train, validation }
        }
        Subset::Test => Loaded::Test { test: parsed.test },
    };

    Ok(loaded)
}

/// Load a subset by name as `(text, class_id)` pairs
pub async fn load_pairs<P: AsRef<Path>>(
    dataset_dir: P,
    subset: &str,
    seed: u64,
) -> Result<LoadedPairs, DatasetError> {
    let subset = Subset::try_from(subset)?;

    Ok(load(dataset_dir, subset, seed).await?.into())
}
