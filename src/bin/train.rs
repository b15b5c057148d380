//! Command line tool to trigger training

use std::sync::Arc;

use anyhow::anyhow;
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};
use pico_args::Arguments;
use quicktext::{
    datasets::{imdb, DatasetName, Loaded, Subset},
    models::{AnyModel, ArchitectureName, ModelConfig, Seq2SeqAttentionOverrides},
    pipelines::text_classification,
    vocab::Vocabulary,
};

type Backend = Autodiff<LibTorch>;

const HELP: &str = "\
Usage: train ARCHITECTURE [OPTIONS]

Arguments:
  ARCHITECTURE         The architecture to train ('cnn2d' or 'seq2seq-attention')

Options:
  -h, --help           Print help
  -v, --vectors        Pretrained word vectors in GloVe or word2vec text format (required)
  -c, --config         YAML hyperparameter overrides for seq2seq-attention
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -o, --artifact-dir   Where to save the trained model
                       (defaults to DATA_DIR/text-classification/ARCHITECTURE)
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size
  -s, --seed           Seed for the train/validation split and shuffling
  --cuda               Train on the first CUDA device
  --no-tui             Disable TUI
";

#[derive(Debug)]
struct Args {
    architecture: String,
    vectors: String,
    config: Option<String>,
    data_dir: Option<String>,
    artifact_dir: Option<String>,
    num_epochs: Option<usize>,
    batch_size: Option<usize>,
    seed: Option<u64>,
    cuda: bool,
    use_tui: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            vectors: pargs
                .value_from_str(["-v", "--vectors"])
                .map_err(|e| match e {
                    pico_args::Error::MissingOption(_) => {
                        anyhow!("Missing required option: --vectors")
                    }
                    _ => anyhow!("{}", e),
                })?,
            config: pargs.opt_value_from_str(["-c", "--config"])?,
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            artifact_dir: pargs.opt_value_from_str(["-o", "--artifact-dir"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs.opt_value_from_str(["-b", "--batch-size"])?,
            seed: pargs.opt_value_from_str(["-s", "--seed"])?,
            cuda: pargs.contains("--cuda"),
            use_tui: !(pargs.contains("--no-tui")),
            architecture: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => {
                    anyhow!("Missing required argument: ARCHITECTURE")
                }
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let architecture = ArchitectureName::try_from(args.architecture.as_str())?;

    let mut config = text_classification::Config::new()
        .with_use_tui(args.use_tui)
        .with_artifact_dir(args.artifact_dir.clone());

    if let Some(num_epochs) = args.num_epochs {
        config.num_epochs = num_epochs;
    }

    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }

    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    if let Some(data_dir) = &args.data_dir {
        config.data_dir = data_dir.to_string();
    }

    let vocab = Vocabulary::load_text(&args.vectors)
        .await
        .map_err(|e| anyhow!("Unable to load word vectors from {}: {}", args.vectors, e))?;

    log::info!(
        "Loaded {} vectors of dimension {}",
        vocab.len(),
        vocab.embedding_dim()
    );

    let dataset_dir = format!("{}/{}", config.data_dir, DatasetName::Imdb);
    let Loaded::Train { train, validation } =
        imdb::load(&dataset_dir, Subset::Train, config.seed).await?
    else {
        return Err(anyhow!("Expected the training subset"));
    };

    let classes = imdb::labels();

    let mut model_config = ModelConfig::named(architecture, &vocab, classes.len())?;

    if let Some(path) = &args.config {
        let ModelConfig::Seq2SeqAttention(defaults) = &model_config else {
            return Err(anyhow!(
                "Config overrides are only supported for {}",
                ArchitectureName::Seq2SeqAttention
            ));
        };

        let overrides = Seq2SeqAttentionOverrides::load(path).await?;
        model_config = ModelConfig::Seq2SeqAttention(defaults.merge(&overrides));
    }

    let device = if args.cuda {
        LibTorchDevice::Cuda(0)
    } else {
        LibTorchDevice::Cpu
    };

    let model = model_config.init::<Backend>(&vocab, classes.len(), &device)?;

    let vocab = Arc::new(vocab);
    let dataset_train = imdb::Dataset::from_split(train);
    let dataset_valid = imdb::Dataset::from_split(validation);

    match model {
        AnyModel::Cnn2d(model) => {
            text_classification::train::<Backend, _, imdb::Item, imdb::Dataset>(
                vec![device],
                model,
                &model_config,
                vocab,
                &classes,
                dataset_train,
                dataset_valid,
                &config,
            )?;
        }
        AnyModel::Seq2SeqAttention(model) => {
            text_classification::train::<Backend, _, imdb::Item, imdb::Dataset>(
                vec![device],
                model,
                &model_config,
                vocab,
                &classes,
                dataset_train,
                dataset_valid,
                &config,
            )?;
        }
    }

    Ok(())
}
