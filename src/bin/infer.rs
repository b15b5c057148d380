//! Command line tool for inference

use anyhow::{anyhow, Result};
use burn::backend::{libtorch::LibTorchDevice, LibTorch};
use pico_args::Arguments;
use quicktext::{models::ArchitectureName, pipelines::text_classification};

const HELP: &str = "\
Usage: infer [OPTIONS] TEXT...

Arguments:
  TEXT                 One or more texts to classify

Options:
  -h, --help           Print help
  -a, --architecture   The trained architecture, used to find its artifacts
                       (defaults to 'seq2seq-attention')
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -o, --artifact-dir   Load artifacts from this directory instead
  --cuda               Run on the first CUDA device
";

#[derive(Debug)]
struct Args {
    /// Prints the usage menu
    help: bool,

    /// The trained architecture
    architecture: Option<String>,

    /// The top-level data directory
    data_dir: Option<String>,

    /// An explicit artifact directory
    artifact_dir: Option<String>,

    /// Run on CUDA
    cuda: bool,

    /// The texts to classify
    texts: Vec<String>,
}

fn parse_args() -> Result<Args, pico_args::Error> {
    let mut pargs = Arguments::from_env();

    let args = Args {
        help: pargs.contains(["-h", "--help"]),
        architecture: pargs.opt_value_from_str(["-a", "--architecture"])?,
        data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
        artifact_dir: pargs.opt_value_from_str(["-o", "--artifact-dir"])?,
        cuda: pargs.contains("--cuda"),
        texts: pargs
            .finish()
            .into_iter()
            .map(|text| text.to_string_lossy().to_string())
            .collect(),
    };

    Ok(args)
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    let args = parse_args()?;

    if args.help {
        println!("{}", HELP);
        return Ok(());
    }

    if args.texts.is_empty() {
        return Err(anyhow!("Missing required argument: TEXT"));
    }

    let artifact_dir = match args.artifact_dir {
        Some(dir) => dir,
        None => {
            let architecture = ArchitectureName::try_from(
                args.architecture
                    .as_deref()
                    .unwrap_or(quicktext::models::seq2seq_attention::ARCHITECTURE),
            )?;

            let mut config = text_classification::Config::new();
            if let Some(data_dir) = args.data_dir {
                config.data_dir = data_dir;
            }

            config.artifact_dir(architecture)
        }
    };

    let device = if args.cuda {
        LibTorchDevice::Cuda(0)
    } else {
        LibTorchDevice::Cpu
    };

    // Get model predictions
    let predictions = text_classification::infer::<LibTorch>(device, &artifact_dir, &args.texts)?;

    // Print out predictions for each sample
    for (i, (text, prediction)) in args.texts.iter().zip(predictions).enumerate() {
        let probabilities = prediction
            .probabilities
            .iter()
            .map(|p| format!("{p:.4}"))
            .collect::<Vec<_>>()
            .join(", ");

        println!(
            "\n=== Item {i} ===\
             \n- Text: {text}\
             \n- Class: {}\
             \n- Probabilities: [{probabilities}]\
             \n- Known tokens: {}/{}\
             \n================",
            prediction.label,
            prediction.known_tokens,
            prediction.total_tokens,
        );
    }

    Ok(())
}
