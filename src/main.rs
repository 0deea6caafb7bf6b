use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use icell_forest::{
    ClassMetrics, DecisionForest, FORMAT_VERSION, RankedFeature, TrainingMetadata, TrainingParameters,
};
use icell_io::{
    SampleTableReader, apply_forest, read_feature_stack, read_label_mask, sample_training_set,
    write_label_image,
};

#[derive(Parser)]
#[command(name = "icell")]
#[command(about = "Pixel-wise tissue classification with randomized decision forests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging and per-tree training progress
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Forest shape and split-search granularity.
#[derive(Args, Debug, Clone)]
struct ForestArgs {
    /// Maximum tree depth (root is depth 0)
    #[arg(long, default_value_t = 10)]
    tree_depth: usize,

    /// Number of trees in the forest
    #[arg(long, default_value_t = 50)]
    tree_num: usize,

    /// Candidate features evaluated per node
    #[arg(long, default_value_t = 10)]
    candidate_node_classifier_num: usize,

    /// Candidate thresholds evaluated per candidate feature
    #[arg(long, default_value_t = 10)]
    candidate_classifier_threshold_num: usize,

    /// Fraction of the training set bootstrapped per tree (0 = all samples)
    #[arg(long, default_value_t = 0.0)]
    sub_sample_percent: f64,

    /// Minimum information gain required to accept a split
    #[arg(long, default_value_t = 0.1)]
    split_ig: f64,

    /// Node entropy at or below which growth stops
    #[arg(long, default_value_t = 0.05)]
    leaf_entropy: f64,
}

impl ForestArgs {
    fn to_parameters(&self, seed: u64, verbose: bool) -> TrainingParameters {
        TrainingParameters::new()
            .with_tree_depth(self.tree_depth)
            .with_tree_num(self.tree_num)
            .with_candidate_node_classifier_num(self.candidate_node_classifier_num)
            .with_candidate_classifier_threshold_num(self.candidate_classifier_threshold_num)
            .with_sub_sample_percent(self.sub_sample_percent)
            .with_split_ig(self.split_ig)
            .with_leaf_entropy(self.leaf_entropy)
            .with_seed(seed)
            .with_verbose(verbose)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Train a forest from labelled pixels (or a CSV sample table) and save it
    Train {
        /// Feature channel images, one per channel, in order
        #[arg(long, num_args = 1.., requires = "mask")]
        features: Vec<PathBuf>,

        /// Label mask image (0 = unlabelled)
        #[arg(long, requires = "features")]
        mask: Option<PathBuf>,

        /// CSV sample table `label,f0,...` used instead of images
        #[arg(long, conflicts_with_all = ["features", "mask"], required_unless_present = "mask")]
        samples: Option<PathBuf>,

        /// Output path for the trained forest
        #[arg(long)]
        forest: PathBuf,

        /// Number of top-ranked features to report
        #[arg(long, default_value_t = 10)]
        top_features: usize,

        #[command(flatten)]
        params: ForestArgs,
    },

    /// Classify every pixel of a feature stack with a trained forest
    Apply {
        /// Path to the trained forest
        #[arg(long)]
        forest: PathBuf,

        /// Feature channel images, one per channel, in training order
        #[arg(long, num_args = 1.., required = true)]
        features: Vec<PathBuf>,

        /// Output label image path
        #[arg(long)]
        output: PathBuf,

        /// Fail unless the forest knows exactly this many classes
        #[arg(long)]
        n_classes: Option<usize>,
    },

    /// Print a summary of a trained forest
    Inspect {
        /// Path to the trained forest
        #[arg(long)]
        forest: PathBuf,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct TrainOutput {
    forest: PathBuf,
    metadata: TrainingMetadata,
    labels: Vec<u32>,
    training_accuracy: f64,
    class_metrics: Vec<ClassMetrics>,
    top_features: Vec<RankedFeature>,
}

#[derive(Serialize)]
struct ApplyOutput {
    output: PathBuf,
    width: u32,
    height: u32,
    label_counts: Vec<LabelCount>,
}

#[derive(Serialize)]
struct LabelCount {
    label: u32,
    pixels: usize,
}

#[derive(Serialize)]
struct InspectOutput {
    format_version: u32,
    n_trees: usize,
    n_features: usize,
    n_classes: usize,
    labels: Vec<u32>,
    total_nodes: usize,
    total_leaves: usize,
    max_depth: usize,
    importances: Vec<RankedFeature>,
}

fn load_forest(path: &Path) -> Result<DecisionForest> {
    DecisionForest::load(path)
        .with_context(|| format!("failed to load forest from {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            features,
            mask,
            samples,
            forest,
            top_features,
            params,
        } => {
            // 1. Build the training set
            let dataset = match (samples, mask) {
                (Some(samples), _) => SampleTableReader::new(&samples)
                    .read()
                    .context("failed to read sample table")?,
                (None, Some(mask)) => {
                    let stack = read_feature_stack(&features)
                        .context("failed to read feature images")?;
                    let mask = read_label_mask(&mask).context("failed to read label mask")?;
                    sample_training_set(&stack, &mask)
                        .context("failed to sample training pixels")?
                }
                (None, None) => anyhow::bail!("either --samples or --features with --mask is required"),
            };
            info!(n_samples = dataset.n_samples(), n_features = dataset.n_features(), "training set ready");

            // 2. Train
            let result = params
                .to_parameters(cli.seed, cli.verbose)
                .fit(&dataset)
                .context("training failed")?;

            // 3. Save
            result
                .forest()
                .save(&forest)
                .with_context(|| format!("failed to save forest to {}", forest.display()))?;

            // 4. Training-set evaluation, reused when training already ran it
            let confusion = match result.training_confusion() {
                Some(confusion) => confusion.clone(),
                None => result
                    .forest()
                    .evaluate(&dataset)
                    .context("training-set evaluation failed")?,
            };

            let output = TrainOutput {
                forest,
                metadata: result.metadata().clone(),
                labels: result.label_map().labels().to_vec(),
                training_accuracy: confusion.accuracy(),
                class_metrics: confusion.class_metrics(),
                top_features: result.importances().iter().take(top_features).cloned().collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Apply {
            forest,
            features,
            output,
            n_classes,
        } => {
            let model = load_forest(&forest)?;
            if let Some(expected) = n_classes
                && expected != model.n_classes()
            {
                anyhow::bail!(
                    "forest has {} classes, expected {expected}",
                    model.n_classes()
                );
            }

            let stack = read_feature_stack(&features).context("failed to read feature images")?;
            let classified = apply_forest(&model, &stack).context("classification failed")?;
            write_label_image(&classified, &output)
                .with_context(|| format!("failed to write {}", output.display()))?;

            let output = ApplyOutput {
                output,
                width: classified.width(),
                height: classified.height(),
                label_counts: classified
                    .label_counts()
                    .into_iter()
                    .map(|(label, pixels)| LabelCount { label, pixels })
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Inspect { forest } => {
            let model = load_forest(&forest)?;
            let trees = model.trees();
            let output = InspectOutput {
                format_version: FORMAT_VERSION,
                n_trees: model.n_trees(),
                n_features: model.n_features(),
                n_classes: model.n_classes(),
                labels: model.label_map().labels().to_vec(),
                total_nodes: trees.iter().map(|t| t.n_nodes()).sum(),
                total_leaves: trees.iter().map(|t| t.n_leaves()).sum(),
                max_depth: trees.iter().map(|t| t.depth()).max().unwrap_or(0),
                importances: model.feature_importances(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
