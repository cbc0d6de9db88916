//! rsvmlin Command Line Interface
//!
//! Trains linear least-squares, L2-SVM, TSVM and DA-S3VM models on LibSVM
//! data and prints the learned weights.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use rsvmlin::core::{Algorithm, OptimizerConfig, Result, SSLError};
use rsvmlin::data::LibSVMDataset;
use rsvmlin::optimizer::train;
use rsvmlin::utils::stats::matrix_stats;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;

#[derive(Parser)]
#[command(name = "rsvmlin")]
#[command(about = "Linear SVM solvers for supervised and semi-supervised learning")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a linear model and print its weights
    Train(TrainArgs),
    /// Display dataset statistics
    Stats(StatsArgs),
}

#[derive(Args)]
struct TrainArgs {
    /// Training data file in LibSVM format; label 0 marks an unlabeled row
    #[arg(long)]
    data: PathBuf,

    /// Training algorithm (overrides the config file)
    #[arg(short, long)]
    algorithm: Option<CliAlgorithm>,

    /// JSON optimizer configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Regularization on the weights
    #[arg(long)]
    lambda: Option<f64>,

    /// Weight of the unlabeled loss
    #[arg(long)]
    lambda_u: Option<f64>,

    /// Expected positive fraction among unlabeled rows
    #[arg(short, long)]
    r: Option<f64>,

    /// Maximum label switches per TSVM pass
    #[arg(short, long)]
    s: Option<usize>,

    /// Convergence tolerance
    #[arg(short, long)]
    epsilon: Option<f64>,

    /// Bias feature value (0 disables the bias)
    #[arg(short, long)]
    bias: Option<f64>,

    /// Maximum CGLS iterations
    #[arg(long)]
    cg_iter_max: Option<usize>,

    /// Maximum finite Newton iterations
    #[arg(long)]
    mfn_iter_max: Option<usize>,

    /// Write one decision value per training row to this file
    #[arg(short, long)]
    outputs: Option<PathBuf>,

    /// Save the effective configuration as JSON
    #[arg(long)]
    save_config: Option<PathBuf>,
}

#[derive(ValueEnum, Clone, Debug)]
enum CliAlgorithm {
    /// Regularized least squares
    #[value(name = "rls")]
    Rls,
    /// Supervised L2-SVM (modified finite Newton)
    #[value(name = "svm")]
    Svm,
    /// Transductive L2-SVM with label switching
    #[value(name = "tsvm")]
    Tsvm,
    /// Deterministic annealing semi-supervised SVM
    #[value(name = "da-s3vm")]
    DaS3vm,
}

impl From<CliAlgorithm> for Algorithm {
    fn from(cli_algorithm: CliAlgorithm) -> Self {
        match cli_algorithm {
            CliAlgorithm::Rls => Algorithm::RegularizedLeastSquares,
            CliAlgorithm::Svm => Algorithm::L2Svm,
            CliAlgorithm::Tsvm => Algorithm::Tsvm,
            CliAlgorithm::DaS3vm => Algorithm::DaS3vm,
        }
    }
}

#[derive(Args)]
struct StatsArgs {
    /// Data file in LibSVM format
    #[arg(long)]
    data: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Stats(args) => stats_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

/// Config file values first, then command line overrides
fn effective_config(args: &TrainArgs) -> Result<OptimizerConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path:?}");
            OptimizerConfig::from_json_file(path)?
        }
        None => OptimizerConfig::default(),
    };

    if let Some(algorithm) = &args.algorithm {
        config.algorithm = algorithm.clone().into();
    }
    if let Some(lambda) = args.lambda {
        config.lambda = lambda;
    }
    if let Some(lambda_u) = args.lambda_u {
        config.lambda_u = lambda_u;
    }
    if let Some(r) = args.r {
        config.r = r;
    }
    if let Some(s) = args.s {
        config.s = s;
    }
    if let Some(epsilon) = args.epsilon {
        config.epsilon = epsilon;
    }
    if let Some(bias) = args.bias {
        config.bias = bias;
    }
    if let Some(cg_iter_max) = args.cg_iter_max {
        config.cg_iter_max = cg_iter_max;
    }
    if let Some(mfn_iter_max) = args.mfn_iter_max {
        config.mfn_iter_max = mfn_iter_max;
    }

    config.validate()?;
    Ok(config)
}

fn train_command(args: TrainArgs) -> Result<()> {
    let config = effective_config(&args)?;
    info!("Training {:?} model...", config.algorithm);
    info!("Data file: {:?}", args.data);
    info!(
        "Parameters: lambda={}, lambda_u={}, r={}, s={}, epsilon={}, bias={}",
        config.lambda, config.lambda_u, config.r, config.s, config.epsilon, config.bias
    );

    if let Some(path) = &args.save_config {
        config.save_to_file(path)?;
        info!("Configuration saved to: {path:?}");
    }

    let dataset = LibSVMDataset::from_file(&args.data)?;
    let mut matrix = dataset.to_design_matrix()?.with_bias(config.bias);
    info!(
        "Loaded {} rows ({} unlabeled) with {} features",
        matrix.m(),
        matrix.u(),
        matrix.n_features()
    );

    let result = train(&mut matrix, &config)?;
    info!(
        "Training completed with outcome code {}",
        result.outcome.code()
    );

    if let Some(path) = &args.outputs {
        let file = File::create(path).map_err(SSLError::IoError)?;
        let mut writer = BufWriter::new(file);
        for o in &result.outputs {
            writeln!(writer, "{o:.10}").map_err(SSLError::IoError)?;
        }
        writer.flush().map_err(SSLError::IoError)?;
        info!("Outputs saved to: {path:?}");
    }

    println!("# Algorithm: {:?}", config.algorithm);
    println!("# Outcome code: {}", result.outcome.code());
    if let Some(accuracy) = labeled_accuracy(matrix.labels(), &result.outputs) {
        println!("# Training accuracy: {:.2}%", accuracy * 100.0);
    }
    println!(
        "# Weights ({}{})",
        matrix.n_features(),
        if matrix.has_bias() { " + bias" } else { "" }
    );
    for (j, w) in result.weights.iter().enumerate() {
        if j < matrix.n_features() {
            println!("{} {:.10}", j + 1, w);
        } else {
            println!("bias {w:.10}");
        }
    }

    Ok(())
}

/// Sign agreement on the labeled rows; `None` without labeled rows
fn labeled_accuracy(labels: &[f64], outputs: &[f64]) -> Option<f64> {
    let mut labeled = 0;
    let mut correct = 0;
    for (&y, &o) in labels.iter().zip(outputs) {
        if y == 0.0 {
            continue;
        }
        labeled += 1;
        if (o >= 0.0) == (y > 0.0) {
            correct += 1;
        }
    }
    (labeled > 0).then(|| correct as f64 / labeled as f64)
}

fn stats_command(args: StatsArgs) -> Result<()> {
    let dataset = LibSVMDataset::from_file(&args.data)?;
    let stats = matrix_stats(&dataset.to_design_matrix()?);

    println!("Dataset Statistics:");
    println!("  Rows: {}", stats.rows);
    println!("  Features: {}", stats.features);
    println!("  Labeled: {}", stats.labeled);
    println!("    Positive: {}", stats.positives);
    println!("    Negative: {}", stats.negatives);
    println!("  Unlabeled: {}", stats.unlabeled);
    println!("  Non-zeros: {}", stats.nnz);
    println!(
        "  Non-zeros per row: mean {:.2}, min {}, max {}",
        stats.mean_nnz, stats.min_nnz, stats.max_nnz
    );
    println!("  Density: {:.4}%", stats.density * 100.0);

    Ok(())
}
