use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "tfmodel", version, about = "Inspect TensorFlow SavedModels")]
pub struct Cli {
    /// Log filter (RUST_LOG syntax)
    #[arg(long, global = true, env = "TFMODEL_LOG", default_value = "info")]
    pub log: String,

    /// Meta graph tags to load
    #[arg(long, global = true, value_delimiter = ',', default_value = "serve")]
    pub tags: Vec<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check that the model loads and its signatures are usable
    Validate {
        /// Path of the model
        model: PathBuf,
    },
    /// Print the input/output signatures of the model
    Inspect {
        /// Path of the model
        model: PathBuf,

        /// Only print this signature
        #[arg(long)]
        signature: Option<String>,

        /// Print JSON instead of tables
        #[arg(long)]
        json: bool,
    },
    /// Measure inference latency with synthetic inputs
    Benchmark(BenchmarkArgs),
}

#[derive(Args, Debug)]
pub struct BenchmarkArgs {
    /// Path of the model
    pub model: PathBuf,

    /// Signature to run (defaults to serving_default)
    #[arg(long)]
    pub signature: Option<String>,

    /// Batch sizes to try, in order
    #[arg(long, value_delimiter = ',', default_value = "1,10,1000,10000,100000")]
    pub batch_sizes: Vec<usize>,

    /// Timed runs per batch size
    #[arg(long, default_value_t = 1)]
    pub iterations: u32,

    /// Untimed runs per batch size
    #[arg(long, default_value_t = 0)]
    pub warmup: u32,

    /// Fail instead of feeding 1.0 to inputs with unsupported dtypes
    #[arg(long)]
    pub strict_dtypes: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}
