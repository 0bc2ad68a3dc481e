use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "truthlens")]
#[command(
    author,
    version,
    about = "Deepfake and fake-news detection service"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        default_value = "truthlens.yaml",
        env = "TRUTHLENS_CONFIG"
    )]
    pub config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Server overrides used when no subcommand is given
    #[command(flatten)]
    pub serve: ServeArgs,

    /// Defaults to `serve` when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Start the HTTP server
    Serve(ServeArgs),

    /// Save the current media model weights as safetensors files
    ExportWeights {
        /// Output directory
        #[arg(short, long, default_value = "./weights")]
        out: PathBuf,
    },
}

impl Cli {
    /// Resolve the subcommand, treating a bare invocation as `serve`
    pub fn command(&self) -> Commands {
        self.command
            .clone()
            .unwrap_or_else(|| Commands::Serve(self.serve.clone()))
    }
}

/// Overrides applied on top of the configuration file
#[derive(Args, Debug, Clone, Default)]
pub struct ServeArgs {
    /// Listen address
    #[arg(short = 'l', long, env = "TRUTHLENS_LISTEN")]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long, env = "TRUTHLENS_PORT")]
    pub port: Option<u16>,

    /// Directory uploads are staged in while being analyzed
    #[arg(long, env = "TRUTHLENS_UPLOAD_DIR")]
    pub upload_dir: Option<PathBuf>,

    /// Directory holding media model safetensors files
    #[arg(long, env = "TRUTHLENS_WEIGHTS_DIR")]
    pub weights_dir: Option<PathBuf>,

    /// HuggingFace repo or local directory of the text classifier
    #[arg(long, env = "TRUTHLENS_TEXT_MODEL")]
    pub text_model: Option<String>,

    /// Seed for the auxiliary sub-score generator
    #[arg(long, env = "TRUTHLENS_SEED")]
    pub seed: Option<u64>,
}
