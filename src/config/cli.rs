use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "site-provisioner")]
#[command(about = "Provision an S3 + CloudFront site and HTTPS for its Beanstalk API")]
pub struct CliArgs {
    /// Path to a TOML configuration file (defaults to ./deploy.toml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run the pipeline against an in-memory cloud; no AWS calls are made
    #[arg(long)]
    pub dry_run: bool,

    /// Override logging.directory from the config
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}
