pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliArgs;

pub use adapters::{AwsProvider, InMemoryCloud};
pub use config::DeployConfig;
pub use core::pipeline::Deployment;
pub use core::report::{DeploymentReport, Stage, StageStatus};
pub use utils::error::{ProvisionError, Result};
