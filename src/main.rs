use clap::Parser;
use site_provisioner::utils::{logger, validation::Validate};
use site_provisioner::{AwsProvider, CliArgs, DeployConfig, Deployment, InMemoryCloud};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let config = match DeployConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load configuration: {}", e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(2);
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration validation failed: {}", e);
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(2);
    }

    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| config.logging.directory.clone());
    let log_file = logger::init_cli_logger(args.verbose, Some(&log_dir))?;

    tracing::info!("{}", "=".repeat(80));
    tracing::info!("Starting AWS deployment");
    if let Some(path) = &log_file {
        tracing::info!("Log file: {}", path.display());
    }
    tracing::info!("AWS Region: {}", config.aws.region);
    tracing::info!("Domain: {}", config.site.domain);
    tracing::info!("Frontend Domain: {}", config.frontend_host());
    tracing::info!("Backend Domain: {}", config.backend_host());
    tracing::info!("Environment: {}", config.environment.name);
    tracing::info!("{}", "=".repeat(80));
    if args.verbose {
        tracing::debug!("Config: {:?}", config);
    }

    let report = if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - running against an in-memory cloud, no AWS calls");
        let deployment = Deployment::new(InMemoryCloud::rehearsal(&config), config.clone());
        let report = deployment.run().await;
        for call in deployment.provider().calls() {
            tracing::info!("  would call {}", call);
        }
        report
    } else {
        let provider = AwsProvider::from_config(&config).await;
        Deployment::new(provider, config.clone()).run().await
    };

    report.log();
    tracing::info!(
        "Deployment result: {}",
        serde_json::to_string(&report.execution_summary())?
    );

    if !report.succeeded() {
        tracing::error!("❌ Deployment finished with failed or skipped stages");
        std::process::exit(1);
    }

    tracing::info!("✅ Deployment completed");
    Ok(())
}
