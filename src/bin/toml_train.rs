use clap::Parser;
use diabetes_train::core::ConfigProvider;
use diabetes_train::utils::{logger, validation::Validate};
use diabetes_train::core::dataset::list_csv_files;
use diabetes_train::{tracker_from_config, TomlConfig, TrainingEngine};

#[derive(Parser)]
#[command(name = "toml-train")]
#[command(about = "Train the diabetes classifier from a TOML configuration file")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "train-config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Override the regularization rate from config
    #[arg(long)]
    reg_rate: Option<f64>,

    /// Show the resolved run settings without training
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    if config.json_logs() {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }
    tracing::info!("📁 Loaded configuration from: {}", args.config);

    if let Some(reg_rate) = args.reg_rate {
        config.model.reg_rate = Some(reg_rate);
        tracing::info!("🔧 reg_rate overridden to: {}", reg_rate);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no training will occur");
        perform_dry_run(&config);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    let tracker = match tracker_from_config(&config) {
        Ok(tracker) => tracker,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };
    let engine = TrainingEngine::new_with_monitoring(config, tracker, monitor_enabled);

    match engine.run().await {
        Ok(summary) => {
            println!("✅ Run ID: {}", summary.run_id);
            for (key, value) in &summary.metrics {
                println!("   {key}: {value:.4}");
            }
            println!("📦 Model artifact: {}", summary.model_artifact);
        }
        Err(e) => {
            tracing::error!(
                "❌ Training failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    println!("📋 Configuration Summary:");
    println!("  Training data: {}", config.training_data());
    println!("  reg_rate: {} (C = {})", config.reg_rate(), 1.0 / config.reg_rate());
    println!(
        "  Split: test_size {} random_state {}",
        config.test_size(),
        config.random_state()
    );
    println!("  Experiment: {}", config.experiment_name());
    match config.tracking_uri() {
        Some(uri) => println!("  Tracking: MLflow server {}", uri),
        None => println!("  Tracking: local store {}", config.mlruns_dir()),
    }
    println!();
}

fn perform_dry_run(config: &TomlConfig) {
    println!("🔍 Dry Run Analysis:");
    let path = std::path::Path::new(config.training_data());
    if !path.exists() {
        println!("  ⚠️ Training data path does not exist: {}", path.display());
    } else {
        let csv_count = list_csv_files(path).map(|files| files.len()).unwrap_or(0);
        println!("  📊 CSV files found: {}", csv_count);
    }
    println!("  Model: logistic regression, max_iter {}", config.max_iter());
    println!();
    println!("✅ Dry run analysis complete.");
}
