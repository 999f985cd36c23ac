use clap::Parser;
use diabetes_train::utils::{logger, validation::Validate};
use diabetes_train::{tracker_from_config, CliConfig, TrainingEngine};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    println!("\n\n{}", "*".repeat(60));
    tracing::info!("Starting diabetes-train");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

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
            tracing::info!("✅ Training run {} finished", summary.run_id);
            println!("✅ Run ID: {}", summary.run_id);
            println!("📁 Experiment: {}", summary.experiment_id);
            for (key, value) in &summary.metrics {
                println!("   {key}: {value:.4}");
            }
            println!("📦 Model artifact: {}", summary.model_artifact);
            println!("{}\n\n", "*".repeat(60));
        }
        Err(e) => {
            tracing::error!(
                "❌ Training failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}
