use adhd_med_map::utils::cache::DiskCache;
use adhd_med_map::utils::{logger, validation::Validate};
use adhd_med_map::{CliConfig, EtlEngine, LocalStorage, MapError, MapPipeline};
use clap::Parser;

fn report_failure(e: &MapError, debug: bool) -> ! {
    tracing::error!(
        "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e);
    eprintln!("💡 {}", e.recovery_suggestion());
    if debug {
        eprintln!("🔎 {:#?}", e);
    }

    std::process::exit(e.exit_code());
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let config = CliConfig::parse();

    if config.log_json {
        logger::init_json_logger(config.verbose || config.debug);
    } else {
        logger::init_cli_logger(config.verbose || config.debug);
    }

    tracing::info!("Starting adhd-med-map");
    tracing::debug!("CLI config: {:?}", config);

    // 任何資料載入前先驗證設定
    if let Err(e) = config.validate() {
        report_failure(&e, config.debug);
    }

    if config.clear_cache {
        if let Err(e) = DiskCache::new(&config.cache_dir).clear() {
            report_failure(&e, config.debug);
        }
    }

    let debug = config.debug;
    let storage = LocalStorage::new(config.output_dir.clone());
    let pipeline = match MapPipeline::new(storage, config) {
        Ok(pipeline) => pipeline,
        Err(e) => report_failure(&e, debug),
    };
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output) if !output.is_empty() => {
            tracing::info!("✅ Map ready: {}", output);
            println!("✅ Map ready: {}", output);
        }
        Ok(_) => tracing::info!("✅ Done"),
        Err(e) => report_failure(&e, debug),
    }
}
