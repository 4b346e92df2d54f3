use clap::Parser;
use vet_page::Scan;

mod args;
use args::{Args, Command, build_config};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let Command::Scan(scan_args) = args.command;
    let config = build_config(&scan_args);

    // Initialize logging; --verbose raises the default level to debug
    let mut logger = env_logger::Builder::from_default_env();
    if config.verbose {
        logger.filter_level(::log::LevelFilter::Debug);
    }
    logger.init();

    match Scan::new(config).run().await {
        Ok(report) => {
            ::log::info!(
                "Scan complete: {} pages, {} clicks, {} screenshots, {} page errors in {:.2}s",
                report.summary.pages_scanned,
                report.summary.elements_clicked,
                report.summary.screenshots_taken,
                report.summary.page_errors,
                report.duration_ms as f64 / 1000.0
            );
        }
        Err(e) => {
            ::log::error!("Fatal: {}", e);
            std::process::exit(1);
        }
    }
}
