use clap::{Parser, Subcommand};
use vet_page::config::{ScanConfig, viewport_preset};

#[derive(Parser, Debug)]
#[command(name = "vet-page")]
#[command(about = "QA crawler that clicks through a web app like a real user")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Crawl a web application and record visual and runtime regressions
    Scan(ScanArgs),
}

#[derive(clap::Args, Debug)]
pub struct ScanArgs {
    /// URL to test
    #[arg(long)]
    pub url: String,

    /// Max navigation depth
    #[arg(long, default_value_t = 3)]
    pub depth: usize,

    /// Viewports (comma-separated: desktop,mobile)
    #[arg(long, default_value = "desktop")]
    pub viewport: String,

    /// Max clicks per page
    #[arg(long, default_value_t = 50)]
    pub max_clicks: usize,

    /// Page load timeout in ms
    #[arg(long, default_value_t = 30_000)]
    pub timeout: u64,

    /// Disable click exploration
    #[arg(long)]
    pub no_click: bool,

    /// Disable form auto-fill
    #[arg(long)]
    pub no_input: bool,

    /// Disable link navigation
    #[arg(long)]
    pub no_navigate: bool,

    /// Report output directory
    #[arg(long, default_value = "./vet-page-reports")]
    pub output: String,

    /// Chromium binary path (autodetected when omitted)
    #[arg(long)]
    pub chromium_path: Option<String>,

    /// Verbose logging
    #[arg(long)]
    pub verbose: bool,
}

/// Convert CLI arguments into the scan configuration
pub fn build_config(args: &ScanArgs) -> ScanConfig {
    let mut config = ScanConfig::new(&args.url);
    config.max_depth = args.depth;
    config.max_clicks_per_page = args.max_clicks;
    config.timeout_ms = args.timeout;
    config.enable_click = !args.no_click;
    config.enable_input = !args.no_input;
    config.enable_navigation = !args.no_navigate;
    config.viewports = args
        .viewport
        .split(',')
        .map(|name| viewport_preset(name.trim()))
        .collect();
    config.output_dir = args.output.clone();
    config.chromium_path = args.chromium_path.clone();
    config.verbose = args.verbose;
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_args(extra: &[&str]) -> ScanArgs {
        let mut argv = vec!["vet-page", "scan", "--url", "https://example.com"];
        argv.extend_from_slice(extra);
        let Args {
            command: Command::Scan(scan),
        } = Args::parse_from(argv);
        scan
    }

    #[test]
    fn test_defaults() {
        let config = build_config(&scan_args(&[]));
        assert_eq!(config.url, "https://example.com");
        assert_eq!(config.max_depth, 3);
        assert!(config.enable_click);
        assert_eq!(config.viewports[0].name, "desktop");
    }

    #[test]
    fn test_toggles_and_viewports() {
        let config = build_config(&scan_args(&[
            "--no-click",
            "--no-navigate",
            "--viewport",
            "desktop,mobile",
            "--depth",
            "1",
        ]));
        assert!(!config.enable_click);
        assert!(config.enable_input);
        assert!(!config.enable_navigation);
        assert_eq!(config.max_depth, 1);
        assert_eq!(config.viewports.len(), 2);
        assert_eq!(config.viewports[1].name, "mobile");
    }
}
