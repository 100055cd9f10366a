mod allowlist;
mod cleaner;
mod config;
mod constants;
mod model;
mod probe;
mod report;
mod scanner;
mod service;
mod sidecar;
mod size;
mod ui;

use anyhow::Result;
use clap::Parser;
use config::Config;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use model::ScanMode;
use ratatui::prelude::*;
use scanner::ScanOptions;
use service::CacheService;
use std::io;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use ui::app::App;

#[derive(Parser)]
#[command(version, about, long_about = None, disable_version_flag = true)]
struct Cli {
    /// Print version information
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// List every project, device, and archive instead of root totals only
    #[arg(long)]
    full: bool,

    /// Also size each installed package version in the pub cache (slow)
    #[arg(long)]
    packages: bool,

    /// Print a summary and exit instead of opening the interactive view
    #[arg(long)]
    report: bool,
}

fn init_tracing(interactive: bool) {
    // stderr belongs to the terminal UI, so it stays quiet unless asked
    let fallback = if interactive { "off" } else { "devsweep=warn" };
    let env_filter =
        EnvFilter::try_from_env("DEVSWEEP_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(!cli.report);

    let config = Config::load()?;
    let service = Arc::new(CacheService::new(&config));
    let options = ScanOptions {
        mode: if cli.full {
            ScanMode::Full
        } else {
            ScanMode::Quick
        },
        include_packages: cli.packages,
    };

    if cli.report {
        return report::run(&service, options);
    }

    enable_raw_mode()?;
    let mut stderr = io::stderr();
    execute!(stderr, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stderr);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new_scanning(service, options);
    app.start_scan();

    let res = ui::run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}
