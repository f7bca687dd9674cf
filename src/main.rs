mod app;
mod ui;

use anyhow::{Context, Result};
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use mangel::config::Config;
use mangel::{logging, storage, ProjectStore, Submission};

use app::App;

fn parse_args() -> Option<PathBuf> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("mangel {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_help();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    config_path
}

fn print_help() {
    println!(
        r#"mangel - defect tracking for construction and apartment acceptance

USAGE:
    mangel [OPTIONS]

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    MANGEL_CONFIG           Path to config file (overrides default location)
    MANGEL_LOG              Log level (trace, debug, info, warn, error)
    DROPBOX_ACCESS_TOKEN    Dropbox token when storage.backend = "dropbox"

Config file location: $XDG_CONFIG_HOME/mangel/config.toml

See also: mangel-cli --help"#
    );
}

fn main() -> Result<()> {
    let config_path = parse_args();

    // Logging must not write to the terminal while the TUI owns it
    let _ = logging::init(Some(logging::default_log_dir()));

    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let backend = storage::create_backend(&config.storage).context("Failed to set up storage")?;
    let store = Arc::new(
        ProjectStore::new(backend).with_plan_extensions(config.media.plan_extensions.clone()),
    );
    let submission = Submission::from_config(store, &config);

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, submission);
    let result = app.run(&mut terminal);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}
