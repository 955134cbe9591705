//! # statanalyzer entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Load config (JSON file or defaults)
//!   ├─> Initialize logging (tracing)
//!   │
//!   ├─> serve:       run the HTTP service until Ctrl-C
//!   ├─> inspect:     load one file and print its statistics
//!   └─> init-config: write the default settings to a config file
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // inspect and init-config report on stdout

mod cli;

use anyhow::Result;
use clap::Parser as _;
use statanalyzer::config::AppConfig;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    // init-config may be replacing a file that no longer parses.
    let config = match cli.command {
        cli::Commands::InitConfig { .. } => AppConfig::default(),
        _ => cli::resolve_config(cli.command.config_path())?,
    };

    statanalyzer::logging::init(&config.logging)?;

    tokio::runtime::Runtime::new()?.block_on(cli::run_command(cli.command, config))
}
