mod cli;
mod commands;
mod config;
mod db;
mod error;
mod grading;
mod models;
mod text;
mod tui;

use clap::Parser;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::Cli;
use commands::Ctx;
use config::Config;
use db::Database;
use models::JsonOutput;

fn init_tracing() {
    let (filter, json) = config::log_settings();
    let filter = EnvFilter::try_new(&filter).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Logs go to stderr so stdout stays clean for --json output
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(e) = run(cli) {
        if json {
            match serde_json::to_string(&JsonOutput::<()>::err(e.to_string())) {
                Ok(body) => println!("{body}"),
                Err(_) => eprintln!("Error: {e}"),
            }
        } else {
            eprintln!("Error: {e}");
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> error::Result<()> {
    let config = Config::load();
    debug!(db = %config.db_path.display(), "Opening database");

    let db = Database::open(&config.db_path)?
        .with_certificate_threshold(config.certificate_threshold);
    // Schema creation is idempotent, so every command works against a fresh file
    db.init()?;

    let ctx = Ctx {
        db: &db,
        config: &config,
        json: cli.json,
        user: cli.user,
    };
    commands::run(&ctx, cli.command)
}
