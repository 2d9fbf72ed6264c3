use std::env;
use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::db::Database;
use crate::seed::{seed_music, summary_line};
use crate::server;
use crate::ssot::rules::{self, DatasetRules};
use crate::ssot::validate::validate_dataset;
use crate::ssot::{display_relative, ssot_status, SsotRoot};

const USAGE: &str = "usage: lifeos <validate [music|finance|--rules <file>]|seed|serve|status>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Validate,
    Seed,
    Serve,
    Status,
}

pub fn parse_command(args: &[String]) -> Option<Command> {
    match args.get(1).map(String::as_str) {
        Some("validate") => Some(Command::Validate),
        Some("seed") => Some(Command::Seed),
        Some("serve") => Some(Command::Serve),
        Some("status") => Some(Command::Status),
        _ => None,
    }
}

/// Which rule set `lifeos validate` runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    Builtin(&'static str),
    File(PathBuf),
}

pub fn parse_rules_source(args: &[String]) -> Option<RulesSource> {
    match args {
        [] => Some(RulesSource::Builtin("music")),
        [name] if name == "music" => Some(RulesSource::Builtin("music")),
        [name] if name == "finance" => Some(RulesSource::Builtin("finance")),
        [flag, path] if flag == "--rules" => Some(RulesSource::File(PathBuf::from(path))),
        _ => None,
    }
}

pub fn run_with_args(args: &[String]) -> i32 {
    let Some(command) = parse_command(args) else {
        eprintln!("{USAGE}");
        return 2;
    };

    let config = AppConfig::from_env();
    let default_filter = if command == Command::Serve { "info" } else { "warn" };
    if let Err(error) = crate::init_tracing(config.log_dir.as_deref(), default_filter) {
        eprintln!("failed to initialise logging: {error}");
    }

    let base_dir = match env::current_dir() {
        Ok(dir) => dir,
        Err(err) => {
            eprintln!("failed to read working directory: {err}");
            return 1;
        }
    };

    match command {
        Command::Validate => handle_validate(args, &config, &base_dir),
        Command::Seed => handle_seed(&config, &base_dir),
        Command::Serve => handle_serve(&config),
        Command::Status => handle_status(&config, &base_dir),
    }
}

fn handle_validate(args: &[String], config: &AppConfig, base_dir: &Path) -> i32 {
    let Some(source) = parse_rules_source(args.get(2..).unwrap_or_default()) else {
        eprintln!("{USAGE}");
        return 2;
    };

    let loaded;
    let rules: &DatasetRules = match &source {
        RulesSource::Builtin(name) => match rules::builtin(name) {
            Some(rules) => rules,
            None => {
                eprintln!("{USAGE}");
                return 2;
            }
        },
        RulesSource::File(path) => match DatasetRules::load(path) {
            Ok(rules) => {
                loaded = rules;
                &loaded
            }
            Err(err) => {
                eprintln!("\n[validate] ERROR: {err}\n");
                return 1;
            }
        },
    };

    let outcome = SsotRoot::resolve(base_dir, &config.ssot_path)
        .and_then(|root| validate_dataset(rules, &root));
    match outcome {
        Ok(summary) => {
            println!("[{}] OK", rules.tag);
            println!("SSOT_PATH: {}", summary.root.display());
            println!("{}", summary.counts_line());
            println!("files:");
            for file in &summary.files {
                println!("- {}", display_relative(&file.path, base_dir));
            }
            0
        }
        Err(err) => {
            tracing::debug!(dataset = %rules.name, error = %err, "validation failed");
            eprintln!("\n[{}] ERROR: {err}\n", rules.tag);
            1
        }
    }
}

fn handle_seed(config: &AppConfig, base_dir: &Path) -> i32 {
    let Some(database_url) = config.database_url.as_deref() else {
        eprintln!("DATABASE_URL is missing");
        return 1;
    };

    let root = match SsotRoot::resolve(base_dir, &config.ssot_path) {
        Ok(root) => root,
        Err(err) => {
            eprintln!("[seed] ERROR: {err}");
            return 1;
        }
    };

    let db = match Database::open_url(database_url) {
        Ok(db) => db,
        Err(err) => {
            eprintln!("[seed] ERROR: {err}");
            return 1;
        }
    };

    let outcome = seed_music(&db, &root);
    if let Err(err) = db.close() {
        tracing::warn!(error = %err, "failed to close store");
    }

    match outcome {
        Ok(counts) => {
            println!("{}", summary_line(&counts));
            0
        }
        Err(err) => {
            eprintln!("[seed] ERROR: {err}");
            1
        }
    }
}

fn handle_serve(config: &AppConfig) -> i32 {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return 1;
        }
    };

    match runtime.block_on(server::run_server(config)) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err:#}");
            1
        }
    }
}

fn handle_status(config: &AppConfig, base_dir: &Path) -> i32 {
    match serde_json::to_string_pretty(&ssot_status(base_dir, &config.ssot_path)) {
        Ok(payload) => {
            println!("{payload}");
            0
        }
        Err(err) => {
            eprintln!("failed to serialize status: {err}");
            1
        }
    }
}
