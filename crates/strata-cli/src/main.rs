use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use strata_cli::{commands, schema};
use strata_core::ControllerConfig;
use strata_store::FileStore;

const CONFIG_FILE: &str = "strata.toml";

fn cli() -> Command {
    Command::new("strata")
        .version(strata_cli::VERSION)
        .about("Inspect and edit a persisted quote-builder workspace")
        .subcommand_required(true)
        .arg(
            Arg::new("store")
                .long("store")
                .env("STRATA_STORE_DIR")
                .default_value(".strata")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Directory holding the persisted state"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(value_parser!(PathBuf))
                .global(true)
                .help("Controller config (defaults to <store>/strata.toml when present)"),
        )
        .arg(
            Arg::new("json-logs")
                .long("json-logs")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Emit logs as JSON lines"),
        )
        .subcommand(
            Command::new("show")
                .about("Print the live tree or one field")
                .arg(
                    Arg::new("field")
                        .long("field")
                        .help("Top-level field name or JSON pointer"),
                ),
        )
        .subcommand(Command::new("status").about("Print load, version and policy status"))
        .subcommand(Command::new("refresh").about("Re-read the store and report changes"))
        .subcommand(
            Command::new("set")
                .about("Set a value by JSON pointer and save")
                .arg(Arg::new("pointer").required(true).help("JSON pointer, e.g. /settings/currency"))
                .arg(Arg::new("value").required(true).help("JSON value, e.g. '\"EUR\"'")),
        )
        .subcommand(Command::new("reset").about("Replace the live tree with the baseline"))
        .subcommand(
            Command::new("export")
                .about("Write a backup")
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Backup file (stdout when omitted)"),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Restore a backup in any envelope format")
                .arg(
                    Arg::new("file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn init_tracing(json: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn resolve_config(store_dir: &Path, explicit: Option<&PathBuf>) -> Result<ControllerConfig> {
    if let Some(path) = explicit {
        return ControllerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    let implicit = store_dir.join(CONFIG_FILE);
    if implicit.is_file() {
        return ControllerConfig::load(&implicit)
            .with_context(|| format!("loading config {}", implicit.display()));
    }
    Ok(ControllerConfig::default())
}

fn run(matches: &ArgMatches) -> Result<()> {
    let store_dir = matches
        .get_one::<PathBuf>("store")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(".strata"));
    let config = resolve_config(&store_dir, matches.get_one::<PathBuf>("config"))?;

    tracing::debug!("opening store at {}", store_dir.display());
    let mut controller = schema::open(FileStore::new(&store_dir), config)
        .context("opening workspace")?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match matches.subcommand() {
        Some(("show", args)) => {
            let field = args.get_one::<String>("field").map(String::as_str);
            commands::show(&controller, field, &mut out)?;
        }
        Some(("status", _)) => {
            let location = store_dir.display().to_string();
            commands::status(&controller, &location, &mut out)?;
        }
        Some(("refresh", _)) => commands::refresh(&mut controller, &mut out)?,
        Some(("set", args)) => {
            let pointer = args.get_one::<String>("pointer").map_or("", String::as_str);
            let value = args.get_one::<String>("value").map_or("", String::as_str);
            commands::set(&mut controller, pointer, value, &mut out)?;
        }
        Some(("reset", _)) => commands::reset(&mut controller, &mut out)?,
        Some(("export", args)) => {
            let path = args.get_one::<PathBuf>("out").map(PathBuf::as_path);
            commands::export(&controller, path, &mut out)?;
        }
        Some(("import", args)) => {
            let path = args
                .get_one::<PathBuf>("file")
                .context("missing backup file")?;
            commands::import(&mut controller, path, &mut out)?;
        }
        _ => {}
    }
    out.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("json-logs"));
    run(&matches)
}
