#![forbid(unsafe_code)]

mod args;
mod commands;
mod render;

use args::{Invocation, parse_args};
use commands::{CliError, execute};
use orgtree_core::NestedSetEngine;
use orgtree_storage::{SqliteStore, TreeConfig};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn usage() -> &'static str {
    "orgtree: nested-set trees stored in SQLite\n\n\
USAGE:\n\
  orgtree [--db PATH] [--config PATH] <COMMAND> [ARGS]\n\n\
COMMANDS:\n\
  init                                   create the table if missing\n\
  insert [--content JSON] [--parent ID | --after ID]\n\
  update ID --content JSON\n\
  move ID[,ID...] (--parent ID | --after ID)\n\
  delete ID                              remove ID and its whole subtree\n\
  get ID\n\
  path ID [--field NAME] [--separator S]\n\
  depth ID\n\
  children ID[,ID...] [--levels N] [--first]\n\
  siblings ID\n\
  resolve PATH [--start ID] [--field NAME] [--separator S]\n\
  subtree ID [--depth N]\n\
  verify                                 check nested-set invariants\n\n\
ENVIRONMENT:\n\
  ORGTREE_DB      default for --db\n\
  ORGTREE_CONFIG  default for --config (JSON table description)\n\
  ORGTREE_LOG     log filter, e.g. `debug` (default: warn)\n\n\
NOTES:\n\
  - insert without --parent/--after creates the root.\n\
  - results go to stdout as JSON; errors go to stderr as `CODE: message`.\n"
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn init_logging() {
    let filter = env_var("ORGTREE_LOG")
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(invocation: Invocation) -> Result<serde_json::Value, CliError> {
    let config = TreeConfig::load(&invocation.config)?;
    let store = SqliteStore::open(&invocation.db, &config)?;
    debug!(db = %invocation.db.display(), table = %config.table, "store opened");

    let mut engine = NestedSetEngine::new(store);
    execute(&mut engine, invocation.command)
}

fn main() {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print!("{}", usage());
        std::process::exit(0);
    }

    init_logging();

    let invocation = parse_args(
        &args,
        env_var("ORGTREE_DB").map(PathBuf::from),
        env_var("ORGTREE_CONFIG").map(PathBuf::from),
    )
    .unwrap_or_else(|e| {
        eprintln!("{e}");
        eprintln!("run `orgtree --help` for usage");
        std::process::exit(2);
    });

    match run(invocation) {
        Ok(out) => println!("{out}"),
        Err(err) => {
            eprintln!("{}: {err}", err.code());
            std::process::exit(1);
        }
    }
}
