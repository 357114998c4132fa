//! # Tasks - console task manager
//!
//! A single-user, menu-driven task list. Tasks are created, listed,
//! updated, completed and removed from an interactive prompt and kept in a
//! JSON file that is rewritten in full after every change.
//!
//! ## Layers
//!
//! - `cmd`: the read-evaluate loop over injected input/output
//! - `service`: business rules, the only way to change tasks
//! - `db`: the in-memory task list and the backend that mirrors it
//! - `task` / `fields`: the entity and its enumerations
//!
//! ## Quick Start
//!
//! ```bash
//! # Everything happens in the menu; the task file is ./tasks.json
//! tasks
//! ```
//!
//! `--db` (`TASKS_DB`) and `--validation` (`TASKS_VALIDATION`) are optional
//! startup overrides; without them the program behaves as above.
//!
//! Diagnostics go to stderr; set `RUST_LOG=info` to see every change logged.

use std::io;

use clap::Parser;

pub mod cli;
pub mod cmd;
pub mod db;
pub mod fields;
pub mod logging;
pub mod service;
pub mod task;

use cli::Cli;
use cmd::Console;
use db::{JsonFile, TaskStore};
use service::TaskService;

fn main() {
    let cli = Cli::parse();
    logging::init_logging();

    let store = TaskStore::open(JsonFile::new(&cli.db));
    tracing::debug!(path = %store.backend().path().display(), "task file");
    let mut service = TaskService::new(store, cli.validation);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut console = Console::new(&mut service, stdin.lock(), stdout.lock());
    if let Err(e) = console.run() {
        tracing::error!("console error: {e}");
        std::process::exit(1);
    }
}
