use std::path::PathBuf;

use clap::Parser;

use crate::fields::ValidationPolicy;

/// Console task manager backed by a single JSON file.
/// Everything happens in the interactive menu; these options are optional
/// startup overrides and the defaults need no arguments at all.
#[derive(Parser, Debug)]
#[command(name = "tasks", version, about = "Interactive console task manager")]
pub struct Cli {
    /// Path to the JSON task file.
    #[arg(long, env = "TASKS_DB", default_value = "tasks.json")]
    pub db: PathBuf,

    /// Description rules: strict requires one, lenient allows it empty.
    #[arg(long, env = "TASKS_VALIDATION", value_enum, default_value_t = ValidationPolicy::Strict)]
    pub validation: ValidationPolicy,
}
