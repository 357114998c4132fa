//! Enumerations and policy types for task management.
//!
//! This module defines the small closed sets used across the crate: task
//! priorities, the derived completion status and the description
//! validation policy chosen at startup.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Priority classification for task importance.
///
/// Stored in the JSON file by its upper-case name. The localized names
/// written by older files are accepted on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ValueEnum, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    #[serde(alias = "BAIXA")]
    Low,
    #[serde(alias = "MEDIA")]
    Medium,
    #[serde(alias = "ALTA")]
    High,
}

impl Priority {
    /// Map a menu code (`1`, `2`, `3`) or a priority name to a priority.
    pub fn parse_input(input: &str) -> Option<Priority> {
        let input = input.trim();
        match input {
            "1" => Some(Priority::Low),
            "2" => Some(Priority::Medium),
            "3" => Some(Priority::High),
            _ => Priority::from_str(input, true).ok(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task completion status, derived from the completion timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Pending,
    Completed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Pending => f.write_str("Pending"),
            Status::Completed => f.write_str("Completed"),
        }
    }
}

/// How strictly task descriptions are validated.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum ValidationPolicy {
    /// Description is required on create; blank updates are ignored.
    #[default]
    Strict,
    /// Description may be empty and is stored verbatim on update.
    Lenient,
}

impl ValidationPolicy {
    pub fn requires_description(self) -> bool {
        self == ValidationPolicy::Strict
    }
}
