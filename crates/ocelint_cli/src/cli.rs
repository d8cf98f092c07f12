//! CLI argument definitions

use clap::{Parser, ValueEnum};
use ocelint_core::Group;

/// ocelint - pluggable Python source inspector
#[derive(Parser)]
#[command(name = "ocelint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files, directories, or glob patterns to inspect
    #[arg(required_unless_present = "show_plugins")]
    pub paths: Vec<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,

    /// Group findings by this axis (plugin, code, line, column, file)
    #[arg(long, default_value = "plugin", value_parser = parse_group)]
    pub group: Group,

    /// Plugins to skip, e.g. `@upgrade` or `third.party.checks`
    #[arg(long = "ignore-plugin", value_name = "PLUGIN")]
    pub ignore_plugins: Vec<String>,

    /// Report codes to drop, e.g. `OPTIONAL`
    #[arg(long = "ignore-code", value_name = "CODE")]
    pub ignore_codes: Vec<String>,

    /// Worker threads for bulk inspection (0 = automatic)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Always exit zero, even with findings
    #[arg(long)]
    pub no_fail_exit: bool,

    /// Skip the built-in plugins
    #[arg(long)]
    pub no_core: bool,

    /// List the loaded plugins and exit
    #[arg(long)]
    pub show_plugins: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn parse_group(text: &str) -> Result<Group, String> {
    text.parse()
}
