use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::decode::InputFormat;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Load spreadsheets or CYOA documents, filter them, and roll random picks",
    long_about = None
)]
pub struct Cli {
    /// Snapshot file holding the working state between commands
    #[arg(short = 's', long = "state", global = true, default_value = "table-roller.json")]
    pub state: PathBuf,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load a workbook, CSV table, or CYOA document into a fresh state
    Load(LoadArgs),
    /// List the predefined remote documents
    Predefined,
    /// List loaded groups and their selection
    Groups,
    /// Select or deselect groups
    Select(SelectArgs),
    /// Set or clear a group's display name
    RenameGroup(RenameGroupArgs),
    /// List source fields with their mapped names
    Fields,
    /// Rename and order a field
    Map(MapArgs),
    /// Hide or show a field in listings and text export
    Hide(HideArgs),
    /// Filter the pool and roll random results
    Roll(RollArgs),
    /// List kept items
    Kept,
    /// Remove a kept item by id
    Remove(RemoveArgs),
    /// Export kept items (or one of them) as `key: value` text
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct LoadArgs {
    /// Input file (`-` for stdin)
    #[arg(short = 'i', long = "input", conflicts_with_all = ["url", "predefined"])]
    pub input: Option<PathBuf>,
    /// Fetch the document from a URL
    #[arg(long, conflicts_with = "predefined")]
    pub url: Option<String>,
    /// Load a predefined document by name or list position
    #[arg(long)]
    pub predefined: Option<String>,
    /// Input format; inferred from the file extension when omitted
    #[arg(short = 'f', long, value_enum)]
    pub format: Option<InputFormat>,
    /// Table name for CSV input (defaults to the file stem)
    #[arg(long = "table-name")]
    pub table_name: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Select every group after loading
    #[arg(long = "select-all")]
    pub select_all: bool,
}

#[derive(Debug, Args)]
pub struct SelectArgs {
    /// Group names to select
    #[arg(required_unless_present = "all")]
    pub groups: Vec<String>,
    /// Deselect the named groups instead
    #[arg(long)]
    pub off: bool,
    /// Toggle every group: select all, or clear when all are selected
    #[arg(long, conflicts_with = "groups")]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct RenameGroupArgs {
    /// Source name of the group
    pub group: String,
    /// New display name; empty restores the derived name
    #[arg(default_value = "")]
    pub label: String,
}

#[derive(Debug, Args)]
pub struct MapArgs {
    /// Source field name
    pub field: String,
    /// Display name; empty maps the field to itself
    #[arg(default_value = "")]
    pub target: String,
    /// Position among mapped fields
    #[arg(long)]
    pub order: Option<usize>,
}

#[derive(Debug, Args)]
pub struct HideArgs {
    /// Field names (source or mapped)
    #[arg(required = true)]
    pub fields: Vec<String>,
    /// Show the fields again
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct RollArgs {
    /// Filter expressions such as `price:Cost <= 100`, `Name contains fly`,
    /// or `!Tier >= 3`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Number of distinct results to roll
    #[arg(short = 'n', long, default_value_t = 1)]
    pub count: usize,
    /// Seed for a reproducible roll
    #[arg(long)]
    pub seed: Option<u64>,
    /// Restrict the roll to these group display names
    #[arg(long = "only-group", action = clap::ArgAction::Append)]
    pub only_groups: Vec<String>,
    /// Keep every rolled result
    #[arg(long)]
    pub keep: bool,
    /// Store the given filters in the state; later rolls reuse them
    #[arg(long = "save-filters")]
    pub save_filters: bool,
    /// Ignore filters saved in the state
    #[arg(long = "no-saved-filters")]
    pub no_saved_filters: bool,
}

#[derive(Debug, Args)]
pub struct RemoveArgs {
    /// Kept item id
    pub id: String,
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Kept item id; every kept item when omitted
    pub id: Option<String>,
    /// Output file (stdout when omitted or `-`)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() || !first.is_ascii() {
                return Err(format!("Unsupported delimiter '{other}'"));
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_aliases() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
    }

    #[test]
    fn roll_arguments_parse() {
        let cli = Cli::parse_from([
            "table-roller",
            "-s",
            "state.json",
            "roll",
            "--filter",
            "price:Cost <= 100",
            "--filter",
            "Name contains fl",
            "-n",
            "3",
            "--keep",
        ]);
        let Commands::Roll(args) = cli.command else {
            panic!("expected roll");
        };
        assert_eq!(args.filters.len(), 2);
        assert_eq!(args.count, 3);
        assert!(args.keep);
        assert_eq!(cli.state, PathBuf::from("state.json"));
    }
}
