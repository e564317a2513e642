//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hierarchical configuration engine: layered XML documents, path queries, and value expansion
#[derive(Parser, Debug)]
#[command(name = "rsconf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub debug: u8,

    /// Project directory for .rsconf.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    /// Document to load; repeat in merge order (later files override earlier)
    #[arg(short = 'f', long = "file", global = true, value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// Load every *.xml document in a directory, sorted by name
    #[arg(long, global = true, conflicts_with = "files", value_hint = ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// Schema for each --file, in the same order ("-" for none)
    #[arg(long = "schema", global = true)]
    pub schemas: Vec<String>,

    /// Keep documents as separate siblings instead of merging them
    #[arg(long, global = true)]
    pub append: bool,

    /// Expand environment references while loading
    #[arg(long, global = true)]
    pub expand_env: bool,

    /// Property for env. references, takes precedence over the environment
    #[arg(
        short = 'D',
        long = "define",
        global = true,
        value_name = "KEY=VALUE",
        value_parser = parse_property
    )]
    pub properties: Vec<(String, String)>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the value at a path
    Get {
        /// Slash-separated path, e.g. config/db/host
        path: String,
        /// Print the value without expanding references
        #[arg(long)]
        raw: bool,
        /// Values for {0}, {1}, ... placeholders
        args: Vec<String>,
    },

    /// Print the value at a path if it resolves, nothing otherwise
    #[command(name = "try-get")]
    TryGet {
        /// Slash-separated path
        path: String,
    },

    /// List every node matching a path
    Nodes {
        /// Slash-separated path
        path: String,
    },

    /// Show the merged tree
    Tree,

    /// Print every leaf path with its raw value
    Dump,

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show merged settings
    Show,

    /// Create settings template
    Init {
        /// Create global config
        #[arg(short, long)]
        global: bool,
    },

    /// Show settings paths
    Path,
}

/// Parse `KEY=VALUE`; the value may itself contain `=`.
pub fn parse_property(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}
