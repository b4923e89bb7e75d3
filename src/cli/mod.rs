use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::constants::MAX_UNLOCK_TTL_MINUTES;
use crate::media::MediaType;

/// A personal media bookmarking shelf with a passcode vault
#[derive(Parser, Debug)]
#[command(name = "mediashelf", author, version, about, long_about = None)]
pub struct CliArgs {
    /// Print verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Log format override (text or json)
    #[arg(long, global = true, value_parser = ["text", "json"])]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bookmark a URL
    Add(AddArgs),

    /// List bookmarks, newest first
    List(ListArgs),

    /// Edit a bookmark
    Update(UpdateArgs),

    /// Delete a public bookmark
    Delete {
        /// Record id
        id: String,
    },

    /// Move a bookmark into the hidden vault
    Hide {
        /// Record id
        id: String,
    },

    /// Move a bookmark out of the hidden vault (requires unlock)
    Unhide {
        /// Record id
        id: String,
    },

    /// Show or change the hidden-tag list
    #[command(subcommand)]
    Tags(TagsCommand),

    /// Export the shelf to a JSON file
    Export(ExportArgs),

    /// Import a JSON export (or a legacy array of bookmarks)
    Import(ImportArgs),

    /// Passcode vault management
    #[command(subcommand)]
    Vault(VaultCommand),

    /// Read or set display preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Delete the database file
    Destroy {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub url: String,

    /// Tag (repeatable, at least one)
    #[arg(short = 't', long = "tag", required = true)]
    pub tags: Vec<String>,

    #[arg(long = "type", value_enum)]
    pub media_type: Option<TypeArg>,

    #[arg(short = 'n', long)]
    pub name: Option<String>,

    #[arg(long)]
    pub thumbnail: Option<String>,

    /// Add straight into the hidden vault
    #[arg(long)]
    pub hidden: bool,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// List the hidden vault instead (requires unlock)
    #[arg(long)]
    pub hidden: bool,

    /// Include public records carrying hidden tags
    #[arg(long, conflicts_with = "hidden")]
    pub all: bool,

    /// Only records with this tag
    #[arg(short = 't', long)]
    pub tag: Option<String>,

    /// Only records of this format
    #[arg(short = 'f', long)]
    pub format: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct UpdateArgs {
    pub id: String,

    #[arg(long)]
    pub url: Option<String>,

    #[arg(long = "type", value_enum)]
    pub media_type: Option<TypeArg>,

    #[arg(short = 'n', long)]
    pub name: Option<String>,

    /// Replace tags (repeatable)
    #[arg(short = 't', long = "tag")]
    pub tags: Vec<String>,

    #[arg(long, conflicts_with = "clear_thumbnail")]
    pub thumbnail: Option<String>,

    #[arg(long)]
    pub clear_thumbnail: bool,

    /// Re-run format detection after the change
    #[arg(long)]
    pub recompute_format: bool,
}

#[derive(Subcommand, Debug)]
pub enum TagsCommand {
    /// List all tags and the hidden-tag list
    List,
    /// Hide public records carrying this tag
    Hide { tag: String },
    /// Stop hiding records carrying this tag
    Unhide { tag: String },
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    pub path: PathBuf,

    /// Include hidden records and the vault verifier (requires unlock)
    #[arg(long)]
    pub include_hidden: bool,
}

#[derive(Args, Debug)]
pub struct ImportArgs {
    pub path: PathBuf,

    /// Replace everything instead of merging
    #[arg(long)]
    pub overwrite: bool,

    /// Ask for a passcode to restore hidden records
    #[arg(long)]
    pub with_passcode: bool,
}

#[derive(Subcommand, Debug)]
pub enum VaultCommand {
    /// Set the first passcode
    Setup,
    /// Replace the passcode (asks for the current one first)
    Reconfigure,
    /// Unlock the vault
    Unlock {
        /// Minutes a remembered unlock stays valid (1 to 1440)
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_UNLOCK_TTL_MINUTES as i64))]
        ttl: Option<u32>,

        /// Stay running until the unlock expires, then lock
        #[arg(long)]
        hold: bool,
    },
    /// Lock the vault
    Lock,
    /// Show vault state
    Status,
    /// Remember unlocks for the configured TTL
    Remember {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Blur hidden thumbnails
    Blur {
        #[arg(value_enum)]
        state: Toggle,
    },
}

#[derive(Subcommand, Debug)]
pub enum PrefsCommand {
    /// Print or set the theme
    Theme { value: Option<String> },
    /// Print or set the gallery layout
    Layout { value: Option<String> },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeArg {
    Image,
    Video,
    Other,
}

impl From<TypeArg> for MediaType {
    fn from(arg: TypeArg) -> Self {
        match arg {
            TypeArg::Image => MediaType::Image,
            TypeArg::Video => MediaType::Video,
            TypeArg::Other => MediaType::Other,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }
}
