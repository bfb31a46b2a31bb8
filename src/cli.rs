use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "droplift")]
#[command(author, version, about = "Watch a folder and upload what lands in it")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch the configured folder until interrupted
    Watch,

    /// Upload files to the configured destination
    Upload {
        /// Files to upload
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Render a name template once
    RenderName {
        /// Pattern to render (defaults to naming.pattern)
        pattern: Option<String>,
    },

    /// Bring a custom uploader file up to the current format
    Migrate {
        /// .sxcu file to migrate
        file: PathBuf,

        /// Rewrite the file in place instead of printing it
        #[arg(long)]
        write: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
