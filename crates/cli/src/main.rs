//! CLI for generating, editing and exporting medical slide decks.

mod commands;
mod input;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use medislide_core::ai::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use medislide_core::{ExportFormat, ModifyAction};
use std::path::PathBuf;
use uuid::Uuid;

/// Build medical presentations with an AI collaborator and export them.
#[derive(Parser, Debug)]
#[command(name = "medislide")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// API key for the model endpoint
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(long, env = "MEDISLIDE_MODEL", default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Base URL of the model API
    #[arg(long, default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: String,

    /// Directory holding saved cases
    #[arg(long, env = "MEDISLIDE_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate slide JSON (raw model output or a saved deck) and print the repaired deck
    Validate {
        input: PathBuf,
        /// Write the repaired deck here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render a deck as HTML
    Render {
        /// Slide JSON file or case id
        source: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Export a deck as PDF, Word or PowerPoint
    Export {
        /// Slide JSON file or case id
        source: String,
        #[arg(short, long, value_enum, default_value = "pdf")]
        format: FormatArg,
        /// Output file (default: <topic>.<ext> in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Topic used for the file name and document title
        #[arg(short, long)]
        topic: Option<String>,
    },

    /// Print the text of every slide in a .pptx file
    Inspect { input: PathBuf },

    /// Start a topic case and generate its outline, or regenerate a case's outline
    Outline {
        /// Medical topic for a new case
        #[arg(required_unless_present = "case")]
        topic: Option<String>,
        /// Existing case to outline again
        #[arg(long, conflicts_with = "topic")]
        case: Option<Uuid>,
    },

    /// Generate slides for outline titles (1-based; default all)
    Generate {
        case: Uuid,
        #[arg(value_delimiter = ',')]
        picks: Vec<usize>,
    },

    /// Append one generated slide per topic
    Add {
        case: Uuid,
        #[arg(required = true)]
        topics: Vec<String>,
    },

    /// Ask the model to rewrite or expand selected slides (1-based)
    Modify {
        case: Uuid,
        #[arg(value_enum)]
        action: ActionArg,
        #[arg(required = true, value_delimiter = ',')]
        slides: Vec<usize>,
    },

    /// Suggest further topics for a case
    Suggest { case: Uuid },

    /// Delete slides (1-based)
    Remove {
        case: Uuid,
        #[arg(required = true, value_delimiter = ',')]
        slides: Vec<usize>,
    },

    /// Move a slide (1-based positions)
    Move { case: Uuid, from: usize, to: usize },

    /// Show a case's deck
    Show {
        case: Uuid,
        /// Print the raw `{"slides": [...]}` JSON
        #[arg(long)]
        json: bool,
    },

    /// List saved cases, or delete one
    Cases {
        #[arg(long)]
        delete: Option<Uuid>,
    },

    /// Answer a clinical question and start a question case
    Ask {
        question: Option<String>,
        /// Image files sent with the question
        #[arg(short, long)]
        image: Vec<PathBuf>,
    },

    /// Suggest diagnoses from patient notes and images
    Diagnose {
        notes: Option<String>,
        #[arg(short, long)]
        image: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FormatArg {
    Pdf,
    Docx,
    Pptx,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Pdf => ExportFormat::Pdf,
            FormatArg::Docx => ExportFormat::Docx,
            FormatArg::Pptx => ExportFormat::Pptx,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionArg {
    ReplaceContent,
    ExpandSelected,
    ExpandContent,
}

impl From<ActionArg> for ModifyAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::ReplaceContent => ModifyAction::ReplaceContent,
            ActionArg::ExpandSelected => ModifyAction::ExpandSelected,
            ActionArg::ExpandContent => ModifyAction::ExpandContent,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    commands::run(&args).await
}
