//! CLI command definitions and subcommands

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use tracing::debug;

use crate::domain::CHAPTER_COUNT;

/// NovelWriter - staged LLM pipeline for serialized novels
#[derive(Parser)]
#[command(
    name = "nw",
    about = "Plan, draft, summarize and publish 8-chapter novels with an LLM",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a project and generate its plan (bible, characters, relations, outline)
    #[command(group(ArgGroup::new("topic").required(true)))]
    Init {
        /// Working title of the novel
        #[arg(long)]
        title: String,

        /// Topic paragraph
        #[arg(long, group = "topic")]
        blurb: Option<String>,

        /// UTF-8 text file containing the topic paragraph
        #[arg(long, group = "topic")]
        topic_file: Option<PathBuf>,

        /// Custom project id (default: slug of the title plus a UTC timestamp)
        #[arg(long)]
        project_id: Option<String>,
    },

    /// List projects
    ListProjects,

    /// Print a project's stored plan as JSON
    ShowPlan {
        #[arg(short, long, env = "NOVEL_PROJECT")]
        project: String,

        /// Print a readable overview instead of the JSON document
        #[arg(long)]
        summary: bool,
    },

    /// Show generation and publish status
    Status {
        #[arg(short, long, env = "NOVEL_PROJECT")]
        project: String,
    },

    /// Generate a chapter draft and save it
    WriteChapter {
        #[arg(short, long, env = "NOVEL_PROJECT")]
        project: String,

        /// Chapter number
        #[arg(long, value_parser = chapter_number)]
        chapter: u32,
    },

    /// Publish (create or edit) a chapter to Telegraph
    PublishChapter {
        #[arg(short, long, env = "NOVEL_PROJECT")]
        project: String,

        /// Chapter number
        #[arg(long, value_parser = chapter_number)]
        chapter: u32,
    },

    /// Publish or update the book index page linking to chapters
    PublishIndex {
        #[arg(short, long, env = "NOVEL_PROJECT")]
        project: String,
    },

    /// Create a Telegraph account and write its access token into an env file
    TelegraphInit {
        /// Account short name (required by createAccount)
        #[arg(long)]
        short_name: String,

        #[arg(long)]
        author_name: Option<String>,

        #[arg(long)]
        author_url: Option<String>,

        /// Env file to edit
        #[arg(long, default_value = "./.env")]
        env_file: PathBuf,

        /// Overwrite an existing token without prompting
        #[arg(long)]
        force: bool,
    },
}

fn chapter_number(s: &str) -> Result<u32, String> {
    let n: u32 = s.trim().parse().map_err(|_| format!("`{}` is not a chapter number", s))?;
    if (1..=CHAPTER_COUNT as u32).contains(&n) {
        Ok(n)
    } else {
        Err(format!("chapter must be in 1..={}", CHAPTER_COUNT))
    }
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("novelwriter")
        .join("logs")
        .join("novelwriter.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with credential checks and the log path
pub fn generate_after_help(api_key_env: &str, token_env: &str) -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Credentials:\n");
    for name in [api_key_env, token_env] {
        let present = std::env::var(name).map(|v| !v.trim().is_empty()).unwrap_or(false);
        let icon = if present { "\u{2705}" } else { "\u{274C}" };
        help.push_str(&format!("  {} {}\n", icon, name));
    }

    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}
