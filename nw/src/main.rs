//! NovelWriter CLI
//!
//! Thin command layer: every command opens the store, calls into the library
//! and prints tab-separated lines that are easy to script against.

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use novelstore::{INDEX_PAGE, Store};
use tracing::{debug, info};

use novelwriter::cli::{Cli, Command, generate_after_help, get_log_path};
use novelwriter::config::Config;
use novelwriter::domain::{CHAPTER_COUNT, ProjectPlan};
use novelwriter::envfile::{get_env_var, set_env_var};
use novelwriter::llm::create_client;
use novelwriter::pipeline::continuity;
use novelwriter::pipeline::{ChapterPipeline, FsArtifactSink, PlanGenerator};
use novelwriter::project::{Manifest, project_id_from_title, write_manifest};
use novelwriter::prompts::PromptLoader;
use novelwriter::publish::{self, Author, PublishError, TelegraphClient, create_account};
use novelwriter::storage::Persistence;

const TOKEN_VAR: &str = "TELEGRAPH_ACCESS_TOKEN";

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();

    let defaults = Config::default();
    let cmd = Cli::command().after_help(generate_after_help(&defaults.llm.api_key_env, &defaults.publish.token_env));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Init {
            title,
            blurb,
            topic_file,
            project_id,
        } => {
            cmd_init(&config, &title, blurb, topic_file, project_id).await?;
        }
        Command::ListProjects => cmd_list_projects(&config)?,
        Command::ShowPlan { project, summary } => cmd_show_plan(&config, &project, summary)?,
        Command::Status { project } => cmd_status(&config, &project)?,
        Command::WriteChapter { project, chapter } => cmd_write_chapter(&config, &project, chapter).await?,
        Command::PublishChapter { project, chapter } => cmd_publish_chapter(&config, &project, chapter).await?,
        Command::PublishIndex { project } => cmd_publish_index(&config, &project).await?,
        Command::TelegraphInit {
            short_name,
            author_name,
            author_url,
            env_file,
            force,
        } => {
            return cmd_telegraph_init(&config, &short_name, author_name, author_url, &env_file, force).await;
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn open_store(config: &Config) -> Result<Store> {
    let path = &config.storage.db_path;
    Store::open(path).context(format!("Failed to open database at {}", path.display()))
}

fn prompt_loader(config: &Config) -> Arc<PromptLoader> {
    Arc::new(PromptLoader::new(config.storage.prompts_dir.as_ref()))
}

/// Create a project: generate its plan, store it, print the project id
async fn cmd_init(
    config: &Config,
    title: &str,
    blurb: Option<String>,
    topic_file: Option<PathBuf>,
    project_id: Option<String>,
) -> Result<()> {
    debug!(%title, ?topic_file, "cmd_init: called");
    config.validate()?;

    let title = title.trim();
    let blurb = match topic_file {
        Some(path) => fs::read_to_string(&path).context(format!("Failed to read topic file {}", path.display()))?,
        None => blurb.unwrap_or_default(),
    };
    let blurb = blurb.trim();

    let project_id = project_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| project_id_from_title(title));

    let store = open_store(config)?;
    let llm = create_client(&config.llm)?;
    let sink = FsArtifactSink::for_project(&config.storage.outputs_dir, &project_id);

    let generated = PlanGenerator::new(llm, prompt_loader(config), config)
        .generate_project_plan(title, blurb, &sink)
        .await?;
    store.put_plan(&project_id, title, blurb, &generated.document)?;

    write_manifest(
        &config.storage.outputs_dir,
        &Manifest {
            project_id: project_id.clone(),
            title: title.to_string(),
        },
    )
    .context("Failed to write manifest")?;

    info!(%project_id, "cmd_init: project created");
    println!("{}", project_id);
    Ok(())
}

fn cmd_list_projects(config: &Config) -> Result<()> {
    debug!("cmd_list_projects: called");
    let store = open_store(config)?;
    for row in store.list_projects()? {
        println!("{}\t{}\t{}", row.project_id, row.created_at_utc, row.title);
    }
    Ok(())
}

fn cmd_show_plan(config: &Config, project_id: &str, summary: bool) -> Result<()> {
    debug!(%project_id, summary, "cmd_show_plan: called");
    let store = open_store(config)?;
    let record = store
        .get_project(project_id)?
        .ok_or_else(|| eyre::eyre!("Project not found: {}", project_id))?;
    if summary {
        let plan: ProjectPlan = serde_json::from_value(record.plan)?;
        print!("{}", plan.overview(project_id));
    } else {
        println!("{}", serde_json::to_string_pretty(&record.plan)?);
    }
    Ok(())
}

fn cmd_status(config: &Config, project_id: &str) -> Result<()> {
    debug!(%project_id, "cmd_status: called");
    let store = open_store(config)?;
    let plan = store
        .get_plan(project_id)?
        .ok_or_else(|| eyre::eyre!("Project not found: {}", project_id))?;
    println!("project\t{}\t{}", project_id, plan.topic.title);

    let chapters = store.list_chapters(project_id)?;
    let publishes = store.list_publishes(project_id)?;
    let url_for = |idx: u32| publishes.iter().find(|p| p.chapter_idx == idx).map(|p| p.url.as_str());

    for idx in 1..=CHAPTER_COUNT as u32 {
        let row = chapters.iter().find(|c| c.chapter_idx == idx);
        let have = if row.is_some() { "Y" } else { "N" };
        let title = row.map(|c| c.title.as_str()).filter(|t| !t.is_empty()).unwrap_or("-");
        println!("ch{}\t{}\t{}\t{}", idx, have, title, url_for(idx).unwrap_or("-"));
    }

    if let Some(url) = url_for(INDEX_PAGE) {
        println!("index\t{}", url);
    }
    Ok(())
}

/// Generate one chapter from the stored plan and the previous chapter
async fn cmd_write_chapter(config: &Config, project_id: &str, chapter: u32) -> Result<()> {
    debug!(%project_id, %chapter, "cmd_write_chapter: called");
    config.validate()?;

    let store = open_store(config)?;
    let plan = store
        .get_plan(project_id)?
        .ok_or_else(|| eyre::eyre!("Project not found: {}", project_id))?;
    let context =
        continuity::resolve_with_window(&store, project_id, chapter, config.generation.prev_paragraph_window)?;

    let llm = create_client(&config.llm)?;
    let sink = FsArtifactSink::for_chapter(&config.storage.outputs_dir, project_id, chapter);
    let artifact = ChapterPipeline::new(llm, prompt_loader(config), config)
        .generate_chapter(&plan, chapter, &context, &sink)
        .await?;

    Persistence::put_chapter(&store, project_id, &artifact)?;

    info!(%project_id, %chapter, title = %artifact.title, "cmd_write_chapter: chapter stored");
    println!("ok\t{}\tch{}", project_id, chapter);
    Ok(())
}

fn telegraph(config: &Config) -> Result<TelegraphClient> {
    let token = config
        .publish
        .access_token()
        .ok_or_else(|| PublishError::MissingToken(config.publish.token_env.clone()))?;
    Ok(TelegraphClient::new(token, Duration::from_millis(config.publish.timeout_ms))?)
}

fn author(config: &Config) -> Author {
    Author {
        name: config.publish.author_name.clone(),
        url: config.publish.author_url.clone(),
    }
}

async fn cmd_publish_chapter(config: &Config, project_id: &str, chapter: u32) -> Result<()> {
    debug!(%project_id, %chapter, "cmd_publish_chapter: called");
    let client = telegraph(config)?;
    let store = open_store(config)?;

    let record = publish::publish_chapter(&store, &client, project_id, chapter, &author(config)).await?;
    println!("{}", record.url);
    Ok(())
}

async fn cmd_publish_index(config: &Config, project_id: &str) -> Result<()> {
    debug!(%project_id, "cmd_publish_index: called");
    let client = telegraph(config)?;
    let store = open_store(config)?;

    let record = publish::publish_index(&store, &client, project_id, &author(config)).await?;
    println!("{}", record.url);
    Ok(())
}

/// Ask for REPLACE on an interactive terminal; anything else aborts
fn confirm_replace() -> Result<bool> {
    print!("Type REPLACE to overwrite {}: ", TOKEN_VAR);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(answer.trim() == "REPLACE")
}

/// Create a Telegraph account and store its token; the token is never printed
async fn cmd_telegraph_init(
    config: &Config,
    short_name: &str,
    author_name: Option<String>,
    author_url: Option<String>,
    env_file: &Path,
    force: bool,
) -> Result<ExitCode> {
    debug!(%short_name, ?env_file, force, "cmd_telegraph_init: called");

    let existing = get_env_var(env_file, TOKEN_VAR).context("Failed to read env file")?;
    if existing.is_some_and(|v| !v.trim().is_empty()) && !force {
        println!(
            "{} {} already has {}. Refusing to overwrite without confirmation.",
            "WARNING:".yellow(),
            env_file.display(),
            TOKEN_VAR
        );
        if !io::stdin().is_terminal() {
            println!("Re-run with --force to overwrite.");
            return Ok(ExitCode::from(2));
        }
        if !confirm_replace()? {
            println!("aborted");
            return Ok(ExitCode::from(2));
        }
    }

    let account = create_account(
        short_name,
        author_name.as_deref(),
        author_url.as_deref(),
        Duration::from_millis(config.publish.timeout_ms),
    )
    .await?;
    let token = account
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| PublishError::Api("createAccount returned no access_token".to_string()))?;

    set_env_var(env_file, TOKEN_VAR, &token).context("Failed to write env file")?;
    if let Some(name) = author_name.as_deref() {
        set_env_var(env_file, "TELEGRAPH_AUTHOR_NAME", name).context("Failed to write env file")?;
    }
    if let Some(url) = author_url.as_deref() {
        set_env_var(env_file, "TELEGRAPH_AUTHOR_URL", url).context("Failed to write env file")?;
    }

    info!(env_file = %env_file.display(), "cmd_telegraph_init: token stored");
    println!("ok\tenv={}", env_file.display());
    if let Some(auth_url) = account.auth_url {
        println!("auth_url\t{}", auth_url);
    }
    Ok(ExitCode::SUCCESS)
}
