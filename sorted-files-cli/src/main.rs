use anyhow::Context;
use clap::{Parser, Subcommand};
use sorted_files_core::{
    config::SortedFilesConfig,
    fs::LocalFileSystem,
    listing::{ListEvent, SortDirection, SortKey, SortSpec, SortedFiles, Walker, rank},
};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

mod commands;
mod output;

use commands::Command;
use output::OutputFormat;

/// List the files under a directory, sorted and capped, and keep the list live.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (defaults to $SORTED_FILES_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Regex matched against bare filenames, overrides the config file
    #[arg(short, long, global = true)]
    pattern: Option<String>,

    /// Maximum number of files shown, overrides the config file
    #[arg(short = 'n', long, global = true)]
    max_items: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Walk the directory once and print the ranked list
    List {
        /// Directory to list
        root: PathBuf,
        /// Sort key: modified, created, name or size (default: newest first)
        #[arg(short, long)]
        sort: Option<SortKey>,
        /// Sort in descending order
        #[arg(short, long)]
        descending: bool,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
    /// Watch the directory and reprint the list on every change
    Watch {
        /// Directory to watch
        root: PathBuf,
        /// Output format
        #[arg(short, long, default_value = "summary")]
        format: OutputFormat,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    // Exit directly: a pending stdin read would otherwise hold up runtime shutdown
    match run().await {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Commands::List {
            root,
            sort,
            descending,
            format,
        } => {
            let spec = match sort {
                Some(key) if descending => SortSpec::new(key, SortDirection::Descending),
                Some(key) => SortSpec::new(key, SortDirection::Ascending),
                None => SortSpec::default(),
            };
            list(&config, &root, spec, &format).await
        }
        Commands::Watch { root, format } => watch(&config, &root, &format).await,
    }
}

fn load_config(args: &Args) -> anyhow::Result<SortedFilesConfig> {
    let path = match &args.config {
        Some(path) if !path.exists() => {
            anyhow::bail!("Configuration file {} does not exist", path.display())
        }
        Some(path) => path.clone(),
        None => SortedFilesConfig::default_path(),
    };
    let mut config = SortedFilesConfig::load(&path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;

    if let Some(pattern) = &args.pattern {
        config = config.with_pattern(pattern.clone());
    }
    if let Some(max_items) = args.max_items {
        config = config.with_max_items(max_items);
    }
    config.validate()?;
    Ok(config)
}

async fn list(
    config: &SortedFilesConfig,
    root: &Path,
    spec: SortSpec,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let root = std::path::absolute(root)?;
    let walker = Walker::new(Arc::new(LocalFileSystem::new()), config.compile_pattern()?);
    let entries = walker
        .walk(&root)
        .await
        .with_context(|| format!("Failed to list {}", root.display()))?;

    let ranked = rank(&entries, spec, config.max_items);
    output::write_list(&mut std::io::stdout().lock(), Some(&root), spec, &ranked, format)
}

async fn watch(config: &SortedFilesConfig, root: &Path, format: &OutputFormat) -> anyhow::Result<()> {
    let mut session = SortedFiles::from_config(config)?;
    let mut events = session.subscribe();
    session.set_watched_root(std::path::absolute(root)?)?;

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            step = session.step() => {
                tracing::trace!("Session step: {:?}", step);
            }
            event = events.recv() => match event {
                Ok(ListEvent::Replaced { entries, sort }) => {
                    output::write_list(
                        &mut std::io::stdout().lock(),
                        session.watched_root(),
                        sort,
                        &entries,
                        format,
                    )?;
                }
                Ok(ListEvent::RefreshFailed { root, message, .. }) => {
                    tracing::error!("Could not list {}: {}", root.display(), message);
                }
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {} list updates", missed);
                }
                Err(RecvError::Closed) => break,
            },
            line = lines.next() => match line {
                Some(Ok(line)) if line.trim().is_empty() => {}
                Some(Ok(line)) => match line.parse::<Command>() {
                    Ok(Command::Quit) => break,
                    Ok(command) => apply_command(&mut session, command, format)?,
                    Err(e) => eprintln!("{e}"),
                },
                Some(Err(e)) => return Err(e.into()),
                None => {
                    tracing::debug!("stdin closed");
                    break;
                }
            },
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }
    Ok(())
}

fn apply_command(session: &mut SortedFiles, command: Command, format: &OutputFormat) -> anyhow::Result<()> {
    match command {
        Command::Sort(key) => session.set_sort_key(key),
        Command::Root(dir) => {
            let dir = std::path::absolute(dir)?;
            if let Err(e) = session.set_watched_root(&dir) {
                eprintln!("Could not watch {}: {e}", dir.display());
            }
        }
        Command::Refresh => {
            if session.refresh().is_none() {
                eprintln!("No folder watched");
            }
        }
        Command::Status => {
            output::write_status(&mut std::io::stdout().lock(), &session.status(), format)?;
        }
        Command::Quit => {}
    }
    Ok(())
}
