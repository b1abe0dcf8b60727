use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use hacker_stories::config::Config;
use hacker_stories::db::{KeyValueStore, SqliteStore};
use hacker_stories::render::render_snapshot;
use hacker_stories::{HackerNewsClient, SearchSession, Story};

const HELP: &str = "\
Type a search term and press enter to search.
  :rm N      dismiss story N
  :open N    open story N in the browser
  :reload    fetch the current search again
  :show      print the current results
  :help      show this help
  :q         quit";

#[derive(Debug, PartialEq)]
enum Command {
    Search(String),
    Remove(usize),
    Open(usize),
    Reload,
    Show,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(rest) = line.strip_prefix(':') else {
        return Ok(Command::Search(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let index = |arg: Option<&str>| -> Result<usize, String> {
        let arg = arg.ok_or_else(|| format!(":{} needs a story number", name))?;
        match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(format!("'{}' is not a story number", arg)),
        }
    };

    match name {
        "rm" => index(parts.next()).map(Command::Remove),
        "open" => index(parts.next()).map(Command::Open),
        "reload" => Ok(Command::Reload),
        "show" => Ok(Command::Show),
        "help" => Ok(Command::Help),
        "q" | "quit" => Ok(Command::Quit),
        other => Err(format!("unknown command ':{}', try :help", other)),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so they don't interleave with the result list
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_snapshot<S: KeyValueStore>(session: &SearchSession<S>) -> Result<()> {
    let snapshot = session.snapshot()?;
    println!("{}", render_snapshot(&snapshot, Utc::now()));
    Ok(())
}

fn prompt() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

fn story_at<S: KeyValueStore>(session: &SearchSession<S>, position: usize) -> Result<Option<Story>> {
    Ok(session.snapshot()?.data.into_iter().nth(position - 1))
}

// Self posts have no external URL, so fall back to the discussion page
fn story_link(story: &Story) -> String {
    if story.url.is_empty() {
        format!("https://news.ycombinator.com/item?id={}", story.object_id)
    } else {
        story.url.clone()
    }
}

async fn refresh<S: KeyValueStore>(session: &mut SearchSession<S>, fired: bool) -> Result<()> {
    if fired {
        print_snapshot(session)?;
        session.settle().await;
    }
    print_snapshot(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.verbose);
    debug!(?config, "starting");

    let storage = match &config.db {
        Some(path) => SqliteStore::open(path),
        None => SqliteStore::open_default(),
    }
    .context("failed to open settings database")?;
    let client = HackerNewsClient::new(config.timeout()).context("failed to build HTTP client")?;

    let mut session = SearchSession::new(Arc::new(client), storage, config.session_options());
    let fired = session.mount()?.is_some();
    refresh(&mut session, fired).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt()?;
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Search(text)) => {
                session.on_search_input(&text);
                let fired = session.on_search_submit()?.is_some();
                refresh(&mut session, fired).await?;
            }
            Ok(Command::Remove(position)) => match story_at(&session, position)? {
                Some(story) => {
                    session.on_remove_item(&story)?;
                    print_snapshot(&session)?;
                }
                None => println!("No story number {}.", position),
            },
            Ok(Command::Open(position)) => match story_at(&session, position)? {
                Some(story) => {
                    let link = story_link(&story);
                    if let Err(e) = open::that(&link) {
                        warn!(url = %link, error = %e, "failed to open link");
                    }
                }
                None => println!("No story number {}.", position),
            },
            Ok(Command::Reload) => {
                let fired = session.reload()?.is_some();
                refresh(&mut session, fired).await?;
            }
            Ok(Command::Show) => print_snapshot(&session)?,
            Ok(Command::Help) => println!("{}", HELP),
            Ok(Command::Quit) => break,
            Err(message) => println!("{}", message),
        }
        prompt()?;
    }

    Ok(())
}
