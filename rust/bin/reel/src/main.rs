//! `reel`: terminal story player.
//!
//! Usage:
//!   reel [-c reel.toml] [--fixture stories.json] [--focus <author>] [--viewer <id>]
//!
//! Loads a story fixture into the in-memory collaborator, opens the viewer
//! and maps stdin commands to viewer input. Published state is printed as
//! it changes.

mod commands;
mod config;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use reel_flux::{StateStore, StateValue};
use reel_story::{
    load_catalog, ClosedEvent, CommentsView, Fixture, MemoryBackend, PlaybackState, SocialView,
    ViewerDriver, ViewerView,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use config::ReelConfig;

/// Terminal story player.
#[derive(Parser, Debug)]
#[command(name = "reel", about = "Terminal story player")]
struct Cli {
    /// Path to the config file.
    #[arg(short = 'c', long = "config", default_value = "reel.toml")]
    config: PathBuf,

    /// Story fixture (overrides `fixture` in the config file).
    #[arg(long = "fixture")]
    fixture: Option<PathBuf>,

    /// Open at this author's stories.
    #[arg(long = "focus")]
    focus: Option<String>,

    /// Authenticated viewer id (overrides `viewer.viewer_id`).
    #[arg(long = "viewer")]
    viewer: Option<String>,

    /// Extra viewer overrides: --tick-ms=N, --image-seconds=S.
    #[arg(last = true)]
    overrides: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    let mut config = ReelConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    config.viewer.apply_args(&cli.overrides);
    if let Some(viewer) = cli.viewer {
        config.viewer.viewer_id = Some(viewer);
    }

    let fixture_path = cli
        .fixture
        .or(config.fixture.clone())
        .context("no fixture given (use --fixture or set `fixture` in the config file)")?;
    info!("Loading stories from {}", fixture_path.display());
    let raw = std::fs::read_to_string(&fixture_path)
        .with_context(|| format!("failed to read {}", fixture_path.display()))?;
    let fixture: Fixture = serde_json::from_str(&raw)
        .with_context(|| format!("invalid fixture {}", fixture_path.display()))?;

    let mut backend = MemoryBackend::from_fixture(fixture);
    if let Some(viewer) = config.viewer.viewer() {
        backend = backend.with_viewer(viewer);
    }
    let backend = Arc::new(backend);

    let (catalog, cursor) = load_catalog(backend.as_ref(), Utc::now(), cli.focus.as_deref()).await;
    let cursor = cursor.context("no active stories")?;

    let store = Arc::new(StateStore::new());
    subscribe_printer(&store);

    let (driver, handle) = ViewerDriver::new(backend, store.clone(), config.viewer.clone());
    let mut driver_task = tokio::spawn(driver.run());
    handle.open(catalog, cursor).await?;
    println!("{}", commands::HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            reason = &mut driver_task => {
                info!(?reason, "viewer stopped");
                return Ok(());
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                match commands::parse(&line) {
                    Some(command) => {
                        if let Err(e) = commands::run(&handle, command).await {
                            println!("! {}", e);
                        }
                    }
                    None => println!("? unknown command (type `help`)"),
                }
            }
        }
    }

    // stdin closed: dismiss and wait for the driver to wind down.
    let _ = handle.close();
    let reason = driver_task.await?;
    info!(?reason, "viewer stopped");
    Ok(())
}

/// Print published state. Progress ticks are skipped; the frame is only
/// printed when the story, playback state or comment surface changes.
fn subscribe_printer(store: &StateStore) {
    let last_frame: Mutex<Option<(String, Option<PlaybackState>, bool)>> = Mutex::new(None);
    store.subscribe("viewer/#", move |path, value| match path {
        "viewer/state" => {
            let Some(view) = value.downcast_ref::<ViewerView>() else {
                return;
            };
            let Some(story) = view.story.as_ref() else {
                return;
            };
            let key = (story.id.clone(), view.playback, view.comments_open);
            let mut last = last_frame.lock().unwrap();
            if last.as_ref() == Some(&key) {
                return;
            }
            *last = Some(key);
            print_frame(view);
        }
        "viewer/social" => print_social(value),
        "viewer/comments" => print_comments(value),
        "viewer/closed" => {
            if let Some(event) = value.downcast_ref::<ClosedEvent>() {
                println!("[closed] {:?}", event.reason);
            }
        }
        _ => {}
    });
}

fn print_frame(view: &ViewerView) {
    let (Some(story), Some(cursor), Some(playback)) = (view.story.as_ref(), view.cursor, view.playback) else {
        return;
    };
    let author = view
        .profile
        .as_ref()
        .map(|p| p.display_name.as_str())
        .unwrap_or(&story.author_id);
    let bars: String = (0..view.group_len)
        .map(|i| if i < cursor.story_index { '#' } else if i == cursor.story_index { '>' } else { '-' })
        .collect();
    println!(
        "[{}/{}] {} [{}] {} ({:?}){}{}",
        cursor.author_index + 1,
        view.author_count,
        author,
        bars,
        story.media_url,
        playback,
        story.caption.as_deref().map(|c| format!(" \"{}\"", c)).unwrap_or_default(),
        if view.comments_open { " +comments" } else { "" },
    );
}

fn print_social(value: &StateValue) {
    let Some(view) = value.downcast_ref::<SocialView>() else {
        return;
    };
    match view.state {
        Some(state) => println!(
            "  {} {} likes, {} views, {}",
            if state.is_liked { "♥" } else { "♡" },
            state.like_count,
            state.view_count,
            if state.is_following_author { "following" } else { "not following" },
        ),
        None if view.loading => println!("  loading social..."),
        None => {}
    }
}

fn print_comments(value: &StateValue) {
    let Some(view) = value.downcast_ref::<CommentsView>() else {
        return;
    };
    if !view.open {
        return;
    }
    println!("  -- {} comment(s){}", view.entries.len(), if view.busy { ", sending" } else { "" });
    for entry in &view.entries {
        println!(
            "  {}{}: {}",
            entry.comment.author_display,
            if entry.pending { " (sending)" } else { "" },
            entry.comment.body
        );
    }
}
