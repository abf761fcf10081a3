use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;

use crate::catalog::{self, CatalogError, Category};
use crate::comments::Reaction;
use crate::config;
use crate::data::{self, Library, VideoService};
use crate::render;
use crate::settings::Language;
use crate::storage::{self, KeyValue, MemoryStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsChange {
    Show,
    ToggleTheme,
    Language(Language),
    Email(bool),
    Push(bool),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Feed(Category),
    Search(String),
    Show(String),
    Like(String),
    Save(String),
    Liked,
    Saved,
    Subscribe(String),
    Subscriptions,
    Comments(String),
    Comment { video: String, text: String },
    EditComment { video: String, id: u64, text: String },
    DeleteComment { video: String, id: u64 },
    React { video: String, id: u64, kind: Reaction },
    Settings(SettingsChange),
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some((name, rest)) = args.split_first() else {
            return Ok(Command::Feed(Category::Home));
        };
        let command = match name.as_str() {
            "home" | "trending" | "gaming" => Command::Feed(name.parse()?),
            "search" => Command::Search(rest.join(" ")),
            "show" => Command::Show(arg(rest, 0, "video id")?),
            "like" => Command::Like(arg(rest, 0, "video id")?),
            "save" => Command::Save(arg(rest, 0, "video id")?),
            "liked" => Command::Liked,
            "saved" => Command::Saved,
            "subscribe" => Command::Subscribe(arg(rest, 0, "video id")?),
            "subscriptions" => Command::Subscriptions,
            "comments" => Command::Comments(arg(rest, 0, "video id")?),
            "comment" => Command::Comment {
                video: arg(rest, 0, "video id")?,
                text: rest.get(1..).unwrap_or_default().join(" "),
            },
            "comment-edit" => Command::EditComment {
                video: arg(rest, 0, "video id")?,
                id: comment_id(rest)?,
                text: rest.get(2..).unwrap_or_default().join(" "),
            },
            "comment-delete" => Command::DeleteComment {
                video: arg(rest, 0, "video id")?,
                id: comment_id(rest)?,
            },
            "comment-like" | "comment-dislike" => Command::React {
                video: arg(rest, 0, "video id")?,
                id: comment_id(rest)?,
                kind: if name == "comment-like" {
                    Reaction::Like
                } else {
                    Reaction::Dislike
                },
            },
            "settings" => Command::Settings(settings_change(rest)?),
            other => bail!("unknown command {other:?}; see --help"),
        };
        Ok(command)
    }
}

fn arg(rest: &[String], index: usize, what: &str) -> Result<String> {
    rest.get(index)
        .filter(|value| !value.trim().is_empty())
        .cloned()
        .ok_or_else(|| anyhow!("missing {what}"))
}

fn comment_id(rest: &[String]) -> Result<u64> {
    let raw = arg(rest, 1, "comment id")?;
    raw.trim_start_matches('#')
        .parse()
        .with_context(|| format!("invalid comment id {raw:?}"))
}

fn switch(rest: &[String]) -> Result<bool> {
    match arg(rest, 1, "on/off")?.as_str() {
        "on" | "true" | "1" => Ok(true),
        "off" | "false" | "0" => Ok(false),
        other => bail!("expected on or off, got {other:?}"),
    }
}

fn settings_change(rest: &[String]) -> Result<SettingsChange> {
    let Some(which) = rest.first() else {
        return Ok(SettingsChange::Show);
    };
    match which.as_str() {
        "theme" => Ok(SettingsChange::ToggleTheme),
        "language" => Ok(SettingsChange::Language(arg(rest, 1, "language")?.parse()?)),
        "email" => Ok(SettingsChange::Email(switch(rest)?)),
        "push" => Ok(SettingsChange::Push(switch(rest)?)),
        other => bail!("unknown setting {other:?}"),
    }
}

pub fn run(args: Vec<String>) -> Result<()> {
    let command = Command::parse(&args)?;
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;

    let backend: Arc<dyn KeyValue> = match storage::Store::open(storage::Options {
        path: cfg.storage.path.clone(),
    }) {
        Ok(store) => Arc::new(store),
        Err(err) => {
            tracing::warn!(
                error = ?err,
                "local storage unavailable; changes will only last for this session"
            );
            Arc::new(MemoryStore::new())
        }
    };
    let library = Library::open(backend, &cfg.comments.author);

    let client = catalog::Client::new(catalog::ClientConfig {
        base_url: Some(cfg.catalog.base_url.clone()),
        access_token: cfg.catalog.access_token.clone(),
        user_agent: cfg.catalog.user_agent.clone(),
        timeout: Some(cfg.catalog.timeout),
        workers: Some(cfg.catalog.workers),
        http_client: None,
    })
    .context("create catalog client")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute(command, &client, &library, &mut out)
}

pub fn execute(
    command: Command,
    service: &dyn VideoService,
    library: &Library,
    out: &mut dyn Write,
) -> Result<()> {
    let now = Utc::now();
    match command {
        Command::Feed(category) => {
            let videos = service.list_by_category(category).map_err(retryable)?;
            write!(out, "{}", render::video_list(category.display_name(), &videos))?;
        }
        Command::Search(term) => {
            let videos = service.search(&term).map_err(retryable)?;
            let heading = if term.trim().is_empty() {
                "Home".to_string()
            } else {
                format!("Results for {:?}", term.trim())
            };
            write!(out, "{}", render::video_list(&heading, &videos))?;
        }
        Command::Show(id) => {
            let page = data::video_page(service, library, &id).map_err(retryable)?;
            let reaction = |comment_id| library.comments.reaction(&page.video.id, comment_id);
            write!(out, "{}", render::video_page(&page, &reaction, now))?;
        }
        Command::Like(id) => {
            if library.interactions.toggle_like(&id) {
                writeln!(out, "Liked {id}")?;
            } else {
                writeln!(out, "Removed {id} from liked videos")?;
            }
        }
        Command::Save(id) => {
            if library.interactions.toggle_save(&id) {
                writeln!(out, "Saved {id}")?;
            } else {
                writeln!(out, "Removed {id} from saved videos")?;
            }
        }
        Command::Liked => {
            let videos = data::liked_videos(service, library);
            write!(out, "{}", render::video_list("Liked Videos", &videos))?;
        }
        Command::Saved => {
            let videos = data::saved_videos(service, library);
            write!(out, "{}", render::video_list("Saved Videos", &videos))?;
        }
        Command::Subscribe(video_id) => {
            let (channel, subscribed) = data::toggle_channel_of(service, library, &video_id)?;
            if subscribed {
                writeln!(out, "Subscribed to {}", channel.name)?;
            } else {
                writeln!(out, "Unsubscribed from {}", channel.name)?;
            }
        }
        Command::Subscriptions => {
            let channels = library.subscriptions.list_subscriptions();
            write!(out, "{}", render::subscriptions(&channels))?;
        }
        Command::Comments(video) => {
            let comments = library.comments.list(&video);
            let reaction = |comment_id| library.comments.reaction(&video, comment_id);
            write!(out, "{}", render::comment_list(&comments, &reaction, now))?;
        }
        Command::Comment { video, text } => {
            let comment = library.comments.add(&video, &text, "")?;
            writeln!(out, "Added comment #{} on {video}", comment.id)?;
        }
        Command::EditComment { video, id, text } => {
            library.comments.edit(&video, id, &text)?;
            writeln!(out, "Updated comment #{id}")?;
        }
        Command::DeleteComment { video, id } => {
            library.comments.delete(&video, id)?;
            writeln!(out, "Deleted comment #{id}")?;
        }
        Command::React { video, id, kind } => {
            let state = library.comments.react(&video, id, kind)?;
            let label = match state {
                Some(Reaction::Like) => "liked",
                Some(Reaction::Dislike) => "disliked",
                None => "cleared reaction on",
            };
            writeln!(out, "You {label} comment #{id}")?;
        }
        Command::Settings(change) => {
            let settings = &library.settings;
            match change {
                SettingsChange::Show => {}
                SettingsChange::ToggleTheme => {
                    settings.toggle_theme();
                }
                SettingsChange::Language(language) => settings.set_language(language),
                SettingsChange::Email(enabled) => settings.set_email_notifications(enabled),
                SettingsChange::Push(enabled) => settings.set_push_notifications(enabled),
            }
            write!(out, "{}", render::settings(&settings.get()))?;
        }
    }
    if library.is_degraded() {
        writeln!(out, "note: local storage is unavailable; changes last only for this session")?;
    }
    Ok(())
}

fn retryable(err: CatalogError) -> anyhow::Error {
    match err {
        CatalogError::NotFound(_) => anyhow!(err),
        _ => anyhow!(err).context("Something went wrong loading videos. Please try again."),
    }
}
