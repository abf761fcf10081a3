use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use textwrap::{wrap, Options as WrapOptions};

use crate::catalog::Video;
use crate::comments::{Comment, Reaction};
use crate::data::VideoPage;
use crate::settings::Settings;
use crate::subscriptions::SubscribedChannel;

const WIDTH: usize = 78;
const ICON_VIEWS: &str = "▶";
const ICON_LIKE: &str = "👍";
const ICON_DISLIKE: &str = "👎";

pub fn compact_count(value: u64) -> String {
    const UNITS: [(u64, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];
    for (size, suffix) in UNITS {
        if value >= size {
            let tenths = value / (size / 10);
            return if tenths < 100 && tenths % 10 != 0 {
                format!("{}.{}{suffix}", tenths / 10, tenths % 10)
            } else {
                format!("{}{suffix}", value / size)
            };
        }
    }
    value.to_string()
}

pub fn views_label(value: u64) -> String {
    match value {
        1 => "1 view".to_string(),
        other => format!("{} views", compact_count(other)),
    }
}

pub fn relative_time(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds();
    if secs < 45 {
        return "just now".to_string();
    }
    let (amount, unit) = match secs {
        s if s < 60 * 60 => (s / 60, "minute"),
        s if s < 60 * 60 * 24 => (s / 3_600, "hour"),
        s if s < 60 * 60 * 24 * 30 => (s / 86_400, "day"),
        s if s < 60 * 60 * 24 * 365 => (s / (86_400 * 30), "month"),
        s => (s / (86_400 * 365), "year"),
    };
    let amount = amount.max(1);
    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural} ago")
}

fn wrapped(text: &str, indent: &str) -> String {
    let options = WrapOptions::new(WIDTH)
        .break_words(false)
        .initial_indent(indent)
        .subsequent_indent(indent);
    wrap(text, options)
        .into_iter()
        .map(|line| line.into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn video_list(heading: &str, videos: &[Video]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{heading}");
    if videos.is_empty() {
        let _ = writeln!(out, "  No videos found.");
        return out;
    }
    for video in videos {
        let _ = writeln!(out, "{}", wrapped(&video.title, "  "));
        let _ = writeln!(
            out,
            "    {} · {ICON_VIEWS} {} · {}",
            video.channel.name,
            views_label(video.view_count),
            video.published_at
        );
        let _ = writeln!(out, "    id: {}", video.id);
    }
    out
}

pub fn video_page(
    page: &VideoPage,
    reaction: &dyn Fn(u64) -> Option<Reaction>,
    now: DateTime<Utc>,
) -> String {
    let video = &page.video;
    let mut out = String::new();
    let _ = writeln!(out, "{}", wrapped(&video.title, ""));
    let _ = writeln!(
        out,
        "{} · {} · {}",
        views_label(video.view_count),
        video.published_at,
        video.duration.as_deref().unwrap_or("--:--")
    );
    let _ = writeln!(
        out,
        "{} ({} subscribers){}",
        video.channel.name,
        compact_count(video.channel.subscriber_count),
        if page.subscribed { " [subscribed]" } else { "" }
    );
    let _ = writeln!(
        out,
        "liked: {}   saved: {}",
        yes_no(page.liked),
        yes_no(page.saved)
    );
    if let Some(url) = video.video_url.as_deref() {
        let _ = writeln!(out, "watch: {url}");
    }
    if let Some(description) = video.description.as_deref().filter(|d| !d.trim().is_empty()) {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", wrapped(description, ""));
    }
    let _ = writeln!(out);
    out.push_str(&comment_list(&page.comments, reaction, now));
    out
}

pub fn comment_list(
    comments: &[Comment],
    reaction: &dyn Fn(u64) -> Option<Reaction>,
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Comments ({})", comments.len());
    if comments.is_empty() {
        let _ = writeln!(out, "  No comments yet. Be the first to comment!");
        return out;
    }
    for comment in comments {
        let edited = if comment.updated_at.is_some() { " (edited)" } else { "" };
        let _ = writeln!(
            out,
            "  {} · {}{edited} · #{}",
            comment.author,
            relative_time(comment.created_at, now),
            comment.id
        );
        let _ = writeln!(out, "{}", wrapped(&comment.text, "    "));
        let marker = match reaction(comment.id) {
            Some(Reaction::Like) => " (you liked)",
            Some(Reaction::Dislike) => " (you disliked)",
            None => "",
        };
        let _ = writeln!(
            out,
            "    {ICON_LIKE} {}  {ICON_DISLIKE} {}{marker}",
            comment.likes, comment.dislikes
        );
    }
    out
}

pub fn subscriptions(channels: &[SubscribedChannel]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Subscriptions ({})", channels.len());
    if channels.is_empty() {
        let _ = writeln!(out, "  You have not subscribed to any channels yet.");
    }
    for channel in channels {
        let _ = writeln!(out, "  {} ({})", channel.name, channel.id);
    }
    out
}

pub fn settings(settings: &Settings) -> String {
    format!(
        "Theme: {}\nLanguage: {}\nEmail notifications: {}\nPush notifications: {}\n",
        settings.theme.display_name(),
        settings.language,
        on_off(settings.email_notifications),
        on_off(settings.push_notifications)
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}
