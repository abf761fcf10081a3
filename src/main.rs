use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HELP: &str = "tubedeck - browse a video catalog and keep likes, subscriptions and comments locally.

Usage: tubedeck [command] [args]

Browse:
  home | trending | gaming            List a category feed (default: home)
  search <term...>                    Search titles; an empty term lists home
  show <video-id>                     Video details with your local state and comments

Library:
  like <video-id>                     Toggle a like
  save <video-id>                     Toggle save for later
  liked | saved                       List liked or saved videos
  subscribe <video-id>                Toggle a subscription to the video's channel
  subscriptions                       List subscribed channels

Comments:
  comments <video-id>                 List comments, newest first
  comment <video-id> <text...>        Add a comment
  comment-edit <video-id> <id> <text...>
  comment-delete <video-id> <id>
  comment-like <video-id> <id>        Toggle your like on a comment
  comment-dislike <video-id> <id>     Toggle your dislike on a comment

Settings:
  settings                            Show settings
  settings theme                      Toggle light/dark
  settings language <name|code>       English, Spanish, French or German
  settings email on|off
  settings push on|off

  --version, -V                       Show version and exit
  --help,    -h                       Show this help message

Logging goes to stderr; set TUBEDECK_LOG (e.g. tubedeck=debug) to change the filter.";

fn main() {
    if handle_cli_flags() {
        return;
    }

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = tubedeck::run(args) {
        eprintln!("error: {err:?}");
        std::process::exit(1);
    }
}

// Flags only count in first position; later words belong to the command.
fn handle_cli_flags() -> bool {
    match std::env::args().nth(1).as_deref() {
        Some("--version" | "-V") => {
            println!("tubedeck {}", tubedeck::VERSION);
            true
        }
        Some("--help" | "-h") => {
            println!("{HELP}");
            true
        }
        _ => false,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("TUBEDECK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("tubedeck=warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
