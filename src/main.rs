use std::path::PathBuf;

use inbox_sync::app::App;
use inbox_sync::config::Config;
use inbox_sync::error::{AppError, Result};

const USAGE: &str = "usage: inbox-sync [--sync | --list [subscription-id] | --unread | --mark-read <post-id> | --push <payload.json> | --reset]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().skip(1).collect();

    let config = Config::load()?;
    let app = App::new(&config).await?;

    match args.first().map(String::as_str) {
        None | Some("--sync") => {
            let outcome = app.sync().await?;
            println!("subscriptions: {}", outcome.subscriptions);
            println!("posts: {}", outcome.posts);
            println!(
                "{}",
                if outcome.new_posts() {
                    "New posts available"
                } else {
                    "No new posts"
                }
            );
        }

        Some("--list") => {
            for stored in app.posts(args.get(1).map(String::as_str)).await? {
                let post = &stored.post;
                println!(
                    "{} {} [{}] {} ({})",
                    if post.is_read { " " } else { "*" },
                    post.received_at.format("%Y-%m-%d %H:%M"),
                    stored
                        .subscription_name
                        .as_deref()
                        .or(post.subscription_id.as_deref())
                        .unwrap_or("-"),
                    post.subject,
                    post.id
                );
            }
        }

        Some("--unread") => {
            println!("{}", app.repository.unread_count().await?);
        }

        Some("--mark-read") => {
            let id = args.get(1).ok_or_else(|| AppError::Config(USAGE.to_string()))?;
            if !app.mark_read(id).await? {
                eprintln!("No post with id {}", id);
            }
        }

        Some("--push") => {
            let path = args
                .get(1)
                .map(PathBuf::from)
                .ok_or_else(|| AppError::Config(USAGE.to_string()))?;
            if app.receive_push_file(&path).await? {
                println!("Stored post from {:?}", path);
            } else {
                println!("{:?} does not carry a post", path);
            }
        }

        Some("--reset") => {
            app.repository.reset().await?;
            println!("Inbox cleared");
        }

        Some(_) => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
