use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Table};
use serde::Serialize;

use campusfeed::{
    Alert, CategoryFilter, FeedEvent, FeedSession, LikeToggle, LogAlerts, PostRecord, RenderedPost,
    feed::append_comment, format::initials, types::Category,
};

use crate::context::AppContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::{ICONS, THEME};

pub const WATCH_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Live Feed",
    commands: &[
        "campusfeed watch                      # Follow the feed until Ctrl-C",
        "campusfeed watch --category Sports    # Only show Sports posts",
        "campusfeed watch --once --output json # Print the current feed once",
    ],
}];

pub const LIKE_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Likes",
    commands: &["campusfeed like Xk3v9PqL2mRt8sWz1aBc   # Like or unlike a post"],
}];

pub const COMMENT_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Comments",
    commands: &["campusfeed comment Xk3v9PqL2mRt8sWz1aBc \"See you there!\""],
}];

pub const PUBLISH_EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Publishing",
    commands: &[
        "campusfeed publish --category Events --location \"Campus Center\" \"Open mic tonight\"",
        "campusfeed publish --category Sports --tag hockey --tag home \"Puck drop at 7\"",
    ],
}];

#[derive(Args)]
pub struct WatchArgs {
    /// Only show posts in this category ("All" shows everything)
    #[arg(long, default_value = "All")]
    pub category: String,

    /// Exit after the first snapshot is shown
    #[arg(long)]
    pub once: bool,
}

#[derive(Args)]
pub struct LikeArgs {
    /// Post to like or unlike
    pub post_id: String,
}

#[derive(Args)]
pub struct CommentArgs {
    /// Post to comment on
    pub post_id: String,

    /// Comment text
    pub text: String,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Post body
    pub text: String,

    /// Post category
    #[arg(long, default_value = "Events")]
    pub category: String,

    /// Location label
    #[arg(long, default_value = "")]
    pub location: String,

    /// Image URL
    #[arg(long)]
    pub image: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Author name (defaults to the local profile name)
    #[arg(long)]
    pub author: Option<String>,
}

/// Rendered feed as shown by `watch`
#[derive(Serialize)]
struct FeedView<'a> {
    category: &'a str,
    posts: Vec<RenderedPost<'a>>,
}

impl TableDisplay for FeedView<'_> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Post", "Author", "Posted", "Category", "Likes", "Comments", "Text"]);

        if self.posts.is_empty() {
            table.add_row(vec![Cell::new("No posts")]);
            return table;
        }

        for rendered in &self.posts {
            let post = rendered.post;
            let heart = if rendered.is_liked { ICONS.liked } else { ICONS.not_liked };
            let likes = format!("{heart} {}", rendered.likes);
            let likes = if rendered.is_liked && !output.options.no_color {
                likes.color(THEME.liked).to_string()
            } else {
                likes
            };
            let mut text = post.text.clone();
            for (author, comment) in rendered.comments.entries() {
                text.push_str(&format!("\n  {} {author}: {comment}", ICONS.comment));
            }
            table.add_row(vec![
                Cell::new(&post.id),
                Cell::new(format!("[{}] {}", initials(&post.author), post.author)),
                Cell::new(&post.created_at),
                Cell::new(post.category.as_str()),
                Cell::new(likes),
                Cell::new(rendered.comments.len().to_string()),
                Cell::new(text),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        let liked = self.posts.iter().filter(|post| post.is_liked).count();
        format!("{} posts ({}), {liked} liked", self.posts.len(), self.category)
    }
}

pub async fn handle_watch(ctx: &AppContext, args: WatchArgs, output: &OutputManager) -> Result<()> {
    let (_prefs, identity) = ctx.identity()?;
    output.progress("Connecting to Redis");
    let store = ctx.connect().await?;
    output.clear_line();

    let alerts = |alert: Alert| output.error(&format!("{}: {}", alert.title, alert.message));
    let mut session = FeedSession::open(store, identity, alerts).await;
    session.set_filter(CategoryFilter::from_label(&args.category));

    loop {
        let event = tokio::select! {
            event = session.next_event() => event,
            _ = tokio::signal::ctrl_c() => {
                output.info("Stopping");
                break;
            }
        };

        match event {
            Some(FeedEvent::Received(version)) => output.verbose(&format!("received snapshot {version}")),
            Some(FeedEvent::Applied(version)) => {
                output.verbose(&format!("applied snapshot {version}"));
                let view = FeedView {
                    category: session.state().filter().label(),
                    posts: session.state().rendered(),
                };
                output.heading("Campus Feed");
                output.display(&view)?;
                if args.once {
                    break;
                }
            }
            Some(FeedEvent::Discarded(version)) => output.verbose(&format!("discarded stale snapshot {version}")),
            Some(FeedEvent::SubscriptionFailed) => anyhow::bail!("Feed subscription failed"),
            None => break,
        }
    }

    session.close();
    Ok(())
}

pub async fn handle_like(ctx: &AppContext, args: LikeArgs, output: &OutputManager) -> Result<()> {
    let (_prefs, identity) = ctx.identity()?;
    let store = ctx.connect().await?;
    // A failed feed load is reported by the bail below.
    let mut session = FeedSession::open(store, identity, LogAlerts).await;

    // The current like state comes from the first applied snapshot.
    loop {
        match session.next_event().await {
            Some(FeedEvent::Applied(_)) => break,
            Some(FeedEvent::SubscriptionFailed) | None => anyhow::bail!("Could not load posts"),
            Some(_) => {}
        }
    }
    if !session.state().posts().iter().any(|post| post.id == args.post_id) {
        session.close();
        anyhow::bail!("Post '{}' not found", args.post_id);
    }

    let toggle = session.toggle_like(&args.post_id).await;
    session.close();
    match toggle {
        LikeToggle::NoIdentity => anyhow::bail!("No local user id is established"),
        LikeToggle::Toggled { liked, result } => {
            result.with_context(|| format!("Failed to update like on '{}'", args.post_id))?;
            if liked {
                output.success(&format!("{} Liked {}", ICONS.liked, args.post_id));
            } else {
                output.success(&format!("{} Unliked {}", ICONS.not_liked, args.post_id));
            }
        }
    }
    Ok(())
}

pub async fn handle_comment(ctx: &AppContext, args: CommentArgs, output: &OutputManager) -> Result<()> {
    let (_prefs, identity) = ctx.identity()?;
    let store = ctx.connect().await?;

    let outcome = append_comment(&store, &identity, &args.post_id, &args.text)
        .await
        .context("Comment rejected")?;

    if let Err(err) = &outcome.bundle {
        output.error(&format!("Failed to save comment: {err}"));
    }
    if let Err(err) = &outcome.counter {
        output.warning(&format!("Failed to update comment count: {err}"));
    }
    if !outcome.is_complete() {
        anyhow::bail!("Comment on '{}' was not fully saved", args.post_id);
    }
    output.success(&format!("{} commented on {}", outcome.author, args.post_id));
    Ok(())
}

pub async fn handle_publish(ctx: &AppContext, args: PublishArgs, output: &OutputManager) -> Result<()> {
    let category = Category::parse(&args.category);
    if !category.is_known() {
        let known = Category::known();
        let known: Vec<&str> = known.iter().map(Category::as_str).collect();
        output.warning(&format!(
            "'{}' is not a known category (expected one of: {})",
            args.category,
            known.join(", ")
        ));
    }
    let author = match args.author {
        Some(author) => author,
        None => {
            let (_prefs, identity) = ctx.identity()?;
            identity.author_name().to_string()
        }
    };

    let record = PostRecord {
        id: String::new(),
        author,
        category,
        date_created: chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
        image: args.image,
        location: args.location,
        text: args.text,
        tags: args.tags,
        likes: Vec::new(),
        comments: 0,
    };

    let store = ctx.connect().await?;
    let id = store.put_post(record).await.context("Failed to publish post")?;
    output.success(&format!("Published post {id}"));
    Ok(())
}
