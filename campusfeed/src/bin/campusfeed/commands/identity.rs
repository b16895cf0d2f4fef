use anyhow::{Context, Result};
use clap::Subcommand;
use comfy_table::{Cell, Table};
use serde::Serialize;

use campusfeed::format::initials;

use crate::context::AppContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Device Identity",
    commands: &[
        "campusfeed identity show                # Show (and mint on first use) the local user id",
        "campusfeed identity set-name \"Ole Gus\"  # Set the name attached to comments",
    ],
}];

#[derive(Subcommand)]
pub enum IdentityCommands {
    /// Show the local user id and display name
    #[command(name = "show")]
    Show,

    /// Set the display name used for comments
    #[command(name = "set-name")]
    SetName {
        /// New display name
        name: String,
    },
}

#[derive(Serialize)]
struct IdentityView {
    user_id: Option<String>,
    display_name: Option<String>,
    author: String,
    initials: String,
    preferences: String,
    config: Option<String>,
}

impl TableDisplay for IdentityView {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        let rows = [
            ("User id", self.user_id.as_deref().unwrap_or("-")),
            ("Display name", self.display_name.as_deref().unwrap_or("-")),
            ("Comments as", self.author.as_str()),
            ("Initials", self.initials.as_str()),
            ("Preferences", self.preferences.as_str()),
            ("Config", self.config.as_deref().unwrap_or("defaults")),
        ];
        for (key, value) in rows {
            table.add_row(vec![Cell::new(key), Cell::new(value)]);
        }
        table
    }

    fn to_compact(&self) -> String {
        format!("{} ({})", self.user_id.as_deref().unwrap_or("-"), self.author)
    }
}

pub fn handle_identity_commands(
    ctx: &AppContext,
    command: IdentityCommands,
    output: &OutputManager,
) -> Result<()> {
    let (mut prefs, mut identity) = ctx.identity()?;

    match command {
        IdentityCommands::Show => {
            let view = IdentityView {
                user_id: identity.user_id().map(str::to_string),
                display_name: identity.display_name().map(str::to_string),
                author: identity.author_name().to_string(),
                initials: initials(identity.author_name()),
                preferences: prefs.path().display().to_string(),
                config: ctx.config_path.as_ref().map(|path| path.display().to_string()),
            };
            output.heading("Local Identity");
            output.display(&view)?;
        }
        IdentityCommands::SetName { name } => {
            let name = name.trim();
            if name.is_empty() {
                anyhow::bail!("Display name must not be empty");
            }
            identity
                .set_display_name(&mut prefs, name)
                .context("Failed to save display name")?;
            output.success(&format!("Comments will be posted as '{}'", identity.author_name()));
        }
    }

    Ok(())
}
