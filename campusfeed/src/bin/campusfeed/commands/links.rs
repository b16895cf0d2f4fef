use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use campusfeed::links::{CampusLink, default_directory, filter_links, load_links, site_search_url};

use crate::context::AppContext;
use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Campus Links",
        commands: &[
            "campusfeed links                  # Links from the store",
            "campusfeed links --directory      # Built-in campus directory (no Redis needed)",
        ],
    },
    ExampleGroup {
        title: "Search",
        commands: &["campusfeed links --directory dining   # Filter by label and print a site search URL"],
    },
];

#[derive(Args)]
pub struct LinksArgs {
    /// Case-insensitive label filter; also used for the site search URL
    pub query: Option<String>,

    /// Use the built-in campus directory instead of the stored links document
    #[arg(long)]
    pub directory: bool,
}

#[derive(Serialize)]
struct LinkList<'a> {
    links: Vec<&'a CampusLink>,
    search: Option<String>,
}

impl TableDisplay for LinkList<'_> {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Link", "URL"]);
        if self.links.is_empty() {
            table.add_row(vec![Cell::new("No links available")]);
        }
        for link in &self.links {
            table.add_row(vec![
                Cell::new(format!("{} {}", ICONS.link, link.label)),
                Cell::new(link.url.as_str()),
            ]);
        }
        table
    }

    fn to_compact(&self) -> String {
        self.links
            .iter()
            .map(|link| format!("{}={}", link.label, link.url))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub async fn handle_links(ctx: &AppContext, args: LinksArgs, output: &OutputManager) -> Result<()> {
    let links = if args.directory {
        default_directory()
    } else {
        let store = ctx.connect().await?;
        load_links(&store).await.context("Failed to load links")?
    };

    let query = args.query.as_deref().unwrap_or("");
    let search = site_search_url(&ctx.config.links.site_search, query)?.map(String::from);
    let list = LinkList {
        links: filter_links(&links, query),
        search,
    };

    output.heading("Campus Links");
    output.display(&list)?;
    if let Some(search) = &list.search {
        output.key_value("Search gustavus.edu", search);
    }
    Ok(())
}
