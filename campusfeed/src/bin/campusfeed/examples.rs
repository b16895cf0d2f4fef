use crate::commands::{feed, identity, links};

#[derive(Clone, Copy)]
pub struct ExampleGroup {
    pub title: &'static str,
    pub commands: &'static [&'static str],
}

#[derive(Clone, Copy)]
pub struct CommandExample {
    pub name: &'static str,
    pub groups: &'static [ExampleGroup],
}

pub fn command_examples() -> &'static [CommandExample] {
    &[
        CommandExample {
            name: "watch",
            groups: feed::WATCH_EXAMPLES,
        },
        CommandExample {
            name: "like",
            groups: feed::LIKE_EXAMPLES,
        },
        CommandExample {
            name: "comment",
            groups: feed::COMMENT_EXAMPLES,
        },
        CommandExample {
            name: "publish",
            groups: feed::PUBLISH_EXAMPLES,
        },
        CommandExample {
            name: "links",
            groups: links::EXAMPLES,
        },
        CommandExample {
            name: "identity",
            groups: identity::EXAMPLES,
        },
    ]
}
