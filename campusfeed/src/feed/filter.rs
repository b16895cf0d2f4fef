use crate::types::{CategoryFilter, Post};

/// Posts matching `filter`, in feed order.
pub fn filter_posts<'a>(posts: &'a [Post], filter: &CategoryFilter) -> Vec<&'a Post> {
    posts.iter().filter(|post| filter.matches(&post.category)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, PostRecord};

    fn post(id: &str, category: &str) -> Post {
        Post::from(&PostRecord {
            id: id.to_string(),
            author: "Gus".to_string(),
            category: Category::parse(category),
            date_created: "2024-03-05T14:30:00".to_string(),
            image: None,
            location: String::new(),
            text: String::new(),
            tags: Vec::new(),
            likes: Vec::new(),
            comments: 0,
        })
    }

    fn ids<'a>(posts: &[&'a Post]) -> Vec<&'a str> {
        posts.iter().map(|post| post.id.as_str()).collect()
    }

    #[test]
    fn all_passes_everything_in_order() {
        let posts = vec![post("a", "Sports"), post("b", "Dining"), post("c", "Library")];
        assert_eq!(ids(&filter_posts(&posts, &CategoryFilter::All)), ["a", "b", "c"]);
    }

    #[test]
    fn category_match_is_exact() {
        let posts = vec![post("a", "Sports"), post("b", "Events"), post("c", "Sports"), post("d", "sports")];
        let sports = CategoryFilter::from_label("Sports");
        assert_eq!(ids(&filter_posts(&posts, &sports)), ["a", "c"]);

        let unknown = CategoryFilter::from_label("sports");
        assert_eq!(ids(&filter_posts(&posts, &unknown)), ["d"]);
    }
}
