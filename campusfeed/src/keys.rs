/// Key-construction helpers for the Redis document layout.
///
/// Documents live at `prefix:collection:id`; sub-documents append
/// `:sub_collection:sub_id`. Each collection keeps a set index of its
/// document ids and a Pub/Sub channel announcing changes.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub collection: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, collection: &'a str) -> Self {
        Self { prefix, collection }
    }

    pub fn document(&self, document_id: &str) -> String {
        format!("{}:{}:{}", self.prefix, self.collection, document_id)
    }

    /// Key of a document nested under `document_id`, e.g. a post's comment bundle.
    pub fn sub_document(&self, document_id: &str, sub_collection: &str, sub_id: &str) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.prefix, self.collection, document_id, sub_collection, sub_id
        )
    }

    pub fn index(&self) -> String {
        format!("{}:{}:_index", self.prefix, self.collection)
    }

    pub fn changes_channel(&self) -> String {
        format!("{}:{}:_changes", self.prefix, self.collection)
    }
}
