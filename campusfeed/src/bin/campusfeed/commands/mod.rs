pub mod feed;
pub mod identity;
pub mod links;
