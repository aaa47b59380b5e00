pub mod post;

pub use post::{scrape_timestamp, CommentNode, PostRecord, ReplyNode};
