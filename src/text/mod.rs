//! Text helpers shared by the crawler and the output writer.

pub mod keywords;
pub mod slug;

pub use keywords::{matches, KeywordSet};
pub use slug::{slugify, DEFAULT_SLUG_LEN};
