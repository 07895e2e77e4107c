mod fetch;
mod parse;

pub use fetch::fetch_feed;
pub use parse::{Feed, FeedItem, Link, parse_feed};
