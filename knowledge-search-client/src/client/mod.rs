pub mod web_search;
pub mod wikipedia;

pub use web_search::{WebSearch, WebSearchConfig};
pub use wikipedia::{Wikipedia, WikipediaConfig};
