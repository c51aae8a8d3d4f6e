pub mod bot;
pub mod config;
pub mod scrape;
pub mod search;
pub mod status;

pub use bot::run_bot;
pub use scrape::{run_fetch, run_index, run_load, run_scrape};
pub use search::{run_search, show_show};
pub use status::show_status;
