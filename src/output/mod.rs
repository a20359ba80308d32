//! Output formatting: terminal, JSON, and plot artifacts.

mod json;
mod plot;
mod terminal;

pub use json::{to_json, to_json_pretty, write_json};
pub use plot::render_null_histogram;
pub use terminal::{format_report, format_round};
