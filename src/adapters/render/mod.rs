mod content;
mod highlight;
mod markdown;

pub use content::render_issue_content;
pub use highlight::highlight_matches;
pub use markdown::html_to_markdown;
