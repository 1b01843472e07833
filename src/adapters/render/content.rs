use termimad::MadSkin;

use crate::domain::{FieldValue, IssueContent, IssueFieldType};

/// Markdown document for an issue detail view.
pub fn content_markdown(content: &IssueContent) -> String {
    let mut out = String::new();

    for field in &content.fields {
        match (&field.field_type, &field.value) {
            (IssueFieldType::Markdown, FieldValue::Text(text)) => {
                out.push_str(&format!("\n**{}**\n\n{}\n\n", field.label, text));
            }
            (_, FieldValue::Chips(chips)) => {
                let chips = chips
                    .iter()
                    .map(|c| format!("`{c}`"))
                    .collect::<Vec<_>>()
                    .join(" ");
                out.push_str(&format!("**{}:** {}\n", field.label, chips));
            }
            (IssueFieldType::Link, FieldValue::Text(text)) => match &field.link {
                Some(link) if !link.is_empty() => {
                    out.push_str(&format!("**{}:** {} ({})\n", field.label, text, link));
                }
                _ => out.push_str(&format!("**{}:** {}\n", field.label, text)),
            },
            (_, FieldValue::Text(text)) => {
                out.push_str(&format!("**{}:** {}\n", field.label, text));
            }
        }
    }

    if let Some(url) = &content.issue_url {
        out.push_str(&format!("\n{url}\n"));
    }

    out
}

/// Issue detail view formatted for the terminal.
pub fn render_issue_content(content: &IssueContent) -> String {
    let skin = MadSkin::default();
    skin.term_text(&content_markdown(content)).to_string()
}
