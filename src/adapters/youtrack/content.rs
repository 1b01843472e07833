use crate::adapters::render::html_to_markdown;
use crate::domain::{IssueContent, IssueContentField, YoutrackIssue};

fn description(issue: &YoutrackIssue) -> Option<String> {
    let wikified = issue
        .wikified_description
        .as_deref()
        .filter(|d| !d.trim().is_empty());

    match (issue.uses_markdown, wikified) {
        (Some(false), Some(html)) => Some(html_to_markdown(html)),
        _ => issue.description.clone().filter(|d| !d.trim().is_empty()),
    }
}

/// Detail view of a YouTrack issue. `issue_url` links the summary row.
pub fn youtrack_issue_content(issue: &YoutrackIssue, issue_url: Option<String>) -> IssueContent {
    let mut fields = Vec::new();

    let number = issue
        .number_in_project
        .map(|n| n.to_string())
        .unwrap_or_default();
    fields.push(IssueContentField::link(
        "Summary",
        format!("{} #{}", issue.summary.as_deref().unwrap_or_default(), number),
        issue_url.clone(),
    ));

    fields.push(IssueContentField::text(
        "Status",
        if issue.is_resolved() { "Resolved" } else { "Open" },
    ));

    if let Some(name) = issue.reporter.as_ref().and_then(|r| r.display_name()) {
        fields.push(IssueContentField::link("Assignee", name, None));
    }

    if !issue.tags.is_empty() {
        fields.push(IssueContentField::chips(
            "Labels",
            issue.tags.iter().map(|t| t.name.clone()).collect(),
        ));
    }

    if let Some(description) = description(issue) {
        fields.push(IssueContentField::markdown("Description", description));
    }

    IssueContent {
        issue_url,
        fields,
        has_collapsing_comments: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FieldValue, YoutrackIssueTag, YoutrackUserReduced};

    #[test]
    fn hides_optional_rows_when_empty() {
        let issue = YoutrackIssue {
            id: "2-1".to_string(),
            summary: Some("Crash".to_string()),
            number_in_project: Some(1),
            ..Default::default()
        };

        let content = youtrack_issue_content(&issue, None);
        let labels: Vec<_> = content.fields.iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["Summary", "Status"]);
        assert_eq!(content.fields[0].value, FieldValue::Text("Crash #1".to_string()));
        assert_eq!(content.fields[1].value, FieldValue::Text("Open".to_string()));
    }

    #[test]
    fn shows_reporter_tags_and_wikified_description() {
        let issue = YoutrackIssue {
            id: "2-1".to_string(),
            summary: Some("Crash".to_string()),
            resolved: Some(1_700_000_000_000),
            reporter: Some(YoutrackUserReduced {
                full_name: Some("Jane Doe".to_string()),
                ..Default::default()
            }),
            tags: vec![YoutrackIssueTag {
                id: "6-1".to_string(),
                name: "bug".to_string(),
                ..Default::default()
            }],
            description: Some("raw *wiki*".to_string()),
            wikified_description: Some("<p>rendered <strong>wiki</strong></p>".to_string()),
            uses_markdown: Some(false),
            ..Default::default()
        };

        let content = youtrack_issue_content(
            &issue,
            Some("https://yt.example.com/issue/2-1".to_string()),
        );
        let labels: Vec<_> = content.fields.iter().map(|f| f.label).collect();
        assert_eq!(
            labels,
            vec!["Summary", "Status", "Assignee", "Labels", "Description"]
        );
        assert_eq!(content.fields[1].value, FieldValue::Text("Resolved".to_string()));
        assert_eq!(
            content.fields[3].value,
            FieldValue::Chips(vec!["bug".to_string()])
        );
        match &content.fields[4].value {
            FieldValue::Text(text) => assert!(text.contains("**wiki**")),
            other => panic!("unexpected description value: {other:?}"),
        }
    }
}
