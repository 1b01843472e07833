use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueFieldType {
    Link,
    Text,
    Chips,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    Text(String),
    Chips(Vec<String>),
}

/// One row of an issue detail view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueContentField {
    pub label: &'static str,
    pub field_type: IssueFieldType,
    pub value: FieldValue,
    pub link: Option<String>,
}

impl IssueContentField {
    pub fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            field_type: IssueFieldType::Text,
            value: FieldValue::Text(value.into()),
            link: None,
        }
    }

    pub fn link(label: &'static str, value: impl Into<String>, link: Option<String>) -> Self {
        Self {
            label,
            field_type: IssueFieldType::Link,
            value: FieldValue::Text(value.into()),
            link,
        }
    }

    pub fn chips(label: &'static str, chips: Vec<String>) -> Self {
        Self {
            label,
            field_type: IssueFieldType::Chips,
            value: FieldValue::Chips(chips),
            link: None,
        }
    }

    pub fn markdown(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            field_type: IssueFieldType::Markdown,
            value: FieldValue::Text(value.into()),
            link: None,
        }
    }
}

/// Rendered detail view of an issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueContent {
    pub issue_url: Option<String>,
    pub fields: Vec<IssueContentField>,
    pub has_collapsing_comments: bool,
}
