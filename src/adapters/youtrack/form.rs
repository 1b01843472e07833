use crate::domain::{DomainError, DomainResult, YoutrackCfg};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInputType {
    Url,
    Password,
}

/// Declarative description of one provider settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigFormField {
    pub key: &'static str,
    pub label: &'static str,
    pub input_type: FieldInputType,
    pub required: bool,
    /// The value must contain a `/` with characters on both sides.
    pub requires_path_separator: bool,
}

pub const YOUTRACK_CONFIG_FORM: [ConfigFormField; 2] = [
    ConfigFormField {
        key: "server",
        label: "Host (e.g.: https://youtrack.example.com)",
        input_type: FieldInputType::Url,
        required: true,
        requires_path_separator: true,
    },
    ConfigFormField {
        key: "token",
        label: "Permanent token",
        input_type: FieldInputType::Password,
        required: true,
        requires_path_separator: false,
    },
];

fn has_inner_separator(value: &str) -> bool {
    let last = value.chars().count().saturating_sub(1);
    value
        .chars()
        .enumerate()
        .any(|(i, c)| c == '/' && i > 0 && i < last)
}

fn field_value<'a>(cfg: &'a YoutrackCfg, key: &str) -> &'a str {
    match key {
        "server" => cfg.server.trim(),
        "token" => cfg.token.as_deref().unwrap_or("").trim(),
        _ => "",
    }
}

/// Check `cfg` against [`YOUTRACK_CONFIG_FORM`], reporting the first violation.
pub fn validate_youtrack_cfg(cfg: &YoutrackCfg) -> DomainResult<()> {
    for field in YOUTRACK_CONFIG_FORM {
        let value = field_value(cfg, field.key);

        if value.is_empty() {
            if field.required {
                return Err(DomainError::MissingField(field.key.to_string()));
            }
            continue;
        }

        if field.requires_path_separator && !has_inner_separator(value) {
            return Err(DomainError::InvalidConfig(format!(
                "{} must be a full URL, got '{}'",
                field.key, value
            )));
        }

        if field.input_type == FieldInputType::Url && reqwest::Url::parse(value).is_err() {
            return Err(DomainError::InvalidConfig(format!(
                "{} is not a valid URL: '{}'",
                field.key, value
            )));
        }
    }

    Ok(())
}
