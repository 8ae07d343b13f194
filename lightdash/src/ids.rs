//! Composite Terraform IDs such as `projects/{project}/spaces/{space}`

use std::collections::BTreeMap;
use thiserror::Error;

pub const SPACE: &str = "projects/{}/spaces/{}";
pub const GROUP: &str = "groups/{}";
pub const PROJECT_ROLE_MEMBER: &str = "projects/{}/access/{}";
pub const PROJECT_ROLE_GROUP: &str = "projects/{}/group-access/{}";
pub const ORGANIZATION_ROLE_MEMBER: &str = "organization-members/{}";
pub const AI_AGENT: &str = "projects/{}/ai-agents/{}";
pub const WAREHOUSE_CREDENTIALS: &str = "warehouse-credentials/{}";
pub const PROJECT_SCHEDULER_SETTINGS: &str = "projects/{}/scheduler-settings";

const PLACEHOLDER: &str = "{}";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("resource id '{id}' does not match the format '{template}'")]
    Format { id: String, template: &'static str },

    #[error("resource id '{0}' must alternate collection names and uuids")]
    OddSegments(String),

    #[error("resource id '{0}' contains an empty segment")]
    EmptySegment(String),
}

/// Fills each `{}` in the template with the next value
pub fn build(template: &str, values: &[&str]) -> String {
    let mut values = values.iter();
    template
        .split('/')
        .map(|part| {
            if part == PLACEHOLDER {
                values.next().copied().unwrap_or_default()
            } else {
                part
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Extracts the placeholder values of an ID built from `template`
pub fn parse(id: &str, template: &'static str) -> Result<Vec<String>, IdError> {
    let format_error = || IdError::Format {
        id: id.to_string(),
        template,
    };

    let parts: Vec<&str> = id.split('/').collect();
    let expected: Vec<&str> = template.split('/').collect();
    if parts.len() != expected.len() {
        return Err(format_error());
    }

    let mut values = Vec::new();
    for (part, want) in parts.iter().zip(&expected) {
        if *want == PLACEHOLDER {
            if part.trim().is_empty() {
                return Err(IdError::EmptySegment(id.to_string()));
            }
            values.push(part.to_string());
        } else if part != want {
            return Err(format_error());
        }
    }
    Ok(values)
}

/// Two-value variant of [`parse`]
pub fn parse_pair(id: &str, template: &'static str) -> Result<(String, String), IdError> {
    let mut values = parse(id, template)?.into_iter();
    match (values.next(), values.next()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(IdError::Format {
            id: id.to_string(),
            template,
        }),
    }
}

pub fn parse_single(id: &str, template: &'static str) -> Result<String, IdError> {
    parse(id, template)?
        .into_iter()
        .next()
        .ok_or_else(|| IdError::Format {
            id: id.to_string(),
            template,
        })
}

/// Reads any `collection/uuid/...` ID into a map of collection to uuid
pub fn parse_collections(id: &str) -> Result<BTreeMap<String, String>, IdError> {
    let parts: Vec<&str> = id.trim_matches('/').split('/').collect();
    if parts.len() % 2 != 0 {
        return Err(IdError::OddSegments(id.to_string()));
    }
    if parts.iter().any(|p| p.trim().is_empty()) {
        return Err(IdError::EmptySegment(id.to_string()));
    }

    Ok(parts
        .chunks(2)
        .map(|pair| (pair[0].to_string(), pair[1].to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_parse_space_id() {
        let id = build(SPACE, &["p1", "s1"]);
        assert_eq!(id, "projects/p1/spaces/s1");
        assert_eq!(
            parse_pair(&id, SPACE).unwrap(),
            ("p1".to_string(), "s1".to_string())
        );
    }

    #[test]
    fn literal_suffix_ids_parse() {
        let id = build(PROJECT_SCHEDULER_SETTINGS, &["p1"]);
        assert_eq!(id, "projects/p1/scheduler-settings");
        assert_eq!(parse_single(&id, PROJECT_SCHEDULER_SETTINGS).unwrap(), "p1");
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        assert!(matches!(
            parse("projects/p1/dashboards/d1", SPACE),
            Err(IdError::Format { .. })
        ));
        assert!(matches!(parse("groups", GROUP), Err(IdError::Format { .. })));
        assert!(matches!(
            parse("projects//spaces/s1", SPACE),
            Err(IdError::EmptySegment(_))
        ));
    }

    #[test]
    fn collections_map_pairs() {
        let parsed = parse_collections("projects/a/spaces/b").unwrap();
        assert_eq!(parsed.get("projects").map(String::as_str), Some("a"));
        assert_eq!(parsed.get("spaces").map(String::as_str), Some("b"));

        assert_eq!(
            parse_collections("projects/a/spaces"),
            Err(IdError::OddSegments("projects/a/spaces".to_string()))
        );
    }
}
