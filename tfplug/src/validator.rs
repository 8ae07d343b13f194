//! Built-in attribute validators
//!
//! Validators only look at known, non-null values. Null and unknown values
//! are left to Terraform's own required/optional checks.

use crate::schema::{Validator, ValidatorRequest, ValidatorResponse};
use crate::types::{Diagnostic, Dynamic};
use regex::Regex;

fn single(diagnostic: Option<Diagnostic>) -> ValidatorResponse {
    ValidatorResponse {
        diagnostics: diagnostic.into_iter().collect(),
    }
}

/// Accepts only one of a fixed set of strings
pub struct StringOneOf {
    allowed: Vec<String>,
}

impl StringOneOf {
    pub fn create(allowed: &[&str]) -> Box<dyn Validator> {
        Box::new(Self {
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        })
    }
}

impl Validator for StringOneOf {
    fn description(&self) -> String {
        format!("value must be one of: {}", self.allowed.join(", "))
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let diagnostic = match &request.config_value.value {
            Dynamic::String(s) if !self.allowed.contains(s) => Some(
                Diagnostic::error(
                    "Invalid attribute value",
                    format!(
                        "{}: got \"{}\", {}",
                        request.path,
                        s,
                        self.description()
                    ),
                )
                .with_attribute(request.path),
            ),
            _ => None,
        };
        single(diagnostic)
    }
}

/// String length in characters, both bounds inclusive
pub struct StringLengthBetween {
    min: usize,
    max: usize,
}

impl StringLengthBetween {
    pub fn create(min: usize, max: usize) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for StringLengthBetween {
    fn description(&self) -> String {
        format!(
            "string length must be between {} and {}",
            self.min, self.max
        )
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let diagnostic = match &request.config_value.value {
            Dynamic::String(s) => {
                let len = s.chars().count();
                (len < self.min || len > self.max).then(|| {
                    Diagnostic::error(
                        "Invalid attribute value length",
                        format!("{}: {}, got {}", request.path, self.description(), len),
                    )
                    .with_attribute(request.path)
                })
            }
            _ => None,
        };
        single(diagnostic)
    }
}

/// Accepts numbers within an inclusive range
pub struct NumberBetween {
    min: f64,
    max: f64,
}

impl NumberBetween {
    pub fn create(min: f64, max: f64) -> Box<dyn Validator> {
        Box::new(Self { min, max })
    }
}

impl Validator for NumberBetween {
    fn description(&self) -> String {
        format!("value must be between {} and {}", self.min, self.max)
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let diagnostic = match &request.config_value.value {
            Dynamic::Number(n) if *n < self.min || *n > self.max => Some(
                Diagnostic::error(
                    "Invalid attribute value",
                    format!("{}: {}, got {}", request.path, self.description(), n),
                )
                .with_attribute(request.path),
            ),
            _ => None,
        };
        single(diagnostic)
    }
}

/// Requires the whole string to match a regular expression
pub struct StringMatches {
    pattern: Regex,
    message: String,
}

impl StringMatches {
    pub fn create(pattern: Regex, message: &str) -> Box<dyn Validator> {
        Box::new(Self {
            pattern,
            message: message.to_string(),
        })
    }
}

impl Validator for StringMatches {
    fn description(&self) -> String {
        self.message.clone()
    }

    fn validate(&self, request: ValidatorRequest) -> ValidatorResponse {
        let diagnostic = match &request.config_value.value {
            Dynamic::String(s) if !self.pattern.is_match(s) => Some(
                Diagnostic::error(
                    "Invalid attribute value",
                    format!("{}: \"{}\" {}", request.path, s, self.message),
                )
                .with_attribute(request.path),
            ),
            _ => None,
        };
        single(diagnostic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    fn run(validator: &dyn Validator, value: Dynamic) -> ValidatorResponse {
        validator.validate(ValidatorRequest {
            config_value: DynamicValue::new(value),
            path: AttributePath::new("role"),
        })
    }

    #[test]
    fn string_one_of_rejects_unknown_role() {
        let validator = StringOneOf::create(&["viewer", "editor", "admin"]);

        assert!(run(validator.as_ref(), Dynamic::from("editor"))
            .diagnostics
            .is_empty());

        let response = run(validator.as_ref(), Dynamic::from("owner"));
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("owner"));
        assert!(response.diagnostics[0].attribute.is_some());
    }

    #[test]
    fn validators_skip_null_and_unknown() {
        let validator = StringOneOf::create(&["viewer"]);
        assert!(run(validator.as_ref(), Dynamic::Null).diagnostics.is_empty());
        assert!(run(validator.as_ref(), Dynamic::Unknown)
            .diagnostics
            .is_empty());
    }

    #[test]
    fn string_length_between_counts_chars() {
        let validator = StringLengthBetween::create(1, 3);
        assert!(run(validator.as_ref(), Dynamic::from("äöü"))
            .diagnostics
            .is_empty());
        assert_eq!(run(validator.as_ref(), Dynamic::from("")).diagnostics.len(), 1);
        assert_eq!(
            run(validator.as_ref(), Dynamic::from("abcd")).diagnostics.len(),
            1
        );
    }

    #[test]
    fn number_between_is_inclusive() {
        let validator = NumberBetween::create(1.0, 10.0);
        for ok in [1.0, 5.0, 10.0] {
            assert!(run(validator.as_ref(), Dynamic::Number(ok))
                .diagnostics
                .is_empty());
        }
        assert_eq!(
            run(validator.as_ref(), Dynamic::Number(0.0)).diagnostics.len(),
            1
        );
        let response = run(validator.as_ref(), Dynamic::Number(3e18));
        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.diagnostics[0].detail.contains("between 1 and 10"));
    }

    #[test]
    fn string_matches_pattern() {
        let validator = StringMatches::create(
            Regex::new(r"^[0-9a-f-]{36}$").unwrap(),
            "must be a UUID",
        );
        assert!(run(
            validator.as_ref(),
            Dynamic::from("3675b69e-8324-4110-bdca-059031aa8da3")
        )
        .diagnostics
        .is_empty());
        assert_eq!(
            run(validator.as_ref(), Dynamic::from("not-a-uuid"))
                .diagnostics
                .len(),
            1
        );
    }
}
