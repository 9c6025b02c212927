// ABOUTME: Cloud stack name validation.
// ABOUTME: Ensures stack names start with a letter and use only letters, digits, and hyphens.

use std::fmt;
use thiserror::Error;

/// Longest stack name accepted by the provider.
pub const MAX_STACK_NAME_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StackNameError {
    #[error("stack name cannot be empty")]
    Empty,

    #[error("stack name exceeds maximum length of {MAX_STACK_NAME_LEN} characters")]
    TooLong,

    #[error("stack name must start with a letter")]
    InvalidStart,

    #[error("stack name cannot end with a hyphen")]
    EndsWithHyphen,

    #[error("invalid character in stack name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackName(String);

impl StackName {
    pub fn new(value: &str) -> Result<Self, StackNameError> {
        let Some(first) = value.chars().next() else {
            return Err(StackNameError::Empty);
        };

        if value.len() > MAX_STACK_NAME_LEN {
            return Err(StackNameError::TooLong);
        }

        if !first.is_ascii_alphabetic() {
            return Err(StackNameError::InvalidStart);
        }

        if value.ends_with('-') {
            return Err(StackNameError::EndsWithHyphen);
        }

        if let Some(c) = value
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '-')
        {
            return Err(StackNameError::InvalidChar(c));
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_mixed_case_with_hyphens() {
        assert_eq!(StackName::new("Prod-Web-01").unwrap().as_str(), "Prod-Web-01");
    }

    #[test]
    fn rejects_leading_digit() {
        assert_eq!(StackName::new("1stack"), Err(StackNameError::InvalidStart));
    }

    #[test]
    fn rejects_underscores() {
        assert_eq!(StackName::new("my_stack"), Err(StackNameError::InvalidChar('_')));
    }

    #[test]
    fn rejects_overlong_names() {
        let name = "a".repeat(MAX_STACK_NAME_LEN + 1);
        assert_eq!(StackName::new(&name), Err(StackNameError::TooLong));
    }
}
