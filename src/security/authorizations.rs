use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Visibility;
use crate::error::{GraphError, Result};

/// Set of labels a caller presents for one operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorizations {
    labels: BTreeSet<String>,
}

impl Authorizations {
    /// Builds authorizations from any collection of labels.
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Authorizations holding no labels; only public data is readable.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns `true` when the label is held.
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Held labels in sorted order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Number of held labels.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` when no labels are held.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Evaluates `visibility` against these labels.
    pub fn can_read(&self, visibility: &Visibility) -> bool {
        visibility.evaluate(self)
    }

    /// Rejects empty labels and labels containing control characters.
    pub fn validate(&self) -> Result<()> {
        for label in &self.labels {
            if label.trim().is_empty() {
                return Err(GraphError::Security(
                    "authorization labels cannot be empty".into(),
                ));
            }
            if label.chars().any(char::is_control) {
                return Err(GraphError::Security(format!(
                    "authorization label {label:?} contains control characters"
                )));
            }
        }
        Ok(())
    }

    /// Rejects labels that are not part of `granted`.
    pub fn ensure_granted(&self, granted: &BTreeSet<String>) -> Result<()> {
        if let Some(label) = self.labels.iter().find(|l| !granted.contains(*l)) {
            return Err(GraphError::Security(format!(
                "authorization '{label}' has not been granted"
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Authorizations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.labels().collect();
        write!(f, "{}", joined.join(","))
    }
}

impl<S: Into<String>> FromIterator<S> for Authorizations {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::new(iter)
    }
}
