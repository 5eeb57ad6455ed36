//! Module exclude rules.

use crate::error::{Error, Result};
use crate::identifier::ModuleIdentifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Excludes modules by group, by name, or both. An absent field matches anything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExcludeRule {
    /// Group to exclude.
    pub group: Option<String>,
    /// Module name to exclude.
    pub module: Option<String>,
}

impl ExcludeRule {
    /// Create a rule.
    ///
    /// # Errors
    ///
    /// A rule with neither group nor module would exclude everything and is
    /// rejected.
    pub fn new(group: Option<String>, module: Option<String>) -> Result<Self> {
        if group.is_none() && module.is_none() {
            return Err(Error::invalid_user_data(
                "An exclude rule needs a group, a module or both",
            ));
        }
        Ok(Self { group, module })
    }

    /// Exclude a whole group.
    #[must_use]
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            module: None,
        }
    }

    /// Exclude a module name in any group.
    #[must_use]
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            group: None,
            module: Some(module.into()),
        }
    }

    /// Exclude one module.
    #[must_use]
    pub fn exact(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            module: Some(module.into()),
        }
    }

    /// Whether this rule excludes `id`.
    #[must_use]
    pub fn matches(&self, id: &ModuleIdentifier) -> bool {
        self.group.as_ref().is_none_or(|g| *g == id.group)
            && self.module.as_ref().is_none_or(|m| *m == id.name)
    }
}

impl fmt::Display for ExcludeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.group.as_deref().unwrap_or("*"),
            self.module.as_deref().unwrap_or("*")
        )
    }
}

/// Whether any rule in `rules` excludes `id`.
#[must_use]
pub fn is_excluded<'a>(rules: impl IntoIterator<Item = &'a ExcludeRule>, id: &ModuleIdentifier) -> bool {
    rules.into_iter().any(|rule| rule.matches(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matching() {
        let id = ModuleIdentifier::new("org.example", "lib");
        assert!(ExcludeRule::group("org.example").matches(&id));
        assert!(ExcludeRule::module("lib").matches(&id));
        assert!(ExcludeRule::exact("org.example", "lib").matches(&id));
        assert!(!ExcludeRule::exact("org.example", "other").matches(&id));
        assert!(!ExcludeRule::group("com.example").matches(&id));
    }

    #[test]
    fn test_empty_rule_rejected() {
        assert!(ExcludeRule::new(None, None).is_err());
        assert!(ExcludeRule::new(Some("g".to_string()), None).is_ok());
    }

    #[test]
    fn test_display() {
        assert_eq!(ExcludeRule::module("lib").to_string(), "*:lib");
    }
}
