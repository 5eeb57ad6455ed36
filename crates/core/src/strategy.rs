//! Per-configuration resolution strategy.

use crate::conflict::ConflictResolution;
use crate::error::Result;
use crate::identifier::{ModuleIdentifier, ModuleVersionSelector};
use crate::notation::NotationInput;

/// Conflict policy plus forced module versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionStrategy {
    conflict_resolution: ConflictResolution,
    forced_modules: Vec<ModuleVersionSelector>,
}

impl ResolutionStrategy {
    /// Strategy with the given conflict policy and no forced modules.
    #[must_use]
    pub fn new(conflict_resolution: ConflictResolution) -> Self {
        Self {
            conflict_resolution,
            forced_modules: Vec::new(),
        }
    }

    /// The conflict policy.
    #[must_use]
    pub const fn conflict_resolution(&self) -> ConflictResolution {
        self.conflict_resolution
    }

    /// Replace the conflict policy.
    pub fn set_conflict_resolution(&mut self, policy: ConflictResolution) -> &mut Self {
        self.conflict_resolution = policy;
        self
    }

    /// Force additional module versions.
    ///
    /// # Errors
    ///
    /// Fails without changing the strategy if any element of the notation is
    /// malformed.
    pub fn force(&mut self, notation: impl Into<NotationInput>) -> Result<&mut Self> {
        let parsed = notation.into().parse()?;
        self.forced_modules.extend(parsed);
        Ok(self)
    }

    /// Replace all forced module versions.
    ///
    /// # Errors
    ///
    /// Fails without changing the strategy if any element of the notation is
    /// malformed.
    pub fn set_forced_modules(&mut self, notation: impl Into<NotationInput>) -> Result<&mut Self> {
        let parsed = notation.into().parse()?;
        self.forced_modules = parsed;
        Ok(self)
    }

    /// Forced module versions in declaration order.
    #[must_use]
    pub fn forced_modules(&self) -> &[ModuleVersionSelector] {
        &self.forced_modules
    }

    /// The forced version of `module`, if any. Later declarations win.
    #[must_use]
    pub fn forced_version(&self, module: &ModuleIdentifier) -> Option<&str> {
        self.forced_modules
            .iter()
            .rev()
            .find(|s| s.group == module.group && s.name == module.name)
            .map(|s| s.version.as_str())
    }

    /// An independent copy.
    #[must_use]
    pub fn copy(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_accumulates() {
        let mut strategy = ResolutionStrategy::default();
        strategy.force("org:a:1.0").unwrap();
        strategy.force(vec!["org:b:2.0", "org:a:1.5"]).unwrap();
        assert_eq!(strategy.forced_modules().len(), 3);
        assert_eq!(
            strategy.forced_version(&ModuleIdentifier::new("org", "a")),
            Some("1.5")
        );
    }

    #[test]
    fn test_set_forced_modules_replaces() {
        let mut strategy = ResolutionStrategy::default();
        strategy.force("org:a:1.0").unwrap();
        strategy.set_forced_modules("org:b:2.0").unwrap();
        assert_eq!(
            strategy.forced_modules(),
            &[ModuleVersionSelector::new("org", "b", "2.0")]
        );
    }

    #[test]
    fn test_invalid_notation_leaves_strategy_unchanged() {
        let mut strategy = ResolutionStrategy::default();
        strategy.force("org:a:1.0").unwrap();
        assert!(strategy.force(vec!["org:b:2.0", "broken"]).is_err());
        assert_eq!(strategy.forced_modules().len(), 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let mut strategy = ResolutionStrategy::new(ConflictResolution::Strict);
        let copy = strategy.copy();
        strategy.force("org:a:1.0").unwrap();
        assert!(copy.forced_modules().is_empty());
        assert_eq!(copy.conflict_resolution(), ConflictResolution::Strict);
    }
}
