use oxrdf::Variable;
use std::fmt;

/// Identifies a translation-time scope: the root query, or a nested
/// `OPTIONAL`/`Subquery`/`Graph` region. Scopes nest; a child scope's
/// variable bindings shadow its parent's rather than being renamed, per
/// design note "Variable scoping" (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The scope of the outermost query, before any nested pattern is
    /// entered.
    pub const ROOT: ScopeId = ScopeId(0);

    /// Returns a child of this scope, one level deeper.
    #[must_use]
    pub fn child(self, ordinal: u32) -> ScopeId {
        ScopeId(self.0.checked_add(ordinal).unwrap_or(u32::MAX))
    }

    /// Nesting depth, with the root at `0`.
    #[must_use]
    pub fn depth(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// A SPARQL variable tagged with the scope it was bound in.
///
/// Two [`Variable`]s with the same name in different scopes are distinct
/// bindings unless one is projected into the other's scope (e.g. a
/// `Subquery`'s projected variable, or an `OPTIONAL` right side sharing a
/// join variable with its required left side). This type is how the
/// translator tells those cases apart without renaming variables.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScopedVariable {
    variable: Variable,
    scope: ScopeId,
}

impl ScopedVariable {
    #[must_use]
    pub fn new(variable: Variable, scope: ScopeId) -> Self {
        Self { variable, scope }
    }

    #[must_use]
    pub fn variable(&self) -> &Variable {
        &self.variable
    }

    #[must_use]
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Returns a copy of this variable re-scoped to `scope`, used when a
    /// variable is projected out of a nested scope into its parent's.
    #[must_use]
    pub fn rescoped(&self, scope: ScopeId) -> Self {
        Self {
            variable: self.variable.clone(),
            scope,
        }
    }
}

impl fmt::Display for ScopedVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}@{}", self.variable.as_str(), self.scope)
    }
}
