use std::cell::Cell;
use std::fmt;

/// The role an alias plays, which becomes the code segment of
/// `<prefix><role><n>` (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasRole {
    /// One `rdf_quad` table reference.
    Quad,
    /// A `WITH RECURSIVE` common table expression, or a flattened derived
    /// table standing in for a translated child scope (`LEFT JOIN (...)`,
    /// a correlated `EXISTS (...)`).
    Cte,
    /// One step of a property-path recursion.
    PathStep,
}

impl AliasRole {
    const fn code(self) -> &'static str {
        match self {
            AliasRole::Quad => "q",
            AliasRole::Cte => "cte",
            AliasRole::PathStep => "path",
        }
    }
}

/// A generated SQL identifier: `<prefix><role><n>`, e.g. `opt_q3` or
/// `sub_cte1`. `Display`s to its literal text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Alias(String);

impl Alias {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces deterministic, collision-free SQL identifiers across nested
/// translation scopes (spec.md §4.3). A root generator owns the empty
/// prefix; every `LeftJoin`, `Graph`, `Subquery`, or recursive-path scope
/// obtains a [`child`](AliasGenerator::child) with its own prefix, so
/// aliases minted by a child can never collide with or shadow its
/// ancestors' — distinct prefixes partition the identifier namespace
/// without any coordination between generators.
#[derive(Debug)]
pub struct AliasGenerator {
    prefix: String,
    counters: [Cell<u32>; 3],
}

impl AliasGenerator {
    /// The root generator for a query's outermost scope.
    #[must_use]
    pub fn root() -> Self {
        Self::with_prefix(String::new())
    }

    fn with_prefix(prefix: String) -> Self {
        Self {
            prefix,
            counters: std::array::from_fn(|_| Cell::new(0)),
        }
    }

    /// Creates a child scope's generator. `prefix` should be short and
    /// scope-specific (`req_`, `opt_`, `sub_`, `path_`); it is appended to
    /// this generator's own prefix so nesting depth is visible in the
    /// final identifier.
    #[must_use]
    pub fn child(&self, prefix: &str) -> Self {
        Self::with_prefix(format!("{}{prefix}", self.prefix))
    }

    #[must_use]
    pub fn next(&self, role: AliasRole) -> Alias {
        let counter = &self.counters[role as usize];
        let n = counter.get();
        counter.set(n + 1);
        Alias(format!("{}{}{}", self.prefix, role.code(), n))
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_are_deterministic_given_the_same_call_order() {
        let a = AliasGenerator::root();
        let b = AliasGenerator::root();
        assert_eq!(a.next(AliasRole::Quad), b.next(AliasRole::Quad));
        assert_eq!(a.next(AliasRole::Quad), Alias("q1".to_owned()));
    }

    #[test]
    fn child_scopes_never_shadow_the_parent() {
        let root = AliasGenerator::root();
        let first_quad = root.next(AliasRole::Quad);
        let child = root.child("opt_");
        let child_quad = child.next(AliasRole::Quad);
        assert_ne!(first_quad, child_quad);
        assert_eq!(child_quad.as_str(), "opt_q0");
    }

    #[test]
    fn roles_have_independent_counters() {
        let gen = AliasGenerator::root();
        assert_eq!(gen.next(AliasRole::Quad).as_str(), "q0");
        assert_eq!(gen.next(AliasRole::Cte).as_str(), "cte0");
        assert_eq!(gen.next(AliasRole::Quad).as_str(), "q1");
    }
}
