use crate::node::AlgebraNode;
use relquad_model::{GraphPattern, OrderExpression};
use std::sync::Arc;

/// The solution-modifier wrappers spargebra nests directly in the graph
/// pattern tree (`Project`, `Distinct`, `Reduced`, `OrderBy`, `Slice`,
/// `Group`). spec.md §4.4 keeps these out of the core algebra tree —
/// they belong to "Solution modifiers" (§4.7) — so [`peel_modifiers`]
/// strips them from the outside in and returns the remaining core
/// pattern alongside the stack of modifiers that wrapped it, outermost
/// first.
#[derive(Debug, Clone, PartialEq)]
pub enum Modifier {
    Project(Vec<relquad_model::Variable>),
    Distinct,
    Reduced,
    OrderBy(Vec<OrderExpression>),
    Slice { start: usize, length: Option<usize> },
    Group {
        variables: Vec<relquad_model::Variable>,
        aggregates: Vec<(relquad_model::Variable, relquad_model::AggregateExpression)>,
    },
}

#[must_use]
pub fn peel_modifiers(pattern: &GraphPattern) -> (Vec<Modifier>, &GraphPattern) {
    let mut modifiers = Vec::new();
    let mut current = pattern;
    loop {
        match current {
            GraphPattern::Project { inner, variables } => {
                modifiers.push(Modifier::Project(variables.clone()));
                current = inner;
            }
            GraphPattern::Distinct { inner } => {
                modifiers.push(Modifier::Distinct);
                current = inner;
            }
            GraphPattern::Reduced { inner } => {
                modifiers.push(Modifier::Reduced);
                current = inner;
            }
            GraphPattern::OrderBy { inner, expression } => {
                modifiers.push(Modifier::OrderBy(expression.clone()));
                current = inner;
            }
            GraphPattern::Slice { inner, start, length } => {
                modifiers.push(Modifier::Slice {
                    start: *start,
                    length: *length,
                });
                current = inner;
            }
            GraphPattern::Group { inner, variables, aggregates } => {
                modifiers.push(Modifier::Group {
                    variables: variables.clone(),
                    aggregates: aggregates.clone(),
                });
                current = inner;
            }
            _ => break,
        }
    }
    (modifiers, current)
}

/// Builds the core algebra tree from a `spargebra` graph pattern,
/// normalizing it per spec.md §4.4: `BIND` becomes `Extend` (already true
/// of spargebra's tree, kept as-is), a nested pattern whose outermost
/// wrapper is `Project` is isolated as a [`AlgebraNode::Subquery`], and
/// paths are only ever attached to [`AlgebraNode::PathTriple`].
#[must_use]
pub fn build_algebra(pattern: &GraphPattern) -> AlgebraNode {
    match pattern {
        GraphPattern::Bgp { patterns } => AlgebraNode::Bgp(patterns.clone()),
        GraphPattern::Path { subject, path, object } => AlgebraNode::PathTriple {
            subject: subject.clone(),
            path: path.clone(),
            object: object.clone(),
        },
        GraphPattern::Join { left, right } => AlgebraNode::Join(
            Arc::new(build_child(left)),
            Arc::new(build_child(right)),
        ),
        GraphPattern::LeftJoin { left, right, expression } => AlgebraNode::LeftJoin(
            Arc::new(build_child(left)),
            Arc::new(build_child(right)),
            expression.clone(),
        ),
        GraphPattern::Union { left, right } => AlgebraNode::Union(
            Arc::new(build_child(left)),
            Arc::new(build_child(right)),
        ),
        GraphPattern::Graph { name, inner } => {
            AlgebraNode::Graph(term_pattern_from_named_node_pattern(name), Arc::new(build_child(inner)))
        }
        GraphPattern::Filter { expr, inner } => AlgebraNode::Filter(expr.clone(), Arc::new(build_child(inner))),
        GraphPattern::Extend { inner, variable, expression } => {
            AlgebraNode::Extend(variable.clone(), expression.clone(), Arc::new(build_child(inner)))
        }
        GraphPattern::Minus { left, right } => AlgebraNode::Minus(
            Arc::new(build_child(left)),
            Arc::new(build_child(right)),
        ),
        GraphPattern::Values { variables, bindings } => {
            AlgebraNode::Values(variables.clone(), bindings.clone())
        }
        // Any other shape reaching here (Project/Distinct/Reduced/OrderBy/
        // Slice/Group nested inside a pattern position, e.g. a SELECT
        // subquery) is isolated as its own scope.
        other => {
            let (modifiers, core) = peel_modifiers(other);
            let exposed = modifiers
                .iter()
                .find_map(|modifier| match modifier {
                    Modifier::Project(vars) => Some(vars.clone()),
                    _ => None,
                })
                .unwrap_or_else(|| core_vars_as_fallback(core));
            AlgebraNode::Subquery {
                inner: Arc::new(build_algebra(core)),
                exposed,
                modifiers,
            }
        }
    }
}

fn build_child(pattern: &GraphPattern) -> AlgebraNode {
    match pattern {
        GraphPattern::Project { .. }
        | GraphPattern::Distinct { .. }
        | GraphPattern::Reduced { .. }
        | GraphPattern::OrderBy { .. }
        | GraphPattern::Slice { .. }
        | GraphPattern::Group { .. } => build_algebra(pattern),
        other => build_algebra(other),
    }
}

fn core_vars_as_fallback(core: &GraphPattern) -> Vec<relquad_model::Variable> {
    build_algebra(core).visible_variables().into_iter().collect()
}

fn term_pattern_from_named_node_pattern(
    pattern: &relquad_model::NamedNodePattern,
) -> relquad_model::TermPattern {
    match pattern {
        relquad_model::NamedNodePattern::NamedNode(nn) => relquad_model::TermPattern::NamedNode(nn.clone()),
        relquad_model::NamedNodePattern::Variable(var) => relquad_model::TermPattern::Variable(var.clone()),
    }
}
