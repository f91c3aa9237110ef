use crate::build::Modifier;
use relquad_model::{Expression, PropertyPathExpression, TermPattern, TriplePattern, Variable};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One ground (or variable-bearing) triple in a BGP, paired with the scope
/// the translator should look its variables up in. Plain triples never
/// carry a path; those live on [`AlgebraNode::PathTriple`] instead, per
/// spec.md §4.4's normalization that "property paths appear only on
/// PathTriple, never interleaved with plain triples in a BGP".
pub type AlgebraTriple = TriplePattern;

/// The immutable algebra tree the pattern translator walks (spec.md §3,
/// §4.4). Built bottom-up from a [`relquad_model::GraphPattern`]; nodes
/// never carry a parent pointer; children are shared via [`Arc`] so a
/// node can be referenced from more than one place without cloning the
/// subtree, even though in practice most trees are simple DAGs shaped
/// like the query text.
#[derive(Debug, Clone, PartialEq)]
pub enum AlgebraNode {
    Bgp(Vec<AlgebraTriple>),
    Join(Arc<AlgebraNode>, Arc<AlgebraNode>),
    LeftJoin(Arc<AlgebraNode>, Arc<AlgebraNode>, Option<Expression>),
    Union(Arc<AlgebraNode>, Arc<AlgebraNode>),
    Graph(TermPattern, Arc<AlgebraNode>),
    Filter(Expression, Arc<AlgebraNode>),
    Extend(Variable, Expression, Arc<AlgebraNode>),
    Minus(Arc<AlgebraNode>, Arc<AlgebraNode>),
    Values(Vec<Variable>, Vec<Vec<Option<relquad_model::GroundTerm>>>),
    /// An isolated `SELECT` subquery: `inner` is translated in a fresh
    /// alias scope, `modifiers` are the solution modifiers that wrapped it
    /// (`DISTINCT`/`ORDER BY`/`LIMIT`/`OFFSET`/`GROUP BY`, applied inside
    /// the subquery's own derived table), and only `exposed` variables
    /// cross back into the parent (spec.md §4.4, §4.6, §4.7).
    Subquery {
        inner: Arc<AlgebraNode>,
        exposed: Vec<Variable>,
        modifiers: Vec<Modifier>,
    },
    PathTriple {
        subject: TermPattern,
        path: PropertyPathExpression,
        object: TermPattern,
    },
}

impl AlgebraNode {
    /// Variables that may be bound in this node's solutions (spec.md
    /// §4.4's "visible variables" invariant). Computed on demand rather
    /// than cached on the node, since the tree is immutable and small
    /// relative to a query's execution cost.
    #[must_use]
    pub fn visible_variables(&self) -> BTreeSet<Variable> {
        let mut vars = BTreeSet::new();
        self.collect_visible_variables(&mut vars);
        vars
    }

    fn collect_visible_variables(&self, out: &mut BTreeSet<Variable>) {
        match self {
            AlgebraNode::Bgp(triples) => {
                for triple in triples {
                    collect_term_pattern_variable(&triple.subject, out);
                    collect_named_node_pattern_variable(&triple.predicate, out);
                    collect_term_pattern_variable(&triple.object, out);
                }
            }
            AlgebraNode::Join(l, r) | AlgebraNode::Union(l, r) | AlgebraNode::LeftJoin(l, r, _) => {
                l.collect_visible_variables(out);
                r.collect_visible_variables(out);
            }
            AlgebraNode::Minus(l, _) => {
                // Minus never introduces right-side variables into the
                // visible set: it only filters, per spec.md §4.6.
                l.collect_visible_variables(out);
            }
            AlgebraNode::Graph(graph, inner) => {
                collect_term_pattern_variable(graph, out);
                inner.collect_visible_variables(out);
            }
            AlgebraNode::Filter(_, inner) => inner.collect_visible_variables(out),
            AlgebraNode::Extend(var, _, inner) => {
                inner.collect_visible_variables(out);
                out.insert(var.clone());
            }
            AlgebraNode::Values(vars, _) => out.extend(vars.iter().cloned()),
            AlgebraNode::Subquery { exposed, .. } => out.extend(exposed.iter().cloned()),
            AlgebraNode::PathTriple { subject, object, .. } => {
                collect_term_pattern_variable(subject, out);
                collect_term_pattern_variable(object, out);
            }
        }
    }
}

fn collect_term_pattern_variable(pattern: &TermPattern, out: &mut BTreeSet<Variable>) {
    if let TermPattern::Variable(var) = pattern {
        out.insert(var.clone());
    }
}

fn collect_named_node_pattern_variable(pattern: &relquad_model::NamedNodePattern, out: &mut BTreeSet<Variable>) {
    if let relquad_model::NamedNodePattern::Variable(var) = pattern {
        out.insert(var.clone());
    }
}
