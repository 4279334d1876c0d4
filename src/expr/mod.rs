//! The query expression tree and its evaluation contracts.

use std::sync::Arc;

use lazy_static::lazy_static;

use crate::hts::{Header, Record};

mod node;
pub use node::Node;

/// One shareable, immutable expression tree. Cloning is cheap; subtrees may
/// be shared between trees and the `true`/`false` literals are singletons.
#[derive(Clone, Debug)]
pub struct Expr {
    node: Arc<Node>,
}

lazy_static! {
    static ref TRUE: Expr = Node::Literal(true).into();
    static ref FALSE: Expr = Node::Literal(false).into();
}

impl Expr {
    pub fn literal(value: bool) -> Expr {
        if value {
            TRUE.clone()
        } else {
            FALSE.clone()
        }
    }

    pub fn not(self) -> Expr {
        Node::Not(self).into()
    }

    pub fn and(self, other: Expr) -> Expr {
        Node::And(self, other).into()
    }

    pub fn or(self, other: Expr) -> Expr {
        Node::Or(self, other).into()
    }

    pub fn conditional(self, then_part: Expr, else_part: Expr) -> Expr {
        Node::Conditional {
            cond: self,
            then_part,
            else_part,
        }
        .into()
    }

    /// Full per-record evaluation. Total: every leaf answers a boolean for
    /// any well-formed record, and combinators short-circuit.
    pub fn matches_record(&self, header: &Header, record: &Record) -> bool {
        self.node.matches_record(header, record)
    }

    /// Coarse per-chromosome pre-filter: may this chromosome hold a matching
    /// record? Over-approximates to true for everything except chromosome
    /// name checks, so it never rules out a chromosome incorrectly.
    pub fn matches_chromosome(&self, header: &Header, tid: u32) -> bool {
        self.node.matches_chromosome(header, tid)
    }
}

impl From<Node> for Expr {
    fn from(node: Node) -> Self {
        Expr {
            node: Arc::new(node),
        }
    }
}
