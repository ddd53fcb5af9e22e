use super::nodes::Node;

/// What the pre-descent hook wants done with the node's children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    /// Recurse into the children, then call the post-descent hook.
    Descend,
    /// Skip the children and the post-descent hook. Used after an error
    /// aborts a subtree, and by nodes the visitor walks manually.
    Stop,
}

/// Two-phase traversal hooks applied to every node exactly once.
///
/// `visit_before` runs before the children; returning [`VisitFlow::Stop`]
/// suppresses both the descent and `visit_after`. Visitors may re-enter
/// [`walk`] on subtrees from inside `visit_before` (conditionals,
/// short-circuit operators and decorator inlining all do).
pub trait Visitor<'a> {
    fn visit_before(&mut self, node: &'a Node) -> VisitFlow;
    fn visit_after(&mut self, node: &'a Node);
}

/// Depth-first walk of `node`, dispatching to the visitor's hooks and
/// recursing into children in a fixed, node-kind-specific order.
pub fn walk<'a, V: Visitor<'a> + ?Sized>(v: &mut V, node: &'a Node) {
    if v.visit_before(node) == VisitFlow::Stop {
        return;
    }
    match node {
        Node::StmtList(n) => {
            for child in &n.children {
                walk(v, child);
            }
        }
        Node::Cond(n) => {
            if let Some(cond) = &n.cond {
                walk(v, cond);
            }
            walk(v, &n.truth);
            if let Some(else_block) = &n.else_block {
                walk(v, else_block);
            }
        }
        Node::DecoDef(n) => walk(v, &n.block),
        Node::Deco(n) => walk(v, &n.block),
        Node::Del(n) => walk(v, &n.target),
        Node::Binary(n) => {
            walk(v, &n.lhs);
            walk(v, &n.rhs);
        }
        Node::Unary(n) => walk(v, &n.operand),
        Node::Builtin(n) => {
            for arg in &n.args {
                walk(v, arg);
            }
        }
        Node::Conv(n) => walk(v, &n.expr),
        // Leaves.
        Node::Decl(_)
        | Node::Regex(_)
        | Node::StringLit(_)
        | Node::IntLit(_)
        | Node::FloatLit(_)
        | Node::Id(_)
        | Node::Capref(_)
        | Node::Next(_)
        | Node::Otherwise(_) => {}
    }
    v.visit_after(node);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::nodes::*;
    use tally_common::span::Position;

    /// Records the order hooks fire in, keyed by a short node tag.
    struct Recorder {
        events: Vec<String>,
        stop_on_binary: bool,
    }

    fn tag(node: &Node) -> &'static str {
        match node {
            Node::StmtList(_) => "list",
            Node::Binary(_) => "binary",
            Node::IntLit(_) => "int",
            _ => "other",
        }
    }

    impl<'a> Visitor<'a> for Recorder {
        fn visit_before(&mut self, node: &'a Node) -> VisitFlow {
            self.events.push(format!("pre:{}", tag(node)));
            if self.stop_on_binary && matches!(node, Node::Binary(_)) {
                return VisitFlow::Stop;
            }
            VisitFlow::Descend
        }

        fn visit_after(&mut self, node: &'a Node) {
            self.events.push(format!("post:{}", tag(node)));
        }
    }

    fn pos() -> Position {
        Position::new(1, 1)
    }

    fn sum(a: i64, b: i64) -> Node {
        Node::Binary(BinaryNode {
            pos: pos(),
            op: BinaryOp::Plus,
            lhs: Box::new(Node::IntLit(IntLitNode { pos: pos(), value: a })),
            rhs: Box::new(Node::IntLit(IntLitNode { pos: pos(), value: b })),
            ty: crate::types::Type::Int,
        })
    }

    #[test]
    fn children_walked_between_hooks_in_order() {
        let tree = Node::StmtList(StmtListNode {
            pos: pos(),
            children: vec![sum(1, 2)],
        });
        let mut rec = Recorder {
            events: vec![],
            stop_on_binary: false,
        };
        walk(&mut rec, &tree);
        assert_eq!(
            rec.events,
            vec![
                "pre:list", "pre:binary", "pre:int", "post:int", "pre:int", "post:int",
                "post:binary", "post:list",
            ]
        );
    }

    #[test]
    fn stop_skips_children_and_post_hook() {
        let tree = sum(1, 2);
        let mut rec = Recorder {
            events: vec![],
            stop_on_binary: true,
        };
        walk(&mut rec, &tree);
        assert_eq!(rec.events, vec!["pre:binary"]);
    }
}
