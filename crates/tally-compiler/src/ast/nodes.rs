use std::cell::Cell;
use std::cell::RefCell;
use std::rc::Rc;

use tally_common::metrics::MetricKind;
use tally_common::span::Position;

use crate::types::Type;

/// Shared slot holding a regular expression's pool index. Owned by the
/// match node and shared with every capture-reference symbol bound to
/// it; filled in when the match expression is compiled.
pub type RegexRef = Rc<Cell<Option<usize>>>;

/// What a resolved symbol refers to.
#[derive(Debug, Clone)]
pub enum Binding {
    /// A metric in the object's metric pool; the pool index lives in
    /// `Symbol::addr`.
    Metric,
    /// The match expression owning the referenced capture group.
    Regex(RegexRef),
}

/// A name binding, resolved by the checker before code generation.
///
/// Shared between the declaration site and every use site. The binding
/// and (for metrics) the address are assigned during code generation
/// and never change afterwards.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub binding: Option<Binding>,
    /// Metric pool index for identifiers; capture-group offset for
    /// capture references.
    pub addr: usize,
}

pub type SymbolRef = Rc<RefCell<Symbol>>;

impl Symbol {
    pub fn unbound(name: impl Into<String>) -> SymbolRef {
        Rc::new(RefCell::new(Symbol {
            name: name.into(),
            binding: None,
            addr: 0,
        }))
    }
}

/// Binary operators of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    Pow,
    Assign,
    AddAssign,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Or,
    BitAnd,
    BitOr,
    Xor,
    Shl,
    Shr,
}

/// Unary operators of the source language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Postfix increment.
    Inc,
    /// Bitwise complement.
    Not,
}

/// Statement list: program top level, conditional blocks and decorator
/// bodies.
#[derive(Debug)]
pub struct StmtListNode {
    pub pos: Position,
    pub children: Vec<Node>,
}

/// Metric declaration (`counter foo by host`).
#[derive(Debug)]
pub struct DeclNode {
    pub pos: Position,
    pub name: String,
    /// Externally visible name, when exported under a different one.
    pub exported_name: Option<String>,
    pub kind: MetricKind,
    pub keys: Vec<String>,
    pub hidden: bool,
    pub ty: Type,
    pub sym: SymbolRef,
}

/// Conditional: an optional guard expression, a truth block, and an
/// optional else block.
#[derive(Debug)]
pub struct CondNode {
    pub pos: Position,
    pub cond: Option<Box<Node>>,
    pub truth: Box<Node>,
    pub else_block: Option<Box<Node>>,
}

/// A regular expression match against the current input line.
#[derive(Debug)]
pub struct RegexNode {
    pub pos: Position,
    pub pattern: String,
    /// Pool index, assigned when this node is compiled.
    pub addr: RegexRef,
}

impl RegexNode {
    pub fn new(pos: Position, pattern: impl Into<String>) -> Self {
        Self {
            pos,
            pattern: pattern.into(),
            addr: Rc::new(Cell::new(None)),
        }
    }
}

#[derive(Debug)]
pub struct StringLitNode {
    pub pos: Position,
    pub text: String,
}

#[derive(Debug)]
pub struct IntLitNode {
    pub pos: Position,
    pub value: i64,
}

#[derive(Debug)]
pub struct FloatLitNode {
    pub pos: Position,
    pub value: f64,
}

/// A reference to a declared metric.
#[derive(Debug)]
pub struct IdNode {
    pub pos: Position,
    pub name: String,
    pub ty: Type,
    pub sym: Option<SymbolRef>,
}

/// A reference to a numbered capture group of the most recently matched
/// regular expression.
#[derive(Debug)]
pub struct CaprefNode {
    pub pos: Position,
    pub name: String,
    pub ty: Type,
    pub sym: Option<SymbolRef>,
}

/// Decorator definition: a named, reusable block template. Never emits
/// code directly; its body is inlined at each use site.
#[derive(Debug)]
pub struct DecoDefNode {
    pub pos: Position,
    pub name: String,
    pub block: Node,
}

/// Decorator use: wraps its own block with the definition's body.
#[derive(Debug)]
pub struct DecoNode {
    pub pos: Position,
    pub name: String,
    /// The call-site block, substituted where the body says `next`.
    pub block: Box<Node>,
    /// Resolved definition, bound by the checker.
    pub def: Option<Rc<DecoDefNode>>,
}

/// `next`: inside a decorator body, insert the call-site block here.
#[derive(Debug)]
pub struct NextNode {
    pub pos: Position,
}

/// `otherwise`: true when no prior pattern in this block matched.
#[derive(Debug)]
pub struct OtherwiseNode {
    pub pos: Position,
}

/// `del`: remove a datum from a dimensioned metric.
#[derive(Debug)]
pub struct DelNode {
    pub pos: Position,
    pub target: Box<Node>,
}

#[derive(Debug)]
pub struct BinaryNode {
    pub pos: Position,
    pub op: BinaryOp,
    pub lhs: Box<Node>,
    pub rhs: Box<Node>,
    pub ty: Type,
}

impl BinaryNode {
    /// Whether the left-hand side must be emitted twice during descent:
    /// once as the value feeding the operation and once left on the
    /// stack as the assignment target. Only float compound
    /// add-assignment needs this; integer add-assignment lowers to an
    /// in-place increment instead.
    pub fn needs_double_emit(&self) -> bool {
        self.op == BinaryOp::AddAssign && self.ty == Type::Float
    }
}

#[derive(Debug)]
pub struct UnaryNode {
    pub pos: Position,
    pub op: UnaryOp,
    pub operand: Box<Node>,
    pub ty: Type,
}

/// A builtin function call.
#[derive(Debug)]
pub struct BuiltinNode {
    pub pos: Position,
    pub name: String,
    pub args: Vec<Node>,
    pub ty: Type,
}

/// Implicit conversion wrapper inserted by the checker at type-mismatch
/// boundaries.
#[derive(Debug)]
pub struct ConvNode {
    pub pos: Position,
    pub expr: Box<Node>,
    pub ty: Type,
}

/// A node of the type-annotated syntax tree handed to the backend.
///
/// Closed variant set: adding a kind forces every traversal hook to
/// handle it.
#[derive(Debug)]
pub enum Node {
    StmtList(StmtListNode),
    Decl(DeclNode),
    Cond(CondNode),
    Regex(RegexNode),
    StringLit(StringLitNode),
    IntLit(IntLitNode),
    FloatLit(FloatLitNode),
    Id(IdNode),
    Capref(CaprefNode),
    DecoDef(Rc<DecoDefNode>),
    Deco(DecoNode),
    Next(NextNode),
    Otherwise(OtherwiseNode),
    Del(DelNode),
    Binary(BinaryNode),
    Unary(UnaryNode),
    Builtin(BuiltinNode),
    Conv(ConvNode),
}

impl Node {
    /// Source position, for diagnostics.
    pub fn pos(&self) -> Position {
        match self {
            Node::StmtList(n) => n.pos,
            Node::Decl(n) => n.pos,
            Node::Cond(n) => n.pos,
            Node::Regex(n) => n.pos,
            Node::StringLit(n) => n.pos,
            Node::IntLit(n) => n.pos,
            Node::FloatLit(n) => n.pos,
            Node::Id(n) => n.pos,
            Node::Capref(n) => n.pos,
            Node::DecoDef(n) => n.pos,
            Node::Deco(n) => n.pos,
            Node::Next(n) => n.pos,
            Node::Otherwise(n) => n.pos,
            Node::Del(n) => n.pos,
            Node::Binary(n) => n.pos,
            Node::Unary(n) => n.pos,
            Node::Builtin(n) => n.pos,
            Node::Conv(n) => n.pos,
        }
    }

    /// Resolved static type. Literals have their inherent type;
    /// statement-like nodes are `None`.
    pub fn ty(&self) -> Type {
        match self {
            Node::Regex(_) => Type::Pattern,
            Node::StringLit(_) => Type::Str,
            Node::IntLit(_) => Type::Int,
            Node::FloatLit(_) => Type::Float,
            Node::Decl(n) => n.ty.clone(),
            Node::Id(n) => n.ty.clone(),
            Node::Capref(n) => n.ty.clone(),
            Node::Binary(n) => n.ty.clone(),
            Node::Unary(n) => n.ty.clone(),
            Node::Builtin(n) => n.ty.clone(),
            Node::Conv(n) => n.ty.clone(),
            Node::StmtList(_)
            | Node::Cond(_)
            | Node::DecoDef(_)
            | Node::Deco(_)
            | Node::Next(_)
            | Node::Otherwise(_)
            | Node::Del(_) => Type::None,
        }
    }
}
