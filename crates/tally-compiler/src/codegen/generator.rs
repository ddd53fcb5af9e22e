use log::debug;
use regex::Regex;

use tally_common::code::{CompiledRegex, Instr, Object, Operand};
use tally_common::errors::ErrorList;
use tally_common::metrics::{DatumType, Metric, MetricKind};
use tally_common::opcodes::Opcode;
use tally_common::span::Position;

use crate::ast::nodes::*;
use crate::ast::walker::{walk, VisitFlow, Visitor};
use crate::types::Type;

// ============================================================================
// Code Generator
// ============================================================================

/// State for the code generator: the object under construction, the
/// decorator inlining stack, and the accumulated compile errors.
pub struct CodeGen<'a> {
    /// Name of the program being compiled.
    name: String,
    errors: ErrorList,
    obj: Object,
    /// Decorator stack to unwind; one entry per currently-inlined use.
    decos: Vec<&'a DecoNode>,
}

/// Compile a type-annotated program to bytecode and constant pools.
///
/// Walks the tree exactly once. Returns the finished object only when
/// no error was recorded; a partial instruction sequence is never
/// partially valid, so on failure only the error list comes back.
pub fn compile(name: &str, ast: &Node) -> Result<Object, ErrorList> {
    let mut c = CodeGen {
        name: name.to_string(),
        errors: ErrorList::new(),
        obj: Object::default(),
        decos: Vec::new(),
    };
    walk(&mut c, ast);
    if c.errors.is_empty() {
        Ok(c.obj)
    } else {
        Err(c.errors)
    }
}

impl<'a> CodeGen<'a> {
    /// Record an internal compiler error. Every condition checked here
    /// should have been rejected by the checker, so these indicate a
    /// defect upstream, not a user error.
    fn errorf(&mut self, pos: Position, message: impl std::fmt::Display) {
        self.errors.add(
            pos,
            format!("internal compiler error, aborting compilation: {}", message),
        );
    }

    fn emit(&mut self, i: Instr) {
        self.obj.prog.push(i);
    }

    /// Program offset of the last emitted instruction.
    fn pc(&self) -> usize {
        self.obj.prog.len() - 1
    }

    fn patch_target(&mut self, pc: usize, target: usize) {
        self.obj.prog[pc].operand = Some(Operand::Addr(target));
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn emit_decl(&mut self, n: &DeclNode) -> VisitFlow {
        let name = n
            .exported_name
            .clone()
            .unwrap_or_else(|| n.name.clone());
        // A dimensioned declaration stores its value type innermost.
        let mut t = &n.ty;
        if t.is_dimension() {
            t = t.innermost();
        }
        // Anything that isn't Float gets an integer datum. Declarations
        // whose type the checker could not complete fall back to Int as
        // well; this retains historical behaviour.
        let dtype = if *t == Type::Float {
            DatumType::Float
        } else {
            if !t.is_complete() {
                debug!("incomplete type {} for declaration {:?}", t, n.name);
            }
            DatumType::Int
        };
        let mut m = Metric::new(name, self.name.clone(), n.kind, dtype, n.keys.clone());
        m.set_source(n.pos);
        // Scalar counters can be initialized to zero. Dimensioned
        // counters don't know their label values yet; gauges and timers
        // can't be assumed to start at zero.
        if n.keys.is_empty() && n.kind == MetricKind::Counter {
            match m.get_datum() {
                Ok(d) => match dtype {
                    DatumType::Int => d.set_int(0, 0),
                    DatumType::Float => d.set_float(0.0, 0),
                },
                Err(e) => {
                    self.errorf(n.pos, e);
                    return VisitFlow::Stop;
                }
            }
        }
        m.hidden = n.hidden;
        let mut sym = n.sym.borrow_mut();
        sym.binding = Some(Binding::Metric);
        sym.addr = self.obj.metrics.len();
        self.obj.metrics.push(m);
        VisitFlow::Stop
    }

    // ========================================================================
    // Conditionals
    // ========================================================================

    fn emit_cond(&mut self, n: &'a CondNode) -> VisitFlow {
        // The condition's code is required to end in a conditional jump
        // (see the regex and relational lowerings). Save its offset; it
        // will skip over the truth block.
        let guard_pc = n.cond.as_ref().map(|cond| {
            walk(self, cond);
            self.pc()
        });
        self.emit(Instr::new(Opcode::Setmatched, Operand::Bool(false)));
        walk(self, &n.truth);
        // Re-set the matched flag for the rest of the current block.
        self.emit(Instr::new(Opcode::Setmatched, Operand::Bool(true)));
        // Rewrite the guard's target to the instruction after the block.
        if let Some(pc) = guard_pc {
            let target = self.pc() + 1;
            self.patch_target(pc, target);
        }
        if let Some(else_block) = &n.else_block {
            self.emit(Instr::bare(Opcode::Jmp));
            // Rewrite the guard again to skip the else-skipper just
            // emitted.
            if let Some(pc) = guard_pc {
                let target = self.pc() + 1;
                self.patch_target(pc, target);
            }
            let skip_pc = self.pc();
            walk(self, else_block);
            let target = self.pc() + 1;
            self.patch_target(skip_pc, target);
        }
        VisitFlow::Stop
    }

    // ========================================================================
    // Decorators
    // ========================================================================

    fn emit_deco(&mut self, n: &'a DecoNode) -> VisitFlow {
        let Some(def) = &n.def else {
            self.errorf(n.pos, format!("no definition found for decorator {:?}", n.name));
            return VisitFlow::Stop;
        };
        // Make the call-site block available to `next`, then inline the
        // definition's body in place.
        self.decos.push(n);
        walk(self, &def.block);
        self.decos.pop();
        VisitFlow::Stop
    }

    fn emit_next(&mut self, n: &NextNode) -> VisitFlow {
        // Insert the nearest enclosing decorator's call-site block here.
        match self.decos.last().copied() {
            Some(deco) => walk(self, &deco.block),
            None => self.errorf(n.pos, "next statement outside of a decorator"),
        }
        VisitFlow::Stop
    }

    // ========================================================================
    // Operators and conversions
    // ========================================================================

    fn emit_binary_before(&mut self, n: &'a BinaryNode) -> VisitFlow {
        match n.op {
            BinaryOp::And => {
                walk(self, &n.lhs);
                // Offset of the jump ending the lhs, taken when the
                // expression is false.
                let pc1 = self.pc();
                walk(self, &n.rhs);
                let pc2 = self.pc();
                // Bounce through the rhs guard and leave that jump for
                // the enclosing conditional to patch onward.
                self.patch_target(pc1, pc2);
                VisitFlow::Stop
            }
            BinaryOp::Or => {
                walk(self, &n.lhs);
                // The lhs jump triggers on false, but a true lhs must
                // short-circuit straight into the truth block.
                let pc1 = self.pc();
                walk(self, &n.rhs);
                let pc2 = self.pc();
                // The conditional inserts a setmatched next, then the
                // block.
                let block_pc = pc2 + 2;
                self.patch_target(pc1, block_pc);
                self.obj.prog[pc1].op = match self.obj.prog[pc1].op {
                    Opcode::Jnm => Opcode::Jm,
                    Opcode::Jm => Opcode::Jnm,
                    op => op,
                };
                VisitFlow::Stop
            }
            BinaryOp::AddAssign => {
                if n.needs_double_emit() {
                    // Emit the lhs an extra time so the result can be
                    // stored back to it.
                    walk(self, &n.lhs);
                }
                VisitFlow::Descend
            }
            _ => VisitFlow::Descend,
        }
    }

    fn emit_binary_after(&mut self, n: &BinaryNode) {
        match n.op {
            BinaryOp::Lt => {
                self.emit(Instr::new(Opcode::Cmp, Operand::Int(-1)));
                self.emit(Instr::bare(Opcode::Jnm));
            }
            BinaryOp::Gt => {
                self.emit(Instr::new(Opcode::Cmp, Operand::Int(1)));
                self.emit(Instr::bare(Opcode::Jnm));
            }
            BinaryOp::Le => {
                self.emit(Instr::new(Opcode::Cmp, Operand::Int(1)));
                self.emit(Instr::bare(Opcode::Jm));
            }
            BinaryOp::Ge => {
                self.emit(Instr::new(Opcode::Cmp, Operand::Int(-1)));
                self.emit(Instr::bare(Opcode::Jm));
            }
            BinaryOp::Eq => {
                self.emit(Instr::new(Opcode::Cmp, Operand::Int(0)));
                self.emit(Instr::bare(Opcode::Jnm));
            }
            BinaryOp::Ne => {
                self.emit(Instr::new(Opcode::Cmp, Operand::Int(0)));
                self.emit(Instr::bare(Opcode::Jm));
            }
            BinaryOp::AddAssign => match n.ty {
                // With an operand present, inc pops the delta from the
                // stack.
                Type::Int => self.emit(Instr::new(Opcode::Inc, Operand::Int(0))),
                Type::Float => {
                    // The lhs was emitted twice during descent; add,
                    // then store to the remaining copy.
                    self.emit(Instr::bare(Opcode::Fadd));
                    self.emit(Instr::bare(Opcode::Fset));
                }
                _ => self.errorf(
                    n.pos,
                    format!("invalid type for add-assignment: {}", n.ty),
                ),
            },
            BinaryOp::Plus
            | BinaryOp::Minus
            | BinaryOp::Mul
            | BinaryOp::Div
            | BinaryOp::Mod
            | BinaryOp::Pow
            | BinaryOp::Assign => match typed_operator(n.op, &n.ty) {
                Some(op) => self.emit(Instr::bare(op)),
                None => self.errorf(
                    n.pos,
                    format!("invalid type for binary expression: {}", n.ty),
                ),
            },
            BinaryOp::BitAnd => self.emit(Instr::bare(Opcode::And)),
            BinaryOp::BitOr => self.emit(Instr::bare(Opcode::Or)),
            BinaryOp::Xor => self.emit(Instr::bare(Opcode::Xor)),
            BinaryOp::Shl => self.emit(Instr::bare(Opcode::Shl)),
            BinaryOp::Shr => self.emit(Instr::bare(Opcode::Shr)),
            // Lowered entirely in the pre-descent hook.
            BinaryOp::And | BinaryOp::Or => {}
        }
    }

    fn emit_builtin(&mut self, n: &BuiltinNode) {
        let arglen = n.args.len();
        match n.name.as_str() {
            "bool" => {
                // No VM support yet; accepted and ignored to stay
                // lenient with existing programs.
                debug!("ignoring bool builtin at {}", n.pos);
            }
            "int" | "float" | "string" => {
                // Not a real call: just a conversion from the single
                // argument's type to the call's resolved type.
                if arglen > 1 {
                    self.errorf(
                        n.pos,
                        format!("too many arguments to builtin {:?}", n.name),
                    );
                    return;
                }
                let Some(arg) = n.args.first() else {
                    self.errorf(n.pos, format!("missing argument to builtin {:?}", n.name));
                    return;
                };
                if let Err(e) = self.emit_conversion(&arg.ty(), &n.ty) {
                    self.errorf(n.pos, format!("{} in builtin {:?}", e, n.name));
                }
            }
            other => match builtin_opcode(other) {
                Some(op) => self.emit(Instr::new(op, Operand::Addr(arglen))),
                None => self.errorf(n.pos, format!("unknown builtin {:?}", other)),
            },
        }
    }

    /// Emit the single directional conversion for a (from, to) type
    /// pair. Conversions are never chained; any pair outside the fixed
    /// table is an error for the caller to report.
    fn emit_conversion(&mut self, from: &Type, to: &Type) -> Result<(), String> {
        debug!("conversion: {} to {}", from, to);
        let op = match (from, to) {
            (Type::Int, Type::Float) => Opcode::I2f,
            (Type::Str, Type::Float) => Opcode::S2f,
            (Type::Str, Type::Int) => Opcode::S2i,
            (Type::Float, Type::Str) => Opcode::F2s,
            (Type::Int, Type::Str) => Opcode::I2s,
            _ => return Err(format!("can't convert {} to {}", from, to)),
        };
        self.emit(Instr::bare(op));
        Ok(())
    }
}

/// Per-type opcode for each arithmetic and assignment operator. A
/// missing entry means the (operator, type) pair is unsupported.
fn typed_operator(op: BinaryOp, ty: &Type) -> Option<Opcode> {
    Some(match (op, ty) {
        (BinaryOp::Plus, Type::Int) => Opcode::Iadd,
        (BinaryOp::Plus, Type::Float) => Opcode::Fadd,
        (BinaryOp::Plus, Type::Str) => Opcode::Cat,
        (BinaryOp::Minus, Type::Int) => Opcode::Isub,
        (BinaryOp::Minus, Type::Float) => Opcode::Fsub,
        (BinaryOp::Mul, Type::Int) => Opcode::Imul,
        (BinaryOp::Mul, Type::Float) => Opcode::Fmul,
        (BinaryOp::Div, Type::Int) => Opcode::Idiv,
        (BinaryOp::Div, Type::Float) => Opcode::Fdiv,
        (BinaryOp::Mod, Type::Int) => Opcode::Imod,
        (BinaryOp::Mod, Type::Float) => Opcode::Fmod,
        (BinaryOp::Pow, Type::Int) => Opcode::Ipow,
        (BinaryOp::Pow, Type::Float) => Opcode::Fpow,
        (BinaryOp::Assign, Type::Int) => Opcode::Iset,
        (BinaryOp::Assign, Type::Float) => Opcode::Fset,
        _ => return None,
    })
}

/// Opcode for builtins that are real calls; the operand carries the
/// argument count.
fn builtin_opcode(name: &str) -> Option<Opcode> {
    Some(match name {
        "timestamp" => Opcode::Timestamp,
        "settime" => Opcode::Settime,
        "strptime" => Opcode::Strptime,
        "strtol" => Opcode::Strtol,
        "len" => Opcode::Length,
        "tolower" => Opcode::Tolower,
        _ => return None,
    })
}

// ============================================================================
// Traversal hooks
// ============================================================================

impl<'a> Visitor<'a> for CodeGen<'a> {
    fn visit_before(&mut self, node: &'a Node) -> VisitFlow {
        match node {
            Node::Decl(n) => self.emit_decl(n),

            Node::Cond(n) => self.emit_cond(n),

            Node::Regex(n) => {
                match Regex::new(&n.pattern) {
                    Ok(re) => {
                        self.obj.regexes.push(CompiledRegex {
                            re,
                            pattern: n.pattern.clone(),
                        });
                        let addr = self.obj.regexes.len() - 1;
                        // Record the pool index for capture references
                        // bound to this pattern.
                        n.addr.set(Some(addr));
                        self.emit(Instr::new(Opcode::Match, Operand::Addr(addr)));
                        self.emit(Instr::bare(Opcode::Jnm));
                        VisitFlow::Descend
                    }
                    Err(e) => {
                        self.errorf(n.pos, e);
                        VisitFlow::Stop
                    }
                }
            }

            Node::StringLit(n) => {
                self.obj.strings.push(n.text.clone());
                let idx = self.obj.strings.len() - 1;
                self.emit(Instr::new(Opcode::Str, Operand::Addr(idx)));
                VisitFlow::Descend
            }

            Node::IntLit(n) => {
                self.emit(Instr::new(Opcode::Push, Operand::Int(n.value)));
                VisitFlow::Descend
            }

            Node::FloatLit(n) => {
                self.emit(Instr::new(Opcode::Push, Operand::Float(n.value)));
                VisitFlow::Descend
            }

            Node::Id(n) => {
                let bound = n.sym.as_ref().and_then(|s| {
                    let sym = s.borrow();
                    match sym.binding {
                        Some(Binding::Metric) => Some(sym.addr),
                        _ => None,
                    }
                });
                let Some(addr) = bound else {
                    self.errorf(n.pos, format!("no metric bound to identifier {:?}", n.name));
                    return VisitFlow::Stop;
                };
                let Some(m) = self.obj.metrics.get(addr) else {
                    self.errorf(
                        n.pos,
                        format!("identifier {:?} bound outside the metric pool", n.name),
                    );
                    return VisitFlow::Stop;
                };
                let keys = m.keys.len();
                self.emit(Instr::new(Opcode::Mload, Operand::Addr(addr)));
                self.emit(Instr::new(Opcode::Dload, Operand::Addr(keys)));
                VisitFlow::Descend
            }

            Node::Capref(n) => {
                let bound = n.sym.as_ref().and_then(|s| {
                    let sym = s.borrow();
                    match &sym.binding {
                        Some(Binding::Regex(re)) => re.get().map(|idx| (idx, sym.addr)),
                        _ => None,
                    }
                });
                let Some((re_idx, offset)) = bound else {
                    self.errorf(
                        n.pos,
                        format!("no regular expression bound to capref {:?}", n.name),
                    );
                    return VisitFlow::Stop;
                };
                // The pool index of the owning pattern, then the
                // capture-group offset within it.
                self.emit(Instr::new(Opcode::Push, Operand::Addr(re_idx)));
                self.emit(Instr::new(Opcode::Capref, Operand::Addr(offset)));
                VisitFlow::Descend
            }

            // Definitions are inlined at each use; nothing to emit.
            Node::DecoDef(_) => VisitFlow::Stop,

            Node::Deco(n) => self.emit_deco(n),

            Node::Next(n) => self.emit_next(n),

            Node::Otherwise(_) => {
                self.emit(Instr::bare(Opcode::Otherwise));
                self.emit(Instr::bare(Opcode::Jnm));
                VisitFlow::Descend
            }

            Node::Del(n) => {
                let start = self.obj.prog.len();
                walk(self, &n.target);
                // Rewrite the trailing dload: look up the datum, then
                // drop it instead of pushing it.
                if self.obj.prog.len() > start {
                    let pc = self.pc();
                    self.obj.prog[pc].op = Opcode::Del;
                }
                VisitFlow::Stop
            }

            Node::Binary(n) => self.emit_binary_before(n),

            Node::StmtList(_) | Node::Unary(_) | Node::Builtin(_) | Node::Conv(_) => {
                VisitFlow::Descend
            }
        }
    }

    fn visit_after(&mut self, node: &'a Node) {
        match node {
            Node::Builtin(n) => self.emit_builtin(n),

            Node::Unary(n) => match n.op {
                UnaryOp::Inc => self.emit(Instr::bare(Opcode::Inc)),
                UnaryOp::Not => self.emit(Instr::bare(Opcode::Not)),
            },

            Node::Binary(n) => self.emit_binary_after(n),

            Node::Conv(n) => {
                if let Err(e) = self.emit_conversion(&n.expr.ty(), &n.ty) {
                    self.errorf(n.pos, e);
                }
            }

            _ => {}
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
