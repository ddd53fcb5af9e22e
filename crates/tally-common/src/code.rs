use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::metrics::Metric;
use crate::opcodes::Opcode;

/// Operand of an instruction.
///
/// `Addr` covers every index-like operand: jump targets, pool indices,
/// label counts and capture-group offsets. `Int`/`Float` carry immediate
/// constants for `push`, and `Bool` carries the `setmatched` flag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Int(i64),
    Float(f64),
    Bool(bool),
    Addr(usize),
}

/// One bytecode instruction: an opcode plus an optional operand.
///
/// Instructions are appended strictly in emission order. Jump operands
/// start out as placeholders and are rewritten in place (backpatched)
/// once the target index is known; instructions never move, so already
/// emitted addresses stay valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instr {
    pub op: Opcode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<Operand>,
}

impl Instr {
    pub fn new(op: Opcode, operand: Operand) -> Self {
        Self {
            op,
            operand: Some(operand),
        }
    }

    /// An instruction with no operand (or a jump placeholder to be
    /// patched later).
    pub fn bare(op: Opcode) -> Self {
        Self { op, operand: None }
    }
}

impl std::fmt::Display for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.operand {
            Some(Operand::Int(v)) => write!(f, "{} {}", self.op, v),
            Some(Operand::Float(v)) => write!(f, "{} {}", self.op, v),
            Some(Operand::Bool(v)) => write!(f, "{} {}", self.op, v),
            Some(Operand::Addr(v)) => write!(f, "{} {}", self.op, v),
            None => write!(f, "{}", self.op),
        }
    }
}

/// A compiled regular expression together with its source pattern text.
#[derive(Debug, Clone)]
pub struct CompiledRegex {
    pub re: Regex,
    pub pattern: String,
}

/// The compiled unit: instruction sequence plus the three constant pools.
///
/// Immutable once returned from the code generator; only a fully
/// error-free compilation produces one.
#[derive(Debug, Default)]
pub struct Object {
    /// Ordered instruction sequence.
    pub prog: Vec<Instr>,
    /// String literal pool, indexed by `str` operands.
    pub strings: Vec<String>,
    /// Regular expression pool, indexed by `match` operands, in
    /// pattern visitation order.
    pub regexes: Vec<CompiledRegex>,
    /// Metric pool, indexed by `mload` operands, in declaration
    /// visitation order.
    pub metrics: Vec<Metric>,
}

impl Object {
    /// Disassembly listing, one numbered instruction per line.
    pub fn disasm(&self) -> String {
        use std::fmt::Write;
        let mut out = String::new();
        for (pc, instr) in self.prog.iter().enumerate() {
            let _ = writeln!(out, "{:4} {}", pc, instr);
        }
        out
    }
}
