use serde::{Deserialize, Serialize};

/// All opcodes for the tally stack-based virtual machine.
///
/// Instructions are addressed by their position in the program; jump
/// operands are absolute instruction indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Opcode {
    // === Pattern matching ===
    /// Match the input line against the regex at pool index (operand).
    Match,
    /// Pop value, push capture group (operand) of the matched regex.
    Capref,
    /// Push whether no prior pattern in this block matched.
    Otherwise,
    /// Set the "matched" flag to the boolean operand.
    Setmatched,

    // === Control flow ===
    /// Jump to the instruction index (operand) if the match flag is unset.
    Jnm,
    /// Jump to the instruction index (operand) if the match flag is set.
    Jm,
    /// Unconditional jump to the instruction index (operand).
    Jmp,

    // === Constants ===
    /// Push an immediate int or float constant.
    Push,
    /// Push the string at pool index (operand).
    Str,

    // === Metric access ===
    /// Push the metric at pool index (operand).
    Mload,
    /// Pop (operand) label values and the metric, push its datum.
    Dload,
    /// Pop (operand) label values and the metric, delete that datum.
    Del,

    // === Integer arithmetic ===
    /// Increment the datum on the stack; with an operand, pop a delta first.
    Inc,
    /// Pop two ints, push sum.
    Iadd,
    /// Pop two ints, push difference.
    Isub,
    /// Pop two ints, push product.
    Imul,
    /// Pop two ints, push quotient.
    Idiv,
    /// Pop two ints, push remainder.
    Imod,
    /// Pop two ints, push power.
    Ipow,
    /// Pop int and datum, store the int.
    Iset,

    // === Float arithmetic ===
    /// Pop two floats, push sum.
    Fadd,
    /// Pop two floats, push difference.
    Fsub,
    /// Pop two floats, push product.
    Fmul,
    /// Pop two floats, push quotient.
    Fdiv,
    /// Pop two floats, push remainder.
    Fmod,
    /// Pop two floats, push power.
    Fpow,
    /// Pop float and datum, store the float.
    Fset,

    // === Strings ===
    /// Pop two strings, push their concatenation.
    Cat,

    // === Comparison ===
    /// Pop two values, three-way compare, set the match flag against
    /// the expected ordering (operand: -1, 0 or 1).
    Cmp,

    // === Bitwise ===
    /// Pop two ints, push bitwise and.
    And,
    /// Pop two ints, push bitwise or.
    Or,
    /// Pop two ints, push bitwise exclusive or.
    Xor,
    /// Pop one int, push bitwise complement.
    Not,
    /// Pop two ints, push left shift.
    Shl,
    /// Pop two ints, push right shift.
    Shr,

    // === Type conversion ===
    /// Pop int, push float.
    I2f,
    /// Pop string, push int.
    S2i,
    /// Pop string, push float.
    S2f,
    /// Pop int, push string.
    I2s,
    /// Pop float, push string.
    F2s,

    // === Builtin functions (operand: argument count) ===
    /// Push the timestamp of the current input line.
    Timestamp,
    /// Set the timestamp of the current input line.
    Settime,
    /// Parse a time string into a timestamp.
    Strptime,
    /// Parse a string into an int with a given base.
    Strtol,
    /// Pop a string, push its length.
    Length,
    /// Pop a string, push its lowercase form.
    Tolower,
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Opcode::Match => "match",
            Opcode::Capref => "capref",
            Opcode::Otherwise => "otherwise",
            Opcode::Setmatched => "setmatched",
            Opcode::Jnm => "jnm",
            Opcode::Jm => "jm",
            Opcode::Jmp => "jmp",
            Opcode::Push => "push",
            Opcode::Str => "str",
            Opcode::Mload => "mload",
            Opcode::Dload => "dload",
            Opcode::Del => "del",
            Opcode::Inc => "inc",
            Opcode::Iadd => "iadd",
            Opcode::Isub => "isub",
            Opcode::Imul => "imul",
            Opcode::Idiv => "idiv",
            Opcode::Imod => "imod",
            Opcode::Ipow => "ipow",
            Opcode::Iset => "iset",
            Opcode::Fadd => "fadd",
            Opcode::Fsub => "fsub",
            Opcode::Fmul => "fmul",
            Opcode::Fdiv => "fdiv",
            Opcode::Fmod => "fmod",
            Opcode::Fpow => "fpow",
            Opcode::Fset => "fset",
            Opcode::Cat => "cat",
            Opcode::Cmp => "cmp",
            Opcode::And => "and",
            Opcode::Or => "or",
            Opcode::Xor => "xor",
            Opcode::Not => "not",
            Opcode::Shl => "shl",
            Opcode::Shr => "shr",
            Opcode::I2f => "i2f",
            Opcode::S2i => "s2i",
            Opcode::S2f => "s2f",
            Opcode::I2s => "i2s",
            Opcode::F2s => "f2s",
            Opcode::Timestamp => "timestamp",
            Opcode::Settime => "settime",
            Opcode::Strptime => "strptime",
            Opcode::Strtol => "strtol",
            Opcode::Length => "length",
            Opcode::Tolower => "tolower",
        };
        f.write_str(name)
    }
}
