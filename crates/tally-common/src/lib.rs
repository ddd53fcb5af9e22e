pub mod code;
pub mod errors;
pub mod metrics;
pub mod opcodes;
pub mod span;

pub use code::{CompiledRegex, Instr, Object, Operand};
pub use errors::{CompileError, ErrorList};
pub use metrics::{Datum, DatumType, DatumValue, Metric, MetricError, MetricKind};
pub use opcodes::Opcode;
pub use span::Position;
