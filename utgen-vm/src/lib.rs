//! utgen virtual machine
//!
//! Type-checking compiler for the Java subset, a stack bytecode
//! interpreter that shadows every value with a symbolic term over the
//! method inputs, and the build bridge that turns generated source into
//! loadable, revisioned units.

pub mod bridge;
pub mod bytecode;
pub mod compiler;
pub mod error;
pub mod ops;
pub mod symbolic;
pub mod vm;

pub use bridge::{BuildBridge, BuildError, LoadableUnit, MethodHandle, ResolveError, UnitLoader};
pub use bytecode::{Bytecode, BytecodeChunk, Instruction, Opcode};
pub use compiler::{compile_source, compile_unit, CompiledUnit, Compiler};
pub use error::{CompileError, Diagnostic, Severity, VmError, VmResult};
pub use ops::OpError;
pub use symbolic::SymExpr;
pub use utgen_core::value::Value;
pub use vm::{Execution, Outcome, ProbeEvent, Vm, VmConfig};
