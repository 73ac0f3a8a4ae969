//! Bytecode representation for compiled classes
//!
//! One [`BytecodeChunk`] per method, in declaration order. The whole
//! [`Bytecode`] is serializable so the build bridge can persist it next to
//! the generated source.

use serde::{Deserialize, Serialize};
use utgen_core::{Type, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    // Stack manipulation
    PushConst,
    PushTrue,
    PushFalse,
    PushNull,
    Pop,
    Dup,

    // Locals
    Load,
    Store,

    // Arithmetic, promoted by operand runtime types
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Neg,
    Concat,

    // Comparison
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    Not,

    /// Numeric conversion to the type coded in `arg`
    Convert,

    // Control flow
    Jump,
    JumpIf,
    JumpIfNot,
    Call,
    Return,
    ReturnVoid,

    // Strings
    StrLength,
    StrIsEmpty,
    StrEquals,

    // Instrumentation
    Probe,
    ProbeValue,
    BoundExceeded,

    /// Trap for a non-void method falling off its end
    MissingReturn,
}

impl Opcode {
    /// Opcode of an arithmetic or comparison operator
    pub fn for_binary(op: utgen_core::BinaryOp) -> Option<Opcode> {
        use utgen_core::BinaryOp::*;
        Some(match op {
            Add => Opcode::Add,
            Sub => Opcode::Sub,
            Mul => Opcode::Mul,
            Div => Opcode::Div,
            Rem => Opcode::Rem,
            Lt => Opcode::Lt,
            Le => Opcode::Le,
            Gt => Opcode::Gt,
            Ge => Opcode::Ge,
            Eq => Opcode::Eq,
            Ne => Opcode::Ne,
            And | Or => return None,
        })
    }

    /// Operator carried by an arithmetic or comparison opcode
    pub fn binary_op(&self) -> Option<utgen_core::BinaryOp> {
        use utgen_core::BinaryOp;
        Some(match self {
            Opcode::Add => BinaryOp::Add,
            Opcode::Sub => BinaryOp::Sub,
            Opcode::Mul => BinaryOp::Mul,
            Opcode::Div => BinaryOp::Div,
            Opcode::Rem => BinaryOp::Rem,
            Opcode::Lt => BinaryOp::Lt,
            Opcode::Le => BinaryOp::Le,
            Opcode::Gt => BinaryOp::Gt,
            Opcode::Ge => BinaryOp::Ge,
            Opcode::Eq => BinaryOp::Eq,
            Opcode::Ne => BinaryOp::Ne,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub arg: u32,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self { opcode, arg: 0 }
    }

    pub fn with_arg(opcode: Opcode, arg: u32) -> Self {
        Self { opcode, arg }
    }
}

/// Numeric type code used by [`Opcode::Convert`]
pub fn type_code(ty: &Type) -> Option<u32> {
    match ty {
        Type::Int => Some(0),
        Type::Long => Some(1),
        Type::Double => Some(2),
        _ => None,
    }
}

/// Inverse of [`type_code`]
pub fn type_from_code(code: u32) -> Option<Type> {
    match code {
        0 => Some(Type::Int),
        1 => Some(Type::Long),
        2 => Some(Type::Double),
        _ => None,
    }
}

/// Compiled method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BytecodeChunk {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
    /// Local slots including parameters
    pub local_count: u32,
    pub instructions: Vec<Instruction>,
    pub constants: Vec<Value>,
}

impl BytecodeChunk {
    pub fn new(name: impl Into<String>, params: Vec<Type>, return_type: Type) -> Self {
        Self {
            name: name.into(),
            local_count: params.len() as u32,
            params,
            return_type,
            instructions: Vec::new(),
            constants: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instruction: Instruction) -> usize {
        self.instructions.push(instruction);
        self.instructions.len() - 1
    }

    /// Add a constant, reusing an identical entry
    pub fn add_constant(&mut self, value: Value) -> u32 {
        if let Some(index) = self.constants.iter().position(|c| *c == value) {
            return index as u32;
        }
        self.constants.push(value);
        (self.constants.len() - 1) as u32
    }

    /// Point the jump at `offset` to `target`
    pub fn patch_jump(&mut self, offset: usize, target: usize) {
        if let Some(instruction) = self.instructions.get_mut(offset) {
            instruction.arg = target as u32;
        }
    }

    /// `name(int, String)`
    pub fn signature(&self) -> String {
        let params = self
            .params
            .iter()
            .map(Type::name)
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}({})", self.name, params)
    }
}

/// Compiled class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bytecode {
    pub package: Option<String>,
    pub class_name: String,
    pub chunks: Vec<BytecodeChunk>,
}

impl Bytecode {
    pub fn new(package: Option<String>, class_name: impl Into<String>) -> Self {
        Self {
            package,
            class_name: class_name.into(),
            chunks: Vec::new(),
        }
    }

    pub fn add_chunk(&mut self, chunk: BytecodeChunk) -> usize {
        self.chunks.push(chunk);
        self.chunks.len() - 1
    }

    pub fn qualified_name(&self) -> String {
        match &self.package {
            Some(package) => format!("{}.{}", package, self.class_name),
            None => self.class_name.clone(),
        }
    }

    /// Chunk index of the method with exactly this name and parameter list
    pub fn find_method(&self, name: &str, params: &[Type]) -> Option<usize> {
        self.chunks
            .iter()
            .position(|c| c.name == name && c.params == params)
    }
}

#[cfg(test)]
#[path = "bytecode_tests.rs"]
mod tests;
