//! Stack-based interpreter with shadow symbolic execution
//!
//! Every stack slot and local holds a concrete [`Value`] plus an optional
//! [`SymExpr`] recording how the value was derived from the entry
//! method's parameters. Probe instructions peek the top of the stack and
//! append a [`ProbeEvent`] to the execution trace.

use crate::bytecode::{type_from_code, Bytecode, BytecodeChunk, Instruction, Opcode};
use crate::error::{VmError, VmResult};
use crate::ops::{self, OpError};
use crate::symbolic::SymExpr;
use std::sync::Arc;
use utgen_core::{ProbeId, ProbeKind, Value};

/// Execution limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Instructions executed before the run is aborted
    pub max_steps: u64,
    /// Nested calls before the run is aborted
    pub max_call_depth: usize,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_steps: 1_000_000,
            max_call_depth: 256,
        }
    }
}

/// One observation made by a probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeEvent {
    pub id: ProbeId,
    pub kind: ProbeKind,
    /// Concrete value: the branch outcome or the observed number
    pub value: Value,
    /// Symbolic term over the inputs; `None` when the value is input independent
    pub sym: Option<Arc<SymExpr>>,
}

impl ProbeEvent {
    /// Outcome of a branch probe
    pub fn taken(&self) -> Option<bool> {
        match self.kind {
            ProbeKind::Branch => self.value.as_bool(),
            ProbeKind::Value => None,
        }
    }
}

/// How an execution ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Normal return; `None` for void methods
    Returned(Option<Value>),
    /// The path needed more loop iterations than the unrolling bound allows
    BoundExceeded,
}

/// Result of one invocation
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub outcome: Outcome,
    /// Probe events in execution order
    pub trace: Vec<ProbeEvent>,
    /// Instructions executed
    pub steps: u64,
}

impl Execution {
    /// Branch probe outcomes in execution order
    pub fn branches(&self) -> impl Iterator<Item = (&ProbeEvent, bool)> {
        self.trace
            .iter()
            .filter_map(|event| event.taken().map(|taken| (event, taken)))
    }
}

#[derive(Debug, Clone)]
struct Slot {
    value: Value,
    sym: Option<Arc<SymExpr>>,
}

impl Slot {
    fn concrete(value: Value) -> Self {
        Self { value, sym: None }
    }

    /// Symbolic term of this slot, falling back to its constant value
    fn term(&self) -> Arc<SymExpr> {
        self.sym
            .clone()
            .unwrap_or_else(|| Arc::new(SymExpr::Const(self.value.clone())))
    }
}

/// Combine two operand terms; `None` when neither operand is symbolic
fn derive(
    lhs: &Slot,
    rhs: &Slot,
    build: impl FnOnce(Arc<SymExpr>, Arc<SymExpr>) -> SymExpr,
) -> Option<Arc<SymExpr>> {
    if lhs.sym.is_none() && rhs.sym.is_none() {
        return None;
    }
    Some(Arc::new(build(lhs.term(), rhs.term())))
}

#[derive(Debug)]
struct CallFrame {
    chunk_id: usize,
    ip: usize,
    locals: Vec<Slot>,
    stack_base: usize,
}

enum VMState {
    Continue,
    Return(Option<Value>),
    Halt,
}

pub struct Vm<'a> {
    bytecode: &'a Bytecode,
    config: VmConfig,
    stack: Vec<Slot>,
    call_stack: Vec<CallFrame>,
    trace: Vec<ProbeEvent>,
    steps: u64,
}

impl<'a> Vm<'a> {
    pub fn new(bytecode: &'a Bytecode, config: VmConfig) -> Self {
        Self {
            bytecode,
            config,
            stack: Vec::with_capacity(64),
            call_stack: Vec::new(),
            trace: Vec::new(),
            steps: 0,
        }
    }

    /// Run chunk `chunk_id` on `args`, with every argument marked symbolic
    pub fn invoke(&mut self, chunk_id: usize, args: &[Value]) -> VmResult<Execution> {
        let chunk = self.chunk(chunk_id)?;
        if args.len() != chunk.params.len() {
            return Err(VmError::ArityMismatch {
                method: chunk.signature(),
                expected: chunk.params.len(),
                got: args.len(),
            });
        }
        for (index, (arg, ty)) in args.iter().zip(&chunk.params).enumerate() {
            if !arg.conforms_to(ty) {
                return Err(VmError::ArgumentType {
                    method: chunk.signature(),
                    index,
                    expected: ty.clone(),
                    got: arg.ty().map_or_else(|| "null".to_string(), |t| t.to_string()),
                });
            }
        }

        self.stack.clear();
        self.call_stack.clear();
        self.trace.clear();
        self.steps = 0;

        let mut locals: Vec<Slot> = args
            .iter()
            .zip(&chunk.params)
            .enumerate()
            .map(|(index, (arg, ty))| Slot {
                value: arg.clone(),
                sym: Some(SymExpr::input(index, ty.clone())),
            })
            .collect();
        locals.resize(chunk.local_count as usize, Slot::concrete(Value::Null));
        self.call_stack.push(CallFrame {
            chunk_id,
            ip: 0,
            locals,
            stack_base: 0,
        });

        tracing::trace!("invoking {}", chunk.signature());
        let outcome = self.run();
        if let Err(err) = &outcome {
            tracing::debug!("{} failed after {} steps: {}", chunk.signature(), self.steps, err);
        }
        Ok(Execution {
            outcome: outcome?,
            trace: std::mem::take(&mut self.trace),
            steps: self.steps,
        })
    }

    fn chunk(&self, chunk_id: usize) -> VmResult<&'a BytecodeChunk> {
        let bytecode: &'a Bytecode = self.bytecode;
        bytecode
            .chunks
            .get(chunk_id)
            .ok_or(VmError::InvalidChunk(chunk_id))
    }

    fn run(&mut self) -> VmResult<Outcome> {
        loop {
            self.steps += 1;
            if self.steps > self.config.max_steps {
                return Err(VmError::StepLimitExceeded {
                    limit: self.config.max_steps,
                });
            }

            let frame = self
                .call_stack
                .last_mut()
                .ok_or_else(|| VmError::StackUnderflow("call stack".to_string()))?;
            let chunk_id = frame.chunk_id;
            let ip = frame.ip;
            frame.ip += 1;
            let chunk = self.chunk(chunk_id)?;
            let instruction = *chunk
                .instructions
                .get(ip)
                .ok_or(VmError::InvalidJump(ip))?;

            match self.execute(chunk, instruction)? {
                VMState::Continue => {}
                VMState::Return(value) => return Ok(Outcome::Returned(value)),
                VMState::Halt => return Ok(Outcome::BoundExceeded),
            }
        }
    }

    fn execute(&mut self, chunk: &'a BytecodeChunk, instruction: Instruction) -> VmResult<VMState> {
        let arg = instruction.arg;
        match instruction.opcode {
            Opcode::PushConst => {
                let value = chunk
                    .constants
                    .get(arg as usize)
                    .cloned()
                    .ok_or(VmError::InvalidConstant(arg))?;
                self.push(Slot::concrete(value));
            }
            Opcode::PushTrue => self.push(Slot::concrete(Value::Bool(true))),
            Opcode::PushFalse => self.push(Slot::concrete(Value::Bool(false))),
            Opcode::PushNull => self.push(Slot::concrete(Value::Null)),
            Opcode::Pop => {
                self.pop(chunk)?;
            }
            Opcode::Dup => {
                let top = self.peek(chunk)?.clone();
                self.push(top);
            }
            Opcode::Load => {
                let slot = self
                    .frame()?
                    .locals
                    .get(arg as usize)
                    .cloned()
                    .ok_or(VmError::InvalidLocal(arg))?;
                self.push(slot);
            }
            Opcode::Store => {
                let value = self.pop(chunk)?;
                let slot = self
                    .frame_mut()?
                    .locals
                    .get_mut(arg as usize)
                    .ok_or(VmError::InvalidLocal(arg))?;
                *slot = value;
            }

            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Rem => {
                let op = instruction
                    .opcode
                    .binary_op()
                    .ok_or_else(|| self.mismatch(chunk, "not an arithmetic opcode"))?;
                let rhs = self.pop(chunk)?;
                let lhs = self.pop(chunk)?;
                let value =
                    ops::arithmetic(op, &lhs.value, &rhs.value).map_err(|e| fault(chunk, e))?;
                let sym = derive(&lhs, &rhs, |lhs, rhs| SymExpr::Arith { op, lhs, rhs });
                self.push(Slot { value, sym });
            }
            Opcode::Lt | Opcode::Le | Opcode::Gt | Opcode::Ge | Opcode::Eq | Opcode::Ne => {
                let op = instruction
                    .opcode
                    .binary_op()
                    .ok_or_else(|| self.mismatch(chunk, "not a comparison opcode"))?;
                let rhs = self.pop(chunk)?;
                let lhs = self.pop(chunk)?;
                let value =
                    Value::Bool(ops::compare(op, &lhs.value, &rhs.value).map_err(|e| fault(chunk, e))?);
                let sym = derive(&lhs, &rhs, |lhs, rhs| SymExpr::Compare { op, lhs, rhs });
                self.push(Slot { value, sym });
            }
            Opcode::Neg => {
                let operand = self.pop(chunk)?;
                let value = ops::negate(&operand.value).map_err(|e| fault(chunk, e))?;
                let sym = operand.sym.map(|s| Arc::new(SymExpr::Neg(s)));
                self.push(Slot { value, sym });
            }
            Opcode::Not => {
                let operand = self.pop(chunk)?;
                let value = ops::not(&operand.value).map_err(|e| fault(chunk, e))?;
                let sym = operand.sym.map(|s| Arc::new(SymExpr::Not(s)));
                self.push(Slot { value, sym });
            }
            Opcode::Concat => {
                let rhs = self.pop(chunk)?;
                let lhs = self.pop(chunk)?;
                let value = ops::concat(&lhs.value, &rhs.value);
                let sym = derive(&lhs, &rhs, |lhs, rhs| SymExpr::Concat(lhs, rhs));
                self.push(Slot { value, sym });
            }
            Opcode::Convert => {
                let ty = type_from_code(arg)
                    .ok_or_else(|| self.mismatch(chunk, format!("unknown type code {}", arg)))?;
                let operand = self.pop(chunk)?;
                let value = ops::convert(&ty, &operand.value).map_err(|e| fault(chunk, e))?;
                let sym = operand.sym.map(|expr| Arc::new(SymExpr::Convert { ty, expr }));
                self.push(Slot { value, sym });
            }

            Opcode::Jump => self.jump(chunk, arg)?,
            Opcode::JumpIf | Opcode::JumpIfNot => {
                let cond = self.pop(chunk)?;
                let taken = cond
                    .value
                    .as_bool()
                    .ok_or_else(|| self.mismatch(chunk, "jump condition is not a boolean"))?;
                if taken == (instruction.opcode == Opcode::JumpIf) {
                    self.jump(chunk, arg)?;
                }
            }

            Opcode::Call => {
                let callee_id = arg as usize;
                let callee = self.chunk(callee_id)?;
                if self.call_stack.len() >= self.config.max_call_depth {
                    return Err(VmError::CallDepthExceeded {
                        limit: self.config.max_call_depth,
                    });
                }
                let arity = callee.params.len();
                if self.stack.len() < arity {
                    return Err(VmError::StackUnderflow(chunk.signature()));
                }
                let mut locals = self.stack.split_off(self.stack.len() - arity);
                locals.resize(callee.local_count as usize, Slot::concrete(Value::Null));
                self.call_stack.push(CallFrame {
                    chunk_id: callee_id,
                    ip: 0,
                    locals,
                    stack_base: self.stack.len(),
                });
            }
            Opcode::Return => {
                let result = self.pop(chunk)?;
                return self.return_from_frame(Some(result));
            }
            Opcode::ReturnVoid => return self.return_from_frame(None),

            Opcode::StrLength | Opcode::StrIsEmpty => {
                let receiver = self.pop(chunk)?;
                let (value, sym) = if instruction.opcode == Opcode::StrLength {
                    (
                        ops::length(&receiver.value),
                        receiver.sym.map(|s| Arc::new(SymExpr::Length(s))),
                    )
                } else {
                    (
                        ops::is_empty(&receiver.value),
                        receiver.sym.map(|s| Arc::new(SymExpr::IsEmpty(s))),
                    )
                };
                let value = value.map_err(|e| fault(chunk, e))?;
                self.push(Slot { value, sym });
            }
            Opcode::StrEquals => {
                let other = self.pop(chunk)?;
                let receiver = self.pop(chunk)?;
                let value = ops::equals(&receiver.value, &other.value).map_err(|e| fault(chunk, e))?;
                let sym = derive(&receiver, &other, |lhs, rhs| SymExpr::Equals(lhs, rhs));
                self.push(Slot { value, sym });
            }

            Opcode::Probe | Opcode::ProbeValue => {
                let kind = if instruction.opcode == Opcode::Probe {
                    ProbeKind::Branch
                } else {
                    ProbeKind::Value
                };
                let top = self.peek(chunk)?;
                let well_typed = match kind {
                    ProbeKind::Branch => top.value.as_bool().is_some(),
                    ProbeKind::Value => top.value.is_numeric(),
                };
                if !well_typed {
                    return Err(self.mismatch(chunk, format!("probe {} on {}", arg, top.value)));
                }
                let event = ProbeEvent {
                    id: ProbeId(arg),
                    kind,
                    value: top.value.clone(),
                    sym: top.sym.clone(),
                };
                self.trace.push(event);
            }
            Opcode::BoundExceeded => return Ok(VMState::Halt),
            Opcode::MissingReturn => {
                return Err(VmError::MissingReturn {
                    method: chunk.signature(),
                })
            }
        }
        Ok(VMState::Continue)
    }

    fn return_from_frame(&mut self, result: Option<Slot>) -> VmResult<VMState> {
        let frame = self
            .call_stack
            .pop()
            .ok_or_else(|| VmError::StackUnderflow("call stack".to_string()))?;
        self.stack.truncate(frame.stack_base);
        if self.call_stack.is_empty() {
            return Ok(VMState::Return(result.map(|slot| slot.value)));
        }
        if let Some(slot) = result {
            self.push(slot);
        }
        Ok(VMState::Continue)
    }

    fn jump(&mut self, chunk: &BytecodeChunk, target: u32) -> VmResult<()> {
        let target = target as usize;
        if target > chunk.instructions.len() {
            return Err(VmError::InvalidJump(target));
        }
        self.frame_mut()?.ip = target;
        Ok(())
    }

    fn frame(&self) -> VmResult<&CallFrame> {
        self.call_stack
            .last()
            .ok_or_else(|| VmError::StackUnderflow("call stack".to_string()))
    }

    fn frame_mut(&mut self) -> VmResult<&mut CallFrame> {
        self.call_stack
            .last_mut()
            .ok_or_else(|| VmError::StackUnderflow("call stack".to_string()))
    }

    fn push(&mut self, slot: Slot) {
        self.stack.push(slot);
    }

    fn pop(&mut self, chunk: &BytecodeChunk) -> VmResult<Slot> {
        let base = self.frame()?.stack_base;
        if self.stack.len() <= base {
            return Err(VmError::StackUnderflow(chunk.signature()));
        }
        self.stack
            .pop()
            .ok_or_else(|| VmError::StackUnderflow(chunk.signature()))
    }

    fn peek(&self, chunk: &BytecodeChunk) -> VmResult<&Slot> {
        let base = self.frame()?.stack_base;
        match self.stack.last() {
            Some(slot) if self.stack.len() > base => Ok(slot),
            _ => Err(VmError::StackUnderflow(chunk.signature())),
        }
    }

    fn mismatch(&self, chunk: &BytecodeChunk, detail: impl Into<String>) -> VmError {
        VmError::TypeMismatch {
            method: chunk.signature(),
            detail: detail.into(),
        }
    }
}

fn fault(chunk: &BytecodeChunk, err: OpError) -> VmError {
    VmError::from_op(err, &chunk.signature())
}

#[cfg(test)]
#[path = "vm_tests.rs"]
mod tests;
