//! Capability surface the lowering engine drives.
//!
//! Lowering never touches a concrete code generator directly; everything it
//! emits goes through [`IrBackend`], so the same walk feeds the Cranelift JIT
//! and the recording backend used by tests and `--backend trace`.

use std::fmt;

use crate::backend::BackendError;

/// Kind of a backend value as seen by the lowering engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Int,
    Float,
    /// Result of a comparison.
    Bool,
    /// Pointer to a NUL-terminated string constant.
    Str,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Int => "integer",
            ValueKind::Float => "float",
            ValueKind::Bool => "boolean",
            ValueKind::Str => "string",
        };
        f.write_str(name)
    }
}

/// Opcode family an arithmetic or comparison instruction is selected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumericFamily {
    Int,
    Float,
}

impl NumericFamily {
    pub fn kind(self) -> ValueKind {
        match self {
            NumericFamily::Int => ValueKind::Int,
            NumericFamily::Float => ValueKind::Float,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Less,
    Greater,
    Equal,
    NotEqual,
}

pub trait IrBackend {
    type Value: Copy + fmt::Debug;
    type Block: Copy + fmt::Debug + PartialEq;
    type Slot: Copy + fmt::Debug;

    /// Makes the formatted-output routine callable from emitted code.
    fn declare_print(&mut self) -> Result<(), BackendError>;
    /// Opens the nullary entry function and positions the cursor in its
    /// first block.
    fn begin_entry(&mut self) -> Result<Self::Block, BackendError>;

    fn create_block(&mut self, label: &'static str) -> Self::Block;
    fn switch_to_block(&mut self, block: Self::Block);

    /// Reserves an 8-byte slot in the entry function's frame.
    fn alloc_slot(&mut self, name: &str) -> Self::Slot;
    fn load(&mut self, slot: Self::Slot, kind: ValueKind) -> Self::Value;
    fn store(&mut self, slot: Self::Slot, value: Self::Value);

    fn int_const(&mut self, value: i64) -> Self::Value;
    fn float_const(&mut self, value: f64) -> Self::Value;
    fn string_const(&mut self, value: &str) -> Result<Self::Value, BackendError>;

    fn int_to_float(&mut self, value: Self::Value) -> Self::Value;
    /// Truncates toward zero.
    fn float_to_int(&mut self, value: Self::Value) -> Self::Value;
    fn bool_to_int(&mut self, value: Self::Value) -> Self::Value;

    fn arith(
        &mut self,
        op: ArithOp,
        family: NumericFamily,
        left: Self::Value,
        right: Self::Value,
    ) -> Self::Value;
    /// Produces a boolean value.
    fn compare(
        &mut self,
        op: CmpOp,
        family: NumericFamily,
        left: Self::Value,
        right: Self::Value,
    ) -> Self::Value;
    fn negate(&mut self, family: NumericFamily, value: Self::Value) -> Self::Value;

    fn jump(&mut self, target: Self::Block);
    /// Branches to `then_block` when `condition` is non-zero.
    fn branch(&mut self, condition: Self::Value, then_block: Self::Block, else_block: Self::Block);

    /// Variadic formatted-output call; `args` are integers, floats or string
    /// pointers matching the directives of `format`. Yields the number of
    /// bytes written as an integer.
    fn print(&mut self, format: &str, args: &[Self::Value]) -> Result<Self::Value, BackendError>;
    fn ret(&mut self, value: Self::Value);
}
