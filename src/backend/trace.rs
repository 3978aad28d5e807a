//! Recording backend.
//!
//! Captures every operation the lowering engine emits as plain data so tests
//! can assert on block structure, and so `--backend trace` can print it.

use std::fmt;

use anyhow::Result;

use crate::ast::Program;
use crate::backend::{Backend, BackendError, PreparedBackend};
use crate::codegen::{self, ArithOp, CmpOp, IrBackend, NumericFamily, ValueKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    Alloca {
        slot: SlotId,
        name: String,
    },
    Load {
        result: ValueId,
        slot: SlotId,
        kind: ValueKind,
    },
    Store {
        slot: SlotId,
        value: ValueId,
    },
    IntConst {
        result: ValueId,
        value: i64,
    },
    FloatConst {
        result: ValueId,
        value: f64,
    },
    StringConst {
        result: ValueId,
        value: String,
    },
    IntToFloat {
        result: ValueId,
        value: ValueId,
    },
    FloatToInt {
        result: ValueId,
        value: ValueId,
    },
    BoolToInt {
        result: ValueId,
        value: ValueId,
    },
    Arith {
        result: ValueId,
        op: ArithOp,
        family: NumericFamily,
        left: ValueId,
        right: ValueId,
    },
    Compare {
        result: ValueId,
        op: CmpOp,
        family: NumericFamily,
        left: ValueId,
        right: ValueId,
    },
    Negate {
        result: ValueId,
        family: NumericFamily,
        operand: ValueId,
    },
    Jump {
        target: BlockId,
    },
    Branch {
        condition: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Print {
        result: ValueId,
        format: String,
        args: Vec<ValueId>,
    },
    Return {
        value: ValueId,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBlock {
    pub label: &'static str,
    pub ops: Vec<Op>,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    print_declared: bool,
    blocks: Vec<RecordedBlock>,
    current: Option<BlockId>,
    /// Number of allocations at the head of the entry block.
    hoisted: usize,
    next_value: usize,
    next_slot: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn print_declared(&self) -> bool {
        self.print_declared
    }

    pub fn blocks(&self) -> &[RecordedBlock] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> &RecordedBlock {
        &self.blocks[id.0]
    }

    /// First block carrying `label`.
    pub fn find_block(&self, label: &str) -> Option<BlockId> {
        self.blocks
            .iter()
            .position(|block| block.label == label)
            .map(BlockId)
    }

    /// Every recorded operation, block by block.
    pub fn ops(&self) -> impl Iterator<Item = &Op> {
        self.blocks.iter().flat_map(|block| block.ops.iter())
    }

    fn ensure_entry(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(RecordedBlock {
                label: "entry",
                ops: Vec::new(),
            });
        }
    }

    fn emit(&mut self, op: Op) {
        self.ensure_entry();
        let index = self.current.map_or(0, |block| block.0);
        self.blocks[index].ops.push(op);
    }

    fn value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }

    fn emit_value(&mut self, build: impl FnOnce(ValueId) -> Op) -> ValueId {
        let result = self.value();
        self.emit(build(result));
        result
    }
}

impl IrBackend for RecordingBackend {
    type Value = ValueId;
    type Block = BlockId;
    type Slot = SlotId;

    fn declare_print(&mut self) -> Result<(), BackendError> {
        self.print_declared = true;
        Ok(())
    }

    fn begin_entry(&mut self) -> Result<BlockId, BackendError> {
        self.ensure_entry();
        self.current = Some(BlockId(0));
        Ok(BlockId(0))
    }

    fn create_block(&mut self, label: &'static str) -> BlockId {
        self.ensure_entry();
        self.blocks.push(RecordedBlock {
            label,
            ops: Vec::new(),
        });
        BlockId(self.blocks.len() - 1)
    }

    fn switch_to_block(&mut self, block: BlockId) {
        self.current = Some(block);
    }

    fn alloc_slot(&mut self, name: &str) -> SlotId {
        self.ensure_entry();
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        self.blocks[0].ops.insert(
            self.hoisted,
            Op::Alloca {
                slot,
                name: name.to_string(),
            },
        );
        self.hoisted += 1;
        slot
    }

    fn load(&mut self, slot: SlotId, kind: ValueKind) -> ValueId {
        self.emit_value(|result| Op::Load { result, slot, kind })
    }

    fn store(&mut self, slot: SlotId, value: ValueId) {
        self.emit(Op::Store { slot, value });
    }

    fn int_const(&mut self, value: i64) -> ValueId {
        self.emit_value(|result| Op::IntConst { result, value })
    }

    fn float_const(&mut self, value: f64) -> ValueId {
        self.emit_value(|result| Op::FloatConst { result, value })
    }

    fn string_const(&mut self, value: &str) -> Result<ValueId, BackendError> {
        Ok(self.emit_value(|result| Op::StringConst {
            result,
            value: value.to_string(),
        }))
    }

    fn int_to_float(&mut self, value: ValueId) -> ValueId {
        self.emit_value(|result| Op::IntToFloat { result, value })
    }

    fn float_to_int(&mut self, value: ValueId) -> ValueId {
        self.emit_value(|result| Op::FloatToInt { result, value })
    }

    fn bool_to_int(&mut self, value: ValueId) -> ValueId {
        self.emit_value(|result| Op::BoolToInt { result, value })
    }

    fn arith(
        &mut self,
        op: ArithOp,
        family: NumericFamily,
        left: ValueId,
        right: ValueId,
    ) -> ValueId {
        self.emit_value(|result| Op::Arith {
            result,
            op,
            family,
            left,
            right,
        })
    }

    fn compare(
        &mut self,
        op: CmpOp,
        family: NumericFamily,
        left: ValueId,
        right: ValueId,
    ) -> ValueId {
        self.emit_value(|result| Op::Compare {
            result,
            op,
            family,
            left,
            right,
        })
    }

    fn negate(&mut self, family: NumericFamily, operand: ValueId) -> ValueId {
        self.emit_value(|result| Op::Negate {
            result,
            family,
            operand,
        })
    }

    fn jump(&mut self, target: BlockId) {
        self.emit(Op::Jump { target });
    }

    fn branch(&mut self, condition: ValueId, then_block: BlockId, else_block: BlockId) {
        self.emit(Op::Branch {
            condition,
            then_block,
            else_block,
        });
    }

    fn print(&mut self, format: &str, args: &[ValueId]) -> Result<ValueId, BackendError> {
        if !self.print_declared {
            return Err(BackendError::PrintNotDeclared);
        }
        Ok(self.emit_value(|result| Op::Print {
            result,
            format: format.to_string(),
            args: args.to_vec(),
        }))
    }

    fn ret(&mut self, value: ValueId) {
        self.emit(Op::Return { value });
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block{}", self.0)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot{}", self.0)
    }
}

fn family_suffix(family: NumericFamily) -> &'static str {
    match family {
        NumericFamily::Int => "i",
        NumericFamily::Float => "f",
    }
}

fn arith_name(op: ArithOp) -> &'static str {
    match op {
        ArithOp::Add => "add",
        ArithOp::Sub => "sub",
        ArithOp::Mul => "mul",
        ArithOp::Div => "div",
    }
}

fn cmp_name(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Less => "lt",
        CmpOp::Greater => "gt",
        CmpOp::Equal => "eq",
        CmpOp::NotEqual => "ne",
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Alloca { slot, name } => write!(f, "{slot} = alloca {name}"),
            Op::Load { result, slot, kind } => write!(f, "{result} = load {kind} {slot}"),
            Op::Store { slot, value } => write!(f, "store {value}, {slot}"),
            Op::IntConst { result, value } => write!(f, "{result} = iconst {value}"),
            Op::FloatConst { result, value } => write!(f, "{result} = fconst {value:?}"),
            Op::StringConst { result, value } => write!(f, "{result} = str {value:?}"),
            Op::IntToFloat { result, value } => write!(f, "{result} = itof {value}"),
            Op::FloatToInt { result, value } => write!(f, "{result} = ftoi {value}"),
            Op::BoolToInt { result, value } => write!(f, "{result} = zext {value}"),
            Op::Arith {
                result,
                op,
                family,
                left,
                right,
            } => write!(
                f,
                "{result} = {}{} {left}, {right}",
                family_suffix(*family),
                arith_name(*op)
            ),
            Op::Compare {
                result,
                op,
                family,
                left,
                right,
            } => write!(
                f,
                "{result} = {}cmp {} {left}, {right}",
                family_suffix(*family),
                cmp_name(*op)
            ),
            Op::Negate {
                result,
                family,
                operand,
            } => write!(f, "{result} = {}neg {operand}", family_suffix(*family)),
            Op::Jump { target } => write!(f, "jump {target}"),
            Op::Branch {
                condition,
                then_block,
                else_block,
            } => write!(f, "brif {condition}, {then_block}, {else_block}"),
            Op::Print {
                result,
                format,
                args,
            } => {
                write!(f, "{result} = print {format:?}")?;
                for arg in args {
                    write!(f, ", {arg}")?;
                }
                Ok(())
            }
            Op::Return { value } => write!(f, "return {value}"),
        }
    }
}

impl fmt::Display for RecordingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.print_declared {
            writeln!(f, "declare print")?;
        }
        for (index, block) in self.blocks.iter().enumerate() {
            writeln!(f, "{} ({}):", BlockId(index), block.label)?;
            for op in &block.ops {
                writeln!(f, "    {op}")?;
            }
        }
        Ok(())
    }
}

/// `trace` backend: lowers the program and returns the recorded listing
/// instead of executing it.
pub struct Trace;

pub struct PreparedTrace {
    listing: String,
}

impl Trace {
    pub fn record(&self, program: &Program) -> Result<RecordingBackend, codegen::LoweringError> {
        let mut recorder = RecordingBackend::new();
        codegen::lower(program, &mut recorder)?;
        Ok(recorder)
    }
}

impl Backend for Trace {
    fn name(&self) -> &'static str {
        "trace"
    }

    fn prepare(&self, program: &Program) -> Result<Box<dyn PreparedBackend>> {
        let recorder = self.record(program)?;
        Ok(Box::new(PreparedTrace {
            listing: recorder.to_string(),
        }))
    }
}

impl PreparedBackend for PreparedTrace {
    fn run(&self) -> Result<String> {
        Ok(self.listing.clone())
    }
}
