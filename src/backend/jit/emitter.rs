use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{
    AbiParam, Block, FuncRef, InstBuilder, Signature, StackSlot, StackSlotData,
    StackSlotKind, Type, Value, types,
};
use cranelift_frontend::FunctionBuilder;
use cranelift_jit::JITModule;
use cranelift_module::{DataDescription, DataId, FuncId, Linkage, Module, ModuleError};
use rustc_hash::FxHashMap;

use crate::backend::BackendError;
use crate::codegen::{ArithOp, CmpOp, IrBackend, NumericFamily, ValueKind};

use super::runtime::PRINT_SYMBOL;

const WORD_SIZE: u32 = 8;
const WORD_ALIGN_SHIFT: u8 = 3;

/// Interned read-only, NUL-terminated string objects.
struct StringData {
    counter: usize,
    interned: FxHashMap<String, DataId>,
}

impl StringData {
    fn new() -> Self {
        Self {
            counter: 0,
            interned: FxHashMap::default(),
        }
    }

    fn declare(&mut self, module: &mut JITModule, value: &str) -> Result<DataId, ModuleError> {
        if let Some(data_id) = self.interned.get(value) {
            return Ok(*data_id);
        }

        let name = format!("str_{}", self.counter);
        self.counter += 1;
        let data_id = module.declare_data(&name, Linkage::Local, false, false)?;
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        let mut data_ctx = DataDescription::new();
        data_ctx.define(bytes.into_boxed_slice());
        module.define_data(data_id, &data_ctx)?;
        self.interned.insert(value.to_string(), data_id);
        Ok(data_id)
    }
}

/// `(ctx, format, args, count) -> written`
pub(super) fn print_signature(module: &JITModule, ptr_type: Type) -> Signature {
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(ptr_type));
    sig.params.push(AbiParam::new(ptr_type));
    sig.params.push(AbiParam::new(ptr_type));
    sig.params.push(AbiParam::new(types::I64));
    sig.returns.push(AbiParam::new(types::I64));
    sig
}

/// `(ctx) -> status`
pub(super) fn entry_signature(module: &JITModule, ptr_type: Type) -> Signature {
    let mut sig = module.make_signature();
    sig.params.push(AbiParam::new(ptr_type));
    sig.returns.push(AbiParam::new(types::I64));
    sig
}

/// Emits the entry function into a [`JITModule`] on behalf of the lowering
/// engine.
pub struct JitBackend<'a> {
    module: &'a mut JITModule,
    builder: FunctionBuilder<'a>,
    ptr_type: Type,
    strings: StringData,
    print_id: Option<FuncId>,
    print_ref: Option<FuncRef>,
    entry_block: Option<Block>,
    ctx_param: Option<Value>,
}

impl<'a> JitBackend<'a> {
    /// `builder` must wrap a function whose signature is [`entry_signature`].
    pub(super) fn new(module: &'a mut JITModule, builder: FunctionBuilder<'a>) -> Self {
        let ptr_type = module.target_config().pointer_type();
        Self {
            module,
            builder,
            ptr_type,
            strings: StringData::new(),
            print_id: None,
            print_ref: None,
            entry_block: None,
            ctx_param: None,
        }
    }

    /// Seals every block and finalizes the function body.
    pub(super) fn finish(mut self) -> Result<(), BackendError> {
        if self.entry_block.is_none() {
            return Err(BackendError::MissingEntry);
        }
        self.builder.seal_all_blocks();
        self.builder.finalize();
        Ok(())
    }

    fn print_ref(&mut self) -> Result<FuncRef, BackendError> {
        if let Some(func_ref) = self.print_ref {
            return Ok(func_ref);
        }
        let print_id = self.print_id.ok_or(BackendError::PrintNotDeclared)?;
        let func_ref = self
            .module
            .declare_func_in_func(print_id, self.builder.func);
        self.print_ref = Some(func_ref);
        Ok(func_ref)
    }

    fn ir_type(&self, kind: ValueKind) -> Type {
        match kind {
            ValueKind::Int => types::I64,
            ValueKind::Float => types::F64,
            ValueKind::Bool => types::I8,
            ValueKind::Str => self.ptr_type,
        }
    }

    fn word_slot(&mut self, words: u32) -> StackSlot {
        self.builder.create_sized_stack_slot(StackSlotData::new(
            StackSlotKind::ExplicitSlot,
            words * WORD_SIZE,
            WORD_ALIGN_SHIFT,
        ))
    }
}

impl IrBackend for JitBackend<'_> {
    type Value = Value;
    type Block = Block;
    type Slot = StackSlot;

    fn declare_print(&mut self) -> Result<(), BackendError> {
        if self.print_id.is_none() {
            let sig = print_signature(self.module, self.ptr_type);
            let print_id = self
                .module
                .declare_function(PRINT_SYMBOL, Linkage::Import, &sig)?;
            self.print_id = Some(print_id);
        }
        Ok(())
    }

    fn begin_entry(&mut self) -> Result<Block, BackendError> {
        if let Some(block) = self.entry_block {
            return Ok(block);
        }
        let block = self.builder.create_block();
        self.builder.append_block_params_for_function_params(block);
        self.builder.switch_to_block(block);
        self.ctx_param = self.builder.block_params(block).first().copied();
        if self.ctx_param.is_none() {
            return Err(BackendError::MissingEntry);
        }
        self.entry_block = Some(block);
        Ok(block)
    }

    fn create_block(&mut self, _label: &'static str) -> Block {
        self.builder.create_block()
    }

    fn switch_to_block(&mut self, block: Block) {
        self.builder.switch_to_block(block);
    }

    // Stack slots belong to the function frame, so every slot is allocated
    // once in the prologue regardless of the current block.
    fn alloc_slot(&mut self, _name: &str) -> StackSlot {
        self.word_slot(1)
    }

    fn load(&mut self, slot: StackSlot, kind: ValueKind) -> Value {
        let ty = self.ir_type(kind);
        self.builder.ins().stack_load(ty, slot, 0)
    }

    fn store(&mut self, slot: StackSlot, value: Value) {
        self.builder.ins().stack_store(value, slot, 0);
    }

    fn int_const(&mut self, value: i64) -> Value {
        self.builder.ins().iconst(types::I64, value)
    }

    fn float_const(&mut self, value: f64) -> Value {
        self.builder.ins().f64const(value)
    }

    fn string_const(&mut self, value: &str) -> Result<Value, BackendError> {
        // The runtime reads strings up to their terminator.
        if value.contains('\0') {
            return Err(BackendError::EmbeddedNul);
        }
        let data_id = self.strings.declare(self.module, value)?;
        let gv = self.module.declare_data_in_func(data_id, self.builder.func);
        Ok(self.builder.ins().global_value(self.ptr_type, gv))
    }

    fn int_to_float(&mut self, value: Value) -> Value {
        self.builder.ins().fcvt_from_sint(types::F64, value)
    }

    fn float_to_int(&mut self, value: Value) -> Value {
        self.builder.ins().fcvt_to_sint_sat(types::I64, value)
    }

    fn bool_to_int(&mut self, value: Value) -> Value {
        self.builder.ins().uextend(types::I64, value)
    }

    fn arith(&mut self, op: ArithOp, family: NumericFamily, left: Value, right: Value) -> Value {
        let ins = self.builder.ins();
        match (family, op) {
            (NumericFamily::Int, ArithOp::Add) => ins.iadd(left, right),
            (NumericFamily::Int, ArithOp::Sub) => ins.isub(left, right),
            (NumericFamily::Int, ArithOp::Mul) => ins.imul(left, right),
            (NumericFamily::Int, ArithOp::Div) => ins.sdiv(left, right),
            (NumericFamily::Float, ArithOp::Add) => ins.fadd(left, right),
            (NumericFamily::Float, ArithOp::Sub) => ins.fsub(left, right),
            (NumericFamily::Float, ArithOp::Mul) => ins.fmul(left, right),
            (NumericFamily::Float, ArithOp::Div) => ins.fdiv(left, right),
        }
    }

    fn compare(&mut self, op: CmpOp, family: NumericFamily, left: Value, right: Value) -> Value {
        match family {
            NumericFamily::Int => {
                let cc = match op {
                    CmpOp::Less => IntCC::SignedLessThan,
                    CmpOp::Greater => IntCC::SignedGreaterThan,
                    CmpOp::Equal => IntCC::Equal,
                    CmpOp::NotEqual => IntCC::NotEqual,
                };
                self.builder.ins().icmp(cc, left, right)
            }
            NumericFamily::Float => {
                let cc = match op {
                    CmpOp::Less => FloatCC::LessThan,
                    CmpOp::Greater => FloatCC::GreaterThan,
                    CmpOp::Equal => FloatCC::Equal,
                    // Ordered: NaN is never "not equal".
                    CmpOp::NotEqual => FloatCC::OrderedNotEqual,
                };
                self.builder.ins().fcmp(cc, left, right)
            }
        }
    }

    fn negate(&mut self, family: NumericFamily, value: Value) -> Value {
        match family {
            NumericFamily::Int => self.builder.ins().ineg(value),
            NumericFamily::Float => self.builder.ins().fneg(value),
        }
    }

    fn jump(&mut self, target: Block) {
        self.builder.ins().jump(target, &[]);
    }

    fn branch(&mut self, condition: Value, then_block: Block, else_block: Block) {
        self.builder
            .ins()
            .brif(condition, then_block, &[], else_block, &[]);
    }

    fn print(&mut self, format: &str, args: &[Value]) -> Result<Value, BackendError> {
        let ctx = self.ctx_param.ok_or(BackendError::MissingEntry)?;
        let print = self.print_ref()?;
        let format = self.string_const(format)?;

        let buffer = if args.is_empty() {
            self.builder.ins().iconst(self.ptr_type, 0)
        } else {
            let slot = self.word_slot(args.len() as u32);
            for (index, arg) in args.iter().enumerate() {
                let ty = self.builder.func.dfg.value_type(*arg);
                let word = if ty.is_int() && ty.bits() < 64 {
                    self.builder.ins().uextend(types::I64, *arg)
                } else {
                    *arg
                };
                let offset = (index as u32 * WORD_SIZE) as i32;
                self.builder.ins().stack_store(word, slot, offset);
            }
            self.builder.ins().stack_addr(self.ptr_type, slot, 0)
        };
        let count = self.builder.ins().iconst(types::I64, args.len() as i64);

        let call = self.builder.ins().call(print, &[ctx, format, buffer, count]);
        Ok(self.builder.inst_results(call)[0])
    }

    fn ret(&mut self, value: Value) {
        self.builder.ins().return_(&[value]);
    }
}
