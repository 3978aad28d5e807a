//! AST-to-IR lowering.
//!
//! Walks a [`Program`] depth-first and drives an [`IrBackend`]: one flat
//! symbol table for the whole program, the backend's insertion cursor for
//! control flow, and integer/float unification on every arithmetic or
//! comparison operation.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::ast::{BinaryOp, Expression, Number, Program, Statement, UnaryOp};

pub mod error;
pub mod ir;

pub use error::LoweringError;
pub use ir::{ArithOp, CmpOp, IrBackend, NumericFamily, ValueKind};

/// Callee name that denotes the formatted-output capability.
pub const PRINT_CALLEE: &str = "yap";

/// A lowered expression: backend value plus its kind.
#[derive(Debug, Clone, Copy)]
pub struct Operand<V> {
    pub value: V,
    pub kind: ValueKind,
}

#[derive(Debug, Clone, Copy)]
struct Binding<S> {
    slot: S,
    kind: ValueKind,
}

enum Emit {
    Arith(ArithOp),
    Compare(CmpOp),
}

fn emit_for(op: BinaryOp) -> Result<Emit, LoweringError> {
    Ok(match op {
        BinaryOp::Add => Emit::Arith(ArithOp::Add),
        BinaryOp::Sub => Emit::Arith(ArithOp::Sub),
        BinaryOp::Mul => Emit::Arith(ArithOp::Mul),
        BinaryOp::Div => Emit::Arith(ArithOp::Div),
        BinaryOp::Less => Emit::Compare(CmpOp::Less),
        BinaryOp::Greater => Emit::Compare(CmpOp::Greater),
        BinaryOp::Equal => Emit::Compare(CmpOp::Equal),
        BinaryOp::NotEqual => {
            return Err(LoweringError::InvalidBinaryOperator { op: op.symbol() });
        }
    })
}

fn family_of(kind: ValueKind) -> NumericFamily {
    if kind == ValueKind::Float {
        NumericFamily::Float
    } else {
        NumericFamily::Int
    }
}

pub struct Lowering<'b, B: IrBackend> {
    backend: &'b mut B,
    symbols: FxHashMap<String, Binding<B::Slot>>,
}

impl<'b, B: IrBackend> Lowering<'b, B> {
    pub fn new(backend: &'b mut B) -> Self {
        Self {
            backend,
            symbols: FxHashMap::default(),
        }
    }

    pub fn lower_program(mut self, program: &Program) -> Result<(), LoweringError> {
        self.backend.declare_print()?;
        self.backend.begin_entry()?;
        self.lower_block(&program.body)?;
        let status = self.backend.int_const(0);
        self.backend.ret(status);
        Ok(())
    }

    fn lower_block(&mut self, statements: &[Statement]) -> Result<(), LoweringError> {
        for statement in statements {
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &Statement) -> Result<(), LoweringError> {
        match statement {
            Statement::Print { args } => {
                self.lower_print(args)?;
            }
            Statement::If {
                condition,
                then_body,
                else_body,
            } => self.lower_if(condition, then_body, else_body)?,
            Statement::For {
                init,
                condition,
                increment,
                body,
            } => self.lower_for(init.as_deref(), condition.as_ref(), increment.as_deref(), body)?,
            Statement::FunctionDecl { name, .. } => {
                debug!(function = %name, "function declarations are not lowered");
            }
            Statement::Expression(expr) => {
                self.lower_expression(expr)?;
            }
            Statement::VarDecl { name, initializer } => self.lower_var_decl(name, initializer)?,
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        condition: &Expression,
        then_body: &[Statement],
        else_body: &[Statement],
    ) -> Result<(), LoweringError> {
        let condition = self.lower_expression(condition)?;
        let condition = self.truthiness(condition)?;

        let then_block = self.backend.create_block("then");
        let else_block = self.backend.create_block("else");
        let merge_block = self.backend.create_block("merge");
        self.backend.branch(condition, then_block, else_block);

        self.backend.switch_to_block(then_block);
        self.lower_block(then_body)?;
        self.backend.jump(merge_block);

        // Materialized even when the source had no `cap` branch.
        self.backend.switch_to_block(else_block);
        self.lower_block(else_body)?;
        self.backend.jump(merge_block);

        self.backend.switch_to_block(merge_block);
        Ok(())
    }

    fn lower_for(
        &mut self,
        init: Option<&Statement>,
        condition: Option<&Expression>,
        increment: Option<&Statement>,
        body: &[Statement],
    ) -> Result<(), LoweringError> {
        if let Some(init) = init {
            self.lower_statement(init)?;
        }

        let cond_block = self.backend.create_block("loop.cond");
        let body_block = self.backend.create_block("loop.body");
        let after_block = self.backend.create_block("loop.after");
        self.backend.jump(cond_block);

        self.backend.switch_to_block(cond_block);
        let condition = match condition {
            Some(condition) => {
                let condition = self.lower_expression(condition)?;
                self.truthiness(condition)?
            }
            None => self.backend.int_const(1),
        };
        self.backend.branch(condition, body_block, after_block);

        self.backend.switch_to_block(body_block);
        self.lower_block(body)?;
        if let Some(increment) = increment {
            self.lower_statement(increment)?;
        }
        self.backend.jump(cond_block);

        self.backend.switch_to_block(after_block);
        Ok(())
    }

    fn lower_var_decl(&mut self, name: &str, initializer: &Expression) -> Result<(), LoweringError> {
        let initializer = self.lower_expression(initializer)?;
        let initializer = self.widen_bool(initializer);
        let slot = self.backend.alloc_slot(name);
        self.backend.store(slot, initializer.value);

        let binding = Binding {
            slot,
            kind: initializer.kind,
        };
        if self.symbols.insert(name.to_string(), binding).is_some() {
            debug!(variable = %name, "redeclaration replaces the previous binding");
        }
        Ok(())
    }

    /// Lowers the argument list into a single formatted-output call.
    fn lower_print(&mut self, args: &[Expression]) -> Result<Operand<B::Value>, LoweringError> {
        let mut format = String::new();
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let operand = self.lower_expression(arg)?;
            let operand = self.widen_bool(operand);
            format.push_str(match operand.kind {
                ValueKind::Str => "%s",
                ValueKind::Float => "%.6f",
                ValueKind::Int | ValueKind::Bool => "%d",
            });
            values.push(operand.value);
        }
        format.push('\n');

        let written = self.backend.print(&format, &values)?;
        Ok(Operand {
            value: written,
            kind: ValueKind::Int,
        })
    }

    pub fn lower_expression(
        &mut self,
        expr: &Expression,
    ) -> Result<Operand<B::Value>, LoweringError> {
        match expr {
            Expression::Number(Number::Int(value)) => Ok(Operand {
                value: self.backend.int_const(*value),
                kind: ValueKind::Int,
            }),
            Expression::Number(Number::Float(value)) => Ok(Operand {
                value: self.backend.float_const(*value),
                kind: ValueKind::Float,
            }),
            Expression::String(value) => Ok(Operand {
                value: self.backend.string_const(value)?,
                kind: ValueKind::Str,
            }),
            Expression::Variable(name) => {
                let binding = self.symbols.get(name).copied().ok_or_else(|| {
                    LoweringError::UnknownVariable { name: name.clone() }
                })?;
                Ok(Operand {
                    value: self.backend.load(binding.slot, binding.kind),
                    kind: binding.kind,
                })
            }
            Expression::Binary { op, left, right } => self.lower_binary(*op, left, right),
            Expression::Unary { op, operand } => self.lower_unary(*op, operand),
            Expression::Call { callee, args } => {
                if callee == PRINT_CALLEE {
                    self.lower_print(args)
                } else {
                    Err(LoweringError::UnknownFunction {
                        name: callee.clone(),
                    })
                }
            }
            Expression::Grouping(inner) => self.lower_expression(inner),
            Expression::Assign { target, value } => self.lower_assign(target, value),
        }
    }

    fn lower_binary(
        &mut self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
    ) -> Result<Operand<B::Value>, LoweringError> {
        let left = self.lower_expression(left)?;
        let right = self.lower_expression(right)?;
        let emit = emit_for(op)?;
        let left = self.numeric(op.symbol(), left)?;
        let right = self.numeric(op.symbol(), right)?;

        // There is no integer division operator.
        let family = if op == BinaryOp::Div
            || left.kind == ValueKind::Float
            || right.kind == ValueKind::Float
        {
            NumericFamily::Float
        } else {
            NumericFamily::Int
        };
        let lhs = self.widen(left, family);
        let rhs = self.widen(right, family);

        Ok(match emit {
            Emit::Arith(arith) => Operand {
                value: self.backend.arith(arith, family, lhs, rhs),
                kind: family.kind(),
            },
            Emit::Compare(cmp) => Operand {
                value: self.backend.compare(cmp, family, lhs, rhs),
                kind: ValueKind::Bool,
            },
        })
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
    ) -> Result<Operand<B::Value>, LoweringError> {
        let operand = self.lower_expression(operand)?;
        match op {
            UnaryOp::Negate => {
                let operand = self.numeric(op.symbol(), operand)?;
                let family = family_of(operand.kind);
                Ok(Operand {
                    value: self.backend.negate(family, operand.value),
                    kind: family.kind(),
                })
            }
            UnaryOp::Not => Err(LoweringError::InvalidUnaryOperator { op: op.symbol() }),
        }
    }

    fn lower_assign(
        &mut self,
        target: &str,
        value: &Expression,
    ) -> Result<Operand<B::Value>, LoweringError> {
        let value = self.lower_expression(value)?;
        let binding = self.symbols.get(target).copied().ok_or_else(|| {
            LoweringError::UndefinedAssignment {
                name: target.to_string(),
            }
        })?;
        let value = self.convert(target, value, binding.kind)?;
        self.backend.store(binding.slot, value.value);
        Ok(value)
    }

    /// Branch condition for `operand`: floats compare unequal to `0.0`,
    /// integers and booleans branch on non-zero.
    fn truthiness(&mut self, operand: Operand<B::Value>) -> Result<B::Value, LoweringError> {
        match operand.kind {
            ValueKind::Int | ValueKind::Bool => Ok(operand.value),
            ValueKind::Float => {
                let zero = self.backend.float_const(0.0);
                Ok(self.backend.compare(
                    CmpOp::NotEqual,
                    NumericFamily::Float,
                    operand.value,
                    zero,
                ))
            }
            ValueKind::Str => Err(LoweringError::InvalidOperand {
                op: "condition",
                kind: operand.kind,
            }),
        }
    }

    /// Admits integers and floats; booleans become integers.
    fn numeric(
        &mut self,
        op: &'static str,
        operand: Operand<B::Value>,
    ) -> Result<Operand<B::Value>, LoweringError> {
        match operand.kind {
            ValueKind::Str => Err(LoweringError::InvalidOperand {
                op,
                kind: operand.kind,
            }),
            _ => Ok(self.widen_bool(operand)),
        }
    }

    fn widen_bool(&mut self, operand: Operand<B::Value>) -> Operand<B::Value> {
        if operand.kind == ValueKind::Bool {
            Operand {
                value: self.backend.bool_to_int(operand.value),
                kind: ValueKind::Int,
            }
        } else {
            operand
        }
    }

    fn widen(&mut self, operand: Operand<B::Value>, family: NumericFamily) -> B::Value {
        if family == NumericFamily::Float && operand.kind == ValueKind::Int {
            self.backend.int_to_float(operand.value)
        } else {
            operand.value
        }
    }

    /// Converts an assigned value to the kind of the variable's slot.
    fn convert(
        &mut self,
        name: &str,
        operand: Operand<B::Value>,
        expected: ValueKind,
    ) -> Result<Operand<B::Value>, LoweringError> {
        let operand = self.widen_bool(operand);
        let value = match (operand.kind, expected) {
            (found, expected) if found == expected => operand.value,
            (ValueKind::Int, ValueKind::Float) => self.backend.int_to_float(operand.value),
            (ValueKind::Float, ValueKind::Int) => self.backend.float_to_int(operand.value),
            (found, expected) => {
                return Err(LoweringError::TypeMismatch {
                    name: name.to_string(),
                    expected,
                    found,
                });
            }
        };
        Ok(Operand {
            value,
            kind: expected,
        })
    }
}

/// Lowers `program` into `backend`. The first error aborts the pass; the
/// backend's partial state must not be finalized.
pub fn lower<B: IrBackend>(program: &Program, backend: &mut B) -> Result<(), LoweringError> {
    Lowering::new(backend).lower_program(program)
}
