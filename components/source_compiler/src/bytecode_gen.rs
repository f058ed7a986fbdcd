//! Bytecode generation from the syntax tree
//!
//! Locals live in frame registers for the whole program; expression
//! temporaries are stacked above them and released as each expression
//! finishes, so nested expressions and call argument windows stay
//! contiguous.

use std::collections::HashMap;

use bytecode_stream::{BytecodeWriter, CodeUnit, Constant, Instruction, Opcode};
use value_model::{EngineError, EngineResult};

use crate::ast::{
    BinaryOperator, Expression, Literal, Program, Statement, UnaryOperator, VariableDeclarator,
};

/// Compiles a parsed program into an executable code unit.
pub struct BytecodeGenerator {
    writer: BytecodeWriter,
    locals: HashMap<String, u8>,
    next_register: u16,
}

impl BytecodeGenerator {
    /// Creates an empty generator.
    pub fn new() -> Self {
        BytecodeGenerator {
            writer: BytecodeWriter::new(),
            locals: HashMap::new(),
            next_register: 0,
        }
    }

    /// Generates code for a whole program.
    ///
    /// The program's value is the value of its last top-level statement
    /// when that statement is an expression statement; a program ending
    /// in any other statement evaluates to undefined.
    pub fn generate(mut self, program: &Program) -> EngineResult<CodeUnit> {
        for statement in &program.body {
            self.gen_statement(statement)?;
        }
        let trailing_expression = matches!(
            program.body.last(),
            Some(Statement::ExpressionStatement { .. })
        );
        if !trailing_expression {
            self.writer.emit(Instruction::LoadUndefined);
        }
        self.writer.emit(Instruction::Return);
        self.writer.into_unit()
    }

    fn gen_statement(&mut self, statement: &Statement) -> EngineResult<()> {
        match statement {
            Statement::ExpressionStatement { expression } => self.gen_expression(expression),

            Statement::VariableDeclaration { declarations } => {
                for VariableDeclarator { name, init } in declarations {
                    match init {
                        Some(init) => self.gen_expression(init)?,
                        None => self.writer.emit(Instruction::LoadUndefined),
                    }
                    // The name binds after its initializer is evaluated,
                    // so `var x = x` reads the outer `x`.
                    let reg = self.local_register(name)?;
                    self.writer.emit(Instruction::StoreReg { reg });
                }
                Ok(())
            }

            Statement::IfStatement { test, consequent, alternate } => {
                self.gen_expression(test)?;
                let else_target = self.writer.new_label();
                self.writer.emit_jump(Opcode::JumpIfFalse, else_target)?;
                self.gen_statement(consequent)?;
                match alternate {
                    Some(alternate) => {
                        let end = self.writer.new_label();
                        self.writer.emit_jump(Opcode::Jump, end)?;
                        self.writer.bind_label(else_target)?;
                        self.gen_statement(alternate)?;
                        self.writer.bind_label(end)?;
                    }
                    None => {
                        self.writer.bind_label(else_target)?;
                    }
                }
                Ok(())
            }

            Statement::WhileStatement { test, body } => {
                let top = self.writer.new_label();
                let exit = self.writer.new_label();
                self.writer.bind_label(top)?;
                self.gen_expression(test)?;
                self.writer.emit_jump(Opcode::JumpIfFalse, exit)?;
                self.gen_statement(body)?;
                self.writer.emit_jump(Opcode::Jump, top)?;
                self.writer.bind_label(exit)?;
                Ok(())
            }

            Statement::ForOfStatement { binding, right, body } => self.gen_for_of(binding, right, body),

            Statement::BlockStatement { body } => {
                for statement in body {
                    self.gen_statement(statement)?;
                }
                Ok(())
            }

            Statement::ThrowStatement { argument } => {
                self.gen_expression(argument)?;
                self.writer.emit(Instruction::Throw);
                Ok(())
            }

            Statement::EmptyStatement => Ok(()),
        }
    }

    fn gen_for_of(&mut self, binding: &str, right: &Expression, body: &Statement) -> EngineResult<()> {
        self.gen_expression(right)?;
        self.writer.emit(Instruction::GetIterator);
        // These registers stay allocated past the loop: the body may
        // declare locals above them.
        let iterator = self.allocate_register()?;
        self.writer.emit(Instruction::StoreReg { reg: iterator });
        let result = self.allocate_register()?;
        let binding_reg = self.local_register(binding)?;
        let done = self.writer.add_name("done")?;
        let value = self.writer.add_name("value")?;

        let top = self.writer.new_label();
        let exit = self.writer.new_label();
        self.writer.bind_label(top)?;
        self.writer.emit(Instruction::LoadReg { reg: iterator });
        self.writer.emit(Instruction::IteratorNext);
        self.writer.emit(Instruction::StoreReg { reg: result });
        self.writer.emit(Instruction::GetProperty { name: done });
        self.writer.emit_jump(Opcode::JumpIfTrue, exit)?;
        self.writer.emit(Instruction::LoadReg { reg: result });
        self.writer.emit(Instruction::GetProperty { name: value });
        self.writer.emit(Instruction::StoreReg { reg: binding_reg });
        self.gen_statement(body)?;
        self.writer.emit_jump(Opcode::Jump, top)?;
        self.writer.bind_label(exit)?;
        Ok(())
    }

    fn gen_expression(&mut self, expression: &Expression) -> EngineResult<()> {
        match expression {
            Expression::Identifier { name } => {
                match self.locals.get(name) {
                    Some(&reg) => self.writer.emit(Instruction::LoadReg { reg }),
                    None => {
                        let name = self.writer.add_name(name)?;
                        self.writer.emit(Instruction::LoadGlobal { name });
                    }
                }
                Ok(())
            }

            Expression::Literal { value } => {
                self.gen_literal(value)?;
                Ok(())
            }

            Expression::ArrayExpression { elements } => {
                let count = u8::try_from(elements.len()).map_err(|_| {
                    EngineError::syntax_error("array literal exceeds 255 elements")
                })?;
                let mark = self.next_register;
                let mut first = 0;
                for (index, element) in elements.iter().enumerate() {
                    self.gen_expression(element)?;
                    let reg = self.allocate_register()?;
                    if index == 0 {
                        first = reg;
                    }
                    self.writer.emit(Instruction::StoreReg { reg });
                }
                self.writer.emit(Instruction::CreateArray { first, count });
                self.next_register = mark;
                Ok(())
            }

            Expression::BinaryExpression { left, operator, right } => {
                self.gen_expression(left)?;
                let lhs = self.allocate_register()?;
                self.writer.emit(Instruction::StoreReg { reg: lhs });
                self.gen_expression(right)?;
                self.writer.emit(binary_instruction(*operator, lhs));
                self.release_register(lhs);
                Ok(())
            }

            Expression::UnaryExpression { operator, argument } => {
                self.gen_expression(argument)?;
                self.writer.emit(match operator {
                    UnaryOperator::Minus => Instruction::Neg,
                    UnaryOperator::Not => Instruction::Not,
                });
                Ok(())
            }

            Expression::AssignmentExpression { target, value } => self.gen_assignment(target, value),

            Expression::MemberExpression { object, property, computed } => {
                if *computed {
                    self.gen_expression(object)?;
                    let base = self.allocate_register()?;
                    self.writer.emit(Instruction::StoreReg { reg: base });
                    self.gen_expression(property)?;
                    self.writer.emit(Instruction::GetElement { base });
                    self.release_register(base);
                } else {
                    self.gen_expression(object)?;
                    let name = self.writer.add_name(property_name(property)?)?;
                    self.writer.emit(Instruction::GetProperty { name });
                }
                Ok(())
            }

            Expression::CallExpression { callee, arguments } => {
                let argc = u8::try_from(arguments.len())
                    .map_err(|_| EngineError::syntax_error("call exceeds 255 arguments"))?;
                self.gen_expression(callee)?;
                let callee_reg = self.allocate_register()?;
                self.writer.emit(Instruction::StoreReg { reg: callee_reg });
                let mut first_arg = 0;
                for (index, argument) in arguments.iter().enumerate() {
                    self.gen_expression(argument)?;
                    let reg = self.allocate_register()?;
                    if index == 0 {
                        first_arg = reg;
                    }
                    self.writer.emit(Instruction::StoreReg { reg });
                }
                self.writer.emit(Instruction::Call { callee: callee_reg, first_arg, argc });
                self.release_register(callee_reg);
                Ok(())
            }
        }
    }

    fn gen_assignment(&mut self, target: &Expression, value: &Expression) -> EngineResult<()> {
        match target {
            Expression::Identifier { name } => {
                self.gen_expression(value)?;
                match self.locals.get(name) {
                    Some(&reg) => self.writer.emit(Instruction::StoreReg { reg }),
                    None => {
                        let name = self.writer.add_name(name)?;
                        self.writer.emit(Instruction::StoreGlobal { name });
                    }
                }
                Ok(())
            }

            Expression::MemberExpression { object, property, computed } => {
                if *computed {
                    self.gen_expression(object)?;
                    let base = self.allocate_register()?;
                    self.writer.emit(Instruction::StoreReg { reg: base });
                    self.gen_expression(property)?;
                    let index = self.allocate_register()?;
                    self.writer.emit(Instruction::StoreReg { reg: index });
                    self.gen_expression(value)?;
                    self.writer.emit(Instruction::SetElement { base, index });
                    self.release_register(base);
                } else {
                    self.gen_expression(object)?;
                    let obj = self.allocate_register()?;
                    self.writer.emit(Instruction::StoreReg { reg: obj });
                    let name = self.writer.add_name(property_name(property)?)?;
                    self.gen_expression(value)?;
                    self.writer.emit(Instruction::SetProperty { obj, name });
                    self.release_register(obj);
                }
                Ok(())
            }

            _ => Err(EngineError::internal("assignment target survived parsing")),
        }
    }

    fn gen_literal(&mut self, literal: &Literal) -> EngineResult<()> {
        match literal {
            Literal::Number(value) => match int32_literal(*value) {
                Some(value) => self.writer.emit(Instruction::LoadInt { value }),
                None => {
                    let index = self.writer.add_constant(Constant::Number(*value))?;
                    self.writer.emit(Instruction::LoadConst { index });
                }
            },
            Literal::String(value) => {
                let index = self.writer.add_constant(Constant::String(value.clone()))?;
                self.writer.emit(Instruction::LoadConst { index });
            }
            Literal::Boolean(true) => self.writer.emit(Instruction::LoadTrue),
            Literal::Boolean(false) => self.writer.emit(Instruction::LoadFalse),
            Literal::Null => self.writer.emit(Instruction::LoadNull),
            Literal::Undefined => self.writer.emit(Instruction::LoadUndefined),
        }
        Ok(())
    }

    // ==================================================================
    // Register allocation
    // ==================================================================

    fn local_register(&mut self, name: &str) -> EngineResult<u8> {
        if let Some(&reg) = self.locals.get(name) {
            return Ok(reg);
        }
        let reg = self.allocate_register()?;
        self.locals.insert(name.to_string(), reg);
        Ok(reg)
    }

    fn allocate_register(&mut self) -> EngineResult<u8> {
        let reg = u8::try_from(self.next_register).map_err(|_| {
            EngineError::syntax_error("program needs more than 256 registers")
        })?;
        self.next_register += 1;
        Ok(reg)
    }

    /// Frees `reg` and every temporary stacked above it.
    fn release_register(&mut self, reg: u8) {
        self.next_register = u16::from(reg);
    }
}

impl Default for BytecodeGenerator {
    fn default() -> Self {
        BytecodeGenerator::new()
    }
}

fn binary_instruction(operator: BinaryOperator, lhs: u8) -> Instruction {
    match operator {
        BinaryOperator::Add => Instruction::Add { lhs },
        BinaryOperator::Sub => Instruction::Sub { lhs },
        BinaryOperator::Mul => Instruction::Mul { lhs },
        BinaryOperator::Div => Instruction::Div { lhs },
        BinaryOperator::Mod => Instruction::Mod { lhs },
        BinaryOperator::Eq => Instruction::Equal { lhs },
        BinaryOperator::NotEq => Instruction::NotEqual { lhs },
        BinaryOperator::StrictEq => Instruction::StrictEqual { lhs },
        BinaryOperator::StrictNotEq => Instruction::StrictNotEqual { lhs },
        BinaryOperator::Lt => Instruction::LessThan { lhs },
        BinaryOperator::LtEq => Instruction::LessEqual { lhs },
        BinaryOperator::Gt => Instruction::GreaterThan { lhs },
        BinaryOperator::GtEq => Instruction::GreaterEqual { lhs },
    }
}

fn property_name(property: &Expression) -> EngineResult<&str> {
    match property {
        Expression::Identifier { name } => Ok(name),
        _ => Err(EngineError::internal("non-computed member without a name")),
    }
}

/// The int32 encoding for a number literal, when one exists. Negative
/// zero stays a double; the int32 zero cannot carry its sign.
fn int32_literal(value: f64) -> Option<i32> {
    if value == 0.0 && value.is_sign_negative() {
        return None;
    }
    let candidate = value as i32;
    if f64::from(candidate) == value {
        Some(candidate)
    } else {
        None
    }
}
