use crate::error::CompileError;
use crate::ir::ast;
use crate::ir::tac::{Instruction, Label, Operand, TacOperator, TacProgram, Temp};

use super::Backend;

/// Понижение AST в трёхадресный код. Сам бэкенд состояния не хранит:
/// счётчики живут только внутри одного вызова `compile`.
#[derive(Debug, Default)]
pub struct TacBackend;

impl TacBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Backend for TacBackend {
    fn compile(&mut self, program: &ast::Program) -> Result<String, CompileError> {
        Ok(lower(program)?.to_string())
    }
}

/// Понижает программу в TAC со свежими счётчиками временных и меток
pub fn lower(program: &ast::Program) -> Result<TacProgram, CompileError> {
    let mut lowering = Lowering::new();
    lowering.lower_block(&program.statements)?;
    Ok(lowering.finish())
}

/// Состояние одного прогона: инструкции и два счётчика.
/// Счётчики только растут, поэтому все имена tN и LN в прогоне уникальны.
struct Lowering {
    code: Vec<Instruction>,
    temp_count: u32,
    label_count: u32,
}

impl Lowering {
    fn new() -> Self {
        Self {
            code: Vec::new(),
            temp_count: 0,
            label_count: 0,
        }
    }

    fn new_temp(&mut self) -> Temp {
        self.temp_count += 1;
        Temp(self.temp_count)
    }

    fn new_label(&mut self) -> Label {
        self.label_count += 1;
        Label(self.label_count)
    }

    fn emit(&mut self, instruction: Instruction) {
        self.code.push(instruction);
    }

    fn finish(self) -> TacProgram {
        TacProgram { instructions: self.code }
    }

    fn lower_block(&mut self, block: &[ast::Statement]) -> Result<(), CompileError> {
        for statement in block {
            self.lower_statement(statement)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, statement: &ast::Statement) -> Result<(), CompileError> {
        match statement {
            ast::Statement::Assign { target, value } => {
                let value = self.lower_expression(value)?;
                self.emit(Instruction::Copy { target: target.clone(), value });
            }
            ast::Statement::If { condition, then_branch, else_branch } => {
                self.lower_if(condition, then_branch, else_branch)?;
            }
            ast::Statement::Loop { body, condition } => {
                self.lower_loop(body, condition)?;
            }
            ast::Statement::FuncDef { name, params, body } => {
                self.emit(Instruction::FuncBegin { name: name.clone(), params: params.clone() });
                self.lower_block(body)?;
                self.emit(Instruction::FuncEnd { name: name.clone() });
            }
            ast::Statement::Log(ast::LogArgument::Text(text)) => {
                self.emit(Instruction::LogText(text.clone()));
            }
            ast::Statement::Log(ast::LogArgument::Value(expr)) => {
                let value = self.lower_expression(expr)?;
                self.emit(Instruction::LogValue(value));
            }
            // В словаре TAC нет инструкций вызова и возврата
            ast::Statement::Call(_) => {
                return Err(CompileError::Unsupported { construct: "function call" });
            }
            ast::Statement::Return(_) => {
                return Err(CompileError::Unsupported { construct: "return" });
            }
        }
        Ok(())
    }

    fn lower_if(
        &mut self,
        condition: &ast::Expression,
        then_branch: &[ast::Statement],
        else_branch: &[ast::Statement],
    ) -> Result<(), CompileError> {
        let condition = self.lower_expression(condition)?;
        let else_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::JumpIfNot { condition, label: else_label });
        self.lower_block(then_branch)?;
        self.emit(Instruction::Jump(end_label));
        self.emit(Instruction::Label(else_label));
        self.lower_block(else_branch)?;
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    /// Тело выполняется хотя бы раз; назад прыгаем, пока условие истинно.
    /// Метка конца ставится, но переходов на неё нет.
    fn lower_loop(
        &mut self,
        body: &[ast::Statement],
        condition: &ast::Expression,
    ) -> Result<(), CompileError> {
        let start_label = self.new_label();
        let end_label = self.new_label();

        self.emit(Instruction::Label(start_label));
        self.lower_block(body)?;
        let condition = self.lower_expression(condition)?;
        self.emit(Instruction::JumpIf { condition, label: start_label });
        self.emit(Instruction::Label(end_label));
        Ok(())
    }

    /// Возвращает операнд с результатом; для составных выражений
    /// сначала выдаёт инструкции, вычисляющие его во временную.
    ///
    /// Левая ветка цепочки `a + b + c + ...` обходится циклом: длинная
    /// сумма даёт дерево глубиной в число слагаемых. Правые операнды
    /// разбираются рекурсивно, их глубину ограничивает парсер.
    fn lower_expression(&mut self, expr: &ast::Expression) -> Result<Operand, CompileError> {
        let mut pending = Vec::new();
        let mut current = expr;
        while let Some((op, left, right)) = split_binary(current) {
            pending.push((op, right));
            current = left;
        }

        let mut value = self.lower_operand(current)?;
        while let Some((op, right)) = pending.pop() {
            let right = self.lower_expression(right)?;
            let target = self.new_temp();
            self.emit(Instruction::Binary { target, left: value, op, right });
            value = Operand::Temp(target);
        }
        Ok(value)
    }

    fn lower_operand(&mut self, expr: &ast::Expression) -> Result<Operand, CompileError> {
        match expr {
            ast::Expression::Number(text) | ast::Expression::Identifier(text) => {
                Ok(Operand::Name(text.clone()))
            }
            ast::Expression::BinaryOp { .. } | ast::Expression::Compare { .. } => {
                self.lower_expression(expr)
            }
            ast::Expression::Logical { .. } => {
                Err(CompileError::Unsupported { construct: "logical operator" })
            }
            ast::Expression::Call(_) => {
                Err(CompileError::Unsupported { construct: "function call" })
            }
        }
    }
}

/// Оператор и операнды узла, который понижается в `t := a op b`
fn split_binary(
    expr: &ast::Expression,
) -> Option<(TacOperator, &ast::Expression, &ast::Expression)> {
    match expr {
        ast::Expression::BinaryOp { op, left, right } => {
            Some((TacOperator::Arithmetic(*op), left.as_ref(), right.as_ref()))
        }
        ast::Expression::Compare { op, left, right } => {
            Some((TacOperator::Compare(*op), left.as_ref(), right.as_ref()))
        }
        _ => None,
    }
}
