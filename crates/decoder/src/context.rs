//! The opcode stream's push-down automaton: the operand stack, the
//! positional-argument scratch space graphics statements fill in out of
//! order, and the accretion helpers (`put_statement`, `put_declaration`, ...)
//! that let several opcodes in a row build up one statement (§4.3).

use std::collections::HashMap;

use qb_core::{QbError, QbResult};
use qb_syntax::{
    Comment, Expression, File, Line, ProcKind, Procedure, Statement, VariableDeclaration,
    VariableDeclarationStatement,
};

/// One operand-stack slot. `Elided` is a syntactically-present-but-absent
/// argument (an explicit empty comma slot); `Missing` is a hole an opcode
/// promises to fill in later via [`ParseContext::clear_missing`] /
/// [`ParseContext::replace_missing`] once the rest of the statement's
/// arguments are known.
#[derive(Debug, Clone)]
pub enum StackValue {
    Expr(Expression),
    Elided,
    Missing,
}

impl StackValue {
    pub fn into_expr(self) -> Option<Expression> {
        match self {
            StackValue::Expr(e) => Some(e),
            StackValue::Elided | StackValue::Missing => None,
        }
    }
}

/// A statement's exact location, so `DEF FN`'s block form can come back and
/// fill in its `definition` field once the closing `END DEF`/expression
/// opcode is seen, without needing a live borrow held across intervening
/// opcodes.
struct StatementSlot {
    procedure_index: Option<usize>,
    line_index: usize,
}

pub struct ParseContext {
    stack: Vec<StackValue>,
    positional_arguments: HashMap<&'static str, StackValue>,
    deffn_stack: Vec<StatementSlot>,
    /// Set by the bare `LET` opcode, which precedes its assignment with no
    /// other stack effect; the next statement placed via
    /// [`ParseContext::put_assignment_statement`] consumes the flag and
    /// prints with the `LET` keyword.
    pending_let: bool,
    /// Set by the file driver from a trailing procedure record's `0x80`
    /// flag bit just before its opcode stream is decoded; consumed by the
    /// `SUB`/`FUNCTION` header opcode (0x0058/0x0076) to stamp both the
    /// owning [`Procedure`] and its [`ProcedureHeaderStatement`].
    pending_static: bool,
    pub file: File,
}

impl ParseContext {
    pub fn new() -> Self {
        ParseContext {
            stack: Vec::new(),
            positional_arguments: HashMap::new(),
            deffn_stack: Vec::new(),
            pending_let: false,
            pending_static: false,
            file: File::new(),
        }
    }

    pub fn set_pending_static(&mut self, is_static: bool) {
        self.pending_static = is_static;
    }

    /// Consume the pending-static flag set by the driver, defaulting to
    /// `false` for the unnamed main procedure (which has no trailing record).
    pub fn take_pending_static(&mut self) -> bool {
        std::mem::take(&mut self.pending_static)
    }

    pub fn mark_pending_let(&mut self) {
        self.pending_let = true;
    }

    /// Drop whatever operand-stack and positional-argument state survived
    /// from the previous line. Every "begin line" opcode calls this before
    /// [`ParseContext::begin_line`]: a line never inherits stack contents
    /// from the one before it, even after a decode error left some behind.
    pub fn clear(&mut self) {
        self.stack.clear();
        self.positional_arguments.clear();
    }

    fn current_procedure(&mut self) -> &mut Procedure {
        self.file.procedures.last_mut().unwrap_or(&mut self.file.main)
    }

    fn current_line(&mut self) -> &mut Line {
        if self.file.procedures.is_empty() {
            self.file.main.lines.last_mut().expect("line started before first opcode")
        } else {
            self.file
                .procedures
                .last_mut()
                .unwrap()
                .lines
                .last_mut()
                .expect("line started before first opcode")
        }
    }

    pub fn push(&mut self, value: StackValue) {
        self.stack.push(value);
    }

    pub fn push_expr(&mut self, expr: Expression) {
        self.stack.push(StackValue::Expr(expr));
    }

    pub fn pop(&mut self, offset: u64) -> QbResult<StackValue> {
        self.stack.pop().ok_or(QbError::StackUnderflow { offset, needed: 1, available: 0 })
    }

    pub fn pop_expr(&mut self, offset: u64) -> QbResult<Expression> {
        match self.pop(offset)? {
            StackValue::Expr(e) => Ok(e),
            StackValue::Elided | StackValue::Missing => {
                Err(QbError::structural(offset, "expected an expression on the stack"))
            }
        }
    }

    pub fn pop_n(&mut self, count: usize, offset: u64) -> QbResult<Vec<StackValue>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if self.stack.len() < count {
            return Err(QbError::StackUnderflow { offset, needed: count, available: self.stack.len() });
        }
        Ok(self.stack.split_off(self.stack.len() - count))
    }

    pub fn pop_exprs(&mut self, count: usize, offset: u64) -> QbResult<Vec<Option<Expression>>> {
        Ok(self.pop_n(count, offset)?.into_iter().map(StackValue::into_expr).collect())
    }

    /// Replace every [`StackValue::Missing`] slot with an elided hole, for
    /// statements (`WIDTH`, `PAINT`, `VIEW`, ...) whose trailing optional
    /// arguments the stack tracked as `Missing` until the argument count was
    /// known.
    pub fn replace_missing(values: Vec<StackValue>) -> Vec<Option<Expression>> {
        values
            .into_iter()
            .map(|v| match v {
                StackValue::Missing | StackValue::Elided => None,
                StackValue::Expr(e) => Some(e),
            })
            .collect()
    }

    /// Remove every [`StackValue::Missing`] slot entirely and report the
    /// positions they occupied, for the builtin-table `double_arguments`
    /// convention where missing args are filtered out before reinsertion by
    /// index.
    pub fn clear_missing(values: Vec<StackValue>) -> (Vec<Option<Expression>>, Vec<usize>) {
        let mut present = Vec::new();
        let mut missing_positions = Vec::new();
        for (i, v) in values.into_iter().enumerate() {
            match v {
                StackValue::Missing => missing_positions.push(i),
                StackValue::Elided => present.push(None),
                StackValue::Expr(e) => present.push(Some(e)),
            }
        }
        (present, missing_positions)
    }

    pub fn set_argument(&mut self, position: &'static str, value: StackValue, offset: u64) -> QbResult<()> {
        if self.positional_arguments.contains_key(position) {
            return Err(QbError::DuplicateArgument { position, offset });
        }
        self.positional_arguments.insert(position, value);
        Ok(())
    }

    pub fn take_argument(&mut self, position: &'static str) -> Option<Expression> {
        self.positional_arguments.remove(position).and_then(StackValue::into_expr)
    }

    pub fn clear_arguments(&mut self) {
        self.positional_arguments.clear();
    }

    pub fn begin_procedure(&mut self, procedure: Procedure) {
        self.file.procedures.push(procedure);
    }

    pub fn begin_line(&mut self, label: Option<qb_core::Identifier>, indent: usize) {
        let mut line = Line::new();
        line.label = label;
        line.indent = indent;
        line.statements.push(Statement::Empty);
        if self.file.procedures.is_empty() {
            self.file.main.lines.push(line);
        } else {
            self.file.procedures.last_mut().unwrap().lines.push(line);
        }
    }

    pub fn new_statement(&mut self, at_column: Option<usize>) {
        let line = self.current_line();
        line.statements.push(Statement::Empty);
        line.separator_columns.push(at_column);
    }

    pub fn set_comment(&mut self, comment: Comment) {
        self.current_line().comment = Some(comment);
    }

    pub fn comment_mut(&mut self) -> Option<&mut Comment> {
        self.current_line().comment.as_mut()
    }

    /// Replace the current (last) statement slot with `statement`, following
    /// the original tool's combination rules: an empty slot is simply
    /// overwritten, a `LineIf` tries to place it into its open branch, and
    /// anything else is a hard error (statements genuinely cannot combine).
    pub fn put_statement(&mut self, statement: Statement) -> QbResult<()> {
        let line = self.current_line();
        let slot = line.statements.last_mut().expect("line has no open statement slot");
        Self::place_into_slot(slot, statement)
    }

    fn place_into_slot(slot: &mut Statement, statement: Statement) -> QbResult<()> {
        match slot {
            Statement::Empty => {
                *slot = statement;
                Ok(())
            }
            Statement::ErrorInLine(err) if err.rest_of_line.is_none() => {
                err.rest_of_line = Some(Box::new(statement));
                Ok(())
            }
            Statement::LineIf(line_if) => {
                let target: &mut Statement = match &mut line_if.else_branch {
                    None => &mut line_if.then_branch,
                    Some(else_clause) => &mut else_clause.action,
                };
                if matches!(target, Statement::Empty) {
                    *target = statement;
                    return Ok(());
                }
                if line_if.else_branch.is_none() {
                    if let Statement::Else = statement {
                        line_if.else_branch = Some(Box::new(qb_syntax::ElseClause { action: Box::new(Statement::Empty) }));
                        return Ok(());
                    }
                }
                Err(QbError::structural(0, "statements cannot be combined"))
            }
            _ => Err(QbError::structural(0, "statements cannot be combined")),
        }
    }

    pub fn peek_statement_is<F>(&mut self, pred: F) -> bool
    where
        F: FnOnce(&Statement) -> bool,
    {
        let line = self.current_line();
        line.statements.last().is_some_and(pred)
    }

    /// Replace the current slot with a fresh `T::default()` unless it
    /// already holds one, then return a mutable view of it via `with`.
    pub fn with_statement_kind<T, R>(
        &mut self,
        is_kind: fn(&Statement) -> bool,
        make: fn() -> Statement,
        extract: fn(&mut Statement) -> &mut T,
        with: impl FnOnce(&mut T) -> R,
    ) -> R {
        let line = self.current_line();
        let slot = line.statements.last_mut().expect("line has no open statement slot");
        if !is_kind(slot) {
            *slot = make();
        }
        with(extract(slot))
    }

    /// Ensure the current statement is a [`Statement::VarDecl`] and that its
    /// last declarator is nameless (ready to be filled in), then run `with`
    /// against that declarator.
    pub fn with_declaration<R>(&mut self, with: impl FnOnce(&mut VariableDeclaration) -> R) -> R {
        self.with_statement_kind(
            |s| matches!(s, Statement::VarDecl(_)),
            || Statement::VarDecl(VariableDeclarationStatement::new()),
            |s| match s {
                Statement::VarDecl(v) => v,
                _ => unreachable!(),
            },
            |decl| {
                if decl.declarations.last().map(|d| d.name.is_some()).unwrap_or(true) {
                    decl.declarations.push(VariableDeclaration::nameless());
                }
                with(decl.declarations.last_mut().unwrap())
            },
        )
    }

    pub fn put_assignment_statement(&mut self, mut statement: qb_syntax::AssignmentStatement) -> QbResult<()> {
        if self.pending_let {
            self.pending_let = false;
            statement.keyword = Some(qb_syntax::AssignKeyword::Let);
        }
        let line = self.current_line();
        let slot = line.statements.last_mut().expect("line has no open statement slot");
        match slot {
            Statement::Const(c) => {
                c.assignments.push(Statement::Assignment(statement));
                Ok(())
            }
            _ => Self::place_into_slot(slot, Statement::Assignment(statement)),
        }
    }

    pub fn begin_deffn(&mut self, statement: Statement) -> QbResult<()> {
        self.put_statement(statement)?;
        let procedure_index = if self.file.procedures.is_empty() { None } else { Some(self.file.procedures.len() - 1) };
        let line_index = self.current_line_index();
        self.deffn_stack.push(StatementSlot { procedure_index, line_index });
        Ok(())
    }

    fn current_line_index(&mut self) -> usize {
        if self.file.procedures.is_empty() {
            self.file.main.lines.len() - 1
        } else {
            self.file.procedures.last().unwrap().lines.len() - 1
        }
    }

    pub fn in_deffn(&self) -> bool {
        !self.deffn_stack.is_empty()
    }

    /// `END DEF` (no trailing expression to bind): just close the frame.
    pub fn end_deffn_block(&mut self) -> QbResult<()> {
        self.deffn_stack.pop().ok_or_else(|| QbError::structural(0, "END DEF with no open DEF FN"))?;
        Ok(())
    }

    /// A single-line `DEF FN name(...) = expr`: bind `expr` as the open
    /// `DEF FN`'s definition and close the frame immediately.
    pub fn end_deffn_with(&mut self, definition: Expression) -> QbResult<()> {
        let slot = self.deffn_stack.pop().ok_or_else(|| QbError::structural(0, "assignment with no open DEF FN"))?;
        let lines = match slot.procedure_index {
            None => &mut self.file.main.lines,
            Some(i) => &mut self.file.procedures[i].lines,
        };
        let line = &mut lines[slot.line_index];
        match line.statements.last_mut() {
            Some(Statement::DefFn(deffn)) => {
                deffn.definition = Some(definition);
                Ok(())
            }
            _ => Err(QbError::structural(0, "DEF FN slot no longer holds a DefFnStatement")),
        }
    }

    pub fn current_proc_kind(&mut self) -> Option<ProcKind> {
        self.current_procedure().kind
    }

    /// Stamp the currently-open procedure's kind once its header opcode
    /// (0x0058/0x0076) has been seen; the trailing-record framing that
    /// creates the [`Procedure`] itself carries no kind information.
    pub fn set_current_proc_kind(&mut self, kind: ProcKind) {
        self.current_procedure().kind = Some(kind);
    }

    /// Stamp the just-opened procedure's container-level `static` flag from
    /// its trailing-record preamble (§3 "Procedure").
    pub fn mark_current_procedure_static(&mut self, is_static: bool) {
        self.current_procedure().is_static = is_static;
    }
}

impl Default for ParseContext {
    fn default() -> Self {
        Self::new()
    }
}

