//! The hand-written half of the opcode dispatcher (§4.4): every opcode whose
//! effect is more than "pop N args, emit a named builtin call" — lines,
//! statements that accrete across several opcodes, control flow, and
//! declarations. Anything this module does not match falls through to
//! [`crate::builtins::lookup`] in [`dispatch_opcode`]'s final arm.

use qb_core::{Identifier, QbError, QbResult, Type};
use qb_reader::{ByteReader, NameTable};
use qb_syntax::{
    AssignKeyword, AssignmentStatement, BinaryOp, CallStatement, CaseCondition, CaseStatement,
    CircleStatement, Comment, ConstDeclaration, DeclKind, DeclMode, DeclareStatement,
    DefFnStatement, DefTypeKeyword, DefTypeStatement, DoStatement, ElseIfStatement, EndDeclaration,
    EndKind, ErrorInLine, EventKind, EventState, EventStateStatement, Expression, ExitKind,
    FieldStatement, ForStatement, GetPutGraphicsStatement, InputStatement, LineIfStatement,
    LineMode, LineStatement, LockStatement, LoopStatement, LoopTest, Metacommand, NameStatement, NextStatement,
    OnErrorStatement, OnErrorTarget, OnEventStatement, OnExprStatement, OpenAccess, OpenLock,
    OpenMode, OpenStatement, PaintStatement, ProcKind, ProcedureHeaderStatement, PrintItem,
    PrintKind, PrintStatement, PsetStatement, PutMethod, Radix, ReadStatement, RemStatement,
    RestoreStatement, ResumeStatement, ResumeTarget, ReturnStatement, RunStatement, RunTarget,
    Statement, TypeDeclStatement, VariableDeclaration, VariableDeclarationStatement,
    ViewPrintStatement, ViewWindowStatement,
};

use crate::builtins::{self, ArgCount};
use crate::context::{ParseContext, StackValue};
use crate::dialect::{Dialect, DecodedOpcode, Qb40Special};

fn readvar(reader: &mut ByteReader<'_>, names: &mut NameTable) -> QbResult<Identifier> {
    let offset = reader.read_u16()?;
    names.resolve(reader, offset)
}

/// Resolve a declaration/parameter type index the way `get_type` does in
/// the original tool: builtin and fixed-string indices need no further
/// reads, everything else is itself a name-table offset for a `TYPE` name.
fn get_type(dialect: Dialect, reader: &mut ByteReader<'_>, names: &mut NameTable, index: u16) -> QbResult<Type> {
    if index == 0 || index <= dialect.max_builtin_type() || (index & 0x8000) != 0 {
        Ok(dialect.resolve_type(index, || unreachable!("builtin/fixed-string branch never calls custom()")))
    } else {
        Ok(Type::Custom(names.resolve(reader, index)?))
    }
}

fn letter_mask_ranges(mask: u32) -> Vec<(char, char)> {
    let mut letters = Vec::new();
    for i in 0..26u32 {
        if (mask & (1 << (31 - i))) != 0 {
            letters.push((b'A' + i as u8) as char);
        }
    }
    let mut ranges = Vec::new();
    let mut iter = letters.into_iter().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&((end as u8 + 1) as char)) {
            end = iter.next().unwrap();
        }
        ranges.push((start, end));
    }
    ranges
}

fn def_type_keyword(data: u32) -> DefTypeKeyword {
    match data & 0x3F {
        1 => DefTypeKeyword::Int,
        2 => DefTypeKeyword::Lng,
        3 => DefTypeKeyword::Sng,
        5 => DefTypeKeyword::Cur,
        6 => DefTypeKeyword::Str,
        _ => DefTypeKeyword::Dbl,
    }
}

fn exit_kind(ctx: &mut ParseContext) -> ExitKind {
    if ctx.in_deffn() {
        ExitKind::Def
    } else {
        match ctx.current_proc_kind() {
            Some(ProcKind::Function) => ExitKind::Function,
            Some(ProcKind::Sub) | None => ExitKind::Sub,
        }
    }
}

fn end_kind_for_procedure(ctx: &mut ParseContext) -> EndKind {
    match ctx.current_proc_kind() {
        Some(ProcKind::Function) => EndKind::Function,
        Some(ProcKind::Sub) | None => EndKind::Sub,
    }
}

/// `0x0042`/`0x0044` on QB40 (after `dialect::unpack_qb40` has already
/// surfaced them as [`Qb40Special`]): shortcuts for beginning a `DIM` with no
/// further decoding, and turning a just-popped array element back into a
/// `DIM` declarator (§4.3 remap table).
pub fn dispatch_qb40_special(special: Qb40Special, offset: u64, ctx: &mut ParseContext) -> QbResult<()> {
    match special {
        Qb40Special::BeginDim => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| decl.kind = Some(DeclKind::Dim),
            );
            Ok(())
        }
        Qb40Special::ArrayToDim { suffix_type } => {
            let popped = ctx.pop_expr(offset)?;
            let (name, dims) = match popped {
                Expression::ArrayElement { name, args } => {
                    let dims = args.map(|a| a.into_iter().map(|e| (None, e.unwrap_or(Expression::IntegerLiteral { value: 0, radix: Radix::Decimal, is_long: false }))).collect());
                    (name, dims)
                }
                Expression::Identifier(name) => (name, None),
                _ => return Err(QbError::structural(offset, "expected an array element or identifier to redeclare as DIM")),
            };
            let mut name = name;
            if suffix_type != 0 {
                if let Some(sigil) = Dialect::Qb40.resolve_type(suffix_type, || unreachable!()).sigil() {
                    name = name.with_suffix(sigil);
                }
            }
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| {
                    decl.kind = Some(DeclKind::Dim);
                    decl.declarations.push(VariableDeclaration { name: Some(name), var_type: None, dims, as_column: None });
                },
            );
            Ok(())
        }
    }
}

/// A graphics coordinate pair: pop `x`, `y` off the stack (pushed in that
/// order by two preceding expression opcodes) and wrap them as a `STEP`-
/// aware [`Expression::Coord`].
fn pop_coord(ctx: &mut ParseContext, offset: u64, step: bool) -> QbResult<Expression> {
    let y = ctx.pop_expr(offset)?;
    let x = ctx.pop_expr(offset)?;
    Ok(Expression::Coord { x: Box::new(x), y: Box::new(y), step })
}

/// Read back a positional-argument deposit made by one of the `0x007E`-
/// `0x0084` opcodes, erroring if the statement that needs it never got one.
fn required_argument(ctx: &mut ParseContext, offset: u64, position: &'static str) -> QbResult<Expression> {
    ctx.take_argument(position)
        .ok_or_else(|| QbError::structural(offset, format!("missing positional argument: {position}")))
}

/// Dispatch one already-unpacked, dialect-neutral opcode (§4.4). `offset` is
/// the byte position the opcode word itself started at, used for error
/// reporting.
pub fn dispatch_opcode(
    dialect: Dialect,
    decoded: DecodedOpcode,
    offset: u64,
    reader: &mut ByteReader<'_>,
    names: &mut NameTable,
    ctx: &mut ParseContext,
) -> QbResult<()> {
    let opcode = decoded.opcode;
    let parameter = decoded.parameter;

    match opcode {
        0x0000 => {
            ctx.clear();
            ctx.begin_line(None, parameter as usize);
        }
        0x0004 => {
            ctx.clear();
            let label = readvar(reader, names)?;
            ctx.begin_line(Some(label), 0);
        }
        0x0005 => {
            ctx.clear();
            let label = readvar(reader, names)?;
            ctx.begin_line(Some(label), parameter as usize);
        }
        0x0006 => ctx.new_statement(None),
        0x0007 => {
            let column = reader.read_u16()?;
            ctx.new_statement(Some(column as usize));
        }

        0x000A => {
            let text = reader.read_string()?;
            ctx.put_statement(Statement::ErrorInLine(ErrorInLine { text, rest_of_line: None }))?;
        }

        // Plain identifier: push / assign / declare.
        0x000B => {
            let name = readvar(reader, names)?;
            ctx.push_expr(Expression::Identifier(name));
        }
        0x000C => {
            let value = ctx.pop_expr(offset)?;
            let name = readvar(reader, names)?;
            ctx.put_assignment_statement(AssignmentStatement { keyword: None, target: Expression::Identifier(name), value })?;
        }
        0x000D => {
            let name = readvar(reader, names)?;
            ctx.with_declaration(|decl| decl.name = Some(name));
        }

        // Array-subscripted analogues.
        0x000E => {
            let name = readvar(reader, names)?;
            let argcount = reader.read_u16()? as usize;
            let args = ctx.pop_exprs(argcount, offset)?;
            ctx.push_expr(Expression::ArrayElement { name, args: Some(args) });
        }
        0x000F => {
            let value = ctx.pop_expr(offset)?;
            let name = readvar(reader, names)?;
            let argcount = reader.read_u16()? as usize;
            let args = ctx.pop_exprs(argcount, offset)?;
            ctx.put_assignment_statement(AssignmentStatement {
                keyword: None,
                target: Expression::ArrayElement { name, args: Some(args) },
                value,
            })?;
        }
        0x0010 => {
            let name = readvar(reader, names)?;
            let argcount = reader.read_u16()? as usize;
            let dim_exprs = ctx.pop_exprs(argcount, offset)?;
            let declares = !dialect.is_qb40()
                || ctx.peek_statement_is(|s| {
                    matches!(s, Statement::VarDecl(v) if matches!(v.kind, None | Some(DeclKind::Dim) | Some(DeclKind::Redim)))
                });
            if declares {
                let dims = dim_exprs.into_iter().map(|e| (None, e.unwrap_or(Expression::IntegerLiteral { value: 0, radix: Radix::Decimal, is_long: false }))).collect();
                ctx.with_declaration(|decl| {
                    decl.name = Some(name);
                    decl.dims = Some(dims);
                });
            } else {
                ctx.push_expr(Expression::ArrayElement { name, args: Some(dim_exprs) });
            }
        }

        // Field-access analogues: simple `name.field`, nested `base.field`,
        // assignment, and a `TYPE`-block field declaration.
        0x0011 => {
            let base = readvar(reader, names)?;
            let field = readvar(reader, names)?;
            ctx.push_expr(Expression::Field { base: Box::new(Expression::Identifier(base)), field: Box::new(Expression::Identifier(field)) });
        }
        0x0012 => {
            let base = ctx.pop_expr(offset)?;
            let field = readvar(reader, names)?;
            ctx.push_expr(Expression::Field { base: Box::new(base), field: Box::new(Expression::Identifier(field)) });
        }
        0x0013 => {
            let base = ctx.pop_expr(offset)?;
            let field = readvar(reader, names)?;
            let value = ctx.pop_expr(offset)?;
            ctx.put_assignment_statement(AssignmentStatement {
                keyword: None,
                target: Expression::Field { base: Box::new(base), field: Box::new(Expression::Identifier(field)) },
                value,
            })?;
        }
        0x0014 => {
            let name = readvar(reader, names)?;
            ctx.with_declaration(|decl| decl.name = Some(name));
        }

        0x0015 => {
            let type_index = reader.read_u16()?;
            let as_type = get_type(dialect, reader, names, type_index)?;
            let column = reader.read_u16()?;
            ctx.with_declaration(|decl| {
                decl.var_type = Some(as_type.clone());
                decl.as_column = Some(column as usize);
            });
        }
        0x0016 => {
            let type_index = reader.read_u16()?;
            let as_type = dialect.resolve_type(type_index, || unreachable!());
            let column = reader.read_u16()?;
            ctx.with_declaration(|decl| {
                decl.var_type = Some(as_type.clone());
                decl.as_column = Some(column as usize);
            });
        }
        0x017C => {
            let length = reader.read_u16()?;
            let column = reader.read_u16()?;
            ctx.with_declaration(|decl| {
                decl.var_type = Some(Type::FixedString(length));
                decl.as_column = Some(column as usize);
            });
        }
        0x0019 => {
            let name = readvar(reader, names)?;
            let type_index = reader.read_u16()?;
            let as_type = get_type(dialect, reader, names, type_index)?;
            let column = reader.read_u16()?;
            ctx.with_declaration(|decl| {
                decl.name = Some(name.clone());
                decl.var_type = Some(as_type.clone());
                decl.as_column = Some(column as usize);
            });
        }
        0x017E => {
            let name = readvar(reader, names)?;
            ctx.with_declaration(|decl| decl.name = Some(name));
        }

        0x001A => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| decl.mode = Some(DeclMode::Shared),
            );
        }
        0x001E => {
            reader.read_u16()?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| decl.kind = Some(DeclKind::Shared),
            );
        }
        0x001F => {
            reader.read_u16()?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| decl.kind = Some(DeclKind::Static),
            );
        }
        0x017D => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| decl.kind = Some(DeclKind::Dim),
            );
        }
        0x001C | 0x01A8 => {
            let popped = ctx.pop_expr(offset)?;
            let (name, dims) = match popped {
                Expression::ArrayElement { name, args } => (
                    name,
                    args.map(|a| a.into_iter().map(|e| (None, e.unwrap_or(Expression::IntegerLiteral { value: 0, radix: Radix::Decimal, is_long: false }))).collect()),
                ),
                Expression::Identifier(name) => (name, None),
                _ => return Err(QbError::structural(offset, "REDIM target is not an array element")),
            };
            ctx.with_declaration(|decl| {
                decl.name = Some(name.clone());
                decl.dims = dims.clone();
            });
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| {
                    decl.kind = Some(DeclKind::Redim);
                    if opcode == 0x01A8 {
                        decl.mode = Some(DeclMode::Preserve);
                    }
                },
            );
        }
        0x00A5 => {
            let block_name = if parameter != 0 { Some(readvar(reader, names)?) } else { None };
            ctx.with_statement_kind(
                |s| matches!(s, Statement::VarDecl(_)),
                || Statement::VarDecl(VariableDeclarationStatement::new()),
                |s| match s {
                    Statement::VarDecl(v) => v,
                    _ => unreachable!(),
                },
                |decl| {
                    decl.kind = Some(DeclKind::Common);
                    decl.common_block = block_name.clone();
                },
            );
        }

        0x0020 => {
            reader.read_u16()?;
            let name = readvar(reader, names)?;
            ctx.put_statement(Statement::TypeDecl(TypeDeclStatement { name: Some(name) }))?;
        }
        0x001D => {
            reader.read_u16()?;
            ctx.put_statement(Statement::End(EndDeclaration { kind: EndKind::Type }))?;
        }

        0x001B => {
            reader.read_u16()?;
            let data = reader.read_u32()?;
            let keyword = def_type_keyword(data);
            let ranges = letter_mask_ranges(data);
            ctx.put_statement(Statement::DefType(DefTypeStatement { keyword, ranges }))?;
        }

        0x0021 => {
            reader.read_u16()?;
            ctx.set_comment(Comment { text: Vec::new(), column: None, metacommand: Some(Metacommand::Static) });
        }
        0x0022 => {
            reader.read_u16()?;
            ctx.set_comment(Comment { text: Vec::new(), column: None, metacommand: Some(Metacommand::Dynamic) });
        }

        0x0023 => ctx.put_statement(Statement::Const(ConstDeclaration::new()))?,

        0x0025 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::ByVal(Box::new(arg)));
        }
        0x0036 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Seg(Box::new(arg)));
        }

        0x0026 => {
            let body = ctx.pop_expr(offset)?;
            ctx.end_deffn_with(body)?;
            reader.read_u16()?;
            reader.read_u16()?;
        }
        0x004F => {
            ctx.end_deffn_block()?;
            ctx.put_statement(Statement::End(EndDeclaration { kind: EndKind::Def }))?;
            reader.read_u16()?;
            reader.read_u16()?;
        }
        0x0045 => {
            reader.read_u16()?;
            reader.read_u16()?;
            let mut name = readvar(reader, names)?;
            let flags = reader.read_u16()?;
            if (flags & 0x0080) != 0 {
                if let Some(sigil) = dialect.resolve_type((flags & 0xF) as u16, || unreachable!()).sigil() {
                    name = name.with_suffix(sigil);
                }
            }
            let argcount = reader.read_u16()?;
            let mut params = Vec::new();
            for _ in 0..argcount {
                let mut arg_name = readvar(reader, names)?;
                let mode = reader.read_u16()?;
                let as_type = reader.read_u16()?;
                if dialect.at_least_qb70() {
                    reader.read_u16()?;
                }
                if (mode & 0x0200) != 0 {
                    if let Some(sigil) = dialect.resolve_type(as_type, || unreachable!()).sigil() {
                        arg_name = arg_name.with_suffix(sigil);
                    }
                }
                params.push(arg_name);
            }
            ctx.begin_deffn(Statement::DefFn(DefFnStatement { name, params, definition: None }))?;
        }

        // Events.
        0x0027 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Event { kind: EventKind::Com, index: Some(Box::new(arg)) });
        }
        0x0028 => {
            let arg = ctx.pop_expr(offset)?;
            let target = readvar(reader, names)?;
            let (event, index) = event_and_index(arg)?;
            ctx.put_statement(Statement::OnEvent(OnEventStatement { event, index, target }))?;
        }
        0x0029 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Event { kind: EventKind::Key, index: Some(Box::new(arg)) });
        }
        0x002A | 0x002B | 0x002C => {
            let arg = ctx.pop_expr(offset)?;
            let (event, index) = event_and_index(arg)?;
            let state = match opcode {
                0x002A => EventState::Off,
                0x002B => EventState::On,
                _ => EventState::Stop,
            };
            ctx.put_statement(Statement::EventState(EventStateStatement { event: Some(event), index, state }))?;
        }
        0x0196 => {
            let state = match parameter {
                0 => EventState::Off,
                1 => EventState::On,
                _ => EventState::Stop,
            };
            ctx.put_statement(Statement::EventState(EventStateStatement { event: None, index: None, state }))?;
        }
        0x002D => ctx.push_expr(Expression::Event { kind: EventKind::Pen, index: None }),
        0x002E => ctx.push_expr(Expression::Event { kind: EventKind::Play, index: None }),
        0x002F => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Event { kind: EventKind::Play, index: Some(Box::new(arg)) });
        }
        0x0030 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Event { kind: EventKind::Signal, index: Some(Box::new(arg)) });
        }
        0x0031 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Event { kind: EventKind::Strig, index: Some(Box::new(arg)) });
        }
        0x0032 => ctx.push_expr(Expression::Event { kind: EventKind::Timer, index: None }),
        0x0033 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Event { kind: EventKind::Timer, index: Some(Box::new(arg)) });
        }

        // CALL / CALLS.
        0x0037 | 0x0038 | 0x0039 => {
            let argcount = reader.read_u16()? as usize;
            let name = readvar(reader, names)?;
            let args = ctx.pop_n(argcount, offset)?;
            let args = args
                .into_iter()
                .map(|v| v.into_expr().map(qb_syntax::Argument::ByRef).unwrap_or(qb_syntax::Argument::ByRef(Expression::Identifier(name.clone()))))
                .collect();
            ctx.put_statement(Statement::Call(CallStatement {
                name,
                args,
                is_calls: opcode == 0x0039,
                explicit: opcode != 0x0038,
            }))?;
        }

        // CASE forms.
        0x003A => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Case(_)),
                || Statement::Case(CaseStatement::new()),
                |s| match s {
                    Statement::Case(c) => c,
                    _ => unreachable!(),
                },
                |case| case.is_else = true,
            );
        }
        0x003B => {
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Case(_)),
                || Statement::Case(CaseStatement::new()),
                |s| match s {
                    Statement::Case(c) => c,
                    _ => unreachable!(),
                },
                |case| case.conditions.push(CaseCondition::Value(arg.clone())),
            );
        }
        0x003C => {
            let mut args = ctx.pop_n(2, offset)?;
            let hi = args.pop().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "CASE range missing an endpoint"))?;
            let lo = args.pop().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "CASE range missing an endpoint"))?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Case(_)),
                || Statement::Case(CaseStatement::new()),
                |s| match s {
                    Statement::Case(c) => c,
                    _ => unreachable!(),
                },
                |case| case.conditions.push(CaseCondition::Range(lo.clone(), hi.clone())),
            );
        }
        0x003D..=0x0042 if !dialect.is_qb40() => {
            let op = match opcode {
                0x003D => BinaryOp::Eq,
                0x003E => BinaryOp::Lt,
                0x003F => BinaryOp::Gt,
                0x0040 => BinaryOp::Le,
                0x0041 => BinaryOp::Ge,
                _ => BinaryOp::Ne,
            };
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Case(_)),
                || Statement::Case(CaseStatement::new()),
                |s| match s {
                    Statement::Case(c) => c,
                    _ => unreachable!(),
                },
                |case| case.conditions.push(CaseCondition::Is(op, arg.clone())),
            );
        }

        0x0044 => {
            reader.read_u16()?;
            let mut name = readvar(reader, names)?;
            let flags = reader.read_u16()?;
            let kind = match flags & 0x0300 {
                0x0100 => ProcKind::Sub,
                0x0200 => ProcKind::Function,
                _ => return Err(QbError::structural(offset, "DECLARE flags name neither SUB nor FUNCTION")),
            };
            if (flags & 0x0080) != 0 {
                if let Some(sigil) = dialect.resolve_type((flags & 7) as u16, || unreachable!()).sigil() {
                    name = name.with_suffix(sigil);
                }
            }
            let argcount = reader.read_u16()?;
            let alias_length = (flags >> 10) & 0x1F;
            let mut params = Vec::new();
            if argcount != 0xFFFF {
                for _ in 0..argcount {
                    let arg_name = readvar(reader, names)?;
                    let mode = reader.read_u16()?;
                    let arg_type = get_type(dialect, reader, names, reader.read_u16()?)?;
                    if dialect.at_least_qb70() {
                        reader.read_u16()?;
                    }
                    params.push(VariableDeclaration {
                        name: Some(arg_name),
                        var_type: Some(arg_type),
                        dims: if (mode & 0x0400) != 0 { Some(Vec::new()) } else { None },
                        as_column: None,
                    });
                }
            }
            let alias = if alias_length != 0 {
                let mut bytes = reader.read_bytes(alias_length as usize)?;
                if alias_length % 2 == 1 {
                    reader.read_u8()?;
                }
                bytes.shrink_to_fit();
                Some(bytes)
            } else {
                None
            };
            ctx.put_statement(Statement::Declare(DeclareStatement {
                is_cdecl: (flags & 0x8000) != 0,
                kind,
                name,
                params,
                alias,
            }))?;
        }

        0x0046 => ctx.put_statement(Statement::Do(DoStatement { test: LoopTest::None }))?,
        0x0047 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Do(DoStatement { test: LoopTest::Until(arg) }))?;
            reader.read_u16()?;
        }
        0x0048 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Do(DoStatement { test: LoopTest::While(arg) }))?;
            reader.read_u16()?;
        }
        0x0062 => ctx.put_statement(Statement::Loop(LoopStatement { test: LoopTest::None }))?,
        0x0063 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Loop(LoopStatement { test: LoopTest::Until(arg) }))?;
            reader.read_u16()?;
        }
        0x0064 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Loop(LoopStatement { test: LoopTest::While(arg) }))?;
            reader.read_u16()?;
        }

        0x0049 => {
            ctx.put_statement(Statement::Else)?;
            reader.read_u16()?;
        }
        0x004C => {
            ctx.pop(offset)?;
            reader.read_u16()?;
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::Else)?;
            ctx.put_statement(Statement::Goto(target))?;
        }
        0x004D => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::ElseIf(ElseIfStatement { condition: arg }))?;
            reader.read_u16()?;
        }

        0x0050 => ctx.put_statement(Statement::End(EndDeclaration { kind: EndKind::If }))?,
        0x0051 => {
            let kind = end_kind_for_procedure(ctx);
            ctx.put_statement(Statement::End(EndDeclaration { kind }))?;
        }
        0x0052 => ctx.put_statement(Statement::End(EndDeclaration { kind: EndKind::Select }))?,

        0x0053 => {
            ctx.put_statement(Statement::Exit(ExitKind::Do))?;
            reader.read_u16()?;
        }
        0x0054 => {
            ctx.put_statement(Statement::Exit(ExitKind::For))?;
            reader.read_u16()?;
        }
        0x0055 => {
            let kind = exit_kind(ctx);
            ctx.put_statement(Statement::Exit(kind))?;
            reader.read_u16()?;
        }

        0x0056 => {
            let mut args = ctx.pop_n(3, offset)?.into_iter();
            let end = args.next().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "FOR missing operand"))?;
            let start = args.next().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "FOR missing operand"))?;
            let var = args.next().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "FOR missing operand"))?;
            ctx.put_statement(Statement::For(ForStatement { var, start, end, step: None }))?;
            reader.read_u16()?;
            reader.read_u16()?;
        }
        0x0057 => {
            let mut args = ctx.pop_n(4, offset)?.into_iter();
            let step = args.next().unwrap().into_expr();
            let end = args.next().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "FOR missing operand"))?;
            let start = args.next().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "FOR missing operand"))?;
            let var = args.next().unwrap().into_expr().ok_or_else(|| QbError::structural(offset, "FOR missing operand"))?;
            ctx.put_statement(Statement::For(ForStatement { var, start, end, step }))?;
            reader.read_u16()?;
            reader.read_u16()?;
        }

        0x0058 | 0x0076 => {
            reader.read_u16()?;
            let mut name = readvar(reader, names)?;
            let flags = reader.read_u16()?;
            let proc_kind = if opcode == 0x0058 { ProcKind::Function } else { ProcKind::Sub };
            if (flags & 0x0080) != 0 {
                if let Some(sigil) = dialect.resolve_type((flags & 7) as u16, || unreachable!()).sigil() {
                    name = name.with_suffix(sigil);
                }
            }
            let argcount = reader.read_u16()?;
            let mut params = Vec::new();
            for _ in 0..argcount {
                let arg_name = readvar(reader, names)?;
                let mode = reader.read_u16()?;
                let arg_type = if (mode & 0x2000) != 0 {
                    let idx = reader.read_u16()?;
                    Some(get_type(dialect, reader, names, idx)?)
                } else {
                    reader.read_u16()?;
                    None
                };
                if dialect.at_least_qb70() {
                    reader.read_u16()?;
                }
                params.push(VariableDeclaration {
                    name: Some(arg_name),
                    var_type: arg_type,
                    dims: if (mode & 0x0400) != 0 { Some(Vec::new()) } else { None },
                    as_column: None,
                });
            }
            ctx.set_current_proc_kind(proc_kind);
            let is_static = ctx.take_pending_static();
            ctx.put_statement(Statement::ProcedureHeader(ProcedureHeaderStatement {
                kind: proc_kind,
                name,
                params,
                return_type: None,
                is_static,
            }))?;
        }

        0x0059 => {
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::Gosub(target))?;
        }
        0x005B => {
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::Goto(target))?;
        }

        0x005D => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::LineIf(LineIfStatement { condition: arg, then_branch: Box::new(Statement::Empty), else_branch: None }))?;
            reader.read_u16()?;
        }
        0x005E => {
            let arg = ctx.pop_expr(offset)?;
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::LineIf(LineIfStatement {
                condition: arg,
                then_branch: Box::new(Statement::Goto(target)),
                else_branch: None,
            }))?;
        }
        0x0061 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::BlockIf(qb_syntax::BlockIfStatement { condition: arg }))?;
            reader.read_u16()?;
        }

        0x0065 => {
            ctx.put_statement(Statement::Next(NextStatement::new()))?;
            reader.read_u16()?;
            reader.read_u16()?;
        }
        0x0066 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Next(_)),
                || Statement::Next(NextStatement::new()),
                |s| match s {
                    Statement::Next(n) => n,
                    _ => unreachable!(),
                },
                |next| next.vars.push(arg.clone()),
            );
            reader.read_u16()?;
            reader.read_u16()?;
        }

        0x0067 | 0x0199 => {
            let target = if dialect.at_least_qb70() {
                let target_offset = reader.read_u16()?;
                match target_offset {
                    0xFFFF => OnErrorTarget::Zero,
                    0xFFFE => OnErrorTarget::ResumeNext,
                    _ => OnErrorTarget::Goto(names.resolve(reader, target_offset)?),
                }
            } else {
                OnErrorTarget::Goto(readvar(reader, names)?)
            };
            ctx.put_statement(Statement::OnError(OnErrorStatement { local: opcode == 0x0199, target }))?;
        }

        0x0068 | 0x0069 => {
            let arg = ctx.pop_expr(offset)?;
            let target_count = reader.read_u16()?;
            let mut targets = Vec::new();
            let mut i = 0;
            while i < target_count {
                targets.push(readvar(reader, names)?);
                i += 2;
            }
            ctx.put_statement(Statement::OnExpr(OnExprStatement { is_gosub: opcode == 0x0068, expr: arg, targets }))?;
        }

        0x006A => ctx.put_statement(Statement::Restore(RestoreStatement { target: None }))?,
        0x006B => {
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::Restore(RestoreStatement { target: Some(target) }))?;
        }
        0x006C => ctx.put_statement(Statement::Resume(ResumeStatement { target: ResumeTarget::Same }))?,
        0x006D => {
            let label_offset = reader.read_u16()?;
            let label = if label_offset != 0xFFFF {
                ResumeTarget::Label(names.resolve(reader, label_offset)?)
            } else {
                ResumeTarget::Label(Identifier::numeric(0, 0xFFFF))
            };
            ctx.put_statement(Statement::Resume(ResumeStatement { target: label }))?;
        }
        0x006E => ctx.put_statement(Statement::Resume(ResumeStatement { target: ResumeTarget::Next }))?,
        0x006F => ctx.put_statement(Statement::Return(ReturnStatement { target: None }))?,
        0x0070 => {
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::Return(ReturnStatement { target: Some(target) }))?;
        }
        0x0071 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Run(RunStatement { target: RunTarget::Program(arg) }))?;
        }
        0x0072 => {
            let target = readvar(reader, names)?;
            ctx.put_statement(Statement::Run(RunStatement { target: RunTarget::Label(target) }))?;
        }
        0x0073 => ctx.put_statement(Statement::Run(RunStatement { target: RunTarget::None }))?,

        0x0074 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Select(arg))?;
            reader.read_u16()?;
        }

        // Graphics positional-argument deposits (§4.4).
        0x007E => {
            let arg = ctx.pop_expr(offset)?;
            ctx.set_argument("aspect", StackValue::Expr(arg), offset)?;
        }
        0x007F => {
            let arg = ctx.pop_expr(offset)?;
            ctx.set_argument("end", StackValue::Expr(arg), offset)?;
        }
        0x0080 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.set_argument("start", StackValue::Expr(arg), offset)?;
        }
        0x0081 => {
            let coord = pop_coord(ctx, offset, false)?;
            ctx.set_argument("from", StackValue::Expr(coord), offset)?;
        }
        0x0082 => {
            let coord = pop_coord(ctx, offset, true)?;
            ctx.set_argument("from", StackValue::Expr(coord), offset)?;
        }
        0x0083 => {
            let coord = pop_coord(ctx, offset, false)?;
            ctx.set_argument("to", StackValue::Expr(coord), offset)?;
        }
        0x0084 => {
            let coord = pop_coord(ctx, offset, true)?;
            ctx.set_argument("to", StackValue::Expr(coord), offset)?;
        }

        0x0085 => {
            let file = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::Field(FieldStatement { file, items: Vec::new() }))?;
        }
        0x0086 => {
            let width = ctx.pop_expr(offset)?;
            let name = readvar(reader, names)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Field(_)),
                || Statement::Field(FieldStatement { file: Expression::IntegerLiteral { value: 0, radix: Radix::Decimal, is_long: false }, items: Vec::new() }),
                |s| match s {
                    Statement::Field(f) => f,
                    _ => unreachable!(),
                },
                |field| field.items.push((width.clone(), name.clone())),
            );
        }

        0x0087 | 0x0088 | 0x0089 => {
            let flags = parameter;
            let prompt = if (flags & 0x04) != 0 {
                match ctx.pop_expr(offset)? {
                    Expression::StringLiteral(bytes) => Some(bytes),
                    _ => None,
                }
            } else {
                None
            };
            let file = if opcode == 0x0087 { Some(ctx.pop_expr(offset)?) } else { None };
            ctx.put_statement(Statement::Input(InputStatement {
                file,
                line_input: false,
                prompt,
                suppress_question: (flags & 0x01) != 0,
                leading_semicolon: (flags & 0x02) != 0,
                vars: Vec::new(),
            }))?;
        }
        0x00B6 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Input(_)),
                || {
                    Statement::Input(InputStatement {
                        file: None,
                        line_input: false,
                        prompt: None,
                        suppress_question: false,
                        leading_semicolon: false,
                        vars: Vec::new(),
                    })
                },
                |s| match s {
                    Statement::Input(i) => i,
                    _ => unreachable!(),
                },
                |input| input.vars.push(arg),
            );
        }
        0x00C0 => {
            let flags = reader.read_u16()?;
            let arg = ctx.pop_expr(offset)?;
            let prompt = if (flags & 0x04) != 0 {
                match ctx.pop_expr(offset)? {
                    Expression::StringLiteral(bytes) => Some(bytes),
                    _ => None,
                }
            } else {
                None
            };
            ctx.put_statement(Statement::Input(InputStatement {
                file: None,
                line_input: true,
                prompt,
                suppress_question: false,
                leading_semicolon: (flags & 0x02) != 0,
                vars: vec![arg],
            }))?;
        }

        0x009F | 0x00A0 => {
            let center = required_argument(ctx, offset, "from")?;
            let color = if opcode == 0x00A0 { Some(ctx.pop_expr(offset)?) } else { None };
            let radius = ctx.pop_expr(offset)?;
            let start = ctx.take_argument("start");
            let end = ctx.take_argument("end");
            let aspect = ctx.take_argument("aspect");
            ctx.put_statement(Statement::Circle(CircleStatement { center, radius, color, start, end, aspect }))?;
        }

        0x00B4 => {
            let from = required_argument(ctx, offset, "from")?;
            let to = ctx.take_argument("to");
            let array = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::GetPutGraphics(GetPutGraphicsStatement { is_put: false, from, to, array, method: None }))?;
        }
        0x00B5 => {
            let method_index = reader.read_u16()?;
            let from = required_argument(ctx, offset, "from")?;
            let array = ctx.pop_expr(offset)?;
            let method = match method_index {
                0xFFFF => None,
                0 => Some(PutMethod::Or),
                1 => Some(PutMethod::And),
                2 => Some(PutMethod::Preset),
                3 => Some(PutMethod::Pset),
                4 => Some(PutMethod::Xor),
                _ => return Err(QbError::structural(offset, format!("unrecognized PUT method {method_index:#06X}"))),
            };
            ctx.put_statement(Statement::GetPutGraphics(GetPutGraphicsStatement { is_put: true, from, to: None, array, method }))?;
        }
        0x00B8 => {
            let mode = reader.read_u16()?;
            let state = match mode {
                0 => EventState::Off,
                1 => EventState::On,
                2 => EventState::List,
                _ => return Err(QbError::structural(offset, format!("unrecognized KEY state {mode:#06X}"))),
            };
            ctx.put_statement(Statement::EventState(EventStateStatement { event: Some(EventKind::Key), index: None, state }))?;
        }
        0x00BB | 0x00BC | 0x00BD | 0x00BE => {
            let mode = reader.read_u16()?;
            let style = if matches!(opcode, 0x00BD | 0x00BE) { Some(ctx.pop_expr(offset)?) } else { None };
            let color = if matches!(opcode, 0x00BC | 0x00BE) { Some(ctx.pop_expr(offset)?) } else { None };
            let to = required_argument(ctx, offset, "to")?;
            let from = ctx.take_argument("from");
            let mode = match mode {
                0 => LineMode::None,
                1 => LineMode::Box,
                2 => LineMode::BoxFilled,
                _ => return Err(QbError::structural(offset, format!("unrecognized LINE mode {mode:#06X}"))),
            };
            ctx.put_statement(Statement::Line(LineStatement { from, to, color, mode, style }))?;
        }
        0x00BF => {
            ctx.mark_pending_let();
        }
        0x00C2 | 0x00F2 => {
            let flags = reader.read_u16()?;
            let end = if (flags & 0x8002) == 0x0002 { Some(ctx.pop_expr(offset)?) } else { None };
            let start = if (flags & 0x0002) == 0x0002 {
                let popped = ctx.pop_expr(offset)?;
                if (flags & 0x4000) == 0x4000 {
                    None
                } else {
                    Some(popped)
                }
            } else {
                None
            };
            let file = ctx.pop_expr(offset)?;
            ctx.put_statement(Statement::LockUnlock(LockStatement { is_lock: opcode == 0x00C2, file, start, end }))?;
        }
        0x00C3 => {
            ctx.put_statement(Statement::Print(PrintStatement::new(PrintKind::Lprint)))?;
        }
        0x00C4 | 0x00E6 => {
            let target = ctx.pop_expr(offset)?;
            let value = ctx.pop_expr(offset)?;
            let keyword = if opcode == 0x00C4 { AssignKeyword::LSet } else { AssignKeyword::RSet };
            ctx.put_assignment_statement(AssignmentStatement { keyword: Some(keyword), target, value })?;
        }
        0x00C8 => {
            let mut args = ctx.pop_exprs(2, offset)?;
            let new = args.pop().flatten().ok_or_else(|| QbError::structural(offset, "NAME missing new filename"))?;
            let old = args.pop().flatten().ok_or_else(|| QbError::structural(offset, "NAME missing old filename"))?;
            ctx.put_statement(Statement::Name(NameStatement { old, new }))?;
        }
        0x00D0 | 0x00D1 => {
            let at = required_argument(ctx, offset, "from")?;
            let args = ParseContext::replace_missing(ctx.pop_n(if opcode == 0x00D1 { 3 } else { 2 }, offset)?);
            let mut args = args.into_iter();
            let paint_color = args.next().flatten();
            let border_color = args.next().flatten();
            let background = args.next().flatten();
            ctx.put_statement(Statement::Paint(PaintStatement { at, paint_color, border_color, background }))?;
        }
        0x00D8 | 0x00D9 => {
            let at = required_argument(ctx, offset, "from")?;
            let color = if opcode == 0x00D9 { Some(ctx.pop_expr(offset)?) } else { None };
            ctx.put_statement(Statement::Pset(PsetStatement { at, color, is_preset: true }))?;
        }
        0x00DA | 0x00DB => {
            let at = required_argument(ctx, offset, "from")?;
            let color = if opcode == 0x00DB { Some(ctx.pop_expr(offset)?) } else { None };
            ctx.put_statement(Statement::Pset(PsetStatement { at, color, is_preset: false }))?;
        }
        0x00F3 | 0x00F7 => {
            let mut args = ctx.pop_exprs(6, offset)?.into_iter();
            let from_x = args.next().flatten().ok_or_else(|| QbError::structural(offset, "VIEW missing from.x"))?;
            let from_y = args.next().flatten().ok_or_else(|| QbError::structural(offset, "VIEW missing from.y"))?;
            let to_x = args.next().flatten().ok_or_else(|| QbError::structural(offset, "VIEW missing to.x"))?;
            let to_y = args.next().flatten().ok_or_else(|| QbError::structural(offset, "VIEW missing to.y"))?;
            let color = args.next().flatten();
            let border = args.next().flatten();
            ctx.put_statement(Statement::ViewWindow(ViewWindowStatement {
                coords: Some(((from_x, from_y), (to_x, to_y))),
                color,
                border,
                screen: opcode == 0x00F7,
                is_view: true,
            }))?;
        }
        0x00F5 => {
            ctx.put_statement(Statement::ViewPrint(ViewPrintStatement { range: None }))?;
        }
        0x00F6 => {
            let mut args = ctx.pop_exprs(2, offset)?;
            let bottom = args.pop().flatten().ok_or_else(|| QbError::structural(offset, "VIEW PRINT missing bottom"))?;
            let top = args.pop().flatten().ok_or_else(|| QbError::structural(offset, "VIEW PRINT missing top"))?;
            ctx.put_statement(Statement::ViewPrint(ViewPrintStatement { range: Some((top, bottom)) }))?;
        }
        0x00FB | 0x00FD => {
            let mut args = ctx.pop_exprs(4, offset)?.into_iter();
            let from_x = args.next().flatten().ok_or_else(|| QbError::structural(offset, "WINDOW missing from.x"))?;
            let from_y = args.next().flatten().ok_or_else(|| QbError::structural(offset, "WINDOW missing from.y"))?;
            let to_x = args.next().flatten().ok_or_else(|| QbError::structural(offset, "WINDOW missing to.x"))?;
            let to_y = args.next().flatten().ok_or_else(|| QbError::structural(offset, "WINDOW missing to.y"))?;
            ctx.put_statement(Statement::ViewWindow(ViewWindowStatement {
                coords: Some(((from_x, from_y), (to_x, to_y))),
                color: None,
                border: None,
                screen: opcode == 0x00FD,
                is_view: false,
            }))?;
        }

        0x008F => {
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.items.push(PrintItem::Spc(arg.clone())),
            );
        }
        0x0090 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.items.push(PrintItem::Tab(arg.clone())),
            );
        }
        0x0091 => {
            let arg = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.items.push(PrintItem::Expr(arg.clone())),
            );
        }
        0x0092 => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.items.push(PrintItem::Semicolon),
            );
        }
        0x0093 => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.items.push(PrintItem::Comma),
            );
        }
        0x0094 => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |_| {},
            );
        }
        0x0095 => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Lprint)),
                |_| {},
            );
        }
        0x0096 => {
            let file = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.file = Some(file.clone()),
            );
        }
        0x00FE => {
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Write)),
                |_| {},
            );
        }
        0x00FF => {
            let using = ctx.pop_expr(offset)?;
            ctx.with_statement_kind(
                |s| matches!(s, Statement::Print(_)),
                || Statement::Print(PrintStatement::new(PrintKind::Print)),
                |s| match s {
                    Statement::Print(p) => p,
                    _ => unreachable!(),
                },
                |print| print.using = Some(using.clone()),
            );
        }

        0x0097 => {
            let column = reader.read_u16()?;
            let raw = reader.read_string()?;
            let text = qb_syntax::expand_comment_runs(&raw);
            ctx.set_comment(Comment { text, column: Some(column as usize), metacommand: None });
        }

        0x0099 => {
            let name = readvar(reader, names)?;
            ctx.set_comment(Comment { text: Vec::new(), column: None, metacommand: Some(Metacommand::Include(name.display().into_bytes())) });
        }
        0x01C2 => {
            let name = readvar(reader, names)?;
            ctx.set_comment(Comment { text: Vec::new(), column: None, metacommand: Some(Metacommand::Form(name)) });
        }

        0x00A6 => {
            let raw = reader.read_string()?;
            ctx.put_statement(Statement::Data(raw))?;
        }
        0x00E3 => {
            let raw = reader.read_string()?;
            let text = qb_syntax::expand_comment_runs(&raw);
            ctx.put_statement(Statement::Rem(RemStatement { text, metacommand: None }))?;
        }

        0x00C9 | 0x00CA => {
            let reclen = if opcode == 0x00CA { Some(ctx.pop_expr(offset)?) } else { None };
            let file = ctx.pop_expr(offset)?;
            let filename = ctx.pop_expr(offset)?;
            let flags = parameter as u32 | ((reader.read_u16()? as u32) << 16);
            let mode = match flags & 0x3F {
                0x01 => Some(OpenMode::Input),
                0x02 => Some(OpenMode::Output),
                0x04 => Some(OpenMode::Random),
                0x08 => Some(OpenMode::Append),
                0x20 => Some(OpenMode::Binary),
                _ => None,
            };
            let access = match flags & 0x300 {
                0x100 => Some(OpenAccess::Read),
                0x200 => Some(OpenAccess::Write),
                0x300 => Some(OpenAccess::ReadWrite),
                _ => None,
            };
            let lock = match flags & 0x7000 {
                0x1000 => Some(OpenLock::ReadWrite),
                0x2000 => Some(OpenLock::Write),
                0x3000 => Some(OpenLock::Read),
                0x4000 => Some(OpenLock::Shared),
                _ => None,
            };
            ctx.put_statement(Statement::Open(OpenStatement { filename, mode, access, lock, file, reclen, isam: false }))?;
        }

        // VBDOS method calls.
        0x01C9..=0x01D1 => {
            let target = ctx.pop_expr(offset)?;
            let method = method_name(opcode - 0x01C9);
            if method == "PRINT" {
                ctx.with_statement_kind(
                    |s| matches!(s, Statement::Print(_)),
                    || Statement::Print(PrintStatement::new(PrintKind::Print)),
                    |s| match s {
                        Statement::Print(p) => p,
                        _ => unreachable!(),
                    },
                    |print| print.target = Some(target.clone()),
                );
            } else {
                ctx.push_expr(Expression::MethodCall { target: Box::new(target), method, args: Vec::new() });
            }
        }

        // Unary/binary expression operators and literals are mechanical
        // enough to live in the builtin table's neighborhood, but their
        // stack effect (not a name emission) keeps them hand-written.
        0x0100..=0x0108 | 0x015E..=0x0179 | 0x0185 => dispatch_expression_opcode(dialect, opcode, parameter, offset, reader, ctx)?,

        _ => {
            return dispatch_builtin(opcode, offset, reader, ctx);
        }
    }
    Ok(())
}

fn event_and_index(arg: Expression) -> QbResult<(EventKind, Option<Expression>)> {
    match arg {
        Expression::Event { kind, index } => Ok((kind, index.map(|b| *b))),
        _ => Err(QbError::structural(0, "expected an event specification on the stack")),
    }
}

const METHOD_NAMES: &[&str] = &[
    "PRINT", "MOVE", "SHOWCURSOR", "HIDECURSOR", "REFRESH", "SETFOCUS", "ADDITEM", "REMOVEITEM",
    "CLS",
];

fn method_name(index: u16) -> &'static str {
    METHOD_NAMES.get(index as usize).copied().unwrap_or("UNKNOWN")
}

fn dispatch_expression_opcode(
    dialect: Dialect,
    opcode: u16,
    parameter: u16,
    offset: u64,
    reader: &mut ByteReader<'_>,
    ctx: &mut ParseContext,
) -> QbResult<()> {
    if opcode == 0x0108 {
        let operand = ctx.pop_expr(offset)?;
        let target = dialect.resolve_type(parameter, || unreachable!());
        if matches!(target, Type::String) {
            return Err(QbError::structural(offset, "cannot convert to STRING via a C* conversion opcode"));
        }
        ctx.push_expr(Expression::Convert { target, operand: Box::new(operand) });
        return Ok(());
    }
    if (0x0100..=0x0107).contains(&opcode) {
        let op = match opcode {
            0x0100 => BinaryOp::Add,
            0x0101 => BinaryOp::Sub,
            0x0102 => BinaryOp::Mul,
            0x0103 => BinaryOp::Div,
            0x0104 => BinaryOp::IntDiv,
            0x0105 => BinaryOp::Mod,
            0x0106 => BinaryOp::Pow,
            _ => BinaryOp::Concat,
        };
        let right = ctx.pop_expr(offset)?;
        let left = ctx.pop_expr(offset)?;
        ctx.push_expr(Expression::Binary { op, left: Box::new(left), right: Box::new(right) });
        return Ok(());
    }
    match opcode {
        0x015E..=0x016B => {
            let op = match opcode {
                0x015E => BinaryOp::Eq,
                0x015F => BinaryOp::Ne,
                0x0160 => BinaryOp::Lt,
                0x0161 => BinaryOp::Le,
                0x0162 => BinaryOp::Gt,
                0x0163 => BinaryOp::Ge,
                0x0164 => BinaryOp::And,
                0x0165 => BinaryOp::Or,
                0x0166 => BinaryOp::Xor,
                0x0167 => BinaryOp::Eqv,
                0x0168 => BinaryOp::Imp,
                _ => BinaryOp::Add,
            };
            if opcode <= 0x0168 {
                let right = ctx.pop_expr(offset)?;
                let left = ctx.pop_expr(offset)?;
                ctx.push_expr(Expression::Binary { op, left: Box::new(left), right: Box::new(right) });
            } else {
                let operand = ctx.pop_expr(offset)?;
                let op = if opcode == 0x0169 { qb_syntax::UnaryOp::Neg } else { qb_syntax::UnaryOp::Not };
                ctx.push_expr(Expression::Unary { op, operand: Box::new(operand) });
            }
        }
        0x016E => {
            let inner = ctx.pop_expr(offset)?;
            ctx.push_expr(Expression::Parenthesized(Box::new(inner)));
        }
        0x0172 => ctx.push(StackValue::Elided),
        0x0173 => ctx.push(StackValue::Missing),

        // Literal pushes. The low bit of the parameter selects the `&`
        // long suffix (a 32-bit payload instead of 16-bit); the next two
        // bits select the radix the literal was written in, purely for
        // round-tripping `&O`/`&H` back out on printing.
        0x016C => {
            let is_long = (parameter & 0x1) != 0;
            let radix = match (parameter >> 1) & 0x3 {
                1 => Radix::Octal,
                2 => Radix::Hex,
                _ => Radix::Decimal,
            };
            let value = if is_long { reader.read_u32()? as i64 } else { reader.read_u16()? as i64 };
            ctx.push_expr(Expression::IntegerLiteral { value, radix, is_long });
        }
        0x016D => {
            let value = reader.read_f32()?;
            ctx.push_expr(Expression::SingleLiteral(value));
        }
        0x016F => {
            let value = reader.read_f64()?;
            ctx.push_expr(Expression::DoubleLiteral(value));
        }
        0x0170 => {
            let bytes = reader.read_string()?;
            ctx.push_expr(Expression::StringLiteral(bytes));
        }
        0x0185 => {
            let raw = reader.read_u32()? as i64 | ((reader.read_u16()? as i64) << 32);
            ctx.push_expr(Expression::CurrencyLiteral(raw));
        }
        _ => {
            reader.read_u16()?;
        }
    }
    Ok(())
}

/// Every opcode not hand-written above falls through here: look it up in
/// the builtin-call table and interpret it per the four dispatch
/// combinations in §4.4 (function / implicit-args function / assignment
/// form / statement).
fn dispatch_builtin(opcode: u16, offset: u64, reader: &mut ByteReader<'_>, ctx: &mut ParseContext) -> QbResult<()> {
    let spec = builtins::lookup(opcode).ok_or(QbError::InvalidOpcode { opcode, offset })?;

    let popargcount = match spec.args {
        ArgCount::Fixed(n) => n,
        ArgCount::NextWord => reader.read_u16()? as usize,
        ArgCount::Implicit => 0,
    } + if spec.flags.assignment { 1 } else { 0 };

    let popped = ctx.pop_n(popargcount, offset)?;

    let (mut args, missing_positions) = if spec.flags.double_arguments {
        ParseContext::clear_missing(popped)
    } else {
        (ParseContext::replace_missing(popped), Vec::new())
    };

    for &pos in spec.flags.missing_arguments {
        if pos <= args.len() {
            args.insert(pos, None);
        }
    }
    for pos in missing_positions {
        if pos <= args.len() {
            args.insert(pos, None);
        }
    }

    if spec.is_function {
        ctx.push_expr(Expression::BuiltinCall {
            name: spec.name.to_string(),
            implicit_args: matches!(spec.args, ArgCount::Implicit),
            args,
        });
    } else if spec.flags.assignment {
        let value = args.pop().ok_or_else(|| QbError::structural(offset, "assignment-form builtin missing its value"))?;
        let value = value.ok_or_else(|| QbError::structural(offset, "assignment-form builtin's value was elided"))?;
        let target = Expression::BuiltinCall { name: spec.name.to_string(), implicit_args: false, args };
        ctx.put_assignment_statement(AssignmentStatement { keyword: None, target, value })?;
    } else {
        ctx.put_statement(Statement::Builtin(qb_syntax::BuiltinStatement { name: spec.name, args }))?;
    }

    for _ in 0..spec.flags.skipped_words {
        reader.read_u16()?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qb_reader::NameTable;

    fn run(dialect: Dialect, bytes: &[u8], ctx: &mut ParseContext) -> QbResult<()> {
        let mut reader = ByteReader::new(bytes);
        let mut names = NameTable::new(dialect.header_size());
        let raw = reader.read_u16()?;
        let decoded = DecodedOpcode { opcode: raw & 0x3FF, parameter: raw >> 10 };
        dispatch_opcode(dialect, decoded, 0, &mut reader, &mut names, ctx)
    }

    #[test]
    fn begin_line_then_bare_statement_keyword() {
        let mut ctx = ParseContext::new();
        run(Dialect::Qb45, &[0x00, 0x00], &mut ctx).unwrap();
        run(Dialect::Qb45, &(0x009A << 0) .to_le_bytes(), &mut ctx).unwrap();
        match &ctx.file.main.lines[0].statements[0] {
            Statement::Builtin(b) => assert_eq!(b.name, "BEEP"),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn goto_statement_round_trips_target_identifier() {
        let mut ctx = ParseContext::new();
        run(Dialect::Qb45, &[0x00, 0x00], &mut ctx).unwrap();

        // opcode 0x005B (GOTO), target name-table offset 0x00, whose record
        // sits right after the header at 0x1C + 0x00 + 2.
        let header_size = Dialect::Qb45.header_size() as usize;
        let mut data = vec![0u8; header_size + 2 + 2 + 4];
        data[0..2].copy_from_slice(&0x005Bu16.to_le_bytes());
        data[2..4].copy_from_slice(&0x0000u16.to_le_bytes());
        data[header_size + 2] = 0x00;
        data[header_size + 3] = 4;
        data[header_size + 4..header_size + 8].copy_from_slice(b"LOOP");

        run(Dialect::Qb45, &data, &mut ctx).unwrap();
        match &ctx.file.main.lines[0].statements[0] {
            Statement::Goto(target) => assert_eq!(target.display(), "LOOP"),
            other => panic!("unexpected statement: {other:?}"),
        }
    }
}
