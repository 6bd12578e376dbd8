//! Turns a decoded [`crate::procedure::File`] back into BASIC source text
//! (§4.5). Formatting choices here mirror what the original QuickBASIC
//! editor itself would have produced: `AS`-column alignment inside
//! `DIM`/`TYPE` blocks, a comment column, and numeric-literal rendering
//! that strips the noise a naive `{:?}` would leave in (`0.5` not
//! `0.500000`, `1` not `1.0`).

use qb_core::{Identifier, IdentifierName, Type};

use crate::comment::Metacommand;
use crate::expr::{BinaryOp, Expression, Radix, UnaryOp};
use crate::forms::{AttributeValue, FormAttribute, FormControl};
use crate::line::Line;
use crate::procedure::{File, Procedure};
use crate::statement::*;

const INDENT_WIDTH: usize = 4;

pub fn print_file(file: &File) -> String {
    let mut out = String::new();
    if let Some(form) = &file.form {
        print_form(&mut out, form);
    }
    print_procedure(&mut out, &file.main);
    for proc in &file.procedures {
        out.push('\n');
        print_procedure(&mut out, proc);
    }
    out
}

fn print_procedure(out: &mut String, proc: &Procedure) {
    if let (Some(name), Some(kind)) = (&proc.name, proc.kind) {
        let keyword = match kind {
            ProcKind::Sub => "SUB",
            ProcKind::Function => "FUNCTION",
        };
        out.push_str(&format!("{} {}\n", keyword, name.display()));
    }
    for line in &proc.lines {
        print_line(out, line);
    }
    if let (Some(_), Some(kind)) = (&proc.name, proc.kind) {
        let keyword = match kind {
            ProcKind::Sub => "END SUB",
            ProcKind::Function => "END FUNCTION",
        };
        out.push_str(keyword);
        out.push('\n');
    }
}

/// Column of the cursor within the line currently being built, i.e. the
/// character count since the last `\n` (or the start of `out`).
fn current_column(out: &str) -> usize {
    match out.rfind('\n') {
        Some(i) => out[i + 1..].chars().count(),
        None => out.chars().count(),
    }
}

/// Pad `out` to `target` if it isn't there yet, otherwise fall back to a
/// single separating space (§4.5: pad to the recorded column, or one space
/// once the column is unknown or already passed).
fn pad_to_column_or_space(out: &mut String, target: Option<usize>) {
    let current = current_column(out);
    match target {
        Some(target) if target > current => out.push_str(&" ".repeat(target - current)),
        _ => out.push(' '),
    }
}

fn print_line(out: &mut String, line: &Line) {
    if let Some(label) = &line.label {
        out.push_str(&label.display());
        if !matches!(label.name, IdentifierName::Numeric(_)) {
            out.push(':');
        }
        out.push(' ');
    } else {
        out.push_str(&" ".repeat(line.indent * INDENT_WIDTH));
    }

    for (i, stmt) in line.statements.iter().enumerate() {
        if i > 0 {
            out.push(':');
            let column = line.separator_columns.get(i - 1).copied().flatten();
            pad_to_column_or_space(out, column);
        }
        print_statement(out, stmt);
    }

    if let Some(comment) = &line.comment {
        pad_to_column_or_space(out, comment.column);
        out.push('\'');
        out.push_str(&String::from_utf8_lossy(&comment.text));
        if let Some(metacommand) = &comment.metacommand {
            out.push_str(&render_metacommand(metacommand));
        }
    }
    out.push('\n');
}

fn render_metacommand(metacommand: &Metacommand) -> String {
    match metacommand {
        Metacommand::Static => "$STATIC".to_string(),
        Metacommand::Dynamic => "$DYNAMIC".to_string(),
        Metacommand::Include(text) => format!("$INCLUDE: '{}'", String::from_utf8_lossy(text)),
        Metacommand::Form(name) => format!("$FORM {}", name.display()),
    }
}

fn print_statement(out: &mut String, stmt: &Statement) {
    match stmt {
        Statement::Empty => {}
        Statement::Rem(r) => {
            out.push_str("REM ");
            out.push_str(&String::from_utf8_lossy(&r.text));
            if let Some(metacommand) = &r.metacommand {
                out.push_str(&render_metacommand(metacommand));
            }
        }
        Statement::Builtin(b) => {
            out.push_str(b.name);
            if !b.args.is_empty() {
                out.push(' ');
                out.push_str(&join_opt_args(&b.args));
            }
        }
        Statement::Method(m) => {
            print_expression(out, &m.target);
            out.push('.');
            out.push_str(m.method);
            if !m.args.is_empty() {
                out.push(' ');
                out.push_str(&join_args(&m.args));
            }
        }
        Statement::Call(c) => {
            if c.explicit {
                out.push_str(if c.is_calls { "CALLS " } else { "CALL " });
            }
            out.push_str(&c.name.display());
            if !c.args.is_empty() {
                out.push('(');
                let rendered: Vec<String> = c
                    .args
                    .iter()
                    .map(|a| match a {
                        Argument::ByVal(e) => format!("BYVAL {}", render_expression(e)),
                        Argument::ByRef(e) => render_expression(e),
                    })
                    .collect();
                out.push_str(&rendered.join(", "));
                out.push(')');
            }
        }
        Statement::Assignment(a) => {
            if let Some(kw) = a.keyword {
                out.push_str(match kw {
                    AssignKeyword::Let => "LET ",
                    AssignKeyword::LSet => "LSET ",
                    AssignKeyword::RSet => "RSET ",
                });
            }
            print_expression(out, &a.target);
            out.push_str(" = ");
            print_expression(out, &a.value);
        }

        Statement::Circle(c) => {
            out.push_str("CIRCLE ");
            print_expression(out, &c.center);
            out.push_str(", ");
            print_expression(out, &c.radius);
            if let Some(args) = trailing_optional_args(&[&c.color, &c.start, &c.end, &c.aspect]) {
                out.push_str(", ");
                out.push_str(&args);
            }
        }
        Statement::Line(l) => {
            out.push_str("LINE ");
            if let Some(from) = &l.from {
                print_expression(out, from);
            }
            out.push('-');
            print_expression(out, &l.to);
            if let Some(color) = &l.color {
                out.push_str(", ");
                print_expression(out, color);
            }
            match l.mode {
                LineMode::None => {}
                LineMode::Box => out.push_str(", , B"),
                LineMode::BoxFilled => out.push_str(", , BF"),
            }
            if let Some(style) = &l.style {
                out.push_str(", ");
                print_expression(out, style);
            }
        }
        Statement::Paint(p) => {
            out.push_str("PAINT ");
            print_expression(out, &p.at);
            if let Some(args) = trailing_optional_args(&[&p.paint_color, &p.border_color, &p.background]) {
                out.push_str(", ");
                out.push_str(&args);
            }
        }
        Statement::Pset(p) => {
            out.push_str(if p.is_preset { "PRESET " } else { "PSET " });
            print_expression(out, &p.at);
            if let Some(color) = &p.color {
                out.push_str(", ");
                print_expression(out, color);
            }
        }
        Statement::ViewWindow(v) => {
            let keyword = match (v.is_view, v.screen) {
                (true, true) => "VIEW SCREEN",
                (true, false) => "VIEW",
                (false, true) => "WINDOW SCREEN",
                (false, false) => "WINDOW",
            };
            out.push_str(keyword);
            if let Some(((fx, fy), (tx, ty))) = &v.coords {
                out.push_str(" (");
                print_expression(out, fx);
                out.push_str(", ");
                print_expression(out, fy);
                out.push_str(")-(");
                print_expression(out, tx);
                out.push_str(", ");
                print_expression(out, ty);
                out.push(')');
                if let Some(color) = &v.color {
                    out.push_str(", ");
                    print_expression(out, color);
                }
                if let Some(border) = &v.border {
                    out.push_str(", ");
                    print_expression(out, border);
                }
            }
        }
        Statement::ViewPrint(v) => {
            out.push_str("VIEW PRINT");
            if let Some((top, bottom)) = &v.range {
                out.push(' ');
                print_expression(out, top);
                out.push_str(" TO ");
                print_expression(out, bottom);
            }
        }
        Statement::GetPutGraphics(g) => {
            out.push_str(if g.is_put { "PUT " } else { "GET " });
            print_expression(out, &g.from);
            if let Some(to) = &g.to {
                out.push('-');
                print_expression(out, to);
            }
            out.push_str(", ");
            print_expression(out, &g.array);
            if let Some(method) = g.method {
                out.push_str(", ");
                out.push_str(match method {
                    PutMethod::Or => "OR",
                    PutMethod::And => "AND",
                    PutMethod::Preset => "PRESET",
                    PutMethod::Pset => "PSET",
                    PutMethod::Xor => "XOR",
                });
            }
        }

        Statement::Open(o) => {
            out.push_str("OPEN ");
            print_expression(out, &o.filename);
            if let Some(mode) = o.mode {
                out.push_str(" FOR ");
                out.push_str(match mode {
                    OpenMode::Input => "INPUT",
                    OpenMode::Output => "OUTPUT",
                    OpenMode::Random => "RANDOM",
                    OpenMode::Append => "APPEND",
                    OpenMode::Binary => "BINARY",
                });
            }
            if let Some(access) = o.access {
                out.push_str(" ACCESS ");
                out.push_str(match access {
                    OpenAccess::Read => "READ",
                    OpenAccess::Write => "WRITE",
                    OpenAccess::ReadWrite => "READ WRITE",
                });
            }
            if let Some(lock) = o.lock {
                out.push(' ');
                out.push_str(match lock {
                    OpenLock::ReadWrite => "LOCK READ WRITE",
                    OpenLock::Write => "LOCK WRITE",
                    OpenLock::Read => "LOCK READ",
                    OpenLock::Shared => "SHARED",
                });
            }
            out.push_str(" AS ");
            print_expression(out, &o.file);
            if let Some(reclen) = &o.reclen {
                out.push_str(" LEN = ");
                print_expression(out, reclen);
            }
        }
        Statement::Field(f) => {
            out.push_str("FIELD ");
            print_expression(out, &f.file);
            for (width, name) in &f.items {
                out.push_str(", ");
                print_expression(out, width);
                out.push_str(" AS ");
                out.push_str(&name.display());
            }
        }
        Statement::LockUnlock(l) => {
            out.push_str(if l.is_lock { "LOCK " } else { "UNLOCK " });
            print_expression(out, &l.file);
            if l.start.is_some() || l.end.is_some() {
                out.push_str(", ");
                if let Some(start) = &l.start {
                    print_expression(out, start);
                    if l.end.is_some() {
                        out.push(' ');
                    }
                }
                if let Some(end) = &l.end {
                    out.push_str("TO ");
                    print_expression(out, end);
                }
            }
        }
        Statement::Name(n) => {
            out.push_str("NAME ");
            print_expression(out, &n.old);
            out.push_str(" AS ");
            print_expression(out, &n.new);
        }

        Statement::Do(d) => {
            out.push_str("DO");
            print_loop_test(out, &d.test);
        }
        Statement::Loop(l) => {
            out.push_str("LOOP");
            print_loop_test(out, &l.test);
        }
        Statement::For(f) => {
            out.push_str("FOR ");
            print_expression(out, &f.var);
            out.push_str(" = ");
            print_expression(out, &f.start);
            out.push_str(" TO ");
            print_expression(out, &f.end);
            if let Some(step) = &f.step {
                out.push_str(" STEP ");
                print_expression(out, step);
            }
        }
        Statement::Next(n) => {
            out.push_str("NEXT");
            if !n.vars.is_empty() {
                out.push(' ');
                out.push_str(&join_args(&n.vars));
            }
        }
        Statement::LineIf(i) => {
            out.push_str("IF ");
            print_expression(out, &i.condition);
            out.push_str(" THEN ");
            print_then_branch(out, &i.then_branch);
            if let Some(else_clause) = &i.else_branch {
                out.push_str(" ELSE ");
                print_then_branch(out, &else_clause.action);
            }
        }
        Statement::BlockIf(b) => {
            out.push_str("IF ");
            print_expression(out, &b.condition);
            out.push_str(" THEN");
        }
        Statement::ElseIf(e) => {
            out.push_str("ELSEIF ");
            print_expression(out, &e.condition);
            out.push_str(" THEN");
        }
        Statement::Else => out.push_str("ELSE"),
        Statement::End(e) => out.push_str(end_keyword(e.kind)),
        Statement::Select(e) => {
            out.push_str("SELECT CASE ");
            print_expression(out, e);
        }
        Statement::Case(c) => {
            out.push_str("CASE ");
            if c.is_else {
                out.push_str("ELSE");
            } else {
                let rendered: Vec<String> = c.conditions.iter().map(render_case_condition).collect();
                out.push_str(&rendered.join(", "));
            }
        }
        Statement::Goto(target) => {
            out.push_str("GOTO ");
            out.push_str(&target.display());
        }
        Statement::Gosub(target) => {
            out.push_str("GOSUB ");
            out.push_str(&target.display());
        }
        Statement::Return(r) => {
            out.push_str("RETURN");
            if let Some(target) = &r.target {
                out.push(' ');
                out.push_str(&target.display());
            }
        }
        Statement::Resume(r) => {
            out.push_str("RESUME");
            match &r.target {
                ResumeTarget::Same => {}
                ResumeTarget::Next => out.push_str(" NEXT"),
                ResumeTarget::Label(id) => {
                    out.push(' ');
                    out.push_str(&id.display());
                }
            }
        }
        Statement::Restore(r) => {
            out.push_str("RESTORE");
            if let Some(target) = &r.target {
                out.push(' ');
                out.push_str(&target.display());
            }
        }
        Statement::Run(r) => {
            out.push_str("RUN");
            match &r.target {
                RunTarget::None => {}
                RunTarget::Label(id) => {
                    out.push(' ');
                    out.push_str(&id.display());
                }
                RunTarget::Program(e) => {
                    out.push(' ');
                    print_expression(out, e);
                }
            }
        }
        Statement::Exit(kind) => {
            out.push_str("EXIT ");
            out.push_str(match kind {
                ExitKind::Do => "DO",
                ExitKind::For => "FOR",
                ExitKind::Def => "DEF",
                ExitKind::Function => "FUNCTION",
                ExitKind::Sub => "SUB",
            });
        }
        Statement::OnError(e) => {
            out.push_str("ON ");
            if e.local {
                out.push_str("LOCAL ");
            }
            out.push_str("ERROR GOTO ");
            match &e.target {
                OnErrorTarget::Goto(id) => out.push_str(&id.display()),
                OnErrorTarget::ResumeNext => out.push_str("0"),
                OnErrorTarget::Zero => out.push('0'),
            }
        }
        Statement::OnEvent(e) => {
            out.push_str("ON ");
            out.push_str(e.event.keyword());
            if let Some(index) = &e.index {
                out.push('(');
                print_expression(out, index);
                out.push(')');
            }
            out.push_str(" GOSUB ");
            out.push_str(&e.target.display());
        }
        Statement::OnExpr(e) => {
            out.push_str("ON ");
            print_expression(out, &e.expr);
            out.push_str(if e.is_gosub { " GOSUB " } else { " GOTO " });
            let targets: Vec<String> = e.targets.iter().map(|t| t.display()).collect();
            out.push_str(&targets.join(", "));
        }
        Statement::EventState(e) => {
            if let Some(kind) = e.event {
                out.push_str(kind.keyword());
                if let Some(index) = &e.index {
                    out.push('(');
                    print_expression(out, index);
                    out.push(')');
                }
            } else {
                out.push_str("EVENT");
            }
            out.push(' ');
            out.push_str(match e.state {
                EventState::On => "ON",
                EventState::Off => "OFF",
                EventState::Stop => "STOP",
                EventState::List => "LIST",
            });
        }

        Statement::Const(c) => {
            out.push_str("CONST ");
            let rendered: Vec<String> = c
                .assignments
                .iter()
                .map(|s| {
                    let mut piece = String::new();
                    print_statement(&mut piece, s);
                    piece
                })
                .collect();
            out.push_str(&rendered.join(", "));
        }
        Statement::Data(bytes) => {
            out.push_str("DATA ");
            out.push_str(&String::from_utf8_lossy(bytes));
        }
        Statement::Declare(d) => {
            out.push_str("DECLARE ");
            if d.is_cdecl {
                out.push_str("CDECL ");
            }
            out.push_str(match d.kind {
                ProcKind::Sub => "SUB ",
                ProcKind::Function => "FUNCTION ",
            });
            out.push_str(&d.name.display());
            print_param_list(out, &d.params);
            if let Some(alias) = &d.alias {
                out.push_str(" ALIAS \"");
                out.push_str(&String::from_utf8_lossy(alias));
                out.push('"');
            }
        }
        Statement::DefFn(f) => {
            out.push_str("DEF FN");
            out.push_str(&f.name.display());
            if !f.params.is_empty() {
                out.push('(');
                let names: Vec<String> = f.params.iter().map(|p| p.display()).collect();
                out.push_str(&names.join(", "));
                out.push(')');
            }
            if let Some(def) = &f.definition {
                out.push_str(" = ");
                print_expression(out, def);
            }
        }
        Statement::DefType(d) => {
            out.push_str(d.keyword.keyword());
            out.push(' ');
            let ranges: Vec<String> = d
                .ranges
                .iter()
                .map(|(lo, hi)| {
                    if lo == hi {
                        lo.to_string()
                    } else {
                        format!("{}-{}", lo, hi)
                    }
                })
                .collect();
            out.push_str(&ranges.join(", "));
        }
        Statement::TypeDecl(t) => {
            out.push_str("TYPE");
            if let Some(name) = &t.name {
                out.push(' ');
                out.push_str(&name.display());
            }
        }
        Statement::VarDecl(v) => print_var_decl(out, v),
        Statement::ProcedureHeader(p) => {
            if p.is_static {
                out.push_str("STATIC ");
            }
            out.push_str(match p.kind {
                ProcKind::Sub => "SUB ",
                ProcKind::Function => "FUNCTION ",
            });
            out.push_str(&p.name.display());
            print_param_list(out, &p.params);
            if let Some(ty) = &p.return_type {
                out.push_str(" AS ");
                out.push_str(&ty.render());
            }
        }

        Statement::Print(p) => print_print(out, p),
        Statement::Input(i) => {
            out.push_str(if i.line_input { "LINE INPUT" } else { "INPUT" });
            if let Some(file) = &i.file {
                out.push_str(" #");
                print_expression(out, file);
                out.push(',');
            }
            out.push(' ');
            if let Some(prompt) = &i.prompt {
                out.push('"');
                out.push_str(&String::from_utf8_lossy(prompt));
                out.push('"');
                out.push_str(if i.suppress_question { ";" } else { ", " });
            } else if i.leading_semicolon {
                out.push_str("; ");
            }
            let vars: Vec<String> = i.vars.iter().map(render_expression).collect();
            out.push_str(&vars.join(", "));
        }
        Statement::Erase(e) => {
            out.push_str("ERASE ");
            let names: Vec<String> = e.vars.iter().map(|v| v.display()).collect();
            out.push_str(&names.join(", "));
        }
        Statement::Read(r) => {
            out.push_str("READ ");
            out.push_str(&join_args(&r.vars));
        }

        Statement::ErrorInLine(e) => {
            out.push_str(&String::from_utf8_lossy(&e.text));
            if let Some(rest) = &e.rest_of_line {
                out.push(' ');
                print_statement(out, rest);
            }
        }
    }
}

/// Renders a single-line `IF`/`ELSE` branch, omitting the `GOTO` keyword
/// when the branch is nothing but a jump to a label (§4.5 "implicit-GOTO
/// omission in THEN/ELSE").
fn print_then_branch(out: &mut String, stmt: &Statement) {
    if let Statement::Goto(target) = stmt {
        out.push_str(&target.display());
    } else {
        print_statement(out, stmt);
    }
}

fn print_loop_test(out: &mut String, test: &LoopTest) {
    match test {
        LoopTest::None => {}
        LoopTest::Until(e) => {
            out.push_str(" UNTIL ");
            print_expression(out, e);
        }
        LoopTest::While(e) => {
            out.push_str(" WHILE ");
            print_expression(out, e);
        }
    }
}

fn end_keyword(kind: EndKind) -> &'static str {
    match kind {
        EndKind::Def => "END DEF",
        EndKind::Sub => "END SUB",
        EndKind::Function => "END FUNCTION",
        EndKind::Select => "END SELECT",
        EndKind::If => "END IF",
        EndKind::Type => "END TYPE",
    }
}

fn render_case_condition(cond: &CaseCondition) -> String {
    match cond {
        CaseCondition::Value(e) => render_expression(e),
        CaseCondition::Range(lo, hi) => format!("{} TO {}", render_expression(lo), render_expression(hi)),
        CaseCondition::Is(op, e) => format!("IS {} {}", op.symbol(), render_expression(e)),
    }
}

fn print_param_list(out: &mut String, params: &[VariableDeclaration]) {
    out.push('(');
    let rendered: Vec<String> = params.iter().map(render_declaration).collect();
    out.push_str(&rendered.join(", "));
    out.push(')');
}

fn print_var_decl(out: &mut String, v: &VariableDeclarationStatement) {
    if let Some(kind) = v.kind {
        out.push_str(match kind {
            DeclKind::Common => "COMMON",
            DeclKind::Dim => "DIM",
            DeclKind::Redim => "REDIM",
            DeclKind::Static => "STATIC",
            DeclKind::Shared => "SHARED",
        });
        if let Some(mode) = v.mode {
            out.push_str(match mode {
                DeclMode::Shared => " SHARED",
                DeclMode::Preserve => " PRESERVE",
            });
        }
        if let Some(block) = &v.common_block {
            out.push_str(" /");
            out.push_str(&block.display());
            out.push('/');
        }
        out.push(' ');
    }
    let rendered: Vec<String> = v.declarations.iter().map(render_declaration).collect();
    out.push_str(&rendered.join(", "));
}

fn render_declaration(decl: &VariableDeclaration) -> String {
    let mut piece = String::new();
    if let Some(name) = &decl.name {
        piece.push_str(&name.display());
    }
    if let Some(dims) = &decl.dims {
        piece.push('(');
        let rendered: Vec<String> = dims
            .iter()
            .map(|(lo, hi)| match lo {
                Some(lo) => format!("{} TO {}", render_expression(lo), render_expression(hi)),
                None => render_expression(hi),
            })
            .collect();
        piece.push_str(&rendered.join(", "));
        piece.push(')');
    }
    if let Some(ty) = &decl.var_type {
        if let Some(column) = decl.as_column {
            while piece.len() < column {
                piece.push(' ');
            }
        } else {
            piece.push(' ');
        }
        piece.push_str("AS ");
        piece.push_str(&ty.render());
    }
    piece
}

fn print_print(out: &mut String, p: &PrintStatement) {
    if let Some(target) = &p.target {
        print_expression(out, target);
        out.push('.');
    }
    out.push_str(match p.kind {
        PrintKind::Print => "PRINT",
        PrintKind::Lprint => "LPRINT",
        PrintKind::Write => "WRITE",
    });
    if let Some(file) = &p.file {
        out.push_str(" #");
        print_expression(out, file);
        out.push(',');
    }
    if !p.items.is_empty() || p.using.is_some() {
        out.push(' ');
    }
    if let Some(using) = &p.using {
        out.push_str("USING ");
        print_expression(out, using);
        out.push_str("; ");
    }
    let separator = if matches!(p.kind, PrintKind::Write) { ", " } else { ";" };
    let mut needs_leading_space = false;
    for item in &p.items {
        match item {
            PrintItem::Expr(e) => {
                if needs_leading_space {
                    out.push(' ');
                }
                print_expression(out, e);
                needs_leading_space = false;
            }
            PrintItem::Tab(e) => {
                out.push_str("TAB(");
                print_expression(out, e);
                out.push(')');
            }
            PrintItem::Spc(e) => {
                out.push_str("SPC(");
                print_expression(out, e);
                out.push(')');
            }
            PrintItem::Semicolon => {
                out.push_str(separator);
                needs_leading_space = true;
            }
            PrintItem::Comma => {
                out.push_str(if matches!(p.kind, PrintKind::Write) { ", " } else { "," });
            }
        }
    }
}

fn join_args(args: &[Expression]) -> String {
    let rendered: Vec<String> = args.iter().map(render_expression).collect();
    rendered.join(", ")
}

fn join_opt_args(args: &[Option<Expression>]) -> String {
    let rendered: Vec<String> = args
        .iter()
        .map(|a| a.as_ref().map(render_expression).unwrap_or_default())
        .collect();
    rendered.join(", ")
}

/// Render a statement's trailing run of optional arguments (CIRCLE's
/// color/start/end/aspect, PAINT's paint/border/background): drop any
/// `None`s at the end entirely rather than leaving dangling commas, but
/// keep interior `None`s as blank comma placeholders. Returns `None` if
/// nothing is left to print.
fn trailing_optional_args(args: &[&Option<Expression>]) -> Option<String> {
    let last_present = args.iter().rposition(|a| a.is_some())?;
    let rendered: Vec<String> = args[..=last_present]
        .iter()
        .map(|a| a.as_ref().map(render_expression).unwrap_or_default())
        .collect();
    Some(rendered.join(", "))
}

fn render_expression(expr: &Expression) -> String {
    let mut out = String::new();
    print_expression(&mut out, expr);
    out
}

fn print_expression(out: &mut String, expr: &Expression) {
    match expr {
        Expression::Identifier(id) => out.push_str(&id.display()),
        Expression::ArrayElement { name, args } => {
            out.push_str(&name.display());
            if let Some(args) = args {
                out.push('(');
                out.push_str(&join_opt_args(args));
                out.push(')');
            }
        }
        Expression::Field { base, field } => {
            print_expression(out, base);
            out.push('.');
            print_expression(out, field);
        }
        Expression::IntegerLiteral { value, radix, is_long } => {
            match radix {
                Radix::Decimal => out.push_str(&value.to_string()),
                Radix::Octal => out.push_str(&format!("&O{:o}", value)),
                Radix::Hex => out.push_str(&format!("&H{:X}", value)),
            }
            if *is_long && matches!(radix, Radix::Decimal) {
                out.push('&');
            }
        }
        Expression::SingleLiteral(v) => out.push_str(&format_single(*v)),
        Expression::DoubleLiteral(v) => out.push_str(&format_double(*v)),
        Expression::CurrencyLiteral(v) => out.push_str(&format_currency(*v)),
        Expression::StringLiteral(bytes) => {
            out.push('"');
            out.push_str(&String::from_utf8_lossy(bytes));
            out.push('"');
        }
        Expression::Parenthesized(inner) => {
            out.push('(');
            print_expression(out, inner);
            out.push(')');
        }
        Expression::Unary { op, operand } => {
            out.push_str(match op {
                UnaryOp::Neg => "-",
                UnaryOp::Not => "NOT ",
            });
            print_expression(out, operand);
        }
        Expression::Binary { op, left, right } => {
            print_expression(out, left);
            out.push(' ');
            out.push_str(op.symbol());
            out.push(' ');
            print_expression(out, right);
        }
        Expression::ByVal(inner) => {
            out.push_str("BYVAL ");
            print_expression(out, inner);
        }
        Expression::Seg(inner) => {
            out.push_str("SEG ");
            print_expression(out, inner);
        }
        Expression::FileNumber(inner) => {
            out.push('#');
            print_expression(out, inner);
        }
        Expression::Event { kind, index } => {
            out.push_str(kind.keyword());
            if let Some(index) = index {
                out.push('(');
                print_expression(out, index);
                out.push(')');
            }
        }
        Expression::Coord { x, y, step } => {
            if *step {
                out.push_str("STEP ");
            }
            out.push('(');
            print_expression(out, x);
            out.push_str(", ");
            print_expression(out, y);
            out.push(')');
        }
        Expression::BuiltinCall { name, args, implicit_args } => {
            out.push_str(name);
            if !*implicit_args {
                out.push('(');
                out.push_str(&join_opt_args(args));
                out.push(')');
            }
        }
        Expression::Convert { target, operand } => {
            let short = target.conversion_short_name().unwrap_or("VAR");
            out.push('C');
            out.push_str(short);
            out.push('(');
            print_expression(out, operand);
            out.push(')');
        }
        Expression::TypeOfIs { operand, type_name } => {
            out.push_str("TYPEOF ");
            print_expression(out, operand);
            out.push_str(" IS ");
            out.push_str(&type_name.display());
        }
        Expression::MethodCall { target, method, args } => {
            print_expression(out, target);
            out.push('.');
            out.push_str(method);
            if !args.is_empty() {
                out.push('(');
                out.push_str(&join_args(args));
                out.push(')');
            }
        }
        Expression::ExternalObject(inner) => print_expression(out, inner),
    }
}

fn format_float_core(s: String) -> String {
    let mut s = s;
    if let Some(stripped) = s.strip_suffix(".0") {
        s = stripped.to_string();
    }
    if let Some(rest) = s.strip_prefix("0.") {
        s = format!(".{rest}");
    } else if let Some(rest) = s.strip_prefix("-0.") {
        s = format!("-.{rest}");
    }
    s
}

fn format_single(v: f32) -> String {
    format_float_core(format!("{v}"))
}

fn format_double(v: f64) -> String {
    let raw = format!("{v}").replace(['e', 'E'], "D");
    let core = format_float_core(raw);
    if core.contains('D') {
        core
    } else {
        format!("{core}#")
    }
}

fn format_currency(v: i64) -> String {
    let negative = v < 0;
    let magnitude = v.unsigned_abs();
    let whole = magnitude / 10_000;
    let frac = magnitude % 10_000;
    let mut rendered = if frac == 0 {
        whole.to_string()
    } else {
        let frac_str = format!("{frac:04}");
        let frac_str = frac_str.trim_end_matches('0');
        format!("{whole}.{frac_str}")
    };
    if negative {
        rendered = format!("-{rendered}");
    }
    rendered
}

fn print_form(out: &mut String, form: &FormControl) {
    out.push_str("Version 1.00\n");
    print_form_block(out, form, 0);
}

fn print_form_block(out: &mut String, control: &FormControl, depth: usize) {
    let indent = "\t".repeat(depth);
    out.push_str(&indent);
    out.push_str("BEGIN ");
    out.push_str(control.control_type);
    if let Some(name) = &control.name {
        out.push(' ');
        out.push_str(&String::from_utf8_lossy(name));
    }
    out.push('\n');

    let mut attrs: Vec<&FormAttribute> = control
        .attributes
        .iter()
        .filter(|attr| attr.present && attr.name.chars().next().is_some_and(|c| c.is_alphabetic()))
        .collect();
    attrs.sort_by_key(|attr| attr.name);
    for attr in attrs {
        out.push_str(&indent);
        out.push('\t');
        out.push_str(attr.name);
        out.push_str(" = ");
        out.push_str(&render_attribute_value(&attr.value));
        out.push('\n');
    }
    for member in &control.members {
        print_form_block(out, member, depth + 1);
    }

    out.push_str(&indent);
    out.push_str("END\n");
}

fn render_attribute_value(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Bool(v) => if *v { "-1" } else { "0" }.to_string(),
        AttributeValue::Str(bytes) => format!("\"{}\"", String::from_utf8_lossy(bytes)),
        AttributeValue::Float(v) => format_float_core(format!("{v}")),
        AttributeValue::Char(v) => format!("Char({v})"),
        AttributeValue::QbColor(v) => format!("QBColor({v})"),
        AttributeValue::Shortcut(s) => s.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comment::Comment;

    #[test]
    fn single_literal_drops_trailing_zero() {
        assert_eq!(format_single(1.0), "1");
        assert_eq!(format_single(0.5), ".5");
    }

    #[test]
    fn double_literal_gets_hash_suffix_without_exponent() {
        assert_eq!(format_double(1.5), "1.5#");
    }

    #[test]
    fn currency_literal_is_scaled_down() {
        assert_eq!(format_currency(123_4500), "123.45");
        assert_eq!(format_currency(-50_000), "-5");
    }

    #[test]
    fn then_branch_goto_omits_keyword() {
        let mut out = String::new();
        print_then_branch(&mut out, &Statement::Goto(Identifier::numeric(100, 0)));
        assert_eq!(out, "100");
    }

    fn int_lit(value: i64) -> Expression {
        Expression::IntegerLiteral { value, radix: Radix::Decimal, is_long: false }
    }

    #[test]
    fn ordinary_numeric_line_label_has_no_colon() {
        let mut out = String::new();
        let mut line = Line::new();
        line.label = Some(Identifier::numeric(10, 0));
        line.statements.push(Statement::Goto(Identifier::numeric(20, 0)));
        print_line(&mut out, &line);
        assert_eq!(out, "10 GOTO 20\n");
    }

    #[test]
    fn text_line_label_keeps_its_colon() {
        let mut out = String::new();
        let mut line = Line::new();
        line.label = Some(Identifier::text(*b"START", 0));
        line.statements.push(Statement::Goto(Identifier::numeric(20, 0)));
        print_line(&mut out, &line);
        assert_eq!(out, "START: GOTO 20\n");
    }

    #[test]
    fn open_lock_keywords_are_not_swapped() {
        let mut out = String::new();
        let stmt = Statement::Open(OpenStatement {
            filename: Expression::StringLiteral(b"f".to_vec()),
            mode: Some(OpenMode::Binary),
            access: Some(OpenAccess::ReadWrite),
            lock: Some(OpenLock::Shared),
            file: int_lit(1),
            reclen: Some(int_lit(128)),
            isam: false,
        });
        print_statement(&mut out, &stmt);
        assert_eq!(out, "OPEN \"f\" FOR BINARY ACCESS READ WRITE SHARED AS 1 LEN = 128");
    }

    #[test]
    fn open_lock_read_write_keyword_prints_lock_read_write() {
        let mut out = String::new();
        let stmt = Statement::Open(OpenStatement {
            filename: Expression::StringLiteral(b"f".to_vec()),
            mode: None,
            access: None,
            lock: Some(OpenLock::ReadWrite),
            file: int_lit(1),
            reclen: None,
            isam: false,
        });
        print_statement(&mut out, &stmt);
        assert!(out.contains(" LOCK READ WRITE AS "));
    }

    #[test]
    fn circle_with_no_optional_args_has_no_trailing_commas() {
        let mut out = String::new();
        let stmt = Statement::Circle(CircleStatement {
            center: int_lit(1),
            radius: int_lit(5),
            color: None,
            start: None,
            end: None,
            aspect: None,
        });
        print_statement(&mut out, &stmt);
        assert_eq!(out, "CIRCLE 1, 5");
    }

    #[test]
    fn circle_with_interior_gap_keeps_blank_placeholder() {
        let mut out = String::new();
        let stmt = Statement::Circle(CircleStatement {
            center: int_lit(1),
            radius: int_lit(5),
            color: None,
            start: Some(int_lit(2)),
            end: None,
            aspect: None,
        });
        print_statement(&mut out, &stmt);
        assert_eq!(out, "CIRCLE 1, 5, , 2");
    }

    #[test]
    fn paint_with_no_optional_args_has_no_trailing_commas() {
        let mut out = String::new();
        let stmt = Statement::Paint(PaintStatement {
            at: int_lit(1),
            paint_color: None,
            border_color: None,
            background: None,
        });
        print_statement(&mut out, &stmt);
        assert_eq!(out, "PAINT 1");
    }

    #[test]
    fn trailing_comment_pads_to_its_recorded_column() {
        let mut out = String::new();
        let mut line = Line::new();
        line.statements.push(Statement::Empty);
        line.comment = Some(Comment { text: b"hi".to_vec(), column: Some(10), metacommand: None });
        print_line(&mut out, &line);
        assert_eq!(out, "          'hi\n");
    }

    #[test]
    fn trailing_comment_falls_back_to_one_space_without_a_column() {
        let mut out = String::new();
        let mut line = Line::new();
        line.statements.push(Statement::Goto(Identifier::numeric(10, 0)));
        line.comment = Some(Comment { text: Vec::new(), column: None, metacommand: Some(Metacommand::Static) });
        print_line(&mut out, &line);
        assert_eq!(out, "GOTO 10 '$STATIC\n");
    }

    #[test]
    fn include_metacommand_renders_with_colon_and_quotes() {
        assert_eq!(render_metacommand(&Metacommand::Include(b"FOO.BAS".to_vec())), "$INCLUDE: 'FOO.BAS'");
    }

    #[test]
    fn statement_separator_pads_to_its_recorded_column() {
        let mut out = String::new();
        let mut line = Line::new();
        line.statements.push(Statement::Goto(Identifier::numeric(1, 0)));
        line.statements.push(Statement::Goto(Identifier::numeric(2, 0)));
        line.separator_columns.push(Some(20));
        print_line(&mut out, &line);
        assert_eq!(out, "GOTO 1:             GOTO 2\n");
    }

    #[test]
    fn statement_separator_falls_back_to_one_space_without_a_column() {
        let mut out = String::new();
        let mut line = Line::new();
        line.statements.push(Statement::Goto(Identifier::numeric(1, 0)));
        line.statements.push(Statement::Goto(Identifier::numeric(2, 0)));
        line.separator_columns.push(None);
        print_line(&mut out, &line);
        assert_eq!(out, "GOTO 1: GOTO 2\n");
    }
}
