use qb_core::{Identifier, Type};
use serde::{Deserialize, Serialize};

use crate::expr::{BinaryOp, EventKind, Expression};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignKeyword {
    Let,
    LSet,
    RSet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Argument {
    ByVal(Expression),
    ByRef(Expression),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclKind {
    Common,
    Dim,
    Redim,
    Static,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeclMode {
    Shared,
    Preserve,
}

/// A single `name [(dims)] [AS type]` declarator. Created nameless by
/// `put_declaration` (§4.3) and filled in by the opcode that follows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclaration {
    pub name: Option<Identifier>,
    pub var_type: Option<Type>,
    pub dims: Option<Vec<(Option<Expression>, Expression)>>,
    /// Target print column for the `AS` keyword, so declarators in the same
    /// `DIM`/`TYPE` block line up (§4.5).
    pub as_column: Option<usize>,
}

impl VariableDeclaration {
    pub fn nameless() -> Self {
        VariableDeclaration {
            name: None,
            var_type: None,
            dims: None,
            as_column: None,
        }
    }
}

/// `DIM`/`REDIM`/`STATIC`/`SHARED`/`COMMON`, an accreting container (§3
/// "Variable declaration statement").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableDeclarationStatement {
    pub kind: Option<DeclKind>,
    pub mode: Option<DeclMode>,
    pub common_block: Option<Identifier>,
    pub declarations: Vec<VariableDeclaration>,
}

impl VariableDeclarationStatement {
    pub fn new() -> Self {
        VariableDeclarationStatement {
            kind: None,
            mode: None,
            common_block: None,
            declarations: Vec::new(),
        }
    }
}

impl Default for VariableDeclarationStatement {
    fn default() -> Self {
        Self::new()
    }
}

/// A field declaration inside an open `TYPE ... END TYPE` block. Reuses the
/// same nameless-then-filled-in declarator shape as `DIM`.
pub type TypeFieldDeclaration = VariableDeclaration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcKind {
    Sub,
    Function,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcedureHeaderStatement {
    pub kind: ProcKind,
    pub name: Identifier,
    pub params: Vec<VariableDeclaration>,
    pub return_type: Option<Type>,
    pub is_static: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndKind {
    Def,
    Sub,
    Function,
    Select,
    If,
    Type,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndDeclaration {
    pub kind: EndKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclareStatement {
    pub is_cdecl: bool,
    pub kind: ProcKind,
    pub name: Identifier,
    pub params: Vec<VariableDeclaration>,
    pub alias: Option<Vec<u8>>,
}

/// `DEF FN name(params) = expr` (single-line) or `DEF FN name(params)` ...
/// `END DEF` (block form, `definition` filled in later or left `None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefFnStatement {
    pub name: Identifier,
    pub params: Vec<Identifier>,
    pub definition: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefTypeKeyword {
    Int,
    Lng,
    Sng,
    Dbl,
    Cur,
    Str,
}

impl DefTypeKeyword {
    pub fn keyword(&self) -> &'static str {
        match self {
            DefTypeKeyword::Int => "DEFINT",
            DefTypeKeyword::Lng => "DEFLNG",
            DefTypeKeyword::Sng => "DEFSNG",
            DefTypeKeyword::Dbl => "DEFDBL",
            DefTypeKeyword::Cur => "DEFCUR",
            DefTypeKeyword::Str => "DEFSTR",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefTypeStatement {
    pub keyword: DefTypeKeyword,
    /// Inclusive letter ranges, e.g. `[('A', 'Z')]` or `[('A','A'),
    /// ('C','D')]`.
    pub ranges: Vec<(char, char)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDeclStatement {
    pub name: Option<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDeclaration {
    /// Each entry is an `Assignment` statement; accreted one per `=` in the
    /// source `CONST a = 1, b = 2`.
    pub assignments: Vec<Statement>,
}

impl ConstDeclaration {
    pub fn new() -> Self {
        ConstDeclaration {
            assignments: Vec::new(),
        }
    }
}

impl Default for ConstDeclaration {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoCondition {
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LoopTest {
    None,
    Until(Expression),
    While(Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoStatement {
    pub test: LoopTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopStatement {
    pub test: LoopTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForStatement {
    pub var: Expression,
    pub start: Expression,
    pub end: Expression,
    pub step: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextStatement {
    pub vars: Vec<Expression>,
}

impl NextStatement {
    pub fn new() -> Self {
        NextStatement { vars: Vec::new() }
    }
}

impl Default for NextStatement {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitKind {
    Do,
    For,
    Def,
    Function,
    Sub,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OnErrorTarget {
    Goto(Identifier),
    ResumeNext,
    Zero,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnErrorStatement {
    pub local: bool,
    pub target: OnErrorTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventState {
    On,
    Off,
    Stop,
    /// `KEY LIST`; no other event source uses this state.
    List,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventStateStatement {
    /// `None` is the unnamed `EVENT` on/off/stop available on QB70+.
    pub event: Option<EventKind>,
    pub index: Option<Expression>,
    pub state: EventState,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnEventStatement {
    pub event: EventKind,
    pub index: Option<Expression>,
    pub target: Identifier,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnExprStatement {
    pub is_gosub: bool,
    pub expr: Expression,
    pub targets: Vec<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestoreStatement {
    pub target: Option<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResumeTarget {
    Same,
    Next,
    Label(Identifier),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeStatement {
    pub target: ResumeTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnStatement {
    pub target: Option<Identifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RunTarget {
    None,
    Label(Identifier),
    Program(Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatement {
    pub target: RunTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenMode {
    Input,
    Output,
    Random,
    Append,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenAccess {
    Read,
    Write,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpenLock {
    ReadWrite,
    Write,
    Read,
    Shared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenStatement {
    pub filename: Expression,
    pub mode: Option<OpenMode>,
    pub access: Option<OpenAccess>,
    pub lock: Option<OpenLock>,
    pub file: Expression,
    pub reclen: Option<Expression>,
    pub isam: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldStatement {
    pub file: Expression,
    pub items: Vec<(Expression, Identifier)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockStatement {
    pub is_lock: bool,
    pub file: Expression,
    pub start: Option<Expression>,
    pub end: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameStatement {
    pub old: Expression,
    pub new: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircleStatement {
    pub center: Expression,
    pub radius: Expression,
    pub color: Option<Expression>,
    pub start: Option<Expression>,
    pub end: Option<Expression>,
    pub aspect: Option<Expression>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineMode {
    None,
    Box,
    BoxFilled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineStatement {
    pub from: Option<Expression>,
    pub to: Expression,
    pub color: Option<Expression>,
    pub mode: LineMode,
    pub style: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaintStatement {
    pub at: Expression,
    pub paint_color: Option<Expression>,
    pub border_color: Option<Expression>,
    pub background: Option<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PsetStatement {
    pub at: Expression,
    pub color: Option<Expression>,
    /// `true` for `PRESET` (default color is background), `false` for `PSET`.
    pub is_preset: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewWindowStatement {
    /// `None` means the bare `VIEW`/`WINDOW` form (restores the default).
    /// Each corner is an `(x, y)` pair, not a single value.
    pub coords: Option<((Expression, Expression), (Expression, Expression))>,
    pub color: Option<Expression>,
    pub border: Option<Expression>,
    pub screen: bool,
    pub is_view: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPrintStatement {
    /// `None` for the bare `VIEW PRINT` form that restores the full screen.
    pub range: Option<(Expression, Expression)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PutMethod {
    Or,
    And,
    Preset,
    Pset,
    Xor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetPutGraphicsStatement {
    pub is_put: bool,
    pub from: Expression,
    pub to: Option<Expression>,
    pub array: Expression,
    pub method: Option<PutMethod>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrintKind {
    Print,
    Lprint,
    Write,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PrintItem {
    Expr(Expression),
    Tab(Expression),
    Spc(Expression),
    Semicolon,
    Comma,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintStatement {
    pub kind: PrintKind,
    pub file: Option<Expression>,
    /// VBDOS `object.Print ...` qualifies the statement with a target.
    pub target: Option<Expression>,
    pub items: Vec<PrintItem>,
    pub using: Option<Expression>,
}

impl PrintStatement {
    pub fn new(kind: PrintKind) -> Self {
        PrintStatement {
            kind,
            file: None,
            target: None,
            items: Vec::new(),
            using: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputStatement {
    pub file: Option<Expression>,
    pub line_input: bool,
    pub prompt: Option<Vec<u8>>,
    /// `?` suppressed after the prompt (a trailing `;` on the prompt).
    pub suppress_question: bool,
    pub leading_semicolon: bool,
    pub vars: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadStatement {
    pub vars: Vec<Expression>,
}

impl ReadStatement {
    pub fn new() -> Self {
        ReadStatement { vars: Vec::new() }
    }
}

impl Default for ReadStatement {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EraseStatement {
    pub vars: Vec<Identifier>,
}

impl EraseStatement {
    pub fn new() -> Self {
        EraseStatement { vars: Vec::new() }
    }
}

impl Default for EraseStatement {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemStatement {
    pub text: Vec<u8>,
    pub metacommand: Option<crate::comment::Metacommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallStatement {
    pub name: Identifier,
    pub args: Vec<Argument>,
    /// `true` for `CALLS` (far call convention), `false` for `CALL`/implicit.
    pub is_calls: bool,
    pub explicit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentStatement {
    pub keyword: Option<AssignKeyword>,
    pub target: Expression,
    pub value: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CaseCondition {
    Value(Expression),
    Range(Expression, Expression),
    Is(BinaryOp, Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseStatement {
    pub is_else: bool,
    pub conditions: Vec<CaseCondition>,
}

impl CaseStatement {
    pub fn new() -> Self {
        CaseStatement {
            is_else: false,
            conditions: Vec::new(),
        }
    }
}

impl Default for CaseStatement {
    fn default() -> Self {
        Self::new()
    }
}

/// A single-line `IF cond THEN stmt [ELSE stmt]`. `then_branch` defaults to
/// `Statement::Empty` and is never null; `else_branch` stays `None` until an
/// `ELSE` opcode supplies one (§3 invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineIfStatement {
    pub condition: Expression,
    pub then_branch: Box<Statement>,
    pub else_branch: Option<Box<ElseClause>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElseClause {
    pub action: Box<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockIfStatement {
    pub condition: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElseIfStatement {
    pub condition: Expression,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorInLine {
    pub text: Vec<u8>,
    pub rest_of_line: Option<Box<Statement>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinStatement {
    pub name: &'static str,
    pub args: Vec<Option<Expression>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodStatement {
    pub target: Expression,
    pub method: &'static str,
    pub args: Vec<Expression>,
}

/// Every statement the decoder can reconstruct (§3 "Statement"). Control
/// flow is kept flat: a block `IF`/`SELECT CASE`/`DO`/`FOR` is a sequence of
/// sibling statements across lines (indentation is a print hint, not tree
/// nesting), matching how the on-disk opcode stream itself has no nesting.
/// The only recursive shape is `LineIfStatement`, whose then/else branches
/// hold a single nested statement because the source syntax itself nests
/// there.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Empty,
    Rem(RemStatement),
    Builtin(BuiltinStatement),
    Method(MethodStatement),
    Call(CallStatement),
    Assignment(AssignmentStatement),

    Circle(CircleStatement),
    Line(LineStatement),
    Paint(PaintStatement),
    Pset(PsetStatement),
    ViewWindow(ViewWindowStatement),
    ViewPrint(ViewPrintStatement),
    GetPutGraphics(GetPutGraphicsStatement),

    Open(OpenStatement),
    Field(FieldStatement),
    LockUnlock(LockStatement),
    Name(NameStatement),

    Do(DoStatement),
    Loop(LoopStatement),
    For(ForStatement),
    Next(NextStatement),
    LineIf(LineIfStatement),
    BlockIf(BlockIfStatement),
    ElseIf(ElseIfStatement),
    Else,
    End(EndDeclaration),
    Select(Expression),
    Case(CaseStatement),
    Goto(Identifier),
    Gosub(Identifier),
    Return(ReturnStatement),
    Resume(ResumeStatement),
    Restore(RestoreStatement),
    Run(RunStatement),
    Exit(ExitKind),
    OnError(OnErrorStatement),
    OnEvent(OnEventStatement),
    OnExpr(OnExprStatement),
    EventState(EventStateStatement),

    Const(ConstDeclaration),
    Data(Vec<u8>),
    Declare(DeclareStatement),
    DefFn(DefFnStatement),
    DefType(DefTypeStatement),
    TypeDecl(TypeDeclStatement),
    VarDecl(VariableDeclarationStatement),
    ProcedureHeader(ProcedureHeaderStatement),

    Print(PrintStatement),
    Input(InputStatement),
    Erase(EraseStatement),
    Read(ReadStatement),

    ErrorInLine(ErrorInLine),
}

impl Statement {
    pub fn is_empty_slot(&self) -> bool {
        matches!(self, Statement::Empty)
    }
}
