use qb_core::{Identifier, Type};
use serde::{Deserialize, Serialize};

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary infix operators, in the precedence order QuickBASIC defines them
/// (lowest first): `OR`, `XOR`, `AND`, `EQV`, `IMP`, the comparisons,
/// concatenation/addition/subtraction, `MOD`, `\`, `*`/`/`, `^`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    IntDiv,
    Mod,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Eqv,
    Imp,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add | BinaryOp::Concat => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IntDiv => "\\",
            BinaryOp::Mod => "MOD",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "AND",
            BinaryOp::Or => "OR",
            BinaryOp::Xor => "XOR",
            BinaryOp::Eqv => "EQV",
            BinaryOp::Imp => "IMP",
        }
    }
}

/// One of the eight event sources `ON ... GOSUB` can bind (§3 Expression,
/// "event specification").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Com,
    Key,
    Pen,
    Play,
    Signal,
    Strig,
    Timer,
    UEvent,
}

impl EventKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            EventKind::Com => "COM",
            EventKind::Key => "KEY",
            EventKind::Pen => "PEN",
            EventKind::Play => "PLAY",
            EventKind::Signal => "SIGNAL",
            EventKind::Strig => "STRIG",
            EventKind::Timer => "TIMER",
            EventKind::UEvent => "UEVENT",
        }
    }
}

/// An integer literal's original radix, preserved so `&H10` prints back as
/// hex rather than as the decoded decimal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Radix {
    Decimal,
    Octal,
    Hex,
}

/// Every expression shape the decoder can reconstruct (§3 "Expression").
///
/// `Option<Expression>` is used wherever the on-disk stream can encode an
/// elided argument (the `Missing`/`None` stack sentinels of §4.3, resolved
/// to a printable hole by the time they reach the tree).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    Identifier(Identifier),

    /// `name(args)` — `args: None` means the argument list itself was
    /// omitted (the "implicit dims" marker), distinct from `Some(vec![])`
    /// which is an explicit empty argument list.
    ArrayElement {
        name: Identifier,
        args: Option<Vec<Option<Expression>>>,
    },

    /// `base.field`; `field` is usually an [`Expression::Identifier`] but is
    /// a full expression so `record_array(i).field` (an array-of-records
    /// element selected as the field) round-trips too.
    Field {
        base: Box<Expression>,
        field: Box<Expression>,
    },

    IntegerLiteral {
        value: i64,
        radix: Radix,
        is_long: bool,
    },

    SingleLiteral(f32),

    /// `#`-suffixed literal; the pretty printer converts `E` to `D` in its
    /// exponent when rendering this variant.
    DoubleLiteral(f64),

    /// Fixed-point value scaled by 10000, as stored on disk.
    CurrencyLiteral(i64),

    StringLiteral(Vec<u8>),

    Parenthesized(Box<Expression>),

    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },

    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },

    ByVal(Box<Expression>),

    Seg(Box<Expression>),

    FileNumber(Box<Expression>),

    Event {
        kind: EventKind,
        index: Option<Box<Expression>>,
    },

    /// A graphics coordinate pair, optionally relative (`STEP`).
    Coord {
        x: Box<Expression>,
        y: Box<Expression>,
        step: bool,
    },

    /// `name(args)` / `name` — `implicit_args` means the call had no
    /// parentheses at all (a zero-argument function reference).
    BuiltinCall {
        name: String,
        args: Vec<Option<Expression>>,
        implicit_args: bool,
    },

    /// `CINT(x)`, `CDBL(x)`, ... — the target type is chosen per dialect
    /// from the opcode parameter; conversion to `STRING` is rejected by the
    /// dispatcher rather than represented here.
    Convert {
        target: Type,
        operand: Box<Expression>,
    },

    /// VBDOS `TYPEOF expr IS TypeName`.
    TypeOfIs {
        operand: Box<Expression>,
        type_name: Identifier,
    },

    /// VBDOS `object.Method(args)` used in expression position.
    MethodCall {
        target: Box<Expression>,
        method: &'static str,
        args: Vec<Expression>,
    },

    /// VBDOS external-object wrapper (an object reference crossing a
    /// method-call boundary).
    ExternalObject(Box<Expression>),
}

impl Expression {
    pub fn identifier(ident: Identifier) -> Self {
        Expression::Identifier(ident)
    }
}
