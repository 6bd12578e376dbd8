//! qb-syntax: the reconstructed syntax tree produced by decoding a QB/VBDOS
//! save file, and the pretty printer that turns it back into source text
//! (§3, §4.5).

pub mod comment;
pub mod expr;
pub mod forms;
pub mod line;
pub mod printer;
pub mod procedure;
pub mod statement;

pub use comment::{expand_comment_runs, Comment, Metacommand};
pub use expr::{BinaryOp, EventKind, Expression, Radix, UnaryOp};
pub use forms::{AttributeValue, FormAttribute, FormControl};
pub use line::Line;
pub use printer::print_file;
pub use procedure::{File, Procedure};
pub use statement::*;
