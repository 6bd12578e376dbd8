use serde::{Deserialize, Serialize};

use qb_core::Identifier;

use crate::comment::Comment;
use crate::statement::Statement;

/// One physical source line: an optional label, one or more `:`-separated
/// statements, and an optional trailing comment (§3 "Line").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    pub label: Option<Identifier>,
    pub indent: usize,
    pub statements: Vec<Statement>,
    /// Target print column for each `:` between statements, so a line
    /// reconstructed from several opcodes keeps the spacing the original
    /// editor's auto-indent would have produced (§4.5). One entry per gap
    /// between statements.
    pub separator_columns: Vec<Option<usize>>,
    pub comment: Option<Comment>,
}

impl Line {
    pub fn new() -> Self {
        Line {
            label: None,
            indent: 0,
            statements: Vec::new(),
            separator_columns: Vec::new(),
            comment: None,
        }
    }

}

impl Default for Line {
    fn default() -> Self {
        Self::new()
    }
}
