use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use qb_core::Identifier;

use crate::forms::FormControl;
use crate::line::Line;
use crate::statement::ProcKind;

/// A `SUB`/`FUNCTION` body, or the unnamed main body of the file (§3
/// "Procedure"). `name` is `None` only for the main procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Procedure {
    pub name: Option<Identifier>,
    pub kind: Option<ProcKind>,
    pub is_static: bool,
    pub lines: Vec<Line>,
}

impl Procedure {
    pub fn main() -> Self {
        Procedure {
            name: None,
            kind: None,
            is_static: false,
            lines: Vec::new(),
        }
    }

    pub fn named(name: Identifier, kind: ProcKind) -> Self {
        Procedure {
            name: Some(name),
            kind: Some(kind),
            is_static: false,
            lines: Vec::new(),
        }
    }
}

/// The top-level decoded program: the main body, its trailing `SUB`/
/// `FUNCTION` procedures in on-disk order, and (VBDOS only) the attached
/// form resource (§3 "File", §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    pub main: Procedure,
    pub procedures: Vec<Procedure>,
    /// Name-table offset to identifier, accumulated as opcodes resolve or
    /// declare them, in first-resolved order; kept here rather than in the
    /// reader crate so a decoded `File` is self-contained once parsing
    /// finishes.
    pub names: IndexMap<u16, Identifier>,
    pub form: Option<FormControl>,
}

impl File {
    pub fn new() -> Self {
        File {
            main: Procedure::main(),
            procedures: Vec::new(),
            names: IndexMap::new(),
            form: None,
        }
    }
}

impl Default for File {
    fn default() -> Self {
        Self::new()
    }
}
