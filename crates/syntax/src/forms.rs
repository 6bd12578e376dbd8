use serde::{Deserialize, Serialize};

/// A single decoded control field value (§4.7). Signed fields have already
/// been sign-extended and `STRING` fields already resolved through the
/// form's own name offsets by the time they reach this tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AttributeValue {
    Int(i64),
    Bool(bool),
    Str(Vec<u8>),
    Float(f64),
    /// A field of the `CHAR` datatype, printed as `Char(n)`.
    Char(i64),
    /// A field of the `QBCOLOR` datatype, printed as `QBColor(n)`.
    QbColor(i64),
    /// A menu's parsed shortcut key, already rendered to its final textual
    /// form (`^C`, `{F1}`, ...); printed verbatim with no wrapper.
    Shortcut(String),
}

/// One `Name = Value` line inside a `BEGIN ... END` control block.
/// `present` is `false` for a field that decoded to its type's zero value
/// and is therefore omitted by the pretty printer, matching the original
/// editor's habit of not writing out defaulted properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormAttribute {
    pub name: &'static str,
    pub value: AttributeValue,
    pub present: bool,
}

/// A decoded VBDOS form control, or the form itself (the first record in
/// the resource, §4.7 "first record is main form"). Nested members (menu
/// items, a grid's columns, ...) come from `~`-prefixed fields and print as
/// their own indented `BEGIN`/`END` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormControl {
    pub name: Option<Vec<u8>>,
    pub control_type: &'static str,
    pub attributes: Vec<FormAttribute>,
    pub members: Vec<FormControl>,
}

impl FormControl {
    pub fn new(control_type: &'static str) -> Self {
        FormControl {
            name: None,
            control_type,
            attributes: Vec::new(),
            members: Vec::new(),
        }
    }
}
