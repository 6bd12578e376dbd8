//! The VBDOS form-resource decoder (§4.7): a fixed-length-record table
//! describing the form's controls, attached as an extra header region only
//! VBDOS carries. Each control type has its own field layout; this module
//! walks the names table and the records table and assembles the result
//! into the [`FormControl`] tree the pretty printer renders.

use std::collections::HashMap;

use qb_core::QbResult;
use qb_reader::ByteReader;
use qb_syntax::{AttributeValue, FormAttribute, FormControl};

enum ScalarKind {
    Integer,
    Char,
    QbColor,
    Unsigned,
    Offset,
}

enum ControlField {
    Skip(u64),
    /// A 16-bit bitfield; entry `i` names bit `i`, or `None` for an unused
    /// bit that carries no property.
    Bits(&'static [Option<&'static str>]),
    Scalar { size: u8, kind: ScalarKind, name: &'static str },
    /// An indirect, name-table-style string: the field holds an offset into
    /// the form region (relative to 0x16), not the text itself.
    IndirectString { size: u8, name: &'static str },
}

const fn skip(n: u64) -> ControlField {
    ControlField::Skip(n)
}
const fn bits(names: &'static [Option<&'static str>]) -> ControlField {
    ControlField::Bits(names)
}
const fn scalar(size: u8, kind: ScalarKind, name: &'static str) -> ControlField {
    ControlField::Scalar { size, kind, name }
}
const fn string(size: u8, name: &'static str) -> ControlField {
    ControlField::IndirectString { size, name }
}

use ScalarKind::{Char, Integer, Offset, QbColor, Unsigned};

/// `(display name, record byte length, field layout)` per control type,
/// keyed by the on-disk control type byte (§4.7 "control type table").
fn control_type_layout(ctltype: u8) -> Option<(&'static str, u16, &'static [ControlField])> {
    const FORM: &[ControlField] = &[
        skip(1),
        bits(&[
            None, Some("MaxButton"), None, Some("AutoRedraw"), None, Some("ControlBox"), None, None,
            Some("Enabled"), None, Some("MinButton"), None, None, None, None, Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        skip(4),
        scalar(1, Char, "*Top"),
        scalar(1, Char, "*Left"),
        scalar(1, Char, "*Height"),
        scalar(1, Char, "*Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "WindowState"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        skip(1),
        string(2, "Caption"),
        scalar(1, Integer, "BorderStyle"),
        skip(2),
        scalar(1, Integer, "&Height"),
        scalar(1, Integer, "&Width"),
    ];
    const CHECKBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        string(2, "Caption"),
        scalar(1, Integer, "Value"),
        skip(1),
    ];
    const COMBOBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, Some("Sorted"),
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        skip(12),
        string(2, "Text"),
        scalar(1, Integer, "Style"),
    ];
    const COMMANDBUTTON: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, Some("Default"), None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, Some("Cancel"), None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        skip(1),
        scalar(1, Integer, "DragMode"),
        string(2, "Caption"),
        skip(2),
    ];
    const DIRLISTBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        skip(8),
    ];
    const DRIVELISTBOX: &[ControlField] = DIRLISTBOX;
    const FILELISTBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            Some("ReadOnly"), Some("Hidden"), Some("System"), None, None, Some("Archive"), None, None,
            Some("Enabled"), Some("&Index"), Some("Normal"), None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        skip(10),
        string(2, "Pattern"),
    ];
    const FRAME: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, None, Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        string(2, "Caption"),
    ];
    const HSCROLLBAR: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, Some("Attached"),
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(2, Integer, "Value"),
        scalar(1, Integer, "DragMode"),
        scalar(2, Integer, "LargeChange"),
        scalar(2, Integer, "SmallChange"),
        scalar(2, Integer, "Max"),
        scalar(2, Integer, "Min"),
    ];
    const VSCROLLBAR: &[ControlField] = HSCROLLBAR;
    const LABEL: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, Some("AutoSize"), None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, None, Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        string(2, "Caption"),
        scalar(1, Integer, "BorderStyle"),
        scalar(1, Integer, "Alignment"),
    ];
    const LISTBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, Some("Sorted"),
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        skip(8),
    ];
    const MENU: &[ControlField] = &[
        skip(1),
        bits(&[
            Some("Separator"), None, None, None, None, None, Some("Checked"), None,
            Some("Enabled"), Some("&Index"), None, None, None, None, None, Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(11),
        string(2, "Caption"),
    ];
    const OPTIONBUTTON: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        string(2, "Caption"),
        scalar(1, Integer, "Value"),
        skip(1),
    ];
    const PICTUREBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, Some("AutoRedraw"), None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        skip(2),
        scalar(1, Integer, "BorderStyle"),
        skip(4),
    ];
    const TEXTBOX: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, Some("MultiLine"), None, None, Some("TabStop"), Some("Visible"),
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        scalar(1, Char, "Height"),
        scalar(1, Char, "Width"),
        scalar(1, Integer, "MousePointer"),
        scalar(1, Integer, "TabIndex"),
        scalar(1, QbColor, "BackColor"),
        scalar(1, QbColor, "ForeColor"),
        scalar(1, Integer, "DragMode"),
        skip(2),
        scalar(1, Integer, "BorderStyle"),
        scalar(1, Integer, "ScrollBars"),
        string(2, "Text"),
        skip(2),
    ];
    const TIMER: &[ControlField] = &[
        skip(1),
        bits(&[
            None, None, None, None, None, None, None, None,
            Some("Enabled"), Some("&Index"), None, None, None, None, None, None,
        ]),
        skip(2),
        scalar(2, Offset, "~"),
        string(2, "Tag"),
        scalar(2, Integer, "Index"),
        skip(2),
        scalar(1, Char, "Top"),
        scalar(1, Char, "Left"),
        skip(7),
        scalar(2, Unsigned, "Interval"),
        skip(2),
    ];

    match ctltype {
        0 => Some(("Form", 0x1F, FORM)),
        1 => Some(("CheckBox", 0x1C, CHECKBOX)),
        2 => Some(("ComboBox", 0x27, COMBOBOX)),
        3 => Some(("CommandButton", 0x1C, COMMANDBUTTON)),
        4 => Some(("DirListBox", 0x20, DIRLISTBOX)),
        5 => Some(("DriveListBox", 0x20, DRIVELISTBOX)),
        6 => Some(("FileListBox", 0x24, FILELISTBOX)),
        7 => Some(("Frame", 0x1A, FRAME)),
        8 => Some(("HScrollBar", 0x20, HSCROLLBAR)),
        9 => Some(("Label", 0x1C, LABEL)),
        10 => Some(("ListBox", 0x20, LISTBOX)),
        11 => Some(("Menu", 0x1A, MENU)),
        12 => Some(("OptionButton", 0x1C, OPTIONBUTTON)),
        13 => Some(("PictureBox", 0x1F, PICTUREBOX)),
        14 => Some(("TextBox", 0x22, TEXTBOX)),
        15 => Some(("Timer", 0x1C, TIMER)),
        16 => Some(("VScrollBar", 0x20, VSCROLLBAR)),
        _ => None,
    }
}

struct ControlData {
    name: Vec<u8>,
    control_type: &'static str,
    attrs: HashMap<&'static str, AttributeValue>,
    suppressed: std::collections::HashSet<&'static str>,
}

fn attr_int(attrs: &HashMap<&'static str, AttributeValue>, name: &str) -> Option<i64> {
    match attrs.get(name) {
        Some(AttributeValue::Int(v)) | Some(AttributeValue::Char(v)) | Some(AttributeValue::QbColor(v)) => Some(*v),
        _ => None,
    }
}

fn build_form_control(data: &ControlData) -> FormControl {
    let attributes: Vec<FormAttribute> = data
        .attrs
        .iter()
        .map(|(name, value)| FormAttribute {
            name,
            value: value.clone(),
            present: !data.suppressed.contains(name),
        })
        .collect();
    FormControl {
        name: if data.name.is_empty() { None } else { Some(data.name.clone()) },
        control_type: data.control_type,
        attributes,
        members: Vec::new(),
    }
}

fn build_tree(offset: u64, datas: &HashMap<u64, ControlData>, children: &HashMap<u64, Vec<u64>>) -> FormControl {
    let mut node = build_form_control(&datas[&offset]);
    if let Some(kids) = children.get(&offset) {
        for &child_offset in kids {
            node.members.push(build_tree(child_offset, datas, children));
        }
    }
    node
}

/// Decode the form resource starting at the reader's header offset 0x16
/// (§4.7). Returns `None` if the records table is empty (no form attached).
pub fn parse_form_layout(reader: &mut ByteReader<'_>) -> QbResult<Option<FormControl>> {
    reader.seek(0x16);
    let form_flags = reader.read_u8()?;
    reader.advance(5);
    let names_offset = reader.read_u16()?;
    let records_length = reader.read_u16()? as u64;
    let records_offset = reader.tell();

    reader.seek(0x16 + names_offset as u64);
    let mut names: Vec<Vec<u8>> = Vec::new();
    loop {
        let unknown_offset = match reader.read_u16() {
            Ok(v) => v,
            Err(_) => break,
        };
        let _ctltype = reader.read_u8().unwrap_or(0);
        let length = reader.read_u8().unwrap_or(0);
        let name = reader.read_bytes(length as usize).unwrap_or_default();
        names.push(name);
        if unknown_offset == 0 {
            break;
        }
    }

    reader.seek(records_offset);
    let mut datas: HashMap<u64, ControlData> = HashMap::new();
    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    let mut order: Vec<u64> = Vec::new();

    while reader.tell() + 2 < records_offset + records_length {
        let ctloffset = reader.tell();
        let Ok(index) = reader.read_u8() else { break };
        let Ok(ctltype) = reader.read_u8() else { break };
        let Some((base_name, ctltype_length, fields)) = control_type_layout(ctltype) else { break };
        let Some(name) = names.get(index as usize) else { break };
        let name = name.clone();

        if ctloffset + ctltype_length as u64 > records_offset + records_length {
            break;
        }

        let control_type = if base_name == "Form" && (form_flags & 0x04) != 0 { "MDIForm" } else { base_name };

        reader.seek(ctloffset + 2);
        let mut attrs: HashMap<&'static str, AttributeValue> = HashMap::new();
        for field in fields {
            match field {
                ControlField::Skip(n) => reader.advance(*n),
                ControlField::Bits(bitnames) => {
                    let value = reader.read_u16()?;
                    for (bitindex, bitname) in bitnames.iter().enumerate() {
                        if let Some(bitname) = bitname {
                            attrs.insert(bitname, AttributeValue::Bool((value >> bitindex) & 1 != 0));
                        }
                    }
                }
                ControlField::IndirectString { size, name } => {
                    let raw = if *size == 1 { reader.read_u8()? as u64 } else { reader.read_u16()? as u64 };
                    let saved = reader.tell();
                    reader.seek(0x16 + raw);
                    let text = reader.read_string()?;
                    reader.seek(saved);
                    attrs.insert(name, AttributeValue::Str(text));
                }
                ControlField::Scalar { size, kind, name } => {
                    let mut value: i64 = if *size == 1 { reader.read_u8()? as i64 } else { reader.read_u16()? as i64 };
                    if !matches!(kind, ScalarKind::Unsigned) {
                        if *size == 1 && (value & 0x80) != 0 {
                            value -= 0x100;
                        } else if *size == 2 && (value & 0x8000) != 0 {
                            value -= 0x10000;
                        }
                    }
                    let rendered = match kind {
                        ScalarKind::Char => AttributeValue::Char(value),
                        ScalarKind::QbColor => AttributeValue::QbColor(value),
                        _ => AttributeValue::Int(value),
                    };
                    attrs.insert(name, rendered);
                }
            }
        }
        reader.seek(ctloffset + ctltype_length as u64);

        if let Some(window_state) = attr_int(&attrs, "WindowState") {
            match window_state {
                0 => {
                    for (target, source) in [("Left", "*Left"), ("Top", "*Top"), ("Height", "*Height"), ("Width", "*Width")] {
                        if let Some(v) = attr_int(&attrs, source) {
                            attrs.insert(target, AttributeValue::Char(v));
                        }
                    }
                }
                1 => {
                    attrs.insert("Left", AttributeValue::Char(3));
                    attrs.insert("Top", AttributeValue::Char(22));
                    if let Some(h) = attr_int(&attrs, "&Height") {
                        attrs.insert("Height", AttributeValue::Char(h + 2));
                    }
                    if let Some(w) = attr_int(&attrs, "&Width") {
                        attrs.insert("Width", AttributeValue::Char(w + 2));
                    }
                }
                2 => {
                    attrs.insert("Left", AttributeValue::Char(0));
                    attrs.insert("Top", AttributeValue::Char(0));
                    if let Some(h) = attr_int(&attrs, "&Height") {
                        attrs.insert("Height", AttributeValue::Char(h + 2));
                    }
                    if let Some(w) = attr_int(&attrs, "&Width") {
                        attrs.insert("Width", AttributeValue::Char(w + 2));
                    }
                }
                _ => {}
            }
        }

        let mut suppressed = std::collections::HashSet::new();
        if attr_int(&attrs, "&Index") == Some(0) && attrs.contains_key("Index") {
            suppressed.insert("Index");
        }
        if control_type == "MDIForm" {
            suppressed.insert("WindowState");
        }

        if control_type == "Menu" {
            if let Some(AttributeValue::Str(caption)) = attrs.get("Caption").cloned() {
                if let Some(tab_pos) = caption.iter().position(|&b| b == 0x09) {
                    let (before, after) = (caption[..tab_pos].to_vec(), &caption[tab_pos + 1..]);
                    let mut value = String::new();
                    let mut remaining = after.to_vec();
                    if let Some(rest) = strip_prefix_bytes(&remaining, b"Shift+") {
                        value.push('+');
                        remaining = rest;
                    }
                    if let Some(rest) = strip_prefix_bytes(&remaining, b"Ctrl+") {
                        value.push('^');
                        remaining = rest;
                    }
                    let shortcut_text = String::from_utf8_lossy(&remaining).into_owned();
                    if shortcut_text.starts_with('F') {
                        value.push('{');
                        value.push_str(shortcut_text);
                        value.push('}');
                    } else {
                        value.push_str(shortcut_text);
                    }
                    attrs.insert("Caption", AttributeValue::Str(before));
                    attrs.insert("Shortcut", AttributeValue::Shortcut(value));
                }
            }
        }

        order.push(ctloffset);

        let parent_raw = attr_int(&attrs, "~").unwrap_or(0);
        if parent_raw != 0 {
            children.entry(0x16 + parent_raw as u64).or_default().push(ctloffset);
        }

        datas.insert(ctloffset, ControlData { name, control_type, attrs, suppressed });
    }

    Ok(order.first().map(|&root| build_tree(root, &datas, &children)))
}

fn strip_prefix_bytes(haystack: &[u8], prefix: &[u8]) -> Option<Vec<u8>> {
    if haystack.len() >= prefix.len() && &haystack[..prefix.len()] == prefix {
        Some(haystack[prefix.len()..].to_vec())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_control_type_stops_the_records_walk() {
        assert!(control_type_layout(200).is_none());
    }

    #[test]
    fn form_layout_is_the_largest_record() {
        let (name, length, fields) = control_type_layout(0).unwrap();
        assert_eq!(name, "Form");
        assert_eq!(length, 0x1F);
        assert!(fields.len() > 10);
    }
}
