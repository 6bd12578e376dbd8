//! The builtin-call table (§4.4): every remaining opcode above the
//! hand-written control-flow dispatch in [`crate::opcodes`] names a builtin
//! statement or function keyword, an argument-count convention, and a small
//! set of optional flags. The table itself is mechanical (one entry per
//! keyword) so it lives apart from the dispatcher that interprets it.

/// How many operands a builtin opcode pops off the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgCount {
    /// A fixed, known-in-advance count.
    Fixed(usize),
    /// The count follows as the next `u16` in the opcode stream.
    NextWord,
    /// Functions only: no parentheses, a bare zero-argument reference.
    Implicit,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFlags {
    /// The instruction is the lvalue form of the builtin: pop a value, then
    /// the arguments, and emit an assignment to `name(args)`.
    pub assignment: bool,
    /// `N` extra `u16` words follow the opcode and are read and discarded.
    pub skipped_words: u8,
    /// Every absent argument was pushed as `Missing` rather than omitted
    /// entirely; filter those out before emission (`CLEAR ,,n`).
    pub double_arguments: bool,
    /// Fixed zero-based positions to splice back in as `None` once the
    /// present arguments have been popped.
    pub missing_arguments: &'static [usize],
}

#[derive(Debug, Clone, Copy)]
pub struct BuiltinSpec {
    pub is_function: bool,
    pub name: &'static str,
    pub args: ArgCount,
    pub flags: BuiltinFlags,
}

const fn stmt(name: &'static str, args: ArgCount) -> BuiltinSpec {
    BuiltinSpec { is_function: false, name, args, flags: BuiltinFlags { assignment: false, skipped_words: 0, double_arguments: false, missing_arguments: &[] } }
}

const fn func(name: &'static str, args: ArgCount) -> BuiltinSpec {
    BuiltinSpec { is_function: true, name, args, flags: BuiltinFlags { assignment: false, skipped_words: 0, double_arguments: false, missing_arguments: &[] } }
}

const fn stmt_flags(name: &'static str, args: ArgCount, flags: BuiltinFlags) -> BuiltinSpec {
    BuiltinSpec { is_function: false, name, args, flags }
}

const fn func_flags(name: &'static str, args: ArgCount, flags: BuiltinFlags) -> BuiltinSpec {
    BuiltinSpec { is_function: true, name, args, flags }
}

const SKIP1: BuiltinFlags = BuiltinFlags { assignment: false, skipped_words: 1, double_arguments: false, missing_arguments: &[] };
const DOUBLE: BuiltinFlags = BuiltinFlags { assignment: false, skipped_words: 0, double_arguments: true, missing_arguments: &[] };
const ASSIGN: BuiltinFlags = BuiltinFlags { assignment: true, skipped_words: 0, double_arguments: false, missing_arguments: &[] };
const MISSING1_SKIP1: BuiltinFlags = BuiltinFlags { assignment: false, skipped_words: 1, double_arguments: false, missing_arguments: &[1] };

/// Look up the builtin-call entry for `opcode`, or `None` if it does not
/// name a builtin keyword (the hand-written dispatcher owns that opcode
/// instead).
pub fn lookup(opcode: u16) -> Option<BuiltinSpec> {
    use ArgCount::{Fixed, Implicit, NextWord};
    let spec = match opcode {
        0x0043 => stmt("CHAIN", Fixed(1)),
        0x004E => stmt("END", Fixed(0)),
        0x0075 => stmt_flags("STOP", Fixed(0), SKIP1),
        0x0077 => stmt("WAIT", Fixed(2)),
        0x0078 => stmt("WAIT", Fixed(3)),
        0x0079 => stmt_flags("WEND", Fixed(0), SKIP1),
        0x007A => stmt_flags("WHILE", Fixed(1), SKIP1),
        0x009A => stmt("BEEP", Fixed(0)),
        0x009B => stmt("BLOAD", Fixed(1)),
        0x009C => stmt("BLOAD", Fixed(2)),
        0x009D => stmt("BSAVE", Fixed(3)),
        0x009E => stmt("CHDIR", Fixed(1)),
        0x00A1 => stmt_flags("CLEAR", NextWord, DOUBLE),
        0x00A2 => stmt("CLOSE", NextWord),
        0x00A3 => stmt_flags("CLS", Fixed(1), DOUBLE),
        0x00A4 => stmt_flags("COLOR", NextWord, DOUBLE),
        0x00A7 => func_flags("DATE$", Implicit, ASSIGN),
        0x00A8 => stmt("DEF SEG", Fixed(0)),
        0x00A9 => func_flags("DEF SEG", Implicit, ASSIGN),
        0x00AA => stmt("DRAW", Fixed(1)),
        0x00AB => stmt("ENVIRON", Fixed(1)),
        0x00AD => stmt("ERROR", Fixed(1)),
        0x00AE => stmt("FILES", Fixed(0)),
        0x00AF => stmt("FILES", Fixed(1)),
        0x00B0 => stmt("GET", Fixed(1)),
        0x00B1 => stmt("GET", Fixed(2)),
        0x00B2 => stmt_flags("GET", Fixed(2), MISSING1_SKIP1),
        0x00B3 => stmt_flags("GET", Fixed(3), SKIP1),
        0x00B7 => stmt("IOCTL", Fixed(2)),
        0x00B9 => stmt("KEY", Fixed(2)),
        0x00BA => stmt("KILL", Fixed(1)),
        0x00C1 => stmt_flags("LOCATE", NextWord, DOUBLE),
        0x00C5 => func_flags("MID$", Fixed(2), ASSIGN),
        0x00C6 => func_flags("MID$", Fixed(3), ASSIGN),
        0x00C7 => stmt("MKDIR", Fixed(1)),
        0x00CB => stmt("OPEN", Fixed(3)),
        0x00CC => stmt("OPEN", Fixed(4)),
        0x00CD => stmt("OPTION BASE 0", Fixed(0)),
        0x00CE => stmt("OPTION BASE 1", Fixed(0)),
        0x00CF => stmt("OUT", Fixed(2)),
        0x00D2 => stmt("PALETTE", Fixed(0)),
        0x00D3 => stmt("PALETTE", Fixed(2)),
        0x00D4 => stmt("PALETTE USING", Fixed(1)),
        0x00D5 => stmt("PCOPY", Fixed(2)),
        0x00D6 => stmt("PLAY", Fixed(1)),
        0x00D7 => stmt("POKE", Fixed(2)),
        0x00DC => stmt("PUT", Fixed(1)),
        0x00DD => stmt("PUT", Fixed(2)),
        0x00DE => stmt_flags("PUT", Fixed(2), MISSING1_SKIP1),
        0x00DF => stmt_flags("PUT", Fixed(3), SKIP1),
        0x00E0 => stmt("RANDOMIZE", Fixed(0)),
        0x00E1 => stmt("RANDOMIZE", Fixed(1)),
        0x00E4 => stmt("RESET", Fixed(0)),
        0x00E5 => stmt("RMDIR", Fixed(1)),
        0x00E7 => stmt_flags("SCREEN", NextWord, DOUBLE),
        0x00E8 => stmt("SEEK", Fixed(2)),
        0x00E9 => stmt("SHELL", Fixed(0)),
        0x00EA => stmt("SHELL", Fixed(1)),
        0x00EB => stmt("SLEEP", Fixed(0)),
        0x00EC => stmt("SOUND", Fixed(2)),
        0x00ED => stmt_flags("SWAP", Fixed(2), SKIP1),
        0x00EE => stmt("SYSTEM", Fixed(0)),
        0x00EF => func_flags("TIME$", Implicit, ASSIGN),
        0x00F0 => stmt("TROFF", Fixed(0)),
        0x00F1 => stmt("TRON", Fixed(0)),
        0x00F4 => stmt("VIEW", Fixed(0)),
        0x00F9 => stmt("WIDTH LPRINT", Fixed(1)),
        0x00FA => stmt("WIDTH", Fixed(2)),
        0x00FC => stmt("WINDOW", Fixed(0)),
        0x0105 => func("ABS", Fixed(1)),
        0x0106 => func("ASC", Fixed(1)),
        0x0107 => func("ATN", Fixed(1)),
        0x0109 => func("CHR$", Fixed(1)),
        0x010A => func("COMMAND$", Implicit),
        0x010B => func("COS", Fixed(1)),
        0x010C => func("CSRLIN", Implicit),
        0x010D => func("CVD", Fixed(1)),
        0x010E => func("CVDMBF", Fixed(1)),
        0x010F => func("CVI", Fixed(1)),
        0x0110 => func("CVL", Fixed(1)),
        0x0111 => func("CVS", Fixed(1)),
        0x0112 => func("CVSMBF", Fixed(1)),
        0x0113 => func("DATE$", Implicit),
        0x0114 => func("ENVIRON$", Fixed(1)),
        0x0115 => func("EOF", Fixed(1)),
        0x0116 => func("ERDEV", Implicit),
        0x0117 => func("ERDEV$", Implicit),
        0x0118 => func("ERL", Implicit),
        0x0119 => func("ERR", Implicit),
        0x011A => func("EXP", Fixed(1)),
        0x011B => func("FILEATTR", Fixed(2)),
        0x011C => func("FIX", Fixed(1)),
        0x011D => func("FRE", Fixed(1)),
        0x011E => func("FREEFILE", Implicit),
        0x011F => func("HEX$", Fixed(1)),
        0x0120 => func("INKEY$", Implicit),
        0x0121 => func("INP", Fixed(1)),
        0x0122 => func("INPUT$", Fixed(1)),
        0x0123 => func("INPUT$", Fixed(2)),
        0x0124 => func("INSTR", Fixed(2)),
        0x0125 => func("INSTR", Fixed(3)),
        0x0126 => func("INT", Fixed(1)),
        0x0127 => func("IOCTL$", Fixed(1)),
        0x0128 => func("LBOUND", Fixed(1)),
        0x0129 => func("LBOUND", Fixed(2)),
        0x012A => func("LCASE$", Fixed(1)),
        0x012B => func("LTRIM$", Fixed(1)),
        0x012C => func("LEFT$", Fixed(2)),
        0x012D => func_flags("LEN", Fixed(1), SKIP1),
        0x012E => func("LOC", Fixed(1)),
        0x012F => func("LOF", Fixed(1)),
        0x0130 => func("LOG", Fixed(1)),
        0x0131 => func("LPOS", Fixed(1)),
        0x0132 => func("MID$", Fixed(2)),
        0x0133 => func("MID$", Fixed(3)),
        0x0134 => func("MKD$", Fixed(1)),
        0x0135 => func("MKDMBF$", Fixed(1)),
        0x0136 => func("MKI$", Fixed(1)),
        0x0137 => func("MKL$", Fixed(1)),
        0x0138 => func("MKS$", Fixed(1)),
        0x0139 => func("MKSMBF$", Fixed(1)),
        0x013A => func("OCT$", Fixed(1)),
        0x013B => func("PEEK", Fixed(1)),
        0x013C => func("PEN", Fixed(1)),
        0x013D => func("PLAY", Fixed(1)),
        0x013E => func("PMAP", Fixed(2)),
        0x013F => func("POINT", Fixed(1)),
        0x0140 => func("POINT", Fixed(2)),
        0x0141 => func("POS", Fixed(1)),
        0x0142 => func("RIGHT$", Fixed(2)),
        0x0143 => func("RND", Implicit),
        0x0144 => func("RND", Fixed(1)),
        0x0145 => func("RTRIM$", Fixed(1)),
        0x0146 => func("SADD", Fixed(1)),
        0x0147 => func("SCREEN", Fixed(2)),
        0x0148 => func("SCREEN", Fixed(3)),
        0x0149 => func("SEEK", Fixed(1)),
        0x014A => func("SETMEM", Fixed(1)),
        0x014B => func("SGN", Fixed(1)),
        0x014C => func("SHELL", Fixed(1)),
        0x014D => func("SIN", Fixed(1)),
        0x014E => func("SPACE$", Fixed(1)),
        0x014F => func("SQR", Fixed(1)),
        0x0150 => func("STICK", Fixed(1)),
        0x0151 => func("STR$", Fixed(1)),
        0x0152 => func("STRIG", Fixed(1)),
        0x0153 => func("STRING$", Fixed(2)),
        0x0154 => func("TAN", Fixed(1)),
        0x0155 => func("TIME$", Implicit),
        0x0156 => func("TIMER", Implicit),
        0x0157 => func("UBOUND", Fixed(1)),
        0x0158 => func("UBOUND", Fixed(2)),
        0x0159 => func("UCASE$", Fixed(1)),
        0x015A => func("VAL", Fixed(1)),
        0x015B => func("VARPTR", Fixed(1)),
        0x015C => func_flags("VARPTR$", Fixed(1), SKIP1),
        0x015D => func("VARSEG", Fixed(1)),
        // QB45+
        0x017B => stmt("SLEEP", Fixed(1)),
        // QB70+
        0x017F => stmt("CHDRIVE", Fixed(1)),
        0x0180 => func_flags("ERR", Implicit, ASSIGN),
        0x0181 => func("CURDIR$", Implicit),
        0x0182 => func("CURDIR$", Fixed(1)),
        0x0183 => func("DIR$", Implicit),
        0x0184 => func("DIR$", Fixed(1)),
        0x0186 => func("BOF", Fixed(1)),
        0x0187 => func("CVC", Fixed(1)),
        0x0188 => func("GETINDEX$", Fixed(1)),
        0x0189 => func("MKC$", Fixed(1)),
        0x018A => func("SAVEPOINT", Implicit),
        0x018B => func("SSEG", Fixed(1)),
        0x018C => func("SSEGADD", Fixed(1)),
        0x018D => func("STACK", Implicit),
        0x018E => stmt("BEGINTRANS", Fixed(0)),
        0x018F => stmt("CHECKPOINT", Fixed(0)),
        0x0190 => stmt("COMMITTRANS", Fixed(0)),
        0x0191 => stmt("CREATEINDEX", NextWord),
        0x0192 => stmt("DELETE", Fixed(1)),
        0x0193 => stmt("DELETEINDEX", Fixed(2)),
        0x0194 => stmt("DELETETABLE", Fixed(2)),
        0x0195 => stmt("END", Fixed(1)),
        0x0197 => stmt("INSERT", Fixed(2)),
        0x019B => stmt("RETRIEVE", Fixed(2)),
        0x019C => stmt("ROLLBACK", Fixed(0)),
        0x019D => stmt("ROLLBACK", Fixed(1)),
        0x019E => stmt("ROLLBACK ALL", Fixed(0)),
        0x01A0 => stmt("SETINDEX", Fixed(1)),
        0x01A1 => stmt("SETINDEX", Fixed(2)),
        0x01A2 => stmt("STACK", Fixed(0)),
        0x01A3 => stmt("STACK", Fixed(1)),
        0x01A4 => stmt_flags("STOP", Fixed(1), SKIP1),
        0x01A5 => stmt("SYSTEM", Fixed(1)),
        0x01A6 => stmt("UPDATE", Fixed(2)),
        0x01A7 => func("TEXTCOMP", Fixed(2)),
        // VBDOS
        0x01AB => stmt("LOAD", Fixed(1)),
        0x01AC => stmt("UNLOAD", Fixed(1)),
        0x01AD => func("DOEVENTS", Fixed(0)),
        0x01AE => func("QBCOLOR", Fixed(1)),
        0x01AF => func("RGB", Fixed(3)),
        0x01B0 => func("ERROR$", Implicit),
        0x01B1 => func("ERROR$", Fixed(1)),
        0x01B2 => func("FORMAT$", Fixed(1)),
        0x01B3 => func("FORMAT$", Fixed(2)),
        0x01B4 => func("DATESERIAL", Fixed(3)),
        0x01B5 => func("DATEVALUE", Fixed(1)),
        0x01B6 => func("DAY", Fixed(1)),
        0x01B7 => func("MONTH", Fixed(1)),
        0x01B8 => func("WEEKDAY", Fixed(1)),
        0x01B9 => func("YEAR", Fixed(1)),
        0x01BA => func("NOW", Implicit),
        0x01BB => func("TIMESERIAL", Fixed(3)),
        0x01BC => func("TIMEVALUE", Fixed(1)),
        0x01BD => func("HOUR", Fixed(1)),
        0x01BE => func("MINUTE", Fixed(1)),
        0x01BF => func("SECOND", Fixed(1)),
        0x01C0 => stmt("OPTION EXPLICIT", Fixed(0)),
        0x01C3 => func("INPUTBOX$", Fixed(3)),
        0x01C4 => func("INPUTBOX$", Fixed(5)),
        0x01C5 => stmt("MSGBOX", Fixed(3)),
        0x01C6 => func("MSGBOX", Fixed(3)),
        _ => return None,
    };
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_statement_entry_has_no_flags() {
        let spec = lookup(0x009A).unwrap();
        assert!(!spec.is_function);
        assert_eq!(spec.name, "BEEP");
        assert_eq!(spec.args, ArgCount::Fixed(0));
    }

    #[test]
    fn implicit_function_entry_has_no_parens_convention() {
        let spec = lookup(0x010C).unwrap();
        assert!(spec.is_function);
        assert_eq!(spec.args, ArgCount::Implicit);
    }

    #[test]
    fn assignment_flag_marks_lvalue_builtins() {
        let spec = lookup(0x00C5).unwrap();
        assert!(spec.flags.assignment);
    }

    #[test]
    fn unknown_opcode_is_not_a_builtin() {
        assert!(lookup(0x0001).is_none());
    }
}
