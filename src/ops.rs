use std::fmt;

use crate::memory::Cell;

/// Machine operations, one cell each in the program region.
///
/// Discriminants are the wire encoding inside compiled images and must not
/// be reordered. The memory-destination variants were appended later, so
/// they number from 33 rather than sitting next to their stack twins.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum OpCode {
    Halt = 0,
    Push,
    PushM,
    Pop,
    Wait,
    Add,
    Sub,
    Mul,
    Div,
    Lsh,
    Rsh,
    And,
    Or,
    Xor,
    Not,
    Inc,
    Dec,
    Cmp,
    CmpM,
    Jmp,
    Jeq,
    Jne,
    Jgt,
    Jlt,
    Jge,
    Jle,
    Call,
    Ret,
    PutP,
    PutPM,
    PutS,
    Sys,
    Noop,
    AddM,
    SubM,
    MulM,
    DivM,
    AndM,
    OrM,
    XorM,
    LshM,
    RshM,
    NotM,
}

impl OpCode {
    /// Look up an operation by its assembly mnemonic, case-insensitively.
    pub fn from_mnemonic(s: &str) -> Option<OpCode> {
        use OpCode::*;
        let lower = s.to_ascii_lowercase();
        let op = match lower.as_str() {
            "halt" => Halt,
            "push" => Push,
            "pushm" => PushM,
            "pop" => Pop,
            "wait" => Wait,
            "add" => Add,
            "sub" => Sub,
            "mul" => Mul,
            "div" => Div,
            "lsh" => Lsh,
            "rsh" => Rsh,
            "and" => And,
            "or" => Or,
            "xor" => Xor,
            "not" => Not,
            "inc" => Inc,
            "dec" => Dec,
            "cmp" => Cmp,
            "cmpm" => CmpM,
            "jmp" => Jmp,
            "jeq" => Jeq,
            "jne" => Jne,
            "jgt" => Jgt,
            "jlt" => Jlt,
            "jge" => Jge,
            "jle" => Jle,
            "call" => Call,
            "ret" => Ret,
            "putp" => PutP,
            "putpm" => PutPM,
            "puts" => PutS,
            "sys" => Sys,
            "noop" => Noop,
            "addm" => AddM,
            "subm" => SubM,
            "mulm" => MulM,
            "divm" => DivM,
            "andm" => AndM,
            "orm" => OrM,
            "xorm" => XorM,
            "lshm" => LshM,
            "rshm" => RshM,
            "notm" => NotM,
            _ => return None,
        };
        Some(op)
    }

    pub fn mnemonic(&self) -> &'static str {
        use OpCode::*;
        match self {
            Halt => "halt",
            Push => "push",
            PushM => "pushm",
            Pop => "pop",
            Wait => "wait",
            Add => "add",
            Sub => "sub",
            Mul => "mul",
            Div => "div",
            Lsh => "lsh",
            Rsh => "rsh",
            And => "and",
            Or => "or",
            Xor => "xor",
            Not => "not",
            Inc => "inc",
            Dec => "dec",
            Cmp => "cmp",
            CmpM => "cmpm",
            Jmp => "jmp",
            Jeq => "jeq",
            Jne => "jne",
            Jgt => "jgt",
            Jlt => "jlt",
            Jge => "jge",
            Jle => "jle",
            Call => "call",
            Ret => "ret",
            PutP => "putp",
            PutPM => "putpm",
            PutS => "puts",
            Sys => "sys",
            Noop => "noop",
            AddM => "addm",
            SubM => "subm",
            MulM => "mulm",
            DivM => "divm",
            AndM => "andm",
            OrM => "orm",
            XorM => "xorm",
            LshM => "lshm",
            RshM => "rshm",
            NotM => "notm",
        }
    }
}

impl TryFrom<Cell> for OpCode {
    type Error = Cell;

    /// Decode a fetched cell, handing back the raw value if it names nothing.
    fn try_from(value: Cell) -> Result<Self, Self::Error> {
        use OpCode::*;
        let op = match value {
            0 => Halt,
            1 => Push,
            2 => PushM,
            3 => Pop,
            4 => Wait,
            5 => Add,
            6 => Sub,
            7 => Mul,
            8 => Div,
            9 => Lsh,
            10 => Rsh,
            11 => And,
            12 => Or,
            13 => Xor,
            14 => Not,
            15 => Inc,
            16 => Dec,
            17 => Cmp,
            18 => CmpM,
            19 => Jmp,
            20 => Jeq,
            21 => Jne,
            22 => Jgt,
            23 => Jlt,
            24 => Jge,
            25 => Jle,
            26 => Call,
            27 => Ret,
            28 => PutP,
            29 => PutPM,
            30 => PutS,
            31 => Sys,
            32 => Noop,
            33 => AddM,
            34 => SubM,
            35 => MulM,
            36 => DivM,
            37 => AndM,
            38 => OrM,
            39 => XorM,
            40 => LshM,
            41 => RshM,
            42 => NotM,
            _ => return Err(value),
        };
        Ok(op)
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Host services reachable through the `sys` operation.
///
/// The vector numbering leaves room below 0xF0 for services that take over
/// the config region later.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SysCall {
    None = 0x00,
    ClearScreen = 0xF0,
    Flip = 0xF1,
}

impl TryFrom<Cell> for SysCall {
    type Error = Cell;

    fn try_from(value: Cell) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(SysCall::None),
            0xF0 => Ok(SysCall::ClearScreen),
            0xF1 => Ok(SysCall::Flip),
            _ => Err(value),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mnemonics_roundtrip() {
        for raw in 0..=42 {
            let op = OpCode::try_from(raw).unwrap();
            assert_eq!(OpCode::from_mnemonic(op.mnemonic()), Some(op));
        }
    }

    #[test]
    fn mnemonic_lookup_ignores_case() {
        assert_eq!(OpCode::from_mnemonic("PUSH"), Some(OpCode::Push));
        assert_eq!(OpCode::from_mnemonic("PutPm"), Some(OpCode::PutPM));
        assert_eq!(OpCode::from_mnemonic("snake"), None);
    }

    #[test]
    fn encoding_is_stable() {
        assert_eq!(OpCode::Halt as Cell, 0);
        assert_eq!(OpCode::Sys as Cell, 31);
        assert_eq!(OpCode::Noop as Cell, 32);
        assert_eq!(OpCode::AddM as Cell, 33);
        assert_eq!(OpCode::NotM as Cell, 42);
        assert!(OpCode::try_from(43).is_err());
    }

    #[test]
    fn syscall_vectors() {
        assert_eq!(SysCall::try_from(0xF0), Ok(SysCall::ClearScreen));
        assert_eq!(SysCall::try_from(0xF1), Ok(SysCall::Flip));
        assert_eq!(SysCall::try_from(0x07), Err(0x07));
    }
}
