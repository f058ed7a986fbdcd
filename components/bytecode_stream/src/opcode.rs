//! Instruction set for the accumulator/register VM
//!
//! Every instruction is one u8 opcode tag followed by fixed-arity
//! little-endian operands. Arithmetic and comparison instructions read
//! their left operand from a register and their right operand from the
//! accumulator, leaving the result in the accumulator. Jump offsets are
//! i32 values relative to the offset of the next instruction.

/// Opcode tags, one per instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Literals
    /// Load a constant-pool entry into the accumulator
    LoadConst = 0,
    /// Load an inline int32 literal into the accumulator
    LoadInt = 1,
    /// Load undefined into the accumulator
    LoadUndefined = 2,
    /// Load null into the accumulator
    LoadNull = 3,
    /// Load true into the accumulator
    LoadTrue = 4,
    /// Load false into the accumulator
    LoadFalse = 5,

    // Registers and globals
    /// Copy a register into the accumulator
    LoadReg = 6,
    /// Copy the accumulator into a register
    StoreReg = 7,
    /// Load a global by name-pool index
    LoadGlobal = 8,
    /// Store the accumulator into a global by name-pool index
    StoreGlobal = 9,

    // Arithmetic: acc = reg OP acc
    /// Addition, or string concatenation when either side is a string
    Add = 10,
    /// Subtraction
    Sub = 11,
    /// Multiplication
    Mul = 12,
    /// Division
    Div = 13,
    /// Remainder
    Mod = 14,
    /// Unary minus on the accumulator
    Neg = 15,
    /// Logical NOT on the accumulator
    Not = 16,

    // Comparison: acc = reg CMP acc
    /// Loose equality
    Equal = 17,
    /// Loose inequality
    NotEqual = 18,
    /// Strict equality
    StrictEqual = 19,
    /// Strict inequality
    StrictNotEqual = 20,
    /// Less than
    LessThan = 21,
    /// Less than or equal
    LessEqual = 22,
    /// Greater than
    GreaterThan = 23,
    /// Greater than or equal
    GreaterEqual = 24,

    // Control flow
    /// Unconditional relative jump
    Jump = 25,
    /// Relative jump when the accumulator is truthy
    JumpIfTrue = 26,
    /// Relative jump when the accumulator is falsy
    JumpIfFalse = 27,

    // Properties and elements
    /// acc = acc.name
    GetProperty = 28,
    /// reg.name = acc
    SetProperty = 29,
    /// acc = reg[acc]
    GetElement = 30,
    /// base[index] = acc, both base and index in registers
    SetElement = 31,

    // Construction and calls
    /// Build an array from a contiguous register window
    CreateArray = 32,
    /// Call a register-held callee with a contiguous argument window
    Call = 33,

    // Iteration
    /// acc = iterator object for the collection in the accumulator
    GetIterator = 34,
    /// acc = the iterator's next() result object
    IteratorNext = 35,

    // Termination
    /// Throw the accumulator as an exception
    Throw = 36,
    /// Return the accumulator to the caller
    Return = 37,
}

impl Opcode {
    /// Decodes an opcode tag. Returns None for tags outside the
    /// instruction set.
    pub fn from_u8(tag: u8) -> Option<Opcode> {
        Some(match tag {
            0 => Opcode::LoadConst,
            1 => Opcode::LoadInt,
            2 => Opcode::LoadUndefined,
            3 => Opcode::LoadNull,
            4 => Opcode::LoadTrue,
            5 => Opcode::LoadFalse,
            6 => Opcode::LoadReg,
            7 => Opcode::StoreReg,
            8 => Opcode::LoadGlobal,
            9 => Opcode::StoreGlobal,
            10 => Opcode::Add,
            11 => Opcode::Sub,
            12 => Opcode::Mul,
            13 => Opcode::Div,
            14 => Opcode::Mod,
            15 => Opcode::Neg,
            16 => Opcode::Not,
            17 => Opcode::Equal,
            18 => Opcode::NotEqual,
            19 => Opcode::StrictEqual,
            20 => Opcode::StrictNotEqual,
            21 => Opcode::LessThan,
            22 => Opcode::LessEqual,
            23 => Opcode::GreaterThan,
            24 => Opcode::GreaterEqual,
            25 => Opcode::Jump,
            26 => Opcode::JumpIfTrue,
            27 => Opcode::JumpIfFalse,
            28 => Opcode::GetProperty,
            29 => Opcode::SetProperty,
            30 => Opcode::GetElement,
            31 => Opcode::SetElement,
            32 => Opcode::CreateArray,
            33 => Opcode::Call,
            34 => Opcode::GetIterator,
            35 => Opcode::IteratorNext,
            36 => Opcode::Throw,
            37 => Opcode::Return,
            _ => return None,
        })
    }

    /// Operand bytes following the tag, fixed per opcode.
    pub fn operand_size(self) -> usize {
        match self {
            Opcode::LoadUndefined
            | Opcode::LoadNull
            | Opcode::LoadTrue
            | Opcode::LoadFalse
            | Opcode::Neg
            | Opcode::Not
            | Opcode::GetIterator
            | Opcode::IteratorNext
            | Opcode::Throw
            | Opcode::Return => 0,
            Opcode::LoadReg
            | Opcode::StoreReg
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Mod
            | Opcode::Equal
            | Opcode::NotEqual
            | Opcode::StrictEqual
            | Opcode::StrictNotEqual
            | Opcode::LessThan
            | Opcode::LessEqual
            | Opcode::GreaterThan
            | Opcode::GreaterEqual
            | Opcode::GetElement => 1,
            Opcode::LoadConst
            | Opcode::LoadGlobal
            | Opcode::StoreGlobal
            | Opcode::GetProperty
            | Opcode::SetElement
            | Opcode::CreateArray => 2,
            Opcode::SetProperty | Opcode::Call => 3,
            Opcode::LoadInt | Opcode::Jump | Opcode::JumpIfTrue | Opcode::JumpIfFalse => 4,
        }
    }

    /// Total encoded size, tag included.
    pub fn instruction_size(self) -> usize {
        1 + self.operand_size()
    }

    /// Instruction name as printed by the disassembler.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Opcode::LoadConst => "LoadConst",
            Opcode::LoadInt => "LoadInt",
            Opcode::LoadUndefined => "LoadUndefined",
            Opcode::LoadNull => "LoadNull",
            Opcode::LoadTrue => "LoadTrue",
            Opcode::LoadFalse => "LoadFalse",
            Opcode::LoadReg => "LoadReg",
            Opcode::StoreReg => "StoreReg",
            Opcode::LoadGlobal => "LoadGlobal",
            Opcode::StoreGlobal => "StoreGlobal",
            Opcode::Add => "Add",
            Opcode::Sub => "Sub",
            Opcode::Mul => "Mul",
            Opcode::Div => "Div",
            Opcode::Mod => "Mod",
            Opcode::Neg => "Neg",
            Opcode::Not => "Not",
            Opcode::Equal => "Equal",
            Opcode::NotEqual => "NotEqual",
            Opcode::StrictEqual => "StrictEqual",
            Opcode::StrictNotEqual => "StrictNotEqual",
            Opcode::LessThan => "LessThan",
            Opcode::LessEqual => "LessEqual",
            Opcode::GreaterThan => "GreaterThan",
            Opcode::GreaterEqual => "GreaterEqual",
            Opcode::Jump => "Jump",
            Opcode::JumpIfTrue => "JumpIfTrue",
            Opcode::JumpIfFalse => "JumpIfFalse",
            Opcode::GetProperty => "GetProperty",
            Opcode::SetProperty => "SetProperty",
            Opcode::GetElement => "GetElement",
            Opcode::SetElement => "SetElement",
            Opcode::CreateArray => "CreateArray",
            Opcode::Call => "Call",
            Opcode::GetIterator => "GetIterator",
            Opcode::IteratorNext => "IteratorNext",
            Opcode::Throw => "Throw",
            Opcode::Return => "Return",
        }
    }

    /// True for the three jump opcodes.
    pub fn is_jump(self) -> bool {
        matches!(
            self,
            Opcode::Jump | Opcode::JumpIfTrue | Opcode::JumpIfFalse
        )
    }
}

/// A decoded instruction with typed operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// acc = constants[index]
    LoadConst {
        /// Constant-pool index
        index: u16,
    },
    /// acc = value
    LoadInt {
        /// Inline int32 literal
        value: i32,
    },
    /// acc = undefined
    LoadUndefined,
    /// acc = null
    LoadNull,
    /// acc = true
    LoadTrue,
    /// acc = false
    LoadFalse,
    /// acc = registers[reg]
    LoadReg {
        /// Source register
        reg: u8,
    },
    /// registers[reg] = acc
    StoreReg {
        /// Destination register
        reg: u8,
    },
    /// acc = globals[names[name]]
    LoadGlobal {
        /// Name-pool index
        name: u16,
    },
    /// globals[names[name]] = acc
    StoreGlobal {
        /// Name-pool index
        name: u16,
    },
    /// acc = registers[lhs] + acc
    Add {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] - acc
    Sub {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] * acc
    Mul {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] / acc
    Div {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] % acc
    Mod {
        /// Left operand register
        lhs: u8,
    },
    /// acc = -acc
    Neg,
    /// acc = !acc
    Not,
    /// acc = registers[lhs] == acc
    Equal {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] != acc
    NotEqual {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] === acc
    StrictEqual {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] !== acc
    StrictNotEqual {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] < acc
    LessThan {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] <= acc
    LessEqual {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] > acc
    GreaterThan {
        /// Left operand register
        lhs: u8,
    },
    /// acc = registers[lhs] >= acc
    GreaterEqual {
        /// Left operand register
        lhs: u8,
    },
    /// Jump relative to the next instruction offset
    Jump {
        /// Signed offset from the next instruction
        offset: i32,
    },
    /// Jump when the accumulator is truthy
    JumpIfTrue {
        /// Signed offset from the next instruction
        offset: i32,
    },
    /// Jump when the accumulator is falsy
    JumpIfFalse {
        /// Signed offset from the next instruction
        offset: i32,
    },
    /// acc = acc.names[name]
    GetProperty {
        /// Name-pool index
        name: u16,
    },
    /// registers[obj].names[name] = acc
    SetProperty {
        /// Receiver register
        obj: u8,
        /// Name-pool index
        name: u16,
    },
    /// acc = registers[base][acc]
    GetElement {
        /// Base register
        base: u8,
    },
    /// registers[base][registers[index]] = acc
    SetElement {
        /// Base register
        base: u8,
        /// Index register
        index: u8,
    },
    /// acc = [registers[first] .. registers[first + count - 1]]
    CreateArray {
        /// First element register
        first: u8,
        /// Element count
        count: u8,
    },
    /// acc = registers[callee](registers[first_arg] .. , argc of them)
    Call {
        /// Callee register
        callee: u8,
        /// First argument register
        first_arg: u8,
        /// Argument count
        argc: u8,
    },
    /// acc = iterator for the collection in acc
    GetIterator,
    /// acc = next() result object of the iterator in acc
    IteratorNext,
    /// Throw the accumulator
    Throw,
    /// Return the accumulator
    Return,
}

impl Instruction {
    /// The opcode tag of this instruction.
    pub fn opcode(&self) -> Opcode {
        match self {
            Instruction::LoadConst { .. } => Opcode::LoadConst,
            Instruction::LoadInt { .. } => Opcode::LoadInt,
            Instruction::LoadUndefined => Opcode::LoadUndefined,
            Instruction::LoadNull => Opcode::LoadNull,
            Instruction::LoadTrue => Opcode::LoadTrue,
            Instruction::LoadFalse => Opcode::LoadFalse,
            Instruction::LoadReg { .. } => Opcode::LoadReg,
            Instruction::StoreReg { .. } => Opcode::StoreReg,
            Instruction::LoadGlobal { .. } => Opcode::LoadGlobal,
            Instruction::StoreGlobal { .. } => Opcode::StoreGlobal,
            Instruction::Add { .. } => Opcode::Add,
            Instruction::Sub { .. } => Opcode::Sub,
            Instruction::Mul { .. } => Opcode::Mul,
            Instruction::Div { .. } => Opcode::Div,
            Instruction::Mod { .. } => Opcode::Mod,
            Instruction::Neg => Opcode::Neg,
            Instruction::Not => Opcode::Not,
            Instruction::Equal { .. } => Opcode::Equal,
            Instruction::NotEqual { .. } => Opcode::NotEqual,
            Instruction::StrictEqual { .. } => Opcode::StrictEqual,
            Instruction::StrictNotEqual { .. } => Opcode::StrictNotEqual,
            Instruction::LessThan { .. } => Opcode::LessThan,
            Instruction::LessEqual { .. } => Opcode::LessEqual,
            Instruction::GreaterThan { .. } => Opcode::GreaterThan,
            Instruction::GreaterEqual { .. } => Opcode::GreaterEqual,
            Instruction::Jump { .. } => Opcode::Jump,
            Instruction::JumpIfTrue { .. } => Opcode::JumpIfTrue,
            Instruction::JumpIfFalse { .. } => Opcode::JumpIfFalse,
            Instruction::GetProperty { .. } => Opcode::GetProperty,
            Instruction::SetProperty { .. } => Opcode::SetProperty,
            Instruction::GetElement { .. } => Opcode::GetElement,
            Instruction::SetElement { .. } => Opcode::SetElement,
            Instruction::CreateArray { .. } => Opcode::CreateArray,
            Instruction::Call { .. } => Opcode::Call,
            Instruction::GetIterator => Opcode::GetIterator,
            Instruction::IteratorNext => Opcode::IteratorNext,
            Instruction::Throw => Opcode::Throw,
            Instruction::Return => Opcode::Return,
        }
    }

    /// Encoded size in bytes, tag included.
    pub fn size(&self) -> usize {
        self.opcode().instruction_size()
    }

    /// Appends the encoded form, tag then little-endian operands.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.push(self.opcode() as u8);
        match *self {
            Instruction::LoadConst { index } => out.extend_from_slice(&index.to_le_bytes()),
            Instruction::LoadInt { value } => out.extend_from_slice(&value.to_le_bytes()),
            Instruction::LoadUndefined
            | Instruction::LoadNull
            | Instruction::LoadTrue
            | Instruction::LoadFalse
            | Instruction::Neg
            | Instruction::Not
            | Instruction::GetIterator
            | Instruction::IteratorNext
            | Instruction::Throw
            | Instruction::Return => {}
            Instruction::LoadReg { reg } | Instruction::StoreReg { reg } => out.push(reg),
            Instruction::LoadGlobal { name } | Instruction::StoreGlobal { name } => {
                out.extend_from_slice(&name.to_le_bytes())
            }
            Instruction::Add { lhs }
            | Instruction::Sub { lhs }
            | Instruction::Mul { lhs }
            | Instruction::Div { lhs }
            | Instruction::Mod { lhs }
            | Instruction::Equal { lhs }
            | Instruction::NotEqual { lhs }
            | Instruction::StrictEqual { lhs }
            | Instruction::StrictNotEqual { lhs }
            | Instruction::LessThan { lhs }
            | Instruction::LessEqual { lhs }
            | Instruction::GreaterThan { lhs }
            | Instruction::GreaterEqual { lhs } => out.push(lhs),
            Instruction::Jump { offset }
            | Instruction::JumpIfTrue { offset }
            | Instruction::JumpIfFalse { offset } => out.extend_from_slice(&offset.to_le_bytes()),
            Instruction::GetProperty { name } => out.extend_from_slice(&name.to_le_bytes()),
            Instruction::SetProperty { obj, name } => {
                out.push(obj);
                out.extend_from_slice(&name.to_le_bytes());
            }
            Instruction::GetElement { base } => out.push(base),
            Instruction::SetElement { base, index } => {
                out.push(base);
                out.push(index);
            }
            Instruction::CreateArray { first, count } => {
                out.push(first);
                out.push(count);
            }
            Instruction::Call {
                callee,
                first_arg,
                argc,
            } => {
                out.push(callee);
                out.push(first_arg);
                out.push(argc);
            }
        }
    }

    /// Highest register index this instruction touches, if any.
    pub fn max_register(&self) -> Option<u8> {
        match *self {
            Instruction::LoadReg { reg } | Instruction::StoreReg { reg } => Some(reg),
            Instruction::Add { lhs }
            | Instruction::Sub { lhs }
            | Instruction::Mul { lhs }
            | Instruction::Div { lhs }
            | Instruction::Mod { lhs }
            | Instruction::Equal { lhs }
            | Instruction::NotEqual { lhs }
            | Instruction::StrictEqual { lhs }
            | Instruction::StrictNotEqual { lhs }
            | Instruction::LessThan { lhs }
            | Instruction::LessEqual { lhs }
            | Instruction::GreaterThan { lhs }
            | Instruction::GreaterEqual { lhs } => Some(lhs),
            Instruction::SetProperty { obj, .. } => Some(obj),
            Instruction::GetElement { base } => Some(base),
            Instruction::SetElement { base, index } => Some(base.max(index)),
            Instruction::CreateArray { first, count } => {
                Some(first.saturating_add(count.saturating_sub(1)))
            }
            Instruction::Call {
                callee,
                first_arg,
                argc,
            } => Some(callee.max(first_arg.saturating_add(argc.saturating_sub(1)))),
            _ => None,
        }
    }
}
