//! First decode phase: turn an opcode word into a tagged instruction.
//!
//! Nothing here touches the instruction stream beyond the opcode word itself. Extension
//! words (immediates, displacements, register masks) are consumed in the second phase,
//! when the executor resolves operand B and then operand A in encoding order.

use std::fmt::{Display, Error, Formatter};

use crate::error::{VmError, VmResult};
use crate::registers::Size;

/// A mode/register pair taken straight from the opcode word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ea {
    pub mode: u8,
    pub reg: u8,
}

impl Ea {
    pub fn new(mode: u16, reg: u16) -> Ea {
        Ea {
            mode: (mode & 7) as u8,
            reg: (reg & 7) as u8,
        }
    }

    /// The low six bits of an opcode: mode in 5-3, register in 2-0.
    pub fn from_low_bits(word: u16) -> Ea {
        Ea::new(word >> 3, word)
    }

    pub fn data(reg: u8) -> Ea {
        Ea { mode: 0, reg }
    }

    pub fn immediate() -> Ea {
        Ea { mode: 7, reg: 4 }
    }

    /// Register direct forms have no memory address.
    pub fn is_register(&self) -> bool {
        self.mode < 2
    }
}

impl Display for Ea {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match (self.mode, self.reg) {
            (0, r) => write!(f, "d{}", r),
            (1, r) => write!(f, "a{}", r),
            (2, r) => write!(f, "(a{})", r),
            (3, r) => write!(f, "(a{})+", r),
            (4, r) => write!(f, "-(a{})", r),
            (5, r) => write!(f, "d16(a{})", r),
            (6, r) => write!(f, "d8(a{},xn)", r),
            (7, 0) => write!(f, "abs.w"),
            (7, 1) => write!(f, "abs.l"),
            (7, 2) => write!(f, "d16(pc)"),
            (7, 3) => write!(f, "d8(pc,xn)"),
            (7, 4) => write!(f, "#imm"),
            (m, r) => write!(f, "?{}/{}", m, r),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Or,
    And,
    Sub,
    Add,
    Eor,
    Cmp,
}

impl AluOp {
    fn name(self) -> &'static str {
        match self {
            AluOp::Or => "or",
            AluOp::And => "and",
            AluOp::Sub => "sub",
            AluOp::Add => "add",
            AluOp::Eor => "eor",
            AluOp::Cmp => "cmp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOp {
    Test,
    Change,
    Clear,
    Set,
}

impl BitOp {
    fn from_bits(bits: u16) -> BitOp {
        match bits & 3 {
            0 => BitOp::Test,
            1 => BitOp::Change,
            2 => BitOp::Clear,
            _ => BitOp::Set,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BitOp::Test => "btst",
            BitOp::Change => "bchg",
            BitOp::Clear => "bclr",
            BitOp::Set => "bset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftKind {
    Arithmetic,
    Logical,
    RotateExtend,
    Rotate,
}

impl ShiftKind {
    fn from_bits(bits: u16) -> ShiftKind {
        match bits & 3 {
            0 => ShiftKind::Arithmetic,
            1 => ShiftKind::Logical,
            2 => ShiftKind::RotateExtend,
            _ => ShiftKind::Rotate,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ShiftKind::Arithmetic => "as",
            ShiftKind::Logical => "ls",
            ShiftKind::RotateExtend => "rox",
            ShiftKind::Rotate => "ro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftCount {
    /// 1-8, already mapped from the 0 encoding
    Immediate(u8),
    /// Data register holding the count
    Register(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Clr,
    Neg,
    Not,
    Tst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    /// ORI/ANDI/EORI to CCR
    CcrImmediate { op: AluOp },
    /// ORI ANDI SUBI ADDI EORI CMPI
    Immediate { op: AluOp, size: Size, dst: Ea },
    /// Bit number in an extension word
    BitStatic { op: BitOp, dst: Ea },
    /// Bit number in a data register
    BitDynamic { op: BitOp, bit_reg: u8, dst: Ea },
    Move { size: Size, src: Ea, dst: Ea },
    Moveq { reg: u8, data: i8 },
    Lea { reg: u8, src: Ea },
    Pea { src: Ea },
    Jmp { target: Ea },
    Jsr { target: Ea },
    Rts,
    Nop,
    Unary { op: UnaryOp, size: Size, dst: Ea },
    Swap { reg: u8 },
    /// Byte to word (`Size::Word`) or word to long (`Size::Long`)
    Ext { reg: u8, size: Size },
    Movem { to_memory: bool, size: Size, ea: Ea },
    MoveToCcr { src: Ea },
    Quick { add: bool, data: u8, size: Size, dst: Ea },
    Scc { cond: u8, dst: Ea },
    Dbcc { cond: u8, reg: u8 },
    /// Condition 0 is BRA, 1 is BSR
    Branch { cond: u8, disp: i8 },
    /// Data register forms; `to_ea` when the register is the source
    Alu { op: AluOp, size: Size, reg: u8, ea: Ea, to_ea: bool },
    /// ADDA SUBA CMPA
    AddressAlu { op: AluOp, size: Size, reg: u8, src: Ea },
    Cmpm { size: Size, src: u8, dst: u8 },
    Mul { signed: bool, reg: u8, src: Ea },
    Div { signed: bool, reg: u8, src: Ea },
    /// Register indices in the combined 0-15 bank
    Exg { rx: u8, ry: u8 },
    Shift { kind: ShiftKind, left: bool, size: Size, count: ShiftCount, reg: u8 },
    ShiftMemory { kind: ShiftKind, left: bool, dst: Ea },
    LineA(u16),
    LineF(u16),
}

fn unimplemented(opcode: u16, pc: u32) -> VmError {
    VmError::UnimplementedOpcode { opcode, pc }
}

/// Size field used by MOVE (01 byte, 11 word, 10 long).
fn move_size(bits: u16) -> Option<Size> {
    match bits & 3 {
        1 => Some(Size::Byte),
        3 => Some(Size::Word),
        2 => Some(Size::Long),
        _ => None,
    }
}

impl Instruction {
    /// Decode `opcode`, fetched from `pc`, into an instruction.
    pub fn decode(opcode: u16, pc: u32) -> VmResult<Instruction> {
        let ea = Ea::from_low_bits(opcode);
        let reg_hi = ((opcode >> 9) & 7) as u8;
        let opmode = (opcode >> 6) & 7;

        let inst = match opcode >> 12 {
            0x0 => Self::decode_immediate_group(opcode, pc)?,

            0x1..=0x3 => {
                let size = move_size(opcode >> 12).ok_or_else(|| unimplemented(opcode, pc))?;
                Instruction::Move {
                    size,
                    src: ea,
                    dst: Ea::new(opcode >> 6, opcode >> 9),
                }
            }

            0x4 => Self::decode_misc(opcode, pc)?,

            0x5 => {
                let cond = ((opcode >> 8) & 0xf) as u8;
                match Size::from_bits(opcode >> 6) {
                    Some(size) => Instruction::Quick {
                        add: opcode & 0x0100 == 0,
                        data: if reg_hi == 0 { 8 } else { reg_hi },
                        size,
                        dst: ea,
                    },
                    None if ea.mode == 1 => Instruction::Dbcc { cond, reg: ea.reg },
                    None => Instruction::Scc { cond, dst: ea },
                }
            }

            0x6 => Instruction::Branch {
                cond: ((opcode >> 8) & 0xf) as u8,
                disp: opcode as u8 as i8,
            },

            0x7 if opcode & 0x0100 == 0 => Instruction::Moveq {
                reg: reg_hi,
                data: opcode as u8 as i8,
            },

            0x8 | 0xc => {
                let logic = if opcode >> 12 == 0x8 { AluOp::Or } else { AluOp::And };
                let signed = opmode == 7;
                match opmode {
                    3 | 7 if logic == AluOp::Or => Instruction::Div { signed, reg: reg_hi, src: ea },
                    3 | 7 => Instruction::Mul { signed, reg: reg_hi, src: ea },
                    4..=6 if ea.mode < 2 => match (logic, opcode & 0x1f8) {
                        (AluOp::And, 0x140) => Instruction::Exg { rx: reg_hi, ry: ea.reg },
                        (AluOp::And, 0x148) => Instruction::Exg { rx: reg_hi + 8, ry: ea.reg + 8 },
                        (AluOp::And, 0x188) => Instruction::Exg { rx: reg_hi, ry: ea.reg + 8 },
                        _ => return Err(unimplemented(opcode, pc)),
                    },
                    _ => Self::alu(logic, opcode, reg_hi, ea, pc)?,
                }
            }

            0x9 | 0xd => {
                let op = if opcode >> 12 == 0x9 { AluOp::Sub } else { AluOp::Add };
                match opmode {
                    3 => Instruction::AddressAlu { op, size: Size::Word, reg: reg_hi, src: ea },
                    7 => Instruction::AddressAlu { op, size: Size::Long, reg: reg_hi, src: ea },
                    4..=6 if ea.mode < 2 => return Err(unimplemented(opcode, pc)),
                    _ => Self::alu(op, opcode, reg_hi, ea, pc)?,
                }
            }

            0xb => match opmode {
                0..=2 => Self::alu(AluOp::Cmp, opcode, reg_hi, ea, pc)?,
                3 => Instruction::AddressAlu { op: AluOp::Cmp, size: Size::Word, reg: reg_hi, src: ea },
                7 => Instruction::AddressAlu { op: AluOp::Cmp, size: Size::Long, reg: reg_hi, src: ea },
                _ if ea.mode == 1 => Instruction::Cmpm {
                    size: Size::from_bits(opmode).ok_or_else(|| unimplemented(opcode, pc))?,
                    src: ea.reg,
                    dst: reg_hi,
                },
                _ => Self::alu(AluOp::Eor, opcode, reg_hi, ea, pc)?,
            },

            0xe => {
                let kind_bits = if opmode & 3 == 3 { opcode >> 9 } else { opcode >> 3 };
                let kind = ShiftKind::from_bits(kind_bits);
                let left = opcode & 0x0100 != 0;
                match Size::from_bits(opcode >> 6) {
                    None => Instruction::ShiftMemory { kind, left, dst: ea },
                    Some(size) => Instruction::Shift {
                        kind,
                        left,
                        size,
                        count: if opcode & 0x20 != 0 {
                            ShiftCount::Register(reg_hi)
                        } else if reg_hi == 0 {
                            ShiftCount::Immediate(8)
                        } else {
                            ShiftCount::Immediate(reg_hi)
                        },
                        reg: ea.reg,
                    },
                }
            }

            0xa => Instruction::LineA(opcode),
            0xf => Instruction::LineF(opcode),

            _ => return Err(unimplemented(opcode, pc)),
        };
        Ok(inst)
    }

    fn alu(op: AluOp, opcode: u16, reg: u8, ea: Ea, pc: u32) -> VmResult<Instruction> {
        let size = Size::from_bits(opcode >> 6).ok_or_else(|| unimplemented(opcode, pc))?;
        Ok(Instruction::Alu {
            op,
            size,
            reg,
            ea,
            to_ea: opcode & 0x0100 != 0,
        })
    }

    fn decode_immediate_group(opcode: u16, pc: u32) -> VmResult<Instruction> {
        let ea = Ea::from_low_bits(opcode);
        if opcode & 0x0100 != 0 {
            if ea.mode == 1 {
                // MOVEP
                return Err(unimplemented(opcode, pc));
            }
            return Ok(Instruction::BitDynamic {
                op: BitOp::from_bits(opcode >> 6),
                bit_reg: ((opcode >> 9) & 7) as u8,
                dst: ea,
            });
        }

        let op = match (opcode >> 9) & 7 {
            0 => AluOp::Or,
            1 => AluOp::And,
            2 => AluOp::Sub,
            3 => AluOp::Add,
            4 => {
                return Ok(Instruction::BitStatic {
                    op: BitOp::from_bits(opcode >> 6),
                    dst: ea,
                })
            }
            5 => AluOp::Eor,
            6 => AluOp::Cmp,
            _ => return Err(unimplemented(opcode, pc)),
        };

        // to CCR (0x3c) and to SR (0x7c) both only touch the condition flags here
        if opcode & 0x00bf == 0x003c && matches!(op, AluOp::Or | AluOp::And | AluOp::Eor) {
            return Ok(Instruction::CcrImmediate { op });
        }

        let size = Size::from_bits(opcode >> 6).ok_or_else(|| unimplemented(opcode, pc))?;
        Ok(Instruction::Immediate { op, size, dst: ea })
    }

    fn decode_misc(opcode: u16, pc: u32) -> VmResult<Instruction> {
        let ea = Ea::from_low_bits(opcode);
        let reg_hi = ((opcode >> 9) & 7) as u8;

        if opcode == 0x4e75 {
            return Ok(Instruction::Rts);
        }
        if opcode == 0x4e71 {
            return Ok(Instruction::Nop);
        }
        if opcode & 0x01c0 == 0x01c0 {
            return Ok(Instruction::Lea { reg: reg_hi, src: ea });
        }

        let inst = match opcode & 0x0fc0 {
            0x0e80 => Instruction::Jsr { target: ea },
            0x0ec0 => Instruction::Jmp { target: ea },
            0x0840 if ea.mode == 0 => Instruction::Swap { reg: ea.reg },
            0x0840 => Instruction::Pea { src: ea },
            0x0880 | 0x08c0 | 0x0c80 | 0x0cc0 => {
                let size = if opcode & 0x40 != 0 { Size::Long } else { Size::Word };
                if opcode & 0x0400 == 0 && ea.mode == 0 {
                    Instruction::Ext { reg: ea.reg, size }
                } else {
                    Instruction::Movem {
                        to_memory: opcode & 0x0400 == 0,
                        size,
                        ea,
                    }
                }
            }
            0x04c0 => Instruction::MoveToCcr { src: ea },
            _ => {
                let op = match (opcode >> 8) & 0xf {
                    0x2 => UnaryOp::Clr,
                    0x4 => UnaryOp::Neg,
                    0x6 => UnaryOp::Not,
                    0xa => UnaryOp::Tst,
                    _ => return Err(unimplemented(opcode, pc)),
                };
                let size = Size::from_bits(opcode >> 6).ok_or_else(|| unimplemented(opcode, pc))?;
                Instruction::Unary { op, size, dst: ea }
            }
        };
        Ok(inst)
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match *self {
            Instruction::CcrImmediate { op } => write!(f, "{}i #imm,ccr", op.name()),
            Instruction::Immediate { op, size, dst } => {
                write!(f, "{}i.{} #imm,{}", op.name(), size.suffix(), dst)
            }
            Instruction::BitStatic { op, dst } => write!(f, "{} #imm,{}", op.name(), dst),
            Instruction::BitDynamic { op, bit_reg, dst } => write!(f, "{} d{},{}", op.name(), bit_reg, dst),
            Instruction::Move { size, src, dst } if dst.mode == 1 => {
                write!(f, "movea.{} {},{}", size.suffix(), src, dst)
            }
            Instruction::Move { size, src, dst } => write!(f, "move.{} {},{}", size.suffix(), src, dst),
            Instruction::Moveq { reg, data } => write!(f, "moveq #{},d{}", data, reg),
            Instruction::Lea { reg, src } => write!(f, "lea {},a{}", src, reg),
            Instruction::Pea { src } => write!(f, "pea {}", src),
            Instruction::Jmp { target } => write!(f, "jmp {}", target),
            Instruction::Jsr { target } => write!(f, "jsr {}", target),
            Instruction::Rts => write!(f, "rts"),
            Instruction::Nop => write!(f, "nop"),
            Instruction::Unary { op, size, dst } => {
                write!(f, "{}.{} {}", format!("{:?}", op).to_lowercase(), size.suffix(), dst)
            }
            Instruction::Swap { reg } => write!(f, "swap d{}", reg),
            Instruction::Ext { reg, size } => write!(f, "ext.{} d{}", size.suffix(), reg),
            Instruction::Movem { to_memory: true, size, ea } => write!(f, "movem.{} #mask,{}", size.suffix(), ea),
            Instruction::Movem { size, ea, .. } => write!(f, "movem.{} {},#mask", size.suffix(), ea),
            Instruction::MoveToCcr { src } => write!(f, "move {},ccr", src),
            Instruction::Quick { add, data, size, dst } => write!(
                f,
                "{}q.{} #{},{}",
                if add { "add" } else { "sub" },
                size.suffix(),
                data,
                dst
            ),
            Instruction::Scc { cond, dst } => write!(f, "s{} {}", condition_name(cond), dst),
            Instruction::Dbcc { cond, reg } => write!(f, "db{} d{},disp", condition_name(cond), reg),
            Instruction::Branch { cond: 0, disp } => write!(f, "bra {}", disp),
            Instruction::Branch { cond: 1, disp } => write!(f, "bsr {}", disp),
            Instruction::Branch { cond, disp } => write!(f, "b{} {}", condition_name(cond), disp),
            Instruction::Alu { op, size, reg, ea, to_ea: true } => {
                write!(f, "{}.{} d{},{}", op.name(), size.suffix(), reg, ea)
            }
            Instruction::Alu { op, size, reg, ea, .. } => {
                write!(f, "{}.{} {},d{}", op.name(), size.suffix(), ea, reg)
            }
            Instruction::AddressAlu { op, size, reg, src } => {
                write!(f, "{}a.{} {},a{}", op.name(), size.suffix(), src, reg)
            }
            Instruction::Cmpm { size, src, dst } => write!(f, "cmpm.{} (a{})+,(a{})+", size.suffix(), src, dst),
            Instruction::Mul { signed, reg, src } => {
                write!(f, "mul{} {},d{}", if signed { "s" } else { "u" }, src, reg)
            }
            Instruction::Div { signed, reg, src } => {
                write!(f, "div{} {},d{}", if signed { "s" } else { "u" }, src, reg)
            }
            Instruction::Exg { rx, ry } => write!(f, "exg r{},r{}", rx, ry),
            Instruction::Shift { kind, left, size, count, reg } => {
                let dir = if left { "l" } else { "r" };
                match count {
                    ShiftCount::Immediate(n) => write!(f, "{}{}.{} #{},d{}", kind.name(), dir, size.suffix(), n, reg),
                    ShiftCount::Register(r) => write!(f, "{}{}.{} d{},d{}", kind.name(), dir, size.suffix(), r, reg),
                }
            }
            Instruction::ShiftMemory { kind, left, dst } => {
                write!(f, "{}{}.w {}", kind.name(), if left { "l" } else { "r" }, dst)
            }
            Instruction::LineA(w) => write!(f, "ext {:#06x}", w),
            Instruction::LineF(w) => write!(f, "fline {:#06x}", w),
        }
    }
}

fn condition_name(cond: u8) -> &'static str {
    const NAMES: [&str; 16] = [
        "t", "f", "hi", "ls", "cc", "cs", "ne", "eq", "vc", "vs", "pl", "mi", "ge", "lt", "gt", "le",
    ];
    NAMES[(cond & 0xf) as usize]
}
