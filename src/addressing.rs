//! Second decode phase: effective address resolution.
//!
//! Resolving an operand consumes its extension words from the instruction stream, so
//! the executor must resolve operands in encoding order (source before destination).

use crate::error::{VmError, VmResult};
use crate::instruction::Ea;
use crate::registers::Size;
use crate::vm::Vm;

/// A resolved operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Index into the combined register bank (0-7 data, 8-15 address). Register operands
    /// have no address and cannot be used where one is required.
    Register(usize),
    /// Virtual pointer into memory
    Memory(u32),
    /// Quick constant; read only
    Value(u32),
}

impl Vm {
    /// Base plus index register plus 8-bit displacement, from one extension word.
    fn indexed(&mut self, base: u32) -> VmResult<u32> {
        let ext = self.fetch_word()?;
        let reg = (ext >> 12) as usize;
        let index = if ext & 0x0800 != 0 {
            self.regs.read(reg, Size::Long)
        } else {
            Size::Word.sign_extend(self.regs.read(reg, Size::Word))
        };
        let disp = Size::Byte.sign_extend(ext as u32);
        Ok(base.wrapping_add(index).wrapping_add(disp))
    }

    /// Resolve `ea` for an access of `size`, advancing the PC past any extension data
    /// and applying post-increment/pre-decrement to the address register.
    pub(crate) fn resolve(&mut self, ea: Ea, size: Size) -> VmResult<Operand> {
        let an = 8 + ea.reg as usize;
        let op = match ea.mode {
            0 => Operand::Register(ea.reg as usize),
            1 => Operand::Register(an),
            2 => Operand::Memory(self.regs.read(an, Size::Long)),
            3 => {
                let addr = self.regs.read(an, Size::Long);
                self.regs.write(an, Size::Long, addr.wrapping_add(size.bytes()));
                Operand::Memory(addr)
            }
            4 => {
                let addr = self.regs.read(an, Size::Long).wrapping_sub(size.bytes());
                self.regs.write(an, Size::Long, addr);
                Operand::Memory(addr)
            }
            5 => {
                let disp = Size::Word.sign_extend(self.fetch_word()? as u32);
                Operand::Memory(self.regs.read(an, Size::Long).wrapping_add(disp))
            }
            6 => {
                let base = self.regs.read(an, Size::Long);
                Operand::Memory(self.indexed(base)?)
            }
            _ => match ea.reg {
                // absolute short addresses are not sign extended
                0 => Operand::Memory(self.fetch_word()? as u32),
                1 => Operand::Memory(self.fetch_long()?),
                2 => {
                    let base = self.regs.pc;
                    let disp = Size::Word.sign_extend(self.fetch_word()? as u32);
                    Operand::Memory(base.wrapping_add(disp))
                }
                3 => {
                    let base = self.regs.pc;
                    Operand::Memory(self.indexed(base)?)
                }
                4 => {
                    // a byte immediate occupies the low half of a full word
                    let pc = self.regs.pc;
                    let (addr, len) = match size {
                        Size::Byte => (pc.wrapping_add(1), 2),
                        _ => (pc, size.bytes()),
                    };
                    self.regs.pc = pc.wrapping_add(len);
                    Operand::Memory(addr)
                }
                reg => return Err(VmError::IllegalAddressing { mode: 7, reg }),
            },
        };
        Ok(op)
    }

    /// Address of a control operand (LEA, PEA, JMP, JSR, MOVEM).
    pub(crate) fn address_of(&mut self, ea: Ea) -> VmResult<u32> {
        match self.resolve(ea, Size::Long)? {
            Operand::Memory(addr) => Ok(addr),
            _ => Err(VmError::IllegalAddressing {
                mode: ea.mode,
                reg: ea.reg,
            }),
        }
    }

    pub(crate) fn read_operand(&self, op: Operand, size: Size) -> VmResult<u32> {
        match op {
            Operand::Register(i) => Ok(self.regs.read(i, size)),
            Operand::Memory(addr) => self.mem.read(addr, size),
            Operand::Value(v) => Ok(v & size.mask()),
        }
    }

    /// Write the low `size` bits. Register writes keep the untouched upper bits.
    pub(crate) fn write_operand(&mut self, op: Operand, size: Size, value: u32) -> VmResult<()> {
        match op {
            Operand::Register(i) => {
                self.regs.write(i, size, value);
                Ok(())
            }
            Operand::Memory(addr) => self.mem.write(addr, size, value),
            Operand::Value(_) => Err(VmError::IllegalAddressing { mode: 7, reg: 4 }),
        }
    }
}
