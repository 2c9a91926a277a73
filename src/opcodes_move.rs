/// Data movement: MOVE/MOVEA and MOVEM
use crate::addressing::Operand;
use crate::error::VmResult;
use crate::instruction::Ea;
use crate::registers::Size;
use crate::vm::Vm;

impl Vm {
    /// MOVE copies the source into the destination's aligned view; an address register
    /// destination is not sign extended. From format 2 on, moves into an address register
    /// leave the flags alone.
    pub(crate) fn exec_move(&mut self, size: Size, src: Ea, dst: Ea) -> VmResult<()> {
        let b = self.resolve(src, size)?;
        let a = self.resolve(dst, size)?;
        let value = self.read_operand(b, size)?;
        self.write_operand(a, size, value)?;
        if self.version() < 2 || dst.mode != 1 {
            self.regs.flags.set_logic(value, size);
        }
        Ok(())
    }

    pub(crate) fn exec_movem(&mut self, to_memory: bool, size: Size, ea: Ea) -> VmResult<()> {
        let mask = self.fetch_word()?;
        let step = size.bytes();
        let an = 8 + ea.reg as usize;

        match (to_memory, ea.mode) {
            // pre-decrement stores walk A7..D0 and the mask is reversed
            (true, 4) => {
                let mut addr = self.regs.read(an, Size::Long);
                for i in (0..16).rev() {
                    if mask & (1 << (15 - i)) != 0 {
                        addr = addr.wrapping_sub(step);
                        let v = self.regs.read(i, size);
                        self.mem.write(addr, size, v)?;
                    }
                }
                self.regs.write(an, Size::Long, addr);
            }
            (false, 3) => {
                let mut addr = self.regs.read(an, Size::Long);
                for i in 0..16 {
                    if mask & (1 << i) != 0 {
                        let v = size.sign_extend(self.mem.read(addr, size)?);
                        self.regs.write(i, Size::Long, v);
                        addr = addr.wrapping_add(step);
                    }
                }
                self.regs.write(an, Size::Long, addr);
            }
            _ => {
                let mut addr = self.address_of(ea)?;
                for i in 0..16 {
                    if mask & (1 << i) == 0 {
                        continue;
                    }
                    if to_memory {
                        let v = self.regs.read(i, size);
                        self.write_operand(Operand::Memory(addr), size, v)?;
                    } else {
                        let v = size.sign_extend(self.mem.read(addr, size)?);
                        self.regs.write(i, Size::Long, v);
                    }
                    addr = addr.wrapping_add(step);
                }
            }
        }
        Ok(())
    }
}
