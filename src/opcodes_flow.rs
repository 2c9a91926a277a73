/// Branches and loops: Bcc/BRA/BSR and DBcc
use crate::error::VmResult;
use crate::registers::Size;
use crate::vm::Vm;

impl Vm {
    /// An 8-bit displacement of zero means a 16-bit displacement follows. Either way the
    /// target is relative to the PC just past the opcode word.
    pub(crate) fn exec_branch(&mut self, cond: u8, disp: i8) -> VmResult<()> {
        let base = self.regs.pc;
        let offset = if disp == 0 {
            Size::Word.sign_extend(self.fetch_word()? as u32)
        } else {
            disp as i32 as u32
        };
        let target = base.wrapping_add(offset);

        match cond {
            // BSR
            1 => {
                self.push(self.regs.pc)?;
                self.regs.pc = target;
            }
            _ if self.regs.flags.condition(cond) => self.regs.pc = target,
            _ => {}
        }
        Ok(())
    }

    /// Unless the condition holds, decrement the low word of Dn and loop back while it
    /// has not wrapped to -1.
    pub(crate) fn exec_dbcc(&mut self, cond: u8, reg: u8) -> VmResult<()> {
        let base = self.regs.pc;
        let disp = Size::Word.sign_extend(self.fetch_word()? as u32);
        if self.regs.flags.condition(cond) {
            return Ok(());
        }
        let r = reg as usize;
        let counter = self.regs.read(r, Size::Word).wrapping_sub(1) & 0xffff;
        self.regs.write(r, Size::Word, counter);
        if counter != 0xffff {
            self.regs.pc = base.wrapping_add(disp);
        }
        Ok(())
    }
}
