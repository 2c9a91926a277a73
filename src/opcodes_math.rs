/// Arithmetic and logical operations
///
/// This module handles:
/// - ADD/SUB in register, immediate, quick and address forms
/// - CMP, CMPA, CMPM and CMPI, which only set flags
/// - AND/OR/EOR and their immediate and CCR forms
/// - CLR, NEG, NOT, TST, EXT, MULU/MULS and DIVU/DIVS
///
/// Flag behaviour follows the story format, not the real processor: there is no extend
/// flag, carry after ADD compares the re-read source with the result, and later formats
/// leave the flags alone after ADDQ/SUBQ.
use crate::addressing::Operand;
use crate::error::{VmError, VmResult};
use crate::instruction::{AluOp, Ea, UnaryOp};
use crate::registers::Size;
use crate::vm::Vm;

impl Vm {
    /// Flags after ADD/SUB are skipped for quick forms from format 3 on.
    fn arithmetic_sets_flags(&self) -> bool {
        self.version() < 3 || !self.quick_flag
    }

    /// `a += b`. The source is read again after the write, so when both operands overlap
    /// the carry test sees the updated value.
    pub(crate) fn do_add(&mut self, size: Size, a: Operand, b: Operand) -> VmResult<()> {
        let dst = self.read_operand(a, size)?;
        let src = self.read_operand(b, size)?;
        let result = dst.wrapping_add(src) & size.mask();
        self.write_operand(a, size, result)?;
        let src_after = self.read_operand(b, size)?;
        self.regs.flags.carry = src_after > result;
        if self.arithmetic_sets_flags() {
            self.regs.flags.overflow = false;
            self.regs.flags.set_nz(result, size);
        }
        Ok(())
    }

    /// `a -= b`
    pub(crate) fn do_sub(&mut self, size: Size, a: Operand, b: Operand) -> VmResult<()> {
        let dst = self.read_operand(a, size)?;
        let src = self.read_operand(b, size)?;
        self.regs.flags.carry = src > dst;
        let result = dst.wrapping_sub(src) & size.mask();
        self.write_operand(a, size, result)?;
        if self.arithmetic_sets_flags() {
            self.regs.flags.overflow = false;
            self.regs.flags.set_nz(result, size);
        }
        Ok(())
    }

    /// Subtract into a scratch value; only the flags survive.
    pub(crate) fn do_cmp(&mut self, size: Size, a: Operand, b: Operand) -> VmResult<()> {
        let dst = self.read_operand(a, size)?;
        let src = self.read_operand(b, size)?;
        let flags = &mut self.regs.flags;
        flags.carry = src > dst;
        flags.overflow = false;
        flags.set_nz(dst.wrapping_sub(src), size);
        Ok(())
    }

    fn do_logic(&mut self, op: AluOp, size: Size, a: Operand, b: Operand) -> VmResult<()> {
        let dst = self.read_operand(a, size)?;
        let src = self.read_operand(b, size)?;
        let result = match op {
            AluOp::And => dst & src,
            AluOp::Or => dst | src,
            _ => dst ^ src,
        };
        self.write_operand(a, size, result)?;
        self.regs.flags.set_logic(result, size);
        Ok(())
    }

    fn do_op(&mut self, op: AluOp, size: Size, a: Operand, b: Operand) -> VmResult<()> {
        match op {
            AluOp::Add => self.do_add(size, a, b),
            AluOp::Sub => self.do_sub(size, a, b),
            AluOp::Cmp => self.do_cmp(size, a, b),
            AluOp::And | AluOp::Or | AluOp::Eor => self.do_logic(op, size, a, b),
        }
    }

    pub(crate) fn exec_alu(&mut self, op: AluOp, size: Size, reg: u8, ea: Ea, to_ea: bool) -> VmResult<()> {
        let dn = Operand::Register(reg as usize);
        let other = self.resolve(ea, size)?;
        if to_ea {
            self.do_op(op, size, other, dn)
        } else {
            self.do_op(op, size, dn, other)
        }
    }

    /// ORI ANDI SUBI ADDI EORI CMPI: the immediate comes before the destination's
    /// extension words.
    pub(crate) fn exec_immediate(&mut self, op: AluOp, size: Size, dst: Ea) -> VmResult<()> {
        let imm = self.resolve(Ea::immediate(), size)?;
        let a = self.resolve(dst, size)?;
        self.do_op(op, size, a, imm)
    }

    pub(crate) fn exec_ccr_immediate(&mut self, op: AluOp) -> VmResult<()> {
        let imm = self.fetch_word()? as u8;
        let ccr = self.regs.flags.to_ccr();
        let ccr = match op {
            AluOp::Or => ccr | imm,
            AluOp::And => ccr & imm,
            _ => ccr ^ imm,
        };
        self.regs.flags.from_ccr(ccr);
        Ok(())
    }

    /// ADDQ/SUBQ. An address register destination behaves like ADDA/SUBA.
    pub(crate) fn exec_quick(&mut self, add: bool, data: u8, size: Size, dst: Ea) -> VmResult<()> {
        if dst.mode == 1 {
            let an = 8 + dst.reg as usize;
            let v = self.regs.read(an, Size::Long);
            let v = if add { v.wrapping_add(data as u32) } else { v.wrapping_sub(data as u32) };
            self.regs.write(an, Size::Long, v);
            return Ok(());
        }
        let a = self.resolve(dst, size)?;
        self.quick_flag = true;
        let result = if add {
            self.do_add(size, a, Operand::Value(data as u32))
        } else {
            self.do_sub(size, a, Operand::Value(data as u32))
        };
        self.quick_flag = false;
        result
    }

    /// ADDA SUBA sign-extend the source into the whole register and leave the flags
    /// alone. CMPA compares at the operand size.
    pub(crate) fn exec_address_alu(&mut self, op: AluOp, size: Size, reg: u8, src: Ea) -> VmResult<()> {
        let b = self.resolve(src, size)?;
        let an = 8 + reg as usize;
        if op == AluOp::Cmp {
            return self.do_cmp(size, Operand::Register(an), b);
        }
        let value = size.sign_extend(self.read_operand(b, size)?);
        let current = self.regs.read(an, Size::Long);
        let result = if op == AluOp::Add {
            current.wrapping_add(value)
        } else {
            current.wrapping_sub(value)
        };
        self.regs.write(an, Size::Long, result);
        Ok(())
    }

    pub(crate) fn exec_cmpm(&mut self, size: Size, src: u8, dst: u8) -> VmResult<()> {
        let b = self.resolve(Ea { mode: 3, reg: src }, size)?;
        let a = self.resolve(Ea { mode: 3, reg: dst }, size)?;
        self.do_cmp(size, a, b)
    }

    pub(crate) fn exec_unary(&mut self, op: UnaryOp, size: Size, dst: Ea) -> VmResult<()> {
        let a = self.resolve(dst, size)?;
        match op {
            UnaryOp::Clr => {
                self.write_operand(a, size, 0)?;
                self.regs.flags.set_logic(0, size);
            }
            UnaryOp::Neg => {
                let v = self.read_operand(a, size)?;
                let result = 0u32.wrapping_sub(v) & size.mask();
                self.write_operand(a, size, result)?;
                self.regs.flags.carry = v != 0;
                self.regs.flags.overflow = false;
                self.regs.flags.set_nz(result, size);
            }
            UnaryOp::Not => {
                let result = !self.read_operand(a, size)? & size.mask();
                self.write_operand(a, size, result)?;
                self.regs.flags.set_logic(result, size);
            }
            UnaryOp::Tst => {
                let v = self.read_operand(a, size)?;
                self.regs.flags.set_logic(v, size);
            }
        }
        Ok(())
    }

    pub(crate) fn exec_ext(&mut self, reg: u8, size: Size) -> VmResult<()> {
        let r = reg as usize;
        let value = match size {
            Size::Long => Size::Word.sign_extend(self.regs.read(r, Size::Word)),
            _ => Size::Byte.sign_extend(self.regs.read(r, Size::Byte)),
        };
        self.regs.write(r, size, value);
        self.regs.flags.set_logic(value, size);
        Ok(())
    }

    /// 16 x 16 -> 32 bit multiply into a data register.
    pub(crate) fn exec_mul(&mut self, signed: bool, reg: u8, src: Ea) -> VmResult<()> {
        let b = self.resolve(src, Size::Word)?;
        let x = self.read_operand(b, Size::Word)?;
        let y = self.regs.read(reg as usize, Size::Word);
        let result = if signed {
            (x as u16 as i16 as i32).wrapping_mul(y as u16 as i16 as i32) as u32
        } else {
            x.wrapping_mul(y)
        };
        self.regs.set_d(reg as usize, result);
        self.regs.flags.set_logic(result, Size::Long);
        Ok(())
    }

    /// 32 / 16 bit divide: quotient in the low word, remainder in the high word. A
    /// quotient that does not fit sets overflow and leaves the register unchanged.
    pub(crate) fn exec_div(&mut self, signed: bool, reg: u8, src: Ea) -> VmResult<()> {
        let b = self.resolve(src, Size::Word)?;
        let divisor = self.read_operand(b, Size::Word)?;
        if divisor == 0 {
            return Err(VmError::DivideByZero);
        }
        let dividend = self.regs.d(reg as usize);
        let (quotient, remainder, fits) = if signed {
            let n = dividend as i32 as i64;
            let d = divisor as u16 as i16 as i64;
            let q = n / d;
            (q as u32, (n % d) as u32, q >= i16::MIN as i64 && q <= i16::MAX as i64)
        } else {
            let q = dividend / divisor;
            (q, dividend % divisor, q <= 0xffff)
        };
        let flags = &mut self.regs.flags;
        flags.carry = false;
        if !fits {
            flags.overflow = true;
            return Ok(());
        }
        flags.overflow = false;
        flags.set_nz(quotient, Size::Word);
        self.regs
            .set_d(reg as usize, (remainder & 0xffff) << 16 | (quotient & 0xffff));
        Ok(())
    }
}
