use std::fs;
use std::path::Path;

use log::{debug, error, info, trace, warn};

use crate::animation::{AnimationState, Position};
use crate::error::{VmError, VmResult};
use crate::header::{Header, HEADER_SIZE};
use crate::hints::{self, Hint};
use crate::host::Host;
use crate::instruction::Instruction;
use crate::memory::MemoryImage;
use crate::picture::{Graphics, Picture};
use crate::random::{GameRand, RandMode};
use crate::registers::{Registers, Size};
use crate::sound::SoundBank;
use crate::text::{CharOut, StringCursor};
use crate::undo::UndoManager;

/// What `Vm::load` managed to attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    TextOnly = 1,
    WithGraphics = 2,
}

/// The picture currently on screen, kept so animation frames can be drawn over it.
#[derive(Debug, Clone)]
pub(crate) struct ShownPicture {
    pub(crate) id: u32,
    pub(crate) mode: u8,
    pub(crate) picture: Picture,
}

/// The story-file virtual machine
pub struct Vm {
    pub(crate) header: Header,
    pub(crate) regs: Registers,
    pub(crate) mem: MemoryImage,
    /// First `undo_size` bytes as loaded, for restart
    pristine: Vec<u8>,
    pub(crate) undo: UndoManager,
    pub(crate) out: CharOut,
    pub(crate) string: StringCursor,
    pub(crate) rng: GameRand,
    /// F-line shortcut routine (version 1) and table (version 2 and later)
    pub(crate) fl_sub: u32,
    pub(crate) fl_tab: u32,
    pub(crate) fl_size: u32,
    /// Find-property fix-up table
    pub(crate) fp_tab: u32,
    pub(crate) fp_size: u32,
    pub(crate) properties: u32,
    pub(crate) graphics: Option<Graphics>,
    pub(crate) animation: Option<AnimationState>,
    pub(crate) shown: Option<ShownPicture>,
    pub(crate) hints: Option<Vec<Hint>>,
    pub(crate) sound: Option<SoundBank>,
    running: bool,
    pub(crate) i_count: u32,
    /// Set while an ADDQ/SUBQ executes
    pub(crate) quick_flag: bool,
    magnetic_windows: bool,
}

impl Vm {
    /// Build a machine from a complete story image. No graphics, hints or sound.
    pub fn from_story_bytes(bytes: &[u8], rand_mode: RandMode) -> VmResult<Vm> {
        let header = Header::new(bytes)?;
        debug!("story header: {}", header);
        if bytes.len() < header.file_len() {
            return Err(VmError::malformed(
                "story file",
                format!("{} bytes, header declares {}", bytes.len(), header.file_len()),
            ));
        }

        let mut at = HEADER_SIZE;
        let mut section = |len: u32| {
            let s = bytes[at..at + len as usize].to_vec();
            at += len as usize;
            s
        };
        let code = section(header.code_size);
        let strings = section(header.string_size);
        let strings2 = section(header.string2_size);
        let dict = if header.has_separate_dict() {
            Some(section(header.dict_size))
        } else {
            None
        };

        let mem = MemoryImage::new(
            header.version,
            code,
            header.mem_size(),
            strings,
            strings2,
            dict,
            header.decode_offset,
        )?;
        let undo_len = (header.undo_size as usize).min(mem.code().len());
        let pristine = mem.code()[..undo_len].to_vec();

        info!(
            "loaded version {} story, {:#x} bytes of memory",
            header.version,
            mem.mem_size()
        );
        Ok(Vm {
            header,
            regs: Registers::new(),
            mem,
            pristine,
            undo: UndoManager::new(),
            out: CharOut::default(),
            string: StringCursor::default(),
            rng: GameRand::new(rand_mode),
            fl_sub: 0,
            fl_tab: 0,
            fl_size: 0,
            fp_tab: 0,
            fp_size: 0,
            properties: 0,
            graphics: None,
            animation: None,
            shown: None,
            hints: None,
            sound: None,
            running: true,
            i_count: 0,
            quick_flag: false,
            magnetic_windows: false,
        })
    }

    /// Load a story file and whichever optional resource files are given. Problems with
    /// the optional files are logged and otherwise ignored.
    pub fn load(
        story: &Path,
        graphics: Option<&Path>,
        hints: Option<&Path>,
        sound: Option<&Path>,
        rand_mode: RandMode,
    ) -> VmResult<(Vm, LoadStatus)> {
        let bytes = fs::read(story)?;
        let mut vm = Vm::from_story_bytes(&bytes, rand_mode)?;

        let mut status = LoadStatus::TextOnly;
        if let Some(path) = graphics {
            match fs::read(path).map_err(VmError::from).and_then(|b| vm.attach_graphics(b)) {
                Ok(()) => status = LoadStatus::WithGraphics,
                Err(e) => warn!("pictures disabled, {}: {}", path.display(), e),
            }
        }
        if let Some(path) = hints {
            if let Err(e) = fs::read(path).map_err(VmError::from).and_then(|b| vm.attach_hints(&b)) {
                warn!("hints disabled, {}: {}", path.display(), e);
            }
        }
        if let Some(path) = sound {
            if let Err(e) = fs::read(path).map_err(VmError::from).and_then(|b| vm.attach_sound(b)) {
                warn!("music disabled, {}: {}", path.display(), e);
            }
        }
        Ok((vm, status))
    }

    pub fn attach_graphics(&mut self, bytes: Vec<u8>) -> VmResult<()> {
        self.graphics = Some(Graphics::parse(bytes)?);
        Ok(())
    }

    pub fn attach_hints(&mut self, bytes: &[u8]) -> VmResult<()> {
        self.hints = Some(hints::parse(bytes)?);
        Ok(())
    }

    pub fn attach_sound(&mut self, bytes: Vec<u8>) -> VmResult<()> {
        self.sound = Some(SoundBank::parse(bytes)?);
        Ok(())
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    #[inline]
    pub fn version(&self) -> u8 {
        self.header.version
    }

    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    pub fn memory(&self) -> &MemoryImage {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut MemoryImage {
        &mut self.mem
    }

    pub fn instruction_count(&self) -> u32 {
        self.i_count
    }

    pub fn seed(&mut self, seed: u32) {
        self.rng.reseed(seed);
    }

    pub fn is_magnetic_windows(&self) -> bool {
        self.magnetic_windows
    }

    /// Titles from the Magnetic Windows collection loop their animations.
    pub fn set_magnetic_windows(&mut self, windows: bool) {
        self.magnetic_windows = windows;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        debug!("stopping at pc {:#07x}", self.regs.pc);
        self.running = false;
    }

    pub fn hints(&self) -> Option<&[Hint]> {
        self.hints.as_deref()
    }

    /// Put memory and registers back to their loaded state.
    pub fn restart(&mut self, host: &mut dyn Host) {
        info!("restarting story");
        self.mem.restore_prefix(&self.pristine);
        self.undo.invalidate();
        self.animation = None;
        self.shown = None;
        host.display_picture(0, None, 0);
        self.regs.reset();
        self.i_count = 0;
        self.string = StringCursor::default();
        self.running = true;
    }

    pub(crate) fn save_undo(&mut self) {
        let len = self.pristine.len();
        let memory = &self.mem.code()[..len];
        self.undo
            .save(memory, self.regs.bank(), self.i_count, self.regs.pc);
    }

    /// Go back one turn. Flags are left as they are.
    pub(crate) fn restore_undo(&mut self) -> bool {
        match self.undo.restore() {
            Some(r) => {
                self.mem.restore_prefix(&r.memory);
                self.regs.set_bank(r.regs);
                self.regs.pc = r.pc;
                self.i_count = r.instruction_count;
                true
            }
            None => false,
        }
    }

    pub fn undo_available(&self) -> bool {
        self.undo.available()
    }

    #[inline]
    pub(crate) fn fetch_word(&mut self) -> VmResult<u16> {
        let w = self.mem.read_u16(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(2);
        Ok(w)
    }

    #[inline]
    pub(crate) fn fetch_long(&mut self) -> VmResult<u32> {
        let l = self.mem.read_u32(self.regs.pc)?;
        self.regs.pc = self.regs.pc.wrapping_add(4);
        Ok(l)
    }

    pub(crate) fn push(&mut self, value: u32) -> VmResult<()> {
        let sp = self.regs.sp().wrapping_sub(4);
        self.regs.set_sp(sp);
        self.mem.write(sp, Size::Long, value)
    }

    pub(crate) fn pop(&mut self) -> VmResult<u32> {
        let sp = self.regs.sp();
        let value = self.mem.read_u32(sp)?;
        self.regs.set_sp(sp.wrapping_add(4));
        Ok(value)
    }

    /// Execute one instruction. Returns false once the game has stopped, either by
    /// request or because of a fatal error, which is reported to the host first.
    pub fn step(&mut self, host: &mut dyn Host) -> bool {
        if !self.running {
            return false;
        }
        if let Err(e) = self.execute_one(host) {
            error!("fatal error at pc {:#07x}: {}", self.regs.pc, e);
            host.fatal_error(&e.to_string());
            self.running = false;
        }
        self.running
    }

    /// Run until the game stops or `limit` instructions have executed. Returns the
    /// number of instructions executed, including the one that stopped the game.
    pub fn run(&mut self, host: &mut dyn Host, limit: Option<u64>) -> u64 {
        let mut executed = 0u64;
        while self.running && limit.map_or(true, |l| executed < l) {
            executed += 1;
            if !self.step(host) {
                break;
            }
        }
        executed
    }

    pub fn execute_one(&mut self, host: &mut dyn Host) -> VmResult<()> {
        if self.regs.pc == self.header.undo_pc {
            self.save_undo();
        }
        self.i_count = self.i_count.wrapping_add(1);

        let pc = self.regs.pc;
        let opcode = self.fetch_word()?;
        let inst = Instruction::decode(opcode, pc)?;
        trace!("{:06x}: {:04x} {}", pc, opcode, inst);
        self.quick_flag = false;
        self.execute(inst, host)
    }

    fn execute(&mut self, inst: Instruction, host: &mut dyn Host) -> VmResult<()> {
        match inst {
            Instruction::CcrImmediate { op } => self.exec_ccr_immediate(op),
            Instruction::Immediate { op, size, dst } => self.exec_immediate(op, size, dst),
            Instruction::BitStatic { op, dst } => {
                let bit = self.fetch_word()? as u32 & 0xff;
                self.exec_bit(op, bit, dst)
            }
            Instruction::BitDynamic { op, bit_reg, dst } => {
                let bit = self.regs.d(bit_reg as usize);
                self.exec_bit(op, bit, dst)
            }
            Instruction::Move { size, src, dst } => self.exec_move(size, src, dst),
            Instruction::Moveq { reg, data } => {
                let value = data as i32 as u32;
                self.regs.set_d(reg as usize, value);
                self.regs.flags.set_logic(value, Size::Long);
                Ok(())
            }
            Instruction::Lea { reg, src } => {
                let addr = self.address_of(src)?;
                self.regs.set_a(reg as usize, addr);
                Ok(())
            }
            Instruction::Pea { src } => {
                let addr = self.address_of(src)?;
                self.push(addr)
            }
            Instruction::Jmp { target } => {
                self.regs.pc = self.address_of(target)?;
                Ok(())
            }
            Instruction::Jsr { target } => {
                let addr = self.address_of(target)?;
                self.push(self.regs.pc)?;
                self.regs.pc = addr;
                Ok(())
            }
            Instruction::Rts => {
                self.regs.pc = self.pop()?;
                Ok(())
            }
            Instruction::Nop => Ok(()),
            Instruction::Unary { op, size, dst } => self.exec_unary(op, size, dst),
            Instruction::Swap { reg } => {
                let v = self.regs.d(reg as usize).rotate_left(16);
                self.regs.set_d(reg as usize, v);
                self.regs.flags.set_logic(v, Size::Long);
                Ok(())
            }
            Instruction::Ext { reg, size } => self.exec_ext(reg, size),
            Instruction::Movem { to_memory, size, ea } => self.exec_movem(to_memory, size, ea),
            Instruction::MoveToCcr { src } => {
                let op = self.resolve(src, Size::Word)?;
                let ccr = self.read_operand(op, Size::Word)?;
                self.regs.flags.from_ccr(ccr as u8);
                Ok(())
            }
            Instruction::Quick { add, data, size, dst } => self.exec_quick(add, data, size, dst),
            Instruction::Scc { cond, dst } => {
                let op = self.resolve(dst, Size::Byte)?;
                let value = if self.regs.flags.condition(cond) { 0xff } else { 0 };
                self.write_operand(op, Size::Byte, value)
            }
            Instruction::Dbcc { cond, reg } => self.exec_dbcc(cond, reg),
            Instruction::Branch { cond, disp } => self.exec_branch(cond, disp),
            Instruction::Alu { op, size, reg, ea, to_ea } => self.exec_alu(op, size, reg, ea, to_ea),
            Instruction::AddressAlu { op, size, reg, src } => self.exec_address_alu(op, size, reg, src),
            Instruction::Cmpm { size, src, dst } => self.exec_cmpm(size, src, dst),
            Instruction::Mul { signed, reg, src } => self.exec_mul(signed, reg, src),
            Instruction::Div { signed, reg, src } => self.exec_div(signed, reg, src),
            Instruction::Exg { rx, ry } => {
                let (x, y) = (rx as usize, ry as usize);
                let vx = self.regs.read(x, Size::Long);
                let vy = self.regs.read(y, Size::Long);
                self.regs.write(x, Size::Long, vy);
                self.regs.write(y, Size::Long, vx);
                Ok(())
            }
            Instruction::Shift { kind, left, size, count, reg } => {
                self.exec_shift(kind, left, size, count, reg)
            }
            Instruction::ShiftMemory { kind, left, dst } => self.exec_shift_memory(kind, left, dst),
            Instruction::LineA(word) => self.exec_extension(word, host),
            Instruction::LineF(word) => self.exec_line_f(word, host),
        }
    }

    /// Decode a picture for the host. Classic pictures are numbered; for named pictures
    /// `id` is a pointer to the NUL-terminated name in memory.
    pub fn extract_picture(&self, id: u32) -> VmResult<Option<Picture>> {
        match &self.graphics {
            None => Ok(None),
            Some(g @ Graphics::Classic { .. }) => g.extract1(id),
            Some(g @ Graphics::Windows { .. }) => {
                let name = self.mem.c_string(id, 8)?;
                Ok(g.extract2(&name)?.map(|(picture, _, _)| picture))
            }
        }
    }

    /// Decode frame `number` of the current animation.
    pub fn animation_frame(&self, number: usize) -> VmResult<Option<Picture>> {
        let palette = self.shown.as_ref().map(|s| s.picture.palette).unwrap_or([0; 16]);
        match &self.animation {
            Some(anim) => anim.frame(number, palette),
            None => Ok(None),
        }
    }

    pub fn animation_is_repeating(&self) -> bool {
        self.animation.as_ref().map_or(false, |a| a.is_repeating())
    }

    pub fn has_animation(&self) -> bool {
        self.animation.as_ref().map_or(false, |a| !a.is_finished())
    }

    /// Advance the current animation by one tick.
    pub fn animate(&mut self) -> VmResult<Option<Vec<Position>>> {
        let windows = self.magnetic_windows;
        match self.animation.as_mut() {
            Some(anim) => anim.next_positions(windows),
            None => Ok(None),
        }
    }

    /// Advance the animation and send the composited picture to the host. Returns false
    /// once there is nothing left to animate.
    pub fn animate_to_host(&mut self, host: &mut dyn Host) -> VmResult<bool> {
        let positions = match self.animate()? {
            Some(p) => p,
            None => return Ok(self.has_animation()),
        };
        let shown = match &self.shown {
            Some(s) => s.clone(),
            None => return Ok(false),
        };
        let mut canvas = shown.picture;
        for pos in positions {
            if pos.frame < 0 {
                continue;
            }
            if let Some(frame) = self.animation_frame(pos.frame as usize)? {
                canvas.blit(&frame, pos.x as i32, pos.y as i32);
            }
        }
        host.display_picture(shown.id, Some(&canvas), shown.mode);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_headless::HeadlessHost;
    use crate::registers::Flags;
    use crate::test_utils::StoryBuilder;
    use test_log::test;

    #[test]
    fn test_undo_restores_turn_start_but_not_flags() {
        let mut vm = StoryBuilder::new(2)
            .words(
                0,
                &[
                    0x7005, // moveq #5,d0
                    0x5278, 0x0200, // addq.w #1,$200.w
                    0x2440, // movea.l d0,a2
                    0x60f6, // bra.s 0
                ],
            )
            .undo_pc(0)
            .build();
        for n in 0..8 {
            vm.regs.set_d(n, 0x100 + n as u32);
            vm.regs.set_a(n, 0x200 + n as u32);
        }
        vm.mem.write_u16(0x200, 0x1234).unwrap();
        vm.mem.write_u8(0x7ff0, 0xaa).unwrap();

        let bank = *vm.regs.bank();
        let region = vm.mem.code()[..0x8000].to_vec();

        // first pass snapshots the state above, the second pass snapshots the next turn
        let mut host = HeadlessHost::new();
        for _ in 0..6 {
            assert!(vm.step(&mut host));
        }
        assert_eq!(vm.regs.pc, 6);
        assert_eq!(vm.i_count, 6);

        vm.regs.set_d(3, 0xdead);
        vm.regs.set_a(4, 0xbeef);
        vm.mem.write_u8(0x7ff0, 0x55).unwrap();
        vm.mem.write_u8(0x9000, 0x77).unwrap();
        let flags = Flags {
            zero: true,
            negative: true,
            carry: true,
            overflow: true,
        };
        vm.regs.flags = flags;

        assert!(vm.restore_undo());
        assert_eq!(vm.regs.bank(), &bank);
        assert_eq!(vm.regs.pc, 0);
        assert_eq!(vm.i_count, 0);
        assert_eq!(&vm.mem.code()[..0x8000], &region[..]);
        assert_eq!(vm.regs.flags, flags);
        // outside the undo region
        assert_eq!(vm.mem.read_u8(0x9000).unwrap(), 0x77);
        assert!(!vm.restore_undo());
    }
}
