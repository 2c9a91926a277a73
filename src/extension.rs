//! Extension opcodes
//!
//! The story format reserves the A-line (`0xA0DD`..`0xA0FF`) for calls into the
//! interpreter and the F-line for compact subroutine calls. Handlers run synchronously
//! and talk to the outside world through the `Host`.

use log::{debug, warn};

use crate::animation::AnimationState;
use crate::error::{VmError, VmResult};
use crate::host::{Host, UNDO_REQUEST};
use crate::picture::Graphics;
use crate::registers::Size;
use crate::vm::{ShownPicture, Vm};

const A0: usize = 8;
const A1: usize = 9;
const A3: usize = 11;
const A5: usize = 13;

/// Descriptor types for the resource opcode
const RESOURCE_PICTURE: u8 = 7;
const RESOURCE_MUSIC: u8 = 10;

/// Mode passed to the host for named pictures
const NAMED_PICTURE_MODE: u8 = 2;

const UNDONE: &str = "\n[Previous turn undone.]";
const NOTHING_TO_UNDO: &str = "\n[You can't \"undo\" what hasn't been done!]";

const MAX_RESOURCE_NAME: usize = 8;
const MAX_FILE_NAME: usize = 64;

impl Vm {
    pub(crate) fn exec_extension(&mut self, word: u16, host: &mut dyn Host) -> VmResult<()> {
        if word >> 8 != 0xa0 || (word & 0xff) < 0xdd {
            return Err(VmError::UnknownExtension(word));
        }
        match word & 0xff {
            0xdd | 0xe0 | 0xef | 0xfe | 0xff => {}
            0xde => self.regs.write(1, Size::Byte, 1),
            0xdf => self.show_resource(host)?,
            0xe1 => self.read_key(host),
            0xe2 => self.write_string(host)?,
            0xe3 => self.picture_request(host)?,
            0xe4 => {
                let sp = self.regs.sp().wrapping_add(4);
                self.regs.set_sp(sp);
                self.regs.pc = self.pop()?;
            }
            0xe5 => {
                self.regs.pc = self.pop()?;
                self.regs.flags.zero = true;
            }
            0xe6 => {
                self.regs.pc = self.pop()?;
                self.regs.flags.zero = false;
            }
            0xe7 => self.regs.flags.zero = true,
            0xe8 => self.regs.flags.zero = false,
            0xe9 => self.copy_dict_word()?,
            0xea => self.print_dict_word(host)?,
            0xeb => self.store_dict_byte()?,
            0xec => self.load_dict_byte()?,
            0xed => self.stop(),
            0xee => self.restart(host),
            0xf0 => {
                let c = self.regs.read(1, Size::Byte) as u8;
                self.char_out(c, host);
            }
            0xf1 => self.dict_lookup()?,
            0xf2 => self.find_property()?,
            0xf3 => host.flush_output(),
            0xf4 => self.save_region(host)?,
            0xf5 => self.load_region(host)?,
            0xf6 => {
                let bound = self.regs.read(1, Size::Word) as u16;
                let value = self.rng.below(bound);
                self.regs.write(1, Size::Word, value as u32);
            }
            0xf7 => {
                let value = self.rng.byte();
                self.regs.write(1, Size::Byte, value as u32);
            }
            0xf8 => {
                self.fl_sub = self.regs.read(A3, Size::Word);
                self.fl_tab = self.regs.read(A5, Size::Word);
                self.fl_size = self.regs.read(7, Size::Word) + 1;
                debug!(
                    "F-line: routine {:#06x}, table {:#06x} with {} entries",
                    self.fl_sub, self.fl_tab, self.fl_size
                );
            }
            0xf9 => {
                self.fp_tab = self.regs.read(A5, Size::Word);
                self.fp_size = self.regs.read(7, Size::Word);
            }
            0xfa => self.properties = self.regs.read(A0, Size::Word),
            0xfb => {
                let result = match self.hints.as_deref() {
                    Some(hints) => host.show_hints(hints),
                    None => 0,
                };
                self.regs.write(1, Size::Byte, result as u32);
            }
            0xfc => {
                let name = self.regs.read(A1, Size::Long);
                self.play_named_music(name, host)?;
            }
            0xfd => {
                let available = self.undo_available() as u32;
                self.regs.write(1, Size::Byte, available);
            }
            _ => return Err(VmError::UnknownExtension(word)),
        }
        Ok(())
    }

    pub(crate) fn exec_line_f(&mut self, word: u16, host: &mut dyn Host) -> VmResult<()> {
        match self.version() {
            0 => {
                let c = self.regs.read(1, Size::Byte) as u8;
                self.char_out(c, host);
            }
            1 => {
                self.push(self.regs.pc)?;
                self.regs.pc = self.fl_sub;
            }
            _ => {
                let index = (word & 0x0fff) as u32;
                if index >= self.fl_size {
                    return Err(VmError::UnknownExtension(word));
                }
                let target = self.mem.read_u16(self.fl_tab + 2 * index)? as u32;
                self.push(self.regs.pc)?;
                self.regs.pc = target;
            }
        }
        Ok(())
    }

    fn write_message(host: &mut dyn Host, text: &str) {
        for b in text.bytes() {
            host.write_char(b);
        }
    }

    /// Read one key into D1.B, handling undo requests on the way. Closed input stops
    /// the game.
    fn read_key(&mut self, host: &mut dyn Host) {
        host.flush_output();
        match host.read_char(true) {
            None => {
                debug!("input closed");
                self.stop();
            }
            Some(UNDO_REQUEST) => {
                if self.restore_undo() {
                    Self::write_message(host, UNDONE);
                } else {
                    Self::write_message(host, NOTHING_TO_UNDO);
                    self.regs.write(1, Size::Byte, b'\n' as u32);
                }
            }
            Some(c) => self.regs.write(1, Size::Byte, c as u32),
        }
    }

    /// Point A0 at the property record for object D0.W. Later games redirect high
    /// object numbers through a fix-up table.
    pub(crate) fn find_property(&mut self) -> VmResult<()> {
        let version = self.version();
        let object = self.regs.read(0, Size::Word) & 0x3fff;
        let entry = if version > 2 && object > self.fp_size {
            let index = ((self.fp_size.wrapping_sub(object)) ^ 0xffff) & 0xffff;
            let mut ptr = self.fp_tab.wrapping_add(index << 1);
            if version < 4 {
                ptr &= 0xffff;
            }
            self.mem.read_u16(ptr)? as u32
        } else {
            if version < 2 {
                let d0 = self.regs.d(0) & 0x7fff;
                self.regs.set_d(0, d0);
            } else {
                let d0 = self.regs.read(0, Size::Word) & 0x7fff;
                self.regs.write(0, Size::Word, d0);
            }
            self.regs.read(0, Size::Word)
        };
        let addr = (entry & 0x3fff) * 14 + self.properties;
        self.regs.write(A0, Size::Long, addr);
        Ok(())
    }

    fn clear_pictures(&mut self, host: &mut dyn Host) {
        self.animation = None;
        self.shown = None;
        host.display_picture(0, None, 0);
    }

    fn picture_request(&mut self, host: &mut dyn Host) -> VmResult<()> {
        if self.regs.d(1) == 0 && (self.version() < 4 || self.regs.d(6) == 0) {
            self.clear_pictures(host);
            return Ok(());
        }
        let id = self.regs.read(0, Size::Byte);
        let mode = self.regs.read(1, Size::Byte) as u8;
        self.show_picture(id, mode, host);
        Ok(())
    }

    /// Numbered pictures come from classic graphics files only. A picture that fails to
    /// decode is skipped.
    fn show_picture(&mut self, id: u32, mode: u8, host: &mut dyn Host) {
        let picture = match &self.graphics {
            Some(g @ Graphics::Classic { .. }) => match g.extract1(id) {
                Ok(p) => p,
                Err(e) => {
                    warn!("picture {}: {}", id, e);
                    None
                }
            },
            _ => None,
        };
        self.animation = None;
        host.display_picture(id, picture.as_ref(), mode);
        self.shown = picture.map(|picture| ShownPicture { id, mode, picture });
    }

    fn show_resource(&mut self, host: &mut dyn Host) -> VmResult<()> {
        let descriptor = self.regs.read(A1, Size::Long);
        let name = descriptor.wrapping_add(3);
        match self.mem.read_u8(descriptor.wrapping_add(2))? {
            RESOURCE_PICTURE => self.show_named_picture(name, host),
            RESOURCE_MUSIC => self.play_named_music(name, host),
            other => {
                debug!("ignoring resource type {}", other);
                Ok(())
            }
        }
    }

    /// Show a picture from a Windows graphics file and start its animation.
    pub(crate) fn show_named_picture(&mut self, name_ptr: u32, host: &mut dyn Host) -> VmResult<()> {
        let name = self.mem.c_string(name_ptr, MAX_RESOURCE_NAME)?;
        let found = match &self.graphics {
            Some(g @ Graphics::Windows { .. }) => match g.extract2(&name) {
                Ok(Some((picture, block, anim_offset))) => {
                    let animation = match AnimationState::parse(&name, block, anim_offset) {
                        Ok(a) => a,
                        Err(e) => {
                            warn!("animation for '{}': {}", name, e);
                            None
                        }
                    };
                    Some((picture, animation))
                }
                Ok(None) => None,
                Err(e) => {
                    warn!("picture '{}': {}", name, e);
                    None
                }
            },
            _ => None,
        };

        match found {
            Some((picture, animation)) => {
                debug!("showing '{}' {}x{}", name, picture.width, picture.height);
                self.animation = animation;
                host.display_picture(name_ptr, Some(&picture), NAMED_PICTURE_MODE);
                self.shown = Some(ShownPicture {
                    id: name_ptr,
                    mode: NAMED_PICTURE_MODE,
                    picture,
                });
            }
            None => debug!("no picture named '{}'", name),
        }
        Ok(())
    }

    pub(crate) fn play_named_music(&mut self, name_ptr: u32, host: &mut dyn Host) -> VmResult<()> {
        let name = self.mem.c_string(name_ptr, MAX_RESOURCE_NAME)?;
        let bank = match &self.sound {
            Some(bank) => bank,
            None => return Ok(()),
        };
        if name.is_empty() {
            host.play_music(&[], 0);
            return Ok(());
        }
        match bank.tune(&name) {
            Ok(Some((data, tempo))) => host.play_music(data, tempo),
            Ok(None) => debug!("no tune named '{}'", name),
            Err(e) => warn!("tune '{}': {}", name, e),
        }
        Ok(())
    }

    /// File name for save/load. Only later games pass one, in A1.
    fn file_name(&self) -> VmResult<Option<String>> {
        let ptr = self.regs.read(A1, Size::Word);
        if self.version() >= 4 && ptr != 0 {
            Ok(Some(self.mem.c_string(ptr, MAX_FILE_NAME)?))
        } else {
            Ok(None)
        }
    }

    fn save_region(&mut self, host: &mut dyn Host) -> VmResult<()> {
        let name = self.file_name()?;
        let start = self.regs.read(A0, Size::Word);
        let len = self.regs.read(1, Size::Word) as usize;
        let data = self.mem.read_region(start, len)?;
        let status = host.save_file(name.as_deref(), &data);
        self.regs.write(1, Size::Byte, status as u32);
        Ok(())
    }

    fn load_region(&mut self, host: &mut dyn Host) -> VmResult<()> {
        let name = self.file_name()?;
        let start = self.regs.read(A0, Size::Word);
        let len = self.regs.read(1, Size::Word) as usize;
        let mut data = self.mem.read_region(start, len)?;
        let status = host.load_file(name.as_deref(), &mut data);
        self.mem.write_region(start, &data)?;
        self.regs.write(1, Size::Byte, status as u32);
        Ok(())
    }
}
