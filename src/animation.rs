//! Sprite animation attached to `MaP2` pictures.
//!
//! The data following a picture's bit planes holds frame bitmaps (each optionally followed
//! by a transparency mask), position tables of (x, y, frame) triples, and a byte-coded
//! command stream. `AnimationState::next_positions` interprets that stream one tick at a
//! time and yields the placements to draw.

use std::collections::HashMap;

use lazy_static::lazy_static;
use log::{debug, trace};

use crate::error::{VmError, VmResult};
use crate::picture::{extract_frame, le16, le32, Mask, Picture};

pub const MAX_ANIMS: usize = 200;
pub const MAX_POSITIONS: usize = 20;
/// Placements returned by a single tick.
pub const MAX_FRAMES: usize = 20;
/// First two bytes after the planes of a picture that has no animation (`D0 5E`).
pub const NO_ANIMATION: u16 = 0x5ed0;

/// A per-title fix applied when a table is loaded at a given command offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TablePatch {
    Count(i16),
    Disable,
}

lazy_static! {
    /// Keyed by picture name and the command offset just after the load-table command.
    /// Only applied to titles outside the Magnetic Windows collection.
    static ref TABLE_PATCHES: HashMap<(&'static str, i32), TablePatch> = {
        let mut m = HashMap::new();
        m.insert(("catter", 96), TablePatch::Count(9));
        m.insert(("catter", 108), TablePatch::Disable);
        m.insert(("catter", 156), TablePatch::Disable);
        m
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub x: i16,
    pub y: i16,
    /// Zero-based frame index
    pub frame: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Frame {
    data: usize,
    size: usize,
    width: u16,
    height: u16,
    mask: Option<usize>,
}

/// Next position index and remaining repeats for one position table. -1 means idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableCursor {
    flag: i16,
    count: i16,
}

impl TableCursor {
    const IDLE: TableCursor = TableCursor { flag: -1, count: -1 };
}

#[derive(Debug, Clone)]
pub struct AnimationState {
    name: String,
    block: Vec<u8>,
    frames: Vec<Frame>,
    positions: Vec<Vec<Position>>,
    command_table: usize,
    command_index: i32,
    cursors: [TableCursor; MAX_POSITIONS],
    next_table: usize,
    repeating: bool,
    pos_table_index: i32,
    pos_table_max: i32,
}

impl AnimationState {
    /// Parse the animation data at `offset` in a picture block. Returns `None` when the
    /// block carries the "no animation" marker.
    pub fn parse(name: &str, block: &[u8], offset: usize) -> VmResult<Option<AnimationState>> {
        if le16(block, offset)? == NO_ANIMATION {
            return Ok(None);
        }
        let frame_count = le16(block, offset + 2)? as usize;
        if frame_count > MAX_ANIMS {
            return Err(VmError::Capacity("animation frames"));
        }

        let mut current = offset + 6;
        let mut frames = Vec::with_capacity(frame_count);
        for _ in 0..frame_count {
            let mut frame = Frame {
                data: current + 10,
                size: le32(block, current)? as usize,
                width: le16(block, current + 4)?,
                height: le16(block, current + 6)?,
                mask: None,
            };
            current += frame.size + 12;
            let value1 = le16(block, current - 2)?;
            let value2 = le16(block, current)?;
            if value1 == frame.width && value2 == frame.height {
                frame.mask = Some(current + 4);
                current += le16(block, current + 2)? as usize + 6;
            }
            frames.push(frame);
        }

        let table_count = le16(block, current - 2)? as usize;
        if table_count > MAX_POSITIONS {
            return Err(VmError::Capacity("animation position tables"));
        }
        let mut positions = Vec::with_capacity(table_count);
        for _ in 0..table_count {
            let count = le16(block, current + 2)? as usize;
            current += 4;
            if count > MAX_ANIMS {
                return Err(VmError::Capacity("animation positions"));
            }
            let mut table = Vec::with_capacity(count);
            for _ in 0..count {
                table.push(Position {
                    x: le16(block, current)? as i16,
                    y: le16(block, current + 2)? as i16,
                    frame: (le16(block, current + 4)? as i16).wrapping_sub(1),
                });
                current += 8;
            }
            positions.push(table);
        }

        debug!(
            "animation for '{}': {} frames, {} position tables, commands at {:#x}",
            name, frame_count, table_count, current
        );
        Ok(Some(AnimationState {
            name: name.to_string(),
            block: block.to_vec(),
            frames,
            positions,
            command_table: current,
            command_index: 0,
            cursors: [TableCursor::IDLE; MAX_POSITIONS],
            next_table: 1,
            repeating: false,
            pos_table_index: -1,
            pos_table_max: -1,
        }))
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    pub fn is_finished(&self) -> bool {
        self.command_index < 0
    }

    /// Decode animation frame `number` with its mask.
    pub fn frame(&self, number: usize, palette: [u16; 16]) -> VmResult<Option<Picture>> {
        let frame = match self.frames.get(number) {
            Some(f) => *f,
            None => return Ok(None),
        };
        let data = self
            .block
            .get(frame.data..)
            .ok_or_else(|| VmError::malformed("animation", "frame data truncated"))?;
        let pixels = extract_frame(data, frame.size, frame.width, frame.height)?;
        let mask = match frame.mask {
            Some(at) => {
                let bytes = self
                    .block
                    .get(at..)
                    .ok_or_else(|| VmError::malformed("animation", "frame mask truncated"))?;
                Some(Mask::from_bytes(bytes, frame.width, frame.height)?)
            }
            None => None,
        };
        Ok(Some(Picture {
            width: frame.width,
            height: frame.height,
            palette,
            pixels,
            mask,
        }))
    }

    fn command_byte(&mut self) -> VmResult<u8> {
        let at = self.command_table + self.command_index as usize;
        let b = *self
            .block
            .get(at)
            .ok_or_else(|| VmError::malformed("animation", "command stream truncated"))?;
        self.command_index += 1;
        Ok(b)
    }

    fn load_table(&mut self, table: usize, windows: bool) -> VmResult<()> {
        if table == 0 || table > MAX_POSITIONS {
            return Err(VmError::Capacity("animation position tables"));
        }
        let flag = self.command_byte()? as i16 - 1;
        let count = self.command_byte()? as i16 - 1;
        let cursor = &mut self.cursors[table - 1];
        cursor.flag = flag;
        cursor.count = count;

        if !windows {
            let at = self.command_index;
            let patch = TABLE_PATCHES
                .iter()
                .find(|((name, offset), _)| *name == self.name && *offset == at)
                .map(|(_, patch)| *patch);
            match patch {
                Some(TablePatch::Count(n)) => cursor.count = n,
                Some(TablePatch::Disable) => cursor.flag = -1,
                None => {}
            }
        }
        Ok(())
    }

    fn restart(&mut self) {
        self.command_index = 0;
        self.repeating = true;
        self.pos_table_index = -1;
        self.pos_table_max = -1;
        self.cursors = [TableCursor::IDLE; MAX_POSITIONS];
    }

    /// Advance one tick. `Ok(None)` means nothing to draw this tick, either because the
    /// stream ended or a pause command was read. An error ends the animation.
    pub fn next_positions(&mut self, windows: bool) -> VmResult<Option<Vec<Position>>> {
        if self.positions.is_empty() || self.command_index < 0 {
            return Ok(None);
        }
        match self.step(windows) {
            Err(e) => {
                self.command_index = -1;
                Err(e)
            }
            ok => ok,
        }
    }

    fn step(&mut self, windows: bool) -> VmResult<Option<Vec<Position>>> {
        loop {
            if self.pos_table_max >= 0 && self.pos_table_index < self.pos_table_max {
                let mut out = Vec::new();
                for (i, table) in self.positions.iter().enumerate() {
                    let cursor = &mut self.cursors[i];
                    if cursor.flag <= -1 {
                        continue;
                    }
                    if out.len() >= MAX_FRAMES {
                        return Err(VmError::Capacity("animation frames per tick"));
                    }
                    let pos = table
                        .get(cursor.flag as usize)
                        .copied()
                        .ok_or_else(|| VmError::malformed("animation", "position index out of range"))?;
                    out.push(pos);
                    if (cursor.flag as i32) < table.len() as i32 - 1 {
                        cursor.flag += 1;
                    }
                    if cursor.count > 0 {
                        cursor.count -= 1;
                    } else {
                        cursor.flag = -1;
                    }
                }
                self.pos_table_index += 1;
                if !out.is_empty() {
                    trace!("animation tick: {:?}", out);
                    return Ok(Some(out));
                }
            }

            let command = self.command_byte()?;
            self.pos_table_max = -1;
            self.pos_table_index = -1;
            match command {
                0x00 => {
                    self.command_index = -1;
                    return Ok(None);
                }
                0x01 => {
                    let table = self.command_byte()? as usize;
                    self.load_table(table, windows)?;
                }
                0x02 => {
                    self.pos_table_max = self.command_byte()? as i32;
                    self.pos_table_index = 0;
                }
                0x03 if windows => self.restart(),
                0x03 => {
                    self.command_index = -1;
                    return Ok(None);
                }
                0x04 => {
                    self.command_index += 3;
                    return Ok(None);
                }
                0x05 => {
                    let table = self.next_table;
                    self.load_table(table, windows)?;
                    self.next_table += 1;
                }
                other => return Err(VmError::AnimationCommand(other)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    /// No frames, one position table and the given command stream.
    fn block(positions: &[(i16, i16, u16)], commands: &[u8]) -> Vec<u8> {
        let mut b = vec![0xff, 0xff]; // anything but the no-animation marker
        b.extend_from_slice(&0u16.to_le_bytes()); // frame count
        b.extend_from_slice(&1u16.to_le_bytes()); // table count
        b.extend_from_slice(&[0, 0]);
        b.extend_from_slice(&(positions.len() as u16).to_le_bytes());
        for &(x, y, f) in positions {
            b.extend_from_slice(&x.to_le_bytes());
            b.extend_from_slice(&y.to_le_bytes());
            b.extend_from_slice(&f.to_le_bytes());
            b.extend_from_slice(&[0, 0]);
        }
        b.extend_from_slice(commands);
        b
    }

    #[test]
    fn test_no_animation_marker() {
        assert!(AnimationState::parse("x", &[0xd0, 0x5e], 0).unwrap().is_none());
        assert!(AnimationState::parse("x", &[0xd0, 0x5e, 0, 0, 0, 0], 0)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_zero_tail_is_an_animation() {
        let anim = AnimationState::parse("x", &[0, 0, 0, 0, 0, 0], 0).unwrap();
        assert!(anim.is_some());
    }

    #[test]
    fn test_pause_command_skips_three_bytes() {
        let data = block(&[(1, 1, 1)], &[0x04, 9, 9, 9, 0x01, 1, 1, 1, 0x02, 1, 0x00]);
        let mut anim = AnimationState::parse("x", &data, 0).unwrap().unwrap();
        assert_eq!(anim.next_positions(false).unwrap(), None);
        assert!(!anim.is_finished());
        let tick = anim.next_positions(false).unwrap().unwrap();
        assert_eq!(tick, vec![Position { x: 1, y: 1, frame: 0 }]);
        assert_eq!(anim.next_positions(false).unwrap(), None);
        assert!(anim.is_finished());
    }

    #[test]
    fn test_repeat_only_for_windows_titles() {
        let commands = [0x01, 1, 1, 1, 0x02, 1, 0x03];
        let data = block(&[(0, 0, 1)], &commands);

        let mut old = AnimationState::parse("x", &data, 0).unwrap().unwrap();
        assert!(old.next_positions(false).unwrap().is_some());
        assert_eq!(old.next_positions(false).unwrap(), None);
        assert!(old.is_finished());

        let mut new = AnimationState::parse("x", &data, 0).unwrap().unwrap();
        assert!(new.next_positions(true).unwrap().is_some());
        assert!(new.next_positions(true).unwrap().is_some());
        assert!(new.is_repeating());
    }

    #[test]
    fn test_two_step_table() {
        let data = block(&[(0, 0, 1), (4, 0, 2)], &[0x01, 1, 1, 2, 0x02, 2, 0x00]);
        let mut anim = AnimationState::parse("x", &data, 0).unwrap().unwrap();
        assert_eq!(
            anim.next_positions(false).unwrap(),
            Some(vec![Position { x: 0, y: 0, frame: 0 }])
        );
        assert_eq!(
            anim.next_positions(false).unwrap(),
            Some(vec![Position { x: 4, y: 0, frame: 1 }])
        );
        assert_eq!(anim.next_positions(false).unwrap(), None);
        assert!(anim.is_finished());
    }

    #[test]
    fn test_unknown_command_ends_animation() {
        let data = block(&[(0, 0, 1)], &[0x09]);
        let mut anim = AnimationState::parse("x", &data, 0).unwrap().unwrap();
        assert!(matches!(
            anim.next_positions(false),
            Err(VmError::AnimationCommand(0x09))
        ));
        assert!(anim.is_finished());
    }

    #[test]
    fn test_auto_incrementing_tables() {
        let data = block(&[(3, 4, 2)], &[0x05, 1, 1, 0x02, 1, 0x00]);
        let mut anim = AnimationState::parse("x", &data, 0).unwrap().unwrap();
        let tick = anim.next_positions(false).unwrap().unwrap();
        assert_eq!(tick, vec![Position { x: 3, y: 4, frame: 1 }]);
    }
}
