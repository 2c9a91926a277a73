//! One level of undo, kept as two alternating snapshots.
//!
//! A snapshot is taken every time execution reaches the story's undo point, which is at
//! the start of each turn. Restoring goes back to the *older* snapshot: the newer one was
//! taken at the start of the turn the player is currently typing into.

use log::debug;

/// Registers saved in a snapshot: D0-D7, A0-A7, instruction count and PC. The condition
/// flags are not part of it.
pub const SAVED_WORDS: usize = 18;

#[derive(Debug, Clone, Default)]
struct Snapshot {
    memory: Vec<u8>,
    regs: [u32; SAVED_WORDS],
    valid: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UndoManager {
    slots: [Snapshot; 2],
}

/// What a restore hands back to the machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Restored {
    pub memory: Vec<u8>,
    pub regs: [u32; 16],
    pub instruction_count: u32,
    pub pc: u32,
}

impl UndoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the older slot and record `memory` and the register words in its place.
    pub fn save(&mut self, memory: &[u8], regs: &[u32; 16], instruction_count: u32, pc: u32) {
        self.slots.swap(0, 1);
        let slot = &mut self.slots[1];
        slot.memory.clear();
        slot.memory.extend_from_slice(memory);
        slot.regs[..16].copy_from_slice(regs);
        slot.regs[16] = instruction_count;
        slot.regs[17] = pc;
        slot.valid = true;
        debug!("undo snapshot at pc {:#07x}, {} bytes", pc, memory.len());
    }

    /// True when a restore would succeed.
    pub fn available(&self) -> bool {
        self.slots[0].valid
    }

    /// Take the older snapshot and invalidate both slots.
    pub fn restore(&mut self) -> Option<Restored> {
        if !self.slots[0].valid {
            return None;
        }
        let slot = std::mem::take(&mut self.slots[0]);
        self.invalidate();
        let mut regs = [0u32; 16];
        regs.copy_from_slice(&slot.regs[..16]);
        Some(Restored {
            memory: slot.memory,
            regs,
            instruction_count: slot.regs[16],
            pc: slot.regs[17],
        })
    }

    pub fn invalidate(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.valid = false;
        }
    }
}
