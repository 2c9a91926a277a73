// Shared helpers for assembling small story images in integration tests
#![allow(dead_code)]

use magnetic::host::Host;
use magnetic::random::RandMode;
use magnetic::vm::Vm;

pub const HEADER_SIZE: usize = 42;

pub struct StoryBuilder {
    pub version: u8,
    pub code: Vec<u8>,
    pub strings: Vec<u8>,
    pub dict: Vec<u8>,
    pub decode_offset: u32,
    pub undo_size: u32,
    pub undo_pc: u32,
}

impl StoryBuilder {
    pub fn new(version: u8) -> Self {
        StoryBuilder {
            version,
            code: vec![0u8; 0x10000],
            strings: Vec::new(),
            dict: Vec::new(),
            decode_offset: 0,
            undo_size: 0x8000,
            undo_pc: 0xffff_ffff,
        }
    }

    pub fn words(mut self, at: usize, words: &[u16]) -> Self {
        for (i, w) in words.iter().enumerate() {
            self.code[at + 2 * i..at + 2 * i + 2].copy_from_slice(&w.to_be_bytes());
        }
        self
    }

    pub fn bytes(mut self, at: usize, bytes: &[u8]) -> Self {
        self.code[at..at + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn strings(mut self, data: &[u8], table: &[u8]) -> Self {
        self.strings = data.to_vec();
        self.decode_offset = data.len() as u32;
        self.strings.extend_from_slice(table);
        self
    }

    pub fn dict(mut self, dict: &[u8]) -> Self {
        self.dict = dict.to_vec();
        self
    }

    pub fn undo_pc(mut self, pc: u32) -> Self {
        self.undo_pc = pc;
        self
    }

    pub fn image(&self) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_SIZE];
        h[0..4].copy_from_slice(b"MaSc");
        h[8..12].copy_from_slice(&(HEADER_SIZE as u32).to_be_bytes());
        h[13] = self.version;
        h[14..18].copy_from_slice(&(self.code.len() as u32).to_be_bytes());
        h[18..22].copy_from_slice(&(self.strings.len() as u32).to_be_bytes());
        h[26..30].copy_from_slice(&(self.dict.len() as u32).to_be_bytes());
        h[30..34].copy_from_slice(&self.decode_offset.to_be_bytes());
        h[34..38].copy_from_slice(&self.undo_size.to_be_bytes());
        h[38..42].copy_from_slice(&self.undo_pc.to_be_bytes());
        h.extend_from_slice(&self.code);
        h.extend_from_slice(&self.strings);
        h.extend_from_slice(&self.dict);
        h
    }

    pub fn build(&self) -> Vm {
        Vm::from_story_bytes(&self.image(), RandMode::Predictable(0)).expect("story should load")
    }
}

/// Execute exactly `n` instructions, failing the test on any error.
pub fn step_n(vm: &mut Vm, host: &mut dyn Host, n: usize) {
    for _ in 0..n {
        let pc = vm.registers().pc;
        if let Err(e) = vm.execute_one(host) {
            panic!("instruction at {:#x} failed: {}", pc, e);
        }
    }
}

/// A classic `MaPi` file holding one 4x2 picture whose rows both read 5 0 5 0.
pub fn classic_picture_file() -> Vec<u8> {
    let mut block = vec![0u8; 0x45];
    block[4..6].copy_from_slice(&4u16.to_be_bytes()); // right edge
    block[6..8].copy_from_slice(&2u16.to_be_bytes()); // height
    block[0x1c + 10..0x1c + 12].copy_from_slice(&0x0fffu16.to_be_bytes()); // colour 5
    // tree: one bit is colour 5, zero bit is colour 0
    block[0x42] = 0x85;
    block[0x43] = 0x80;
    // first row 5 0 5 0, second row unchanged from the first
    block[0x44] = 0b1010_0000;

    let mut file = b"MaPi".to_vec();
    file.extend_from_slice(&[0, 0, 0, 0]);
    file.extend_from_slice(&12u32.to_be_bytes());
    file.extend_from_slice(&block);
    file
}

/// The 8x1 base image of the `anim` picture: colour 1 in the leftmost pixel.
fn windows_base_block() -> Vec<u8> {
    let mut block = vec![0u8; 48];
    block[4 + 2..4 + 4].copy_from_slice(&0x0f00u16.to_le_bytes()); // colour 1
    block[38..42].copy_from_slice(&4u32.to_le_bytes());
    block[42..44].copy_from_slice(&8u16.to_le_bytes());
    block[44..46].copy_from_slice(&1u16.to_le_bytes());
    block.extend_from_slice(&[0x80, 0x00, 0x00, 0x00]);
    block
}

fn windows_file(block: &[u8]) -> Vec<u8> {
    let mut file = b"MaP2".to_vec();
    file.extend_from_slice(&16u16.to_be_bytes());
    let mut name = [0u8; 8];
    name[..4].copy_from_slice(b"anim");
    file.extend_from_slice(&name);
    file.extend_from_slice(&22u32.to_be_bytes());
    file.extend_from_slice(&(block.len() as u32).to_be_bytes());
    file.extend_from_slice(block);
    file
}

/// The same `anim` picture with the no-animation marker and nothing after it.
pub fn still_picture_file() -> Vec<u8> {
    let mut block = windows_base_block();
    block.extend_from_slice(&[0xd0, 0x5e]);
    windows_file(&block)
}

/// A `MaP2` file with one 8x1 picture called `anim`. Its base image has colour 1 in the
/// leftmost pixel; one animation frame (8x1, all colour 5) is placed at (2, 0) once.
pub fn windows_picture_file() -> Vec<u8> {
    let mut block = windows_base_block();

    // animation header: marker, frame count, unused
    block.extend_from_slice(&[0xff, 0xff]);
    block.extend_from_slice(&1u16.to_le_bytes());
    block.extend_from_slice(&[0, 0]);
    // frame: size, width, height, unused, planes, then the table count
    block.extend_from_slice(&4u32.to_le_bytes());
    block.extend_from_slice(&8u16.to_le_bytes());
    block.extend_from_slice(&1u16.to_le_bytes());
    block.extend_from_slice(&[0, 0]);
    block.extend_from_slice(&[0xff, 0x00, 0xff, 0x00]);
    block.extend_from_slice(&1u16.to_le_bytes());
    // one position table with one entry
    block.extend_from_slice(&[0, 0]);
    block.extend_from_slice(&1u16.to_le_bytes());
    block.extend_from_slice(&2u16.to_le_bytes());
    block.extend_from_slice(&0u16.to_le_bytes());
    block.extend_from_slice(&1u16.to_le_bytes());
    block.extend_from_slice(&[0, 0]);
    // load table 1 for one step, play it, end
    block.extend_from_slice(&[0x01, 1, 1, 1, 0x02, 1, 0x00]);
    windows_file(&block)
}

/// A `MaSd` file with one tune called `theme`.
pub fn sound_file() -> Vec<u8> {
    let notes = [1u8, 2, 3, 4, 5];
    let mut file = b"MaSd".to_vec();
    file.extend_from_slice(&18u16.to_be_bytes());
    let mut name = [0u8; 8];
    name[..5].copy_from_slice(b"theme");
    file.extend_from_slice(&name);
    file.extend_from_slice(&120u16.to_be_bytes());
    file.extend_from_slice(&24u32.to_be_bytes());
    file.extend_from_slice(&(notes.len() as u32).to_be_bytes());
    file.extend_from_slice(&notes);
    file
}
