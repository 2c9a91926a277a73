// Test utilities for building small in-memory story files
use crate::header::HEADER_SIZE;
use crate::random::RandMode;
use crate::vm::Vm;

pub struct StoryBuilder {
    pub version: u8,
    pub code: Vec<u8>,
    pub strings: Vec<u8>,
    pub strings2: Vec<u8>,
    pub dict: Vec<u8>,
    pub decode_offset: u32,
    pub undo_size: u32,
    pub undo_pc: u32,
}

impl StoryBuilder {
    pub fn new(version: u8) -> Self {
        Self {
            version,
            code: vec![0u8; 0x10000],
            strings: Vec::new(),
            strings2: Vec::new(),
            dict: Vec::new(),
            decode_offset: 0,
            undo_size: 0x8000,
            undo_pc: 0xffff_ffff,
        }
    }

    /// Place big-endian opcode words at `at`.
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

    /// String data followed by the decode table.
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
        h[22..26].copy_from_slice(&(self.strings2.len() as u32).to_be_bytes());
        h[26..30].copy_from_slice(&(self.dict.len() as u32).to_be_bytes());
        h[30..34].copy_from_slice(&self.decode_offset.to_be_bytes());
        h[34..38].copy_from_slice(&self.undo_size.to_be_bytes());
        h[38..42].copy_from_slice(&self.undo_pc.to_be_bytes());
        h.extend_from_slice(&self.code);
        h.extend_from_slice(&self.strings);
        h.extend_from_slice(&self.strings2);
        h.extend_from_slice(&self.dict);
        h
    }

    pub fn build(&self) -> Vm {
        Vm::from_story_bytes(&self.image(), RandMode::Predictable(0)).unwrap()
    }
}

/// Decode table for a tiny tree: `I`=1, end=00, `H`=010, `@`=011 (bits read LSB first).
pub fn tiny_decode_table() -> Vec<u8> {
    let mut table = vec![0u8; 0x104];
    table[0x00] = 0x01;
    table[0x80] = 0x80 | b'I';
    table[0x01] = 0x80;
    table[0x81] = 0x02;
    table[0x02] = 0x80 | b'H';
    table[0x82] = 0x80 | b'@';
    table
}
