//! Headless host for testing and piped play
//!
//! Input comes from a queue filled up front, and everything the game produces is
//! recorded: text, status line, pictures, music, save files and fatal errors.

use std::collections::{HashMap, VecDeque};

use log::debug;

use crate::hints::Hint;
use crate::host::{Host, FILE_FAILED, FILE_OK, UNDO_REQUEST};
use crate::picture::Picture;

/// Save slot used when the game does not name its file.
pub const DEFAULT_SAVE: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownPicture {
    pub id: u32,
    pub mode: u8,
    pub size: Option<(u16, u16)>,
}

#[derive(Debug, Default)]
pub struct HeadlessHost {
    input: VecDeque<u8>,
    output: String,
    status: String,
    pub pictures: Vec<ShownPicture>,
    pub tunes: Vec<(usize, u16)>,
    pub hints_shown: usize,
    pub saves: HashMap<String, Vec<u8>>,
    pub fatal: Option<String>,
    pub flushes: usize,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue raw input bytes. A line reading `undo` becomes an undo request.
    pub fn with_input(text: &str) -> Self {
        let mut host = Self::new();
        host.push_input(text);
        host
    }

    pub fn push_input(&mut self, text: &str) {
        for line in text.split_inclusive('\n') {
            if line.trim_end() == "undo" {
                self.input.push_back(UNDO_REQUEST);
            } else {
                self.input.extend(line.bytes());
            }
        }
    }

    /// Get all game text
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn status(&self) -> &str {
        &self.status
    }
}

impl Host for HeadlessHost {
    fn read_char(&mut self, translate_undo: bool) -> Option<u8> {
        let c = self.input.pop_front()?;
        if c == UNDO_REQUEST && !translate_undo {
            return self.read_char(translate_undo);
        }
        Some(c)
    }

    fn write_char(&mut self, c: u8) {
        self.output.push(c as char);
    }

    fn flush_output(&mut self) {
        self.flushes += 1;
    }

    fn show_status_char(&mut self, c: u8) {
        if c == b'\n' {
            self.status.clear();
        } else {
            self.status.push(c as char);
        }
    }

    fn display_picture(&mut self, id: u32, picture: Option<&Picture>, mode: u8) {
        debug!("Headless: picture {} mode {}", id, mode);
        self.pictures.push(ShownPicture {
            id,
            mode,
            size: picture.map(|p| (p.width, p.height)),
        });
    }

    fn play_music(&mut self, data: &[u8], tempo: u16) {
        self.tunes.push((data.len(), tempo));
    }

    fn show_hints(&mut self, hints: &[Hint]) -> u8 {
        self.hints_shown += hints.len();
        1
    }

    fn save_file(&mut self, name: Option<&str>, data: &[u8]) -> u8 {
        let key = name.unwrap_or(DEFAULT_SAVE).to_string();
        self.saves.insert(key, data.to_vec());
        FILE_OK
    }

    fn load_file(&mut self, name: Option<&str>, buf: &mut [u8]) -> u8 {
        match self.saves.get(name.unwrap_or(DEFAULT_SAVE)) {
            Some(data) if data.len() == buf.len() => {
                buf.copy_from_slice(data);
                FILE_OK
            }
            _ => FILE_FAILED,
        }
    }

    fn fatal_error(&mut self, message: &str) {
        self.fatal = Some(message.to_string());
    }
}
