//! Line-based terminal host
//!
//! Game text goes straight to stdout. Input is read a line at a time and handed to the
//! game one character per request, so piped command files work as well as typing. The
//! status line is drawn in reverse video with crossterm when stdout is a terminal.
//!
//! # EOF Handling
//!
//! When stdin is exhausted `read_char` returns `None`, which stops the game instead of
//! feeding it an endless run of empty lines.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Stdout, Write};
use std::path::{Path, PathBuf};

use crossterm::{
    queue,
    style::{Attribute, Print, SetAttribute},
    terminal,
};
use log::{debug, info, warn};

use crate::hints::{Hint, NodeType};
use crate::host::{Host, FILE_FAILED, FILE_OK, UNDO_REQUEST};
use crate::picture::Picture;

const DEFAULT_WIDTH: u16 = 80;

pub struct TerminalHost {
    stdout: Stdout,
    /// Rest of the current input line
    pending: VecDeque<u8>,
    /// Status text collected so far; a carriage return splits left from right
    status: Vec<u8>,
    show_status: bool,
    /// Stdin and stdout are a terminal (not piped)
    interactive: bool,
    /// Save file used when the game does not supply a name
    default_save: PathBuf,
}

impl TerminalHost {
    pub fn new(story: &Path, show_status: bool) -> Self {
        let interactive = atty::is(atty::Stream::Stdin) && atty::is(atty::Stream::Stdout);
        debug!("terminal host, interactive: {}", interactive);
        TerminalHost {
            stdout: io::stdout(),
            pending: VecDeque::new(),
            status: Vec::new(),
            show_status,
            interactive,
            default_save: story.with_extension("sav"),
        }
    }

    /// Read one line from stdin without its line ending. `None` at end of input.
    fn read_line(&mut self) -> Option<String> {
        let _ = self.stdout.flush();
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => {
                debug!("EOF on stdin");
                None
            }
            Ok(_) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                if !self.interactive {
                    // echo piped commands so transcripts read naturally
                    let _ = writeln!(self.stdout, "{}", line);
                }
                Some(line)
            }
            Err(e) => {
                warn!("failed to read input: {}", e);
                None
            }
        }
    }

    fn draw_status(&mut self) {
        let text = String::from_utf8_lossy(&self.status).into_owned();
        self.status.clear();
        if !self.show_status {
            return;
        }
        let (left, right) = match text.split_once('\r') {
            Some((l, r)) => (l.to_string(), r.to_string()),
            None => (text, String::new()),
        };
        if !self.interactive {
            debug!("status: {} | {}", left.trim(), right.trim());
            return;
        }
        let width = terminal::size().map(|(w, _)| w).unwrap_or(DEFAULT_WIDTH);
        let line = format_status(&left, &right, width as usize);
        let _ = queue!(
            self.stdout,
            SetAttribute(Attribute::Reverse),
            Print(line),
            SetAttribute(Attribute::Reset),
            Print("\n")
        );
    }

    fn save_path(&self, name: Option<&str>) -> PathBuf {
        match name {
            Some(n) if !n.is_empty() => PathBuf::from(n),
            _ => self.default_save.clone(),
        }
    }

    fn print_hint_node(&mut self, hint: &Hint) {
        for (i, element) in hint.elements.iter().enumerate() {
            let _ = match hint.node_type {
                NodeType::Folder => writeln!(self.stdout, "  {}. {}", i + 1, element),
                NodeType::Text => writeln!(self.stdout, "  {}", element),
            };
        }
    }
}

/// Pad the left and right status texts to fill `width` columns.
pub fn format_status(left: &str, right: &str, width: usize) -> String {
    let left = left.trim_end();
    let right = right.trim();
    let gap = width.saturating_sub(left.len() + right.len()).max(1);
    let mut line = format!("{}{}{}", left, " ".repeat(gap), right);
    line.truncate(width.max(1));
    line
}

impl Host for TerminalHost {
    fn read_char(&mut self, translate_undo: bool) -> Option<u8> {
        if self.pending.is_empty() {
            let line = self.read_line()?;
            if translate_undo && line.trim().eq_ignore_ascii_case("undo") {
                return Some(UNDO_REQUEST);
            }
            self.pending.extend(line.bytes().filter(|&b| b != UNDO_REQUEST));
            self.pending.push_back(b'\n');
        }
        self.pending.pop_front()
    }

    fn write_char(&mut self, c: u8) {
        let _ = self.stdout.write_all(&[c]);
    }

    fn flush_output(&mut self) {
        let _ = self.stdout.flush();
    }

    fn show_status_char(&mut self, c: u8) {
        if c == b'\n' {
            self.draw_status();
        } else {
            self.status.push(c);
        }
    }

    fn display_picture(&mut self, id: u32, picture: Option<&Picture>, mode: u8) {
        match picture {
            Some(p) => info!("picture {:#x} (mode {}): {}x{}", id, mode, p.width, p.height),
            None if mode == 0 => info!("pictures off"),
            None => info!("picture {:#x} (mode {}) not available", id, mode),
        }
    }

    fn play_music(&mut self, data: &[u8], tempo: u16) {
        if data.is_empty() {
            info!("music stopped");
        } else {
            info!("music: {} bytes at tempo {}", data.len(), tempo);
        }
    }

    /// A small browser: folders list numbered topics, text nodes reveal one line per
    /// Enter. An empty answer in a folder goes back up.
    fn show_hints(&mut self, hints: &[Hint]) -> u8 {
        let mut node = 0usize;
        loop {
            let hint = match hints.get(node) {
                Some(h) => h.clone(),
                None => return 0,
            };
            let _ = writeln!(self.stdout);
            match hint.node_type {
                NodeType::Folder => {
                    self.print_hint_node(&hint);
                    let _ = write!(self.stdout, "Choice (Enter to go back): ");
                    let answer = match self.read_line() {
                        Some(a) => a,
                        None => return 1,
                    };
                    match answer.trim().parse::<usize>() {
                        Ok(n) if n >= 1 && n <= hint.links.len() => node = hint.links[n - 1] as usize,
                        _ if node == 0 => return 1,
                        _ => node = hint.parent as usize,
                    }
                }
                NodeType::Text => {
                    for element in &hint.elements {
                        let _ = writeln!(self.stdout, "  {}", element);
                        if self.read_line().is_none() {
                            return 1;
                        }
                    }
                    node = hint.parent as usize;
                }
            }
        }
    }

    fn save_file(&mut self, name: Option<&str>, data: &[u8]) -> u8 {
        let path = self.save_path(name);
        match fs::write(&path, data) {
            Ok(()) => {
                info!("saved {} bytes to {}", data.len(), path.display());
                FILE_OK
            }
            Err(e) => {
                warn!("save to {} failed: {}", path.display(), e);
                FILE_FAILED
            }
        }
    }

    fn load_file(&mut self, name: Option<&str>, buf: &mut [u8]) -> u8 {
        let path = self.save_path(name);
        match fs::read(&path) {
            Ok(data) if data.len() == buf.len() => {
                buf.copy_from_slice(&data);
                FILE_OK
            }
            Ok(data) => {
                warn!(
                    "{} holds {} bytes, game expected {}",
                    path.display(),
                    data.len(),
                    buf.len()
                );
                FILE_FAILED
            }
            Err(e) => {
                warn!("load from {} failed: {}", path.display(), e);
                FILE_FAILED
            }
        }
    }

    fn fatal_error(&mut self, message: &str) {
        let _ = self.stdout.flush();
        eprintln!("\nFatal error: {}", message);
    }
}
