//! Host callback surface for the virtual machine
//!
//! Everything the story can ask of the outside world goes through this trait: character
//! input and output, the status line, pictures, music, hints and save files. The machine
//! calls it synchronously from inside instruction execution.

use crate::hints::Hint;
use crate::picture::Picture;

/// Returned by `read_char` when the player asked to take back the last move.
pub const UNDO_REQUEST: u8 = 0;

/// Status returned by `save_file`/`load_file` on success.
pub const FILE_OK: u8 = 0;
pub const FILE_FAILED: u8 = 1;

pub trait Host {
    /// Block until one input character is available. With `translate_undo` set, a request
    /// to undo is returned as `UNDO_REQUEST`. `None` means input is closed and the game
    /// should stop.
    fn read_char(&mut self, translate_undo: bool) -> Option<u8>;

    /// Write one character of game text
    fn write_char(&mut self, c: u8);

    /// Push buffered text out before the game waits
    fn flush_output(&mut self) {}

    /// One character for the status line. Only early games use this channel; a carriage
    /// return ends the left part and a newline ends the line.
    fn show_status_char(&mut self, c: u8);

    /// Show picture `id` in `mode`. Mode 0 (with no picture) turns pictures off.
    fn display_picture(&mut self, id: u32, picture: Option<&Picture>, mode: u8);

    /// Play a tune. An empty `data` slice stops playback.
    fn play_music(&mut self, _data: &[u8], _tempo: u16) {}

    /// Run the hints browser. The return value is handed back to the game.
    fn show_hints(&mut self, _hints: &[Hint]) -> u8 {
        0
    }

    /// Persist `data`. `name` is set when the game supplies a file name.
    fn save_file(&mut self, name: Option<&str>, data: &[u8]) -> u8;

    /// Fill `buf` from a saved file.
    fn load_file(&mut self, name: Option<&str>, buf: &mut [u8]) -> u8;

    /// The game hit an unrecoverable error and has stopped.
    fn fatal_error(&mut self, message: &str);
}
