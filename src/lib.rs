//! An interpreter for Magnetic Scrolls story files.
//!
//! The story code runs on a small virtual machine modelled on a 68000 subset, extended
//! with opcodes that call back into the interpreter for text, parsing, pictures and
//! persistence. `Vm` executes instructions; a `Host` supplies input and presents
//! output; `Interpreter` ties the two together with the player configuration.

pub mod addressing;
pub mod animation;
pub mod config;
pub mod dictionary;
pub mod error;
pub mod extension;
pub mod header;
pub mod hints;
pub mod host;
pub mod host_headless;
pub mod instruction;
pub mod interpreter;
pub mod memory;
pub mod opcodes_bits;
pub mod opcodes_flow;
pub mod opcodes_math;
pub mod opcodes_move;
pub mod picture;
pub mod random;
pub mod registers;
pub mod sound;
pub mod terminal;
pub mod text;
pub mod undo;
pub mod vm;

#[cfg(test)]
mod test_utils;
