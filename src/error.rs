//! Error type shared by the loader, the instruction engine and the picture decoders.
//!
//! Load-time problems (`Io`, `Malformed`) are returned to the caller so the host can
//! report them and retry. Everything else means the story file asked for something this
//! machine cannot do; `Vm::step` hands those to the host's fatal-error callback and halts.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VmError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed {what}: {reason}")]
    Malformed { what: &'static str, reason: String },

    #[error("virtual pointer {0:#010x} is outside memory")]
    OutsideMemory(u32),

    #[error("unimplemented opcode {opcode:#06x} at {pc:#07x}")]
    UnimplementedOpcode { opcode: u16, pc: u32 },

    #[error("illegal addressing mode {mode}/{reg} for an address operand")]
    IllegalAddressing { mode: u8, reg: u8 },

    #[error("unknown extension opcode {0:#06x}")]
    UnknownExtension(u16),

    #[error("division by zero")]
    DivideByZero,

    #[error("{0} capacity exceeded")]
    Capacity(&'static str),

    #[error("unknown animation command {0:#04x}")]
    AnimationCommand(u8),

    #[error("truncated compressed picture data")]
    Bitstream(#[from] bitreader::BitReaderError),
}

impl VmError {
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        VmError::Malformed {
            what,
            reason: reason.into(),
        }
    }

    /// True for errors that stop the game rather than fail a load.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, VmError::Io(_) | VmError::Malformed { .. })
    }
}

pub type VmResult<T> = Result<T, VmError>;
