//! The run loop: drives a `Vm` against a `Host`, ticking animations between
//! instructions and turning execution errors into a fatal report.

use log::{error, info};

use crate::config::PlayerConfig;
use crate::error::VmResult;
use crate::host::Host;
use crate::vm::Vm;

/// Instructions executed between animation ticks
pub const ANIMATION_INTERVAL: u64 = 20_000;

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The game stopped, or input ran out
    Stopped,
    /// The instruction limit was reached first
    LimitReached,
}

pub struct Interpreter<H: Host> {
    pub vm: Vm,
    host: H,
    config: PlayerConfig,
    /// Instructions executed by this interpreter
    executed: u64,
}

impl<H: Host> Interpreter<H> {
    pub fn new(mut vm: Vm, host: H, config: PlayerConfig) -> Self {
        vm.set_magnetic_windows(config.magnetic_windows);
        Interpreter {
            vm,
            host,
            config,
            executed: 0,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// Run with the limit from the configuration.
    pub fn run(&mut self) -> VmResult<RunOutcome> {
        self.run_with_limit(self.config.instruction_limit)
    }

    /// Run until the game stops or `max_instructions` more instructions have executed.
    /// An execution error is reported to the host, stops the game and is returned.
    pub fn run_with_limit(&mut self, max_instructions: Option<u64>) -> VmResult<RunOutcome> {
        info!(
            "starting version {} story at pc {:#07x}",
            self.vm.version(),
            self.vm.registers().pc
        );
        let mut count = 0u64;
        while self.vm.is_running() {
            if max_instructions.map_or(false, |max| count >= max) {
                info!("instruction limit reached after {} instructions", count);
                return Ok(RunOutcome::LimitReached);
            }
            if let Err(e) = self.tick() {
                error!("fatal error at pc {:#07x}: {}", self.vm.registers().pc, e);
                self.host.fatal_error(&e.to_string());
                self.vm.stop();
                return Err(e);
            }
            count += 1;
        }
        self.host.flush_output();
        info!("story stopped after {} instructions", self.executed);
        Ok(RunOutcome::Stopped)
    }

    fn tick(&mut self) -> VmResult<()> {
        self.vm.execute_one(&mut self.host)?;
        self.executed += 1;
        if self.config.animation
            && self.executed % ANIMATION_INTERVAL == 0
            && self.vm.has_animation()
        {
            self.vm.animate_to_host(&mut self.host)?;
        }
        Ok(())
    }
}
