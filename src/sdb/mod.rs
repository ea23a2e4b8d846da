//! The simple debugger (SDB): the monitor's command shell.
//!
//! A [`Session`] reads one line at a time from a [`LineSource`], splits it with
//! [`tokenize`], and hands it to the command dispatcher. All access to the machine goes through
//! the traits in [`plat`](crate::plat).

use std::io::Write;

use anyhow::Result;
use thiserror::Error;

use crate::{expr::ExprEngine, plat::Machine};

pub mod command;
pub mod line;
pub mod tokenizer;

pub use command::{CommandKind, Status};
pub use line::{LineSource, Prompt, Script};
pub use tokenizer::{tokenize, CommandLine};

/// Malformed command arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("unexpected argument `{0}`")]
    Unexpected(String),
    #[error("invalid count `{0}`")]
    InvalidCount(String),
    #[error("invalid address `{0}`")]
    InvalidAddress(String),
    #[error("invalid watchpoint number `{0}`")]
    InvalidWatchpoint(String),
}

/// How the session drives the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Read and run commands until `q` or end of input.
    #[default]
    Interactive,
    /// Free-run the machine once without reading any input.
    Batch,
}

/// Fixed at construction and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionConfig {
    pub mode: RunMode,
}

/// Where the session loop is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingLine,
    Dispatching(String),
    Terminated,
}

/// An interactive monitor session over a machine.
pub struct Session<M, W> {
    config: SessionConfig,
    pub(crate) machine: M,
    pub(crate) engine: ExprEngine,
    pub(crate) out: W,
}

impl<M: Machine, W: Write> Session<M, W> {
    /// Creates a session and runs the startup hook: the expression engine is built and the
    /// machine's watchpoint pool is initialized. Both happen exactly once per session.
    pub fn new(config: SessionConfig, mut machine: M, out: W) -> Self {
        let engine = ExprEngine::new();
        machine.init_watchpoint_pool();
        log::debug!("session ready in {:?} mode", config.mode);
        Self {
            config,
            machine,
            engine,
            out,
        }
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn machine(&self) -> &M {
        &self.machine
    }

    pub fn out(&self) -> &W {
        &self.out
    }

    pub fn into_parts(self) -> (M, W) {
        (self.machine, self.out)
    }

    /// Runs the session loop until `q`, end of input, or, in batch mode, one free-run.
    ///
    /// Errors only come from the line source or the output sink. Command failures are reported
    /// to the operator and the loop goes on.
    pub fn run(&mut self, source: &mut dyn LineSource) -> Result<()> {
        let mut state = SessionState::Idle;
        loop {
            state = match state {
                SessionState::Idle => match self.config.mode {
                    RunMode::Batch => {
                        self.dispatch_kind(CommandKind::Continue, None)?;
                        SessionState::Terminated
                    }
                    RunMode::Interactive => SessionState::AwaitingLine,
                },
                SessionState::AwaitingLine => match source.read_line()? {
                    Some(line) => SessionState::Dispatching(line),
                    None => SessionState::Terminated,
                },
                SessionState::Dispatching(line) => match tokenize(&line) {
                    None => SessionState::AwaitingLine,
                    Some(cmd) => match self.dispatch(cmd.name, cmd.args)? {
                        Status::Stop => SessionState::Terminated,
                        Status::Continue | Status::Error => SessionState::AwaitingLine,
                    },
                },
                SessionState::Terminated => {
                    self.out.flush()?;
                    return Ok(());
                }
            };
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::{self, Cursor, Write};

    use super::*;
    use crate::{
        emu::watchpoint::WatchpointPool,
        expr::Expr,
        plat::{
            ExecutionControl, MemoryAccess, PAddr, PResult, PlatformError, RegRef, Register,
            RegisterAccess, Steps, StopReason, WatchpointControl, Word,
        },
    };

    /// A machine that records what the monitor asked of it.
    #[derive(Default)]
    pub(crate) struct FakeMachine {
        pub executed: Vec<Steps>,
        pub quit: bool,
        pub pool_inits: u32,
        pub next_stop: Option<StopReason>,
        pub watchpoints: WatchpointPool,
    }

    impl ExecutionControl for FakeMachine {
        fn execute(&mut self, steps: Steps) -> StopReason {
            self.executed.push(steps);
            self.next_stop.take().unwrap_or(StopReason::StepsDone)
        }

        fn quit(&mut self) {
            self.quit = true;
        }
    }

    impl RegisterAccess for FakeMachine {
        fn reg_value(&self, reg: RegRef) -> Word {
            match reg {
                RegRef::Pc => 0x8000_0000,
                RegRef::Gpr(Register::A0) => 10,
                RegRef::Gpr(_) => 0,
            }
        }

        fn display_registers(&self, out: &mut dyn Write) -> io::Result<()> {
            writeln!(out, "<registers>")
        }
    }

    impl MemoryAccess for FakeMachine {
        /// Each word holds its own address, flipped.
        fn read_word(&self, addr: PAddr) -> PResult<Word> {
            if addr < 0x1000 {
                Ok(!addr)
            } else {
                Err(PlatformError::OutOfBound {
                    addr,
                    base: 0,
                    end: 0xfff,
                })
            }
        }
    }

    impl WatchpointControl for FakeMachine {
        fn init_watchpoint_pool(&mut self) {
            self.pool_inits += 1;
            self.watchpoints.init();
        }

        fn set_watchpoint(&mut self, text: &str, expr: Expr, value: i32) -> PResult<u32> {
            self.watchpoints.arm(text, expr, value)
        }

        fn delete_watchpoint(&mut self, no: u32) -> PResult<()> {
            self.watchpoints.remove(no).map(|_| ())
        }

        fn display_watchpoints(&self, out: &mut dyn Write) -> io::Result<()> {
            self.watchpoints.display(out)
        }
    }

    pub(crate) fn session(mode: RunMode) -> Session<FakeMachine, Vec<u8>> {
        Session::new(SessionConfig { mode }, FakeMachine::default(), Vec::new())
    }

    /// Runs a script through a fresh interactive session and returns the machine and output.
    pub(crate) fn run_script(script: &str) -> (FakeMachine, String) {
        let mut session = session(RunMode::Interactive);
        session.run(&mut Script::new(Cursor::new(script))).unwrap();
        let (machine, out) = session.into_parts();
        (machine, String::from_utf8(out).unwrap())
    }

    /// A line source that panics if the session ever reads from it.
    struct NoInput;

    impl LineSource for NoInput {
        fn read_line(&mut self) -> Result<Option<String>> {
            panic!("batch mode must not read input");
        }
    }

    #[test]
    fn test_startup_hook_runs_once() {
        let session = session(RunMode::Interactive);
        assert_eq!(session.machine().pool_inits, 1);
        assert_eq!(session.config().mode, RunMode::Interactive);
    }

    #[test]
    fn test_batch_mode_free_runs_once() {
        let mut session = session(RunMode::Batch);
        session.run(&mut NoInput).unwrap();
        assert_eq!(session.machine().executed, vec![Steps::UntilStop]);
        assert!(!session.machine().quit);
    }

    #[test]
    fn test_end_of_input_terminates() {
        let (machine, out) = run_script("");
        assert!(machine.executed.is_empty());
        assert_eq!(out, "");
    }

    #[test]
    fn test_blank_lines_do_not_dispatch() {
        let (machine, out) = run_script("\n   \n\t\n");
        assert!(machine.executed.is_empty());
        assert_eq!(out, "");
    }

    #[test]
    fn test_quit_stops_reading() {
        let (machine, out) = run_script("si\nq\nsi\n");
        assert!(machine.quit);
        assert_eq!(machine.executed, vec![Steps::Exactly(1)]);
        assert_eq!(out, "");
    }

    #[test]
    fn test_errors_do_not_stop_the_loop() {
        let (machine, out) = run_script("bogus\np 1+\nc\n");
        assert_eq!(machine.executed, vec![Steps::UntilStop]);
        assert_eq!(out, "Unknown command 'bogus'\ninvalid expression!\n");
    }

    #[test]
    fn test_session_over_emulator() {
        use crate::{
            emu::{default_image, emulator::Emulator, ram::Ram},
            plat::PMEM_BASE,
        };

        let mut emu = Emulator::new(Ram::new(PMEM_BASE, 0x1000));
        emu.load_image(&default_image()).unwrap();
        let mut session = Session::new(SessionConfig::default(), emu, Vec::new());
        let script = "x 2 80000000\nsi 2\np pc\nc\nc\n";
        session.run(&mut Script::new(Cursor::new(script))).unwrap();

        let (emu, out) = session.into_parts();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0x80000000: 0x00000297\n\
             0x80000004: 0x00028823\n\
             pc = 0x80000008\n\
             nemu: HIT GOOD TRAP at pc = 0x8000000c\n\
             Program execution has ended. To restart the program, exit NEMU and run again.\n"
        );
        assert!(!emu.is_exit_status_bad());
    }

    #[test]
    fn test_state_transitions_without_quit() {
        let mut session = session(RunMode::Interactive);
        let mut script = Script::new(Cursor::new("c\nc\n"));
        session.run(&mut script).unwrap();
        assert_eq!(session.machine().executed.len(), 2);
        // the source is drained; a second run terminates immediately
        session.run(&mut script).unwrap();
        assert_eq!(session.machine().executed.len(), 2);
    }
}
