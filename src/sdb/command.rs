use std::{fmt, io::Write};

use anyhow::Result;

use crate::{
    expr::Classification,
    plat::{Machine, PAddr, Steps, StopReason},
};

use super::{ArgError, Session};

/// What a handler tells the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Continue,
    /// End the session.
    Stop,
    /// The command failed and said why; keep going.
    Error,
}

/// Every command the monitor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Help,
    Continue,
    Quit,
    Step,
    Info,
    Print,
    Examine,
    Watch,
    Delete,
}

impl CommandKind {
    /// Every command, in `help` listing order.
    pub const ALL: [CommandKind; 9] = [
        Self::Help,
        Self::Continue,
        Self::Quit,
        Self::Step,
        Self::Info,
        Self::Print,
        Self::Examine,
        Self::Watch,
        Self::Delete,
    ];

    /// Finds a command by its exact, case-sensitive name.
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "help" => Some(Self::Help),
            "c" => Some(Self::Continue),
            "q" => Some(Self::Quit),
            "si" => Some(Self::Step),
            "info" => Some(Self::Info),
            "p" => Some(Self::Print),
            "x" => Some(Self::Examine),
            "w" => Some(Self::Watch),
            "d" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Continue => "c",
            Self::Quit => "q",
            Self::Step => "si",
            Self::Info => "info",
            Self::Print => "p",
            Self::Examine => "x",
            Self::Watch => "w",
            Self::Delete => "d",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Help => "Display information about all supported commands",
            Self::Continue => "Continue the execution of the program",
            Self::Quit => "Exit NEMU",
            Self::Step => "Execute N instructions, then pause (default 1): si [N]",
            Self::Info => "Print program state: `info r` for registers, `info w` for watchpoints",
            Self::Print => "Evaluate an expression and print its value: p EXPR",
            Self::Examine => "Dump N words of memory starting at a hex address: x N ADDR",
            Self::Watch => "Pause execution when the value of an expression changes: w EXPR",
            Self::Delete => "Delete a watchpoint: d N",
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.name(), self.description())
    }
}

/// Parses the step count of `si`: the leading integer of the argument, or 1 if there is none.
/// A negative count runs until the machine stops.
fn parse_steps(args: Option<&str>) -> Result<Steps, ArgError> {
    let Some(args) = args.map(str::trim_start) else {
        return Ok(Steps::Exactly(1));
    };
    let sign_len = usize::from(args.starts_with(['-', '+']));
    let digits_len = args[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(args.len() - sign_len);
    if digits_len == 0 {
        return Ok(Steps::Exactly(1));
    }
    let number = &args[..sign_len + digits_len];
    let n: i64 = number
        .parse()
        .map_err(|_| ArgError::InvalidCount(number.to_string()))?;
    Ok(u64::try_from(n).map_or(Steps::UntilStop, Steps::Exactly))
}

/// Parses the arguments of `x`: a decimal count and a hex address.
fn parse_examine(args: Option<&str>) -> Result<(u32, PAddr), ArgError> {
    let mut words = args.unwrap_or_default().split_whitespace();
    let count = words.next().ok_or(ArgError::Missing("count"))?;
    let addr = words.next().ok_or(ArgError::Missing("address"))?;
    if let Some(extra) = words.next() {
        return Err(ArgError::Unexpected(extra.to_string()));
    }
    let count = count
        .parse::<u32>()
        .map_err(|_| ArgError::InvalidCount(count.to_string()))?;
    let digits = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr);
    let addr = PAddr::from_str_radix(digits, 16)
        .map_err(|_| ArgError::InvalidAddress(addr.to_string()))?;
    Ok((count, addr))
}

fn parse_watchpoint_no(args: Option<&str>) -> Result<u32, ArgError> {
    let mut words = args.unwrap_or_default().split_whitespace();
    let no = words.next().ok_or(ArgError::Missing("watchpoint number"))?;
    if let Some(extra) = words.next() {
        return Err(ArgError::Unexpected(extra.to_string()));
    }
    no.parse()
        .map_err(|_| ArgError::InvalidWatchpoint(no.to_string()))
}

impl<M: Machine, W: Write> Session<M, W> {
    /// Runs the command called `name` with the raw argument string `args`.
    pub fn dispatch(&mut self, name: &str, args: Option<&str>) -> Result<Status> {
        match CommandKind::lookup(name) {
            Some(kind) => self.dispatch_kind(kind, args),
            None => {
                writeln!(self.out, "Unknown command '{}'", name)?;
                Ok(Status::Continue)
            }
        }
    }

    pub fn dispatch_kind(&mut self, kind: CommandKind, args: Option<&str>) -> Result<Status> {
        log::debug!("{} {:?}", kind.name(), args);
        match kind {
            CommandKind::Help => self.cmd_help(args),
            CommandKind::Continue => self.cmd_c(),
            CommandKind::Quit => self.cmd_q(),
            CommandKind::Step => self.cmd_si(args),
            CommandKind::Info => self.cmd_info(args),
            CommandKind::Print => self.cmd_p(args),
            CommandKind::Examine => self.cmd_x(args),
            CommandKind::Watch => self.cmd_w(args),
            CommandKind::Delete => self.cmd_d(args),
        }
    }

    fn cmd_help(&mut self, args: Option<&str>) -> Result<Status> {
        match args.and_then(|a| a.split_whitespace().next()) {
            None => {
                for kind in CommandKind::ALL {
                    writeln!(self.out, "{}", kind)?;
                }
            }
            Some(arg) => match CommandKind::lookup(arg) {
                Some(kind) => writeln!(self.out, "{}", kind)?,
                None => writeln!(self.out, "Unknown command '{}'", arg)?,
            },
        }
        Ok(Status::Continue)
    }

    fn cmd_c(&mut self) -> Result<Status> {
        let reason = self.machine.execute(Steps::UntilStop);
        self.report_stop(reason)?;
        Ok(Status::Continue)
    }

    fn cmd_q(&mut self) -> Result<Status> {
        self.machine.quit();
        Ok(Status::Stop)
    }

    fn cmd_si(&mut self, args: Option<&str>) -> Result<Status> {
        match parse_steps(args) {
            Ok(steps) => {
                let reason = self.machine.execute(steps);
                self.report_stop(reason)?;
                Ok(Status::Continue)
            }
            Err(err) => self.usage(err, "si [N]"),
        }
    }

    fn cmd_info(&mut self, args: Option<&str>) -> Result<Status> {
        match args.map(str::trim) {
            Some("r") => self.machine.display_registers(&mut self.out)?,
            Some("w") => self.machine.display_watchpoints(&mut self.out)?,
            Some(arg) if arg.chars().count() > 1 => {
                writeln!(self.out, "Subcommand `{}` is too long.", arg)?;
                writeln!(self.out, "Usage: info r|w")?;
            }
            _ => writeln!(self.out, "Usage: info r|w")?,
        }
        Ok(Status::Continue)
    }

    fn cmd_p(&mut self, args: Option<&str>) -> Result<Status> {
        let Some(text) = args else {
            return self.usage(ArgError::Missing("expression"), "p EXPR");
        };
        match self.engine.evaluate(text, &self.machine) {
            Ok(ev) => {
                let text = text.trim();
                match ev.classification {
                    Classification::RegisterInvolved => {
                        writeln!(self.out, "{} = 0x{:08X}", text, ev.value as u32)?
                    }
                    Classification::PlainNumeric => writeln!(self.out, "{} = {}", text, ev.value)?,
                }
                Ok(Status::Continue)
            }
            Err(err) => {
                log::warn!("`{}`: {}", text.trim(), err);
                writeln!(self.out, "invalid expression!")?;
                Ok(Status::Continue)
            }
        }
    }

    fn cmd_x(&mut self, args: Option<&str>) -> Result<Status> {
        let (count, mut addr) = match parse_examine(args) {
            Ok(parsed) => parsed,
            Err(err) => return self.usage(err, "x N ADDR"),
        };
        for _ in 0..count {
            match self.machine.read_word(addr) {
                Ok(word) => writeln!(self.out, "0x{:08X}: 0x{:08X}", addr, word)?,
                Err(err) => {
                    writeln!(self.out, "{}", err)?;
                    return Ok(Status::Error);
                }
            }
            addr = addr.wrapping_add(4);
        }
        Ok(Status::Continue)
    }

    fn cmd_w(&mut self, args: Option<&str>) -> Result<Status> {
        let Some(text) = args else {
            return self.usage(ArgError::Missing("expression"), "w EXPR");
        };
        let armed = self.engine.parse(text).and_then(|expr| {
            let value = expr.eval(&self.machine)?;
            Ok((expr, value))
        });
        let (expr, value) = match armed {
            Ok(armed) => armed,
            Err(err) => {
                log::warn!("`{}`: {}", text.trim(), err);
                writeln!(self.out, "invalid expression!")?;
                return Ok(Status::Error);
            }
        };
        match self.machine.set_watchpoint(text, expr, value) {
            Ok(no) => {
                writeln!(self.out, "Watchpoint {}: {}", no, text.trim())?;
                Ok(Status::Continue)
            }
            Err(err) => {
                writeln!(self.out, "{}", err)?;
                Ok(Status::Error)
            }
        }
    }

    fn cmd_d(&mut self, args: Option<&str>) -> Result<Status> {
        let no = match parse_watchpoint_no(args) {
            Ok(no) => no,
            Err(err) => return self.usage(err, "d N"),
        };
        match self.machine.delete_watchpoint(no) {
            Ok(()) => {
                writeln!(self.out, "Deleted watchpoint {}", no)?;
                Ok(Status::Continue)
            }
            Err(err) => {
                writeln!(self.out, "{}", err)?;
                Ok(Status::Error)
            }
        }
    }

    fn usage(&mut self, err: ArgError, usage: &str) -> Result<Status> {
        writeln!(self.out, "{}", err)?;
        writeln!(self.out, "Usage: {}", usage)?;
        Ok(Status::Error)
    }

    /// Tells the operator why execution stopped.
    fn report_stop(&mut self, reason: StopReason) -> Result<()> {
        match reason {
            StopReason::StepsDone => {}
            StopReason::Watchpoint(hit) => {
                writeln!(self.out, "\nWatchpoint {}: {}\n", hit.no, hit.expr)?;
                writeln!(self.out, "Old value = {}", hit.old)?;
                writeln!(self.out, "New value = {}", hit.new)?;
            }
            StopReason::Halted { pc, code: 0 } => {
                writeln!(self.out, "nemu: HIT GOOD TRAP at pc = 0x{:08x}", pc)?
            }
            StopReason::Halted { pc, .. } => {
                writeln!(self.out, "nemu: HIT BAD TRAP at pc = 0x{:08x}", pc)?
            }
            StopReason::Aborted { pc } => writeln!(self.out, "nemu: ABORT at pc = 0x{:08x}", pc)?,
            StopReason::Ended => writeln!(
                self.out,
                "Program execution has ended. To restart the program, exit NEMU and run again."
            )?,
        }
        Ok(())
    }
}
