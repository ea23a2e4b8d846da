#![cfg_attr(doc, warn(missing_docs))]
//! The NEMU monitor: an interactive debugger shell for an emulated RV32 machine.
//!
//! - [`sdb`] is the command shell itself.
//! - [`expr`] evaluates the expressions used by `p` and `w`.
//! - [`emu`] is the machine the shell drives.
//! - [`plat`] holds the types and traits shared between them.

pub mod emu;
pub mod expr;
pub mod plat;
pub mod sdb;
