//! An interactive Brainfuck engine.
//!
//! The engine runs a program over a byte tape (30,000 cells by default) and is
//! built to be driven from another thread: the driver streams input into the
//! engine while it runs, observes output as it is produced, and can stop the
//! run cooperatively at any instruction boundary.
//!
//! Behaviors:
//! - Tape cells start at 0 for every run and wrap modulo 256.
//! - Characters outside `><+-.,[]` are ignored.
//! - `,` with no pending input does not fail or read EOF; it waits until input
//!   arrives or the run is stopped.
//! - Brackets are matched when a jump needs them. An unmatched bracket is only
//!   an error if execution actually has to jump across it.
//! - Moving the pointer off either end of the tape ends the run with
//!   [`EngineError::PointerOutOfBounds`]. The pointer never wraps.
//!
//! Quick start:
//!
//! ```no_run
//! use std::sync::Arc;
//! use jbf::Engine;
//!
//! let engine = Arc::new(Engine::new(30_000).expect("positive memory size"));
//! let task = engine.spawn(",[.,]").expect("engine is idle");
//! engine.push_str("echo");
//! std::thread::sleep(std::time::Duration::from_millis(100));
//! engine.stop();
//! let outcome = task.join().expect("program should run");
//! assert_eq!(outcome.output, b"echo");
//! ```

pub mod cli_util;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod program;
pub mod tape;

pub use config::EngineConfig;
pub use engine::{DEFAULT_MEMORY_SIZE, Engine, EngineHandle, RunOutcome, RunTask, Termination};
pub use error::{BracketKind, EngineError};
pub use input::InputQueue;
pub use program::{Op, Program};
pub use tape::Tape;
