//! Program text decoded into an instruction stream.
//!
//! Every character of the source keeps its position, so an instruction index
//! is also a character index into the source text. Characters outside the
//! eight operators decode to `None` and execute as no-ops.
//!
//! Brackets are not validated up front. A loop boundary is resolved only when
//! the interpreter actually has to jump across it, by scanning and counting
//! nesting depth. A scan that runs off either end reports
//! [`EngineError::UnmatchedBracket`].

use std::fmt;

use crate::error::{BracketKind, EngineError};

/// One of the eight Brainfuck operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `>`
    Right,
    /// `<`
    Left,
    /// `+`
    Inc,
    /// `-`
    Dec,
    /// `.`
    Output,
    /// `,`
    Input,
    /// `[`
    LoopStart,
    /// `]`
    LoopEnd,
}

impl Op {
    pub fn from_char(c: char) -> Option<Op> {
        match c {
            '>' => Some(Op::Right),
            '<' => Some(Op::Left),
            '+' => Some(Op::Inc),
            '-' => Some(Op::Dec),
            '.' => Some(Op::Output),
            ',' => Some(Op::Input),
            '[' => Some(Op::LoopStart),
            ']' => Some(Op::LoopEnd),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Op::Right => '>',
            Op::Left => '<',
            Op::Inc => '+',
            Op::Dec => '-',
            Op::Output => '.',
            Op::Input => ',',
            Op::LoopStart => '[',
            Op::LoopEnd => ']',
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// An immutable, decoded program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    ops: Vec<Option<Op>>,
}

impl Program {
    pub fn parse(source: &str) -> Self {
        Self {
            ops: source.chars().map(Op::from_char).collect(),
        }
    }

    /// Number of positions, including no-op characters.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Operator at `ip`, or `None` for a no-op character or a position past the end.
    pub fn op_at(&self, ip: usize) -> Option<Op> {
        self.ops.get(ip).copied().flatten()
    }

    /// Find the `]` closing the `[` at `ip`.
    pub fn matching_close(&self, ip: usize) -> Result<usize, EngineError> {
        let mut depth = 1usize;
        let mut pos = ip;
        while depth > 0 {
            pos += 1;
            match self.ops.get(pos) {
                None => {
                    return Err(EngineError::UnmatchedBracket {
                        ip,
                        kind: BracketKind::Open,
                    });
                }
                Some(Some(Op::LoopStart)) => depth += 1,
                Some(Some(Op::LoopEnd)) => depth -= 1,
                Some(_) => {}
            }
        }
        Ok(pos)
    }

    /// Find the `[` opening the `]` at `ip`.
    pub fn matching_open(&self, ip: usize) -> Result<usize, EngineError> {
        let mut depth = 1usize;
        let mut pos = ip;
        while depth > 0 {
            let Some(prev) = pos.checked_sub(1) else {
                return Err(EngineError::UnmatchedBracket {
                    ip,
                    kind: BracketKind::Close,
                });
            };
            pos = prev;
            match self.ops[pos] {
                Some(Op::LoopEnd) => depth += 1,
                Some(Op::LoopStart) => depth -= 1,
                _ => {}
            }
        }
        Ok(pos)
    }
}
