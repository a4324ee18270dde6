use std::fmt;

/// Errors that can occur while constructing or running an [`Engine`](crate::Engine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine was asked for a tape with no cells.
    #[error("Memory size must be greater than 0 (got {size})")]
    InvalidMemorySize { size: usize },

    /// The data pointer attempted to move left of cell 0 or beyond the last cell.
    #[error("Pointer out of bounds at instruction {ip} (ptr={ptr}, op='{op}')")]
    PointerOutOfBounds { ip: usize, ptr: usize, op: char },

    /// A bracket scan ran off the end of the program without finding its partner.
    #[error("Unmatched bracket {kind} at instruction {ip}")]
    UnmatchedBracket { ip: usize, kind: BracketKind },

    /// A run was requested while another run on the same engine is still active.
    #[error("Engine is already running a program")]
    AlreadyRunning,

    /// The operating system refused to start a worker thread.
    #[error("Failed to spawn engine worker thread: {source}")]
    Spawn {
        #[source]
        source: std::io::Error,
    },

    /// The worker thread executing a spawned run terminated abnormally.
    #[error("Engine worker thread panicked")]
    WorkerPanicked,
}

impl EngineError {
    /// Instruction index the error points at, when there is one.
    pub fn ip(&self) -> Option<usize> {
        match self {
            EngineError::PointerOutOfBounds { ip, .. } | EngineError::UnmatchedBracket { ip, .. } => {
                Some(*ip)
            }
            _ => None,
        }
    }
}

/// Which side of the loop was unmatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BracketKind {
    Open,
    Close,
}

impl fmt::Display for BracketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BracketKind::Open => write!(f, "'['"),
            BracketKind::Close => write!(f, "']'"),
        }
    }
}
