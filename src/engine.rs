//! The fetch-execute loop and the handles a driver uses to talk to it.
//!
//! An [`Engine`] owns its configuration, the shared [`InputQueue`], and the
//! cooperative cancellation flag. Tape and program are rebuilt for every run
//! and never outlive it. A driver typically wraps the engine in an `Arc`,
//! starts a run with [`Engine::spawn`], and keeps an [`EngineHandle`] to push
//! input and request a stop while the run is in progress.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::InputQueue;
use crate::program::{Op, Program};
use crate::tape::Tape;

/// Tape size used when none is configured.
pub const DEFAULT_MEMORY_SIZE: usize = 30_000;

// Upper bound on how long a starved `,` waits before re-checking the stop flag.
const STALL_POLL: Duration = Duration::from_millis(10);

type OutputSink = Box<dyn Fn(u8, &[u8]) + Send + Sync>;
type InputWanted = Box<dyn Fn() + Send + Sync>;

/// Why a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The instruction pointer reached the end of the program.
    Completed,
    /// A stop was requested before the program finished.
    Cancelled,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Every byte produced by `.`, in order.
    pub output: Vec<u8>,
    pub termination: Termination,
    /// Tape as it was after the last executed instruction.
    pub tape: Tape,
}

impl RunOutcome {
    pub fn is_cancelled(&self) -> bool {
        self.termination == Termination::Cancelled
    }

    /// Output rendered as text, one character per byte.
    pub fn output_lossy(&self) -> String {
        self.output.iter().map(|&b| b as char).collect()
    }
}

/// A Brainfuck engine that runs one program at a time.
pub struct Engine {
    memory_size: usize,
    input: InputQueue,
    running: Arc<AtomicBool>,
    busy: AtomicBool,
    output_sink: Option<OutputSink>,
    input_wanted: Option<InputWanted>,
}

impl Engine {
    /// Create an engine whose runs allocate `memory_size` cells.
    pub fn new(memory_size: usize) -> Result<Self, EngineError> {
        if memory_size == 0 {
            return Err(EngineError::InvalidMemorySize { size: memory_size });
        }
        Ok(Self {
            memory_size,
            input: InputQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
            busy: AtomicBool::new(false),
            output_sink: None,
            input_wanted: None,
        })
    }

    pub fn with_config(config: &EngineConfig) -> Result<Self, EngineError> {
        Self::new(config.memory_size)
    }

    /// Provide an output observer. It is called for every `.` with the new byte
    /// and the cumulative output of the run so far, including that byte.
    pub fn set_output_sink<F>(&mut self, sink: F)
    where
        F: Fn(u8, &[u8]) + Send + Sync + 'static,
    {
        self.output_sink = Some(Box::new(sink));
    }

    /// Provide a hook called when `,` finds the input queue empty and starts
    /// waiting. It fires once per stall, not once per retry.
    pub fn set_input_wanted<F>(&mut self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.input_wanted = Some(Box::new(hook));
    }

    /// A cloneable handle for pushing input and stopping runs from other threads.
    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            input: self.input.clone(),
            running: Arc::clone(&self.running),
        }
    }

    pub fn push_bytes(&self, bytes: &[u8]) {
        self.input.push_bytes(bytes);
    }

    pub fn push_str(&self, text: &str) {
        self.input.push_str(text);
    }

    /// Request a cooperative stop of the active run. Idempotent and non-blocking.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Whether a run is active and has not been asked to stop.
    ///
    /// Once this reads `true`, the run has already cleared its input queue, so
    /// bytes pushed from then on are delivered to it.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run `source` to completion or cancellation on the calling thread.
    pub fn run(&self, source: &str) -> Result<RunOutcome, EngineError> {
        self.begin()?;
        let _guard = RunGuard { engine: self };
        self.execute(&Program::parse(source))
    }

    /// Start a run on a worker thread.
    ///
    /// Run state is reset before this returns, so input pushed and stops
    /// requested afterwards always apply to this run.
    pub fn spawn(self: &Arc<Self>, source: &str) -> Result<RunTask, EngineError> {
        self.begin()?;
        let engine = Arc::clone(self);
        let program = Program::parse(source);
        let spawned = thread::Builder::new()
            .name("jbf-engine".to_string())
            .spawn(move || {
                let _guard = RunGuard { engine: &engine };
                engine.execute(&program)
            });
        match spawned {
            Ok(handle) => Ok(RunTask { handle }),
            Err(source) => {
                self.finish();
                Err(EngineError::Spawn { source })
            }
        }
    }

    fn begin(&self) -> Result<(), EngineError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(EngineError::AlreadyRunning);
        }
        self.input.clear();
        self.running.store(true, Ordering::Release);
        Ok(())
    }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
        self.busy.store(false, Ordering::Release);
    }

    fn execute(&self, program: &Program) -> Result<RunOutcome, EngineError> {
        let mut tape = Tape::new(self.memory_size)?;
        let mut output: Vec<u8> = Vec::new();
        let mut ip = 0usize;
        let mut stalled = false;

        debug!(len = program.len(), memory_size = self.memory_size, "run started");

        while ip < program.len() && self.running.load(Ordering::Relaxed) {
            let Some(op) = program.op_at(ip) else {
                ip += 1;
                continue;
            };
            trace!(ip, %op, ptr = tape.pointer(), cell = tape.get(), "step");

            match op {
                Op::Right => tape.move_right(ip)?,
                Op::Left => tape.move_left(ip)?,
                Op::Inc => tape.inc(),
                Op::Dec => tape.dec(),
                Op::Output => {
                    output.push(tape.get());
                    if let Some(sink) = self.output_sink.as_ref() {
                        (sink)(tape.get(), &output);
                    }
                }
                Op::Input => {
                    let byte = match self.input.pop() {
                        Some(b) => Some(b),
                        None => {
                            if !stalled {
                                stalled = true;
                                debug!(ip, "input queue empty; waiting for input");
                                if let Some(hook) = self.input_wanted.as_ref() {
                                    (hook)();
                                }
                            }
                            self.input.pop_timeout(STALL_POLL)
                        }
                    };
                    match byte {
                        Some(b) => {
                            stalled = false;
                            tape.set(b);
                        }
                        // Re-execute `,` on the next cycle.
                        None => continue,
                    }
                }
                Op::LoopStart => {
                    if tape.get() == 0 {
                        ip = program.matching_close(ip)?;
                    }
                }
                Op::LoopEnd => {
                    if tape.get() != 0 {
                        ip = program.matching_open(ip)?;
                    }
                }
            }
            ip += 1;
        }

        let termination = if ip >= program.len() {
            Termination::Completed
        } else {
            Termination::Cancelled
        };
        debug!(?termination, ip, output_len = output.len(), "run finished");

        Ok(RunOutcome {
            output,
            termination,
            tape,
        })
    }
}

// Releases the engine when a run ends, including by panic.
struct RunGuard<'a> {
    engine: &'a Engine,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.engine.finish();
    }
}

/// Thread-safe access to a running engine's input queue and stop flag.
#[derive(Clone)]
pub struct EngineHandle {
    input: InputQueue,
    running: Arc<AtomicBool>,
}

impl EngineHandle {
    pub fn push_bytes(&self, bytes: &[u8]) {
        self.input.push_bytes(bytes);
    }

    pub fn push_str(&self, text: &str) {
        self.input.push_str(text);
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// A run executing on a worker thread.
pub struct RunTask {
    handle: JoinHandle<Result<RunOutcome, EngineError>>,
}

impl RunTask {
    /// Block until the run ends and return its result.
    pub fn join(self) -> Result<RunOutcome, EngineError> {
        self.handle.join().map_err(|_| EngineError::WorkerPanicked)?
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BracketKind;
    use std::sync::Mutex;
    use std::time::Instant;

    fn engine(size: usize) -> Engine {
        Engine::new(size).unwrap()
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond() {
            assert!(Instant::now() < deadline, "condition not reached in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn zero_memory_is_a_construction_error() {
        assert!(matches!(Engine::new(0), Err(EngineError::InvalidMemorySize { size: 0 })));
    }

    #[test]
    fn straight_line_program_prints_in_order() {
        let code = format!("{}.+.+.", "+".repeat(65));
        let outcome = engine(10).run(&code).unwrap();
        assert_eq!(outcome.output, b"ABC");
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.tape.cells()[0], 67);
    }

    #[test]
    fn non_operators_are_skipped() {
        let outcome = engine(10).run("hello + world +\n.").unwrap();
        assert_eq!(outcome.output, vec![2]);
    }

    #[test]
    fn loop_on_zero_cell_never_runs_body() {
        let outcome = engine(10).run("[-]").unwrap();
        assert!(outcome.output.is_empty());
        assert_eq!(outcome.termination, Termination::Completed);
        assert_eq!(outcome.tape.cells()[0], 0);
    }

    #[test]
    fn loop_on_nonzero_cell_repeats_until_zero() {
        // cell0 = 3; each iteration moves one unit into cell1
        let outcome = engine(10).run("+++[->+<]").unwrap();
        assert_eq!(&outcome.tape.cells()[..2], &[0, 3]);
    }

    #[test]
    fn nested_loops_multiply() {
        let outcome = engine(10).run("++++[>+++[>++<-]<-]").unwrap();
        assert_eq!(&outcome.tape.cells()[..3], &[0, 0, 24]);
    }

    #[test]
    fn input_is_consumed_one_byte_per_read() {
        let e = engine(10);
        let handle = e.handle();
        let t = thread::spawn(move || {
            wait_until(|| handle.is_running());
            handle.push_str("hi");
        });
        let outcome = e.run(",.,.").unwrap();
        t.join().unwrap();
        assert_eq!(outcome.output, b"hi");
    }

    #[test]
    fn starved_read_stalls_until_stopped() {
        let e = Arc::new(engine(10));
        let task = e.spawn(",.").unwrap();
        thread::sleep(Duration::from_millis(50));
        assert!(!task.is_finished());
        e.stop();
        let outcome = task.join().unwrap();
        assert!(outcome.is_cancelled());
        assert!(outcome.output.is_empty());
    }

    #[test]
    fn input_wanted_fires_once_per_stall() {
        let calls = Arc::new(Mutex::new(0usize));
        let mut e = engine(10);
        let counter = Arc::clone(&calls);
        e.set_input_wanted(move || *counter.lock().unwrap() += 1);
        let e = Arc::new(e);

        let task = e.spawn(",.,.").unwrap();
        wait_until(|| *calls.lock().unwrap() == 1);
        thread::sleep(Duration::from_millis(40));
        assert_eq!(*calls.lock().unwrap(), 1);
        e.push_str("a");
        wait_until(|| *calls.lock().unwrap() == 2);
        e.push_str("b");

        let outcome = task.join().unwrap();
        assert_eq!(outcome.output, b"ab");
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[test]
    fn output_sink_sees_each_byte_and_running_total() {
        let seen: Arc<Mutex<Vec<(u8, Vec<u8>)>>> = Arc::new(Mutex::new(Vec::new()));
        let mut e = engine(10);
        let sink_seen = Arc::clone(&seen);
        e.set_output_sink(move |b, all| sink_seen.lock().unwrap().push((b, all.to_vec())));
        e.run("+.+.").unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(*seen, vec![(1, vec![1]), (2, vec![1, 2])]);
    }

    #[test]
    fn infinite_loop_is_cancelled_with_partial_output() {
        let e = Arc::new(engine(10));
        let task = e.spawn("+.[]").unwrap();
        thread::sleep(Duration::from_millis(20));
        e.handle().stop();
        let outcome = task.join().unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.output, vec![1]);
    }

    #[test]
    fn second_run_while_active_is_rejected() {
        let e = Arc::new(engine(10));
        let task = e.spawn("+[]").unwrap();
        assert!(matches!(e.run("+"), Err(EngineError::AlreadyRunning)));
        assert!(matches!(e.spawn("+"), Err(EngineError::AlreadyRunning)));
        e.stop();
        task.join().unwrap();
        assert!(!e.is_running());
        assert!(e.run("+").is_ok());
    }

    #[test]
    fn state_does_not_survive_between_runs() {
        let e = engine(10);
        e.run(">+++").unwrap();
        let outcome = e.run("").unwrap();
        assert_eq!(outcome.tape.pointer(), 0);
        assert!(outcome.tape.cells().iter().all(|&c| c == 0));
    }

    #[test]
    fn input_pushed_before_a_run_is_discarded() {
        let e = Arc::new(engine(10));
        e.push_str("stale");
        let task = e.spawn(",.").unwrap();
        e.push_str("F");
        let outcome = task.join().unwrap();
        assert_eq!(outcome.output, b"F");
    }

    #[test]
    fn moving_off_the_tape_stops_the_run_with_an_error() {
        let result = engine(1).run("+>+");
        assert!(matches!(
            result,
            Err(EngineError::PointerOutOfBounds { ip: 1, ptr: 0, op: '>' })
        ));
    }

    #[test]
    fn pointer_does_not_wrap_from_cell_zero_to_the_last_cell() {
        let result = engine(4).run("+<+");
        assert!(matches!(
            result,
            Err(EngineError::PointerOutOfBounds { ip: 1, ptr: 0, op: '<' })
        ));
    }

    #[test]
    fn config_sets_capacity() {
        let config = EngineConfig {
            memory_size: 2,
            ..EngineConfig::default()
        };
        let e = Engine::with_config(&config).unwrap();
        assert!(e.run(">").is_ok());
        assert!(e.run(">>").is_err());
    }

    #[test]
    fn unmatched_open_is_reported_only_when_scanned() {
        // Non-zero cell enters the loop and simply runs off the end.
        let outcome = engine(10).run("+[").unwrap();
        assert_eq!(outcome.termination, Termination::Completed);

        let result = engine(10).run("[+");
        assert!(matches!(
            result,
            Err(EngineError::UnmatchedBracket { ip: 0, kind: BracketKind::Open })
        ));
    }

    #[test]
    fn unmatched_close_is_reported_only_when_scanned() {
        // Zero cell falls through a stray ']'.
        assert!(engine(10).run("]").is_ok());

        let result = engine(10).run("+]");
        assert!(matches!(
            result,
            Err(EngineError::UnmatchedBracket { ip: 1, kind: BracketKind::Close })
        ));
    }

    #[test]
    fn engine_is_released_after_an_error() {
        let e = engine(1);
        assert!(e.run("<").is_err());
        assert!(!e.is_running());
        assert!(e.run("+").is_ok());
    }
}
