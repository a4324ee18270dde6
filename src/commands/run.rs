use std::fs;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Args;
use jbf::cli_util::print_engine_error;
use jbf::{Engine, EngineConfig, EngineHandle, Termination};
use tracing::debug;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Tape size in cells (fallback JBF_MEMORY_SIZE, then config file; default 30_000)
    #[arg(short = 'm', long = "memory", value_name = "CELLS")]
    pub memory: Option<usize>,

    /// Wall-clock timeout in milliseconds (fallback JBF_TIMEOUT_MS; default none)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        file,
        code,
        memory,
        timeout_ms,
        ..
    } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let code_str = if let Some(path) = file {
        match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        code.join("")
    };

    // Resolve settings: flags -> env -> config file -> defaults
    let mut config = EngineConfig::load();
    if let Some(cells) = memory {
        config.memory_size = cells;
    }
    if timeout_ms.is_some() {
        config.timeout_ms = timeout_ms;
    }
    debug!(?config, "resolved engine config");

    let mut engine = match Engine::with_config(&config) {
        Ok(engine) => engine,
        Err(err) => {
            print_engine_error(Some(program), &code_str, &err);
            return 1;
        }
    };

    // Stream every byte as soon as the program produces it
    engine.set_output_sink(|byte, _| {
        let mut out = io::stdout().lock();
        let _ = out.write_all(&[byte]);
        let _ = out.flush();
    });
    let engine = Arc::new(engine);

    let task = match engine.spawn(&code_str) {
        Ok(task) => task,
        Err(err) => {
            print_engine_error(Some(program), &code_str, &err);
            return 1;
        }
    };

    // Ctrl+C stops the run; the partial output has already been streamed.
    let handle = engine.handle();
    if let Err(e) = ctrlc::set_handler(move || handle.stop()) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        engine.stop();
    }

    let handle = engine.handle();
    let _ = thread::Builder::new()
        .name("jbf-stdin".to_string())
        .spawn(move || forward_input(io::stdin().lock(), &handle));

    let timed_out = Arc::new(AtomicBool::new(false));
    if let Some(ms) = config.timeout_ms {
        let handle = engine.handle();
        let timed_out = Arc::clone(&timed_out);
        let _ = thread::Builder::new()
            .name("jbf-timeout".to_string())
            .spawn(move || {
                thread::sleep(Duration::from_millis(ms));
                timed_out.store(true, Ordering::Relaxed);
                handle.stop();
            });
    }

    let exit_code = match task.join() {
        Ok(outcome) => match outcome.termination {
            Termination::Completed => 0,
            Termination::Cancelled if timed_out.load(Ordering::Relaxed) => {
                let ms = config.timeout_ms.unwrap_or_default();
                eprintln!("Execution aborted: wall-clock timeout exceeded ({ms} ms)");
                let _ = io::stderr().flush();
                1
            }
            Termination::Cancelled => {
                eprintln!("Execution stopped");
                let _ = io::stderr().flush();
                0
            }
        },
        Err(err) => {
            print_engine_error(Some(program), &code_str, &err);
            1
        }
    };

    // For readability, ensure output ends with a newline
    println!();
    let _ = io::stdout().flush();
    exit_code
}

/// Copy bytes from `reader` into the engine's input queue until EOF.
///
/// Terminals deliver a line at a time; pipes deliver whatever chunk is ready.
pub fn forward_input<R: Read>(mut reader: R, handle: &EngineHandle) {
    let mut buf = [0u8; 1024];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => handle.push_bytes(&buf[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "stopped forwarding stdin");
                break;
            }
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] "<code>"
  {0} run [OPTIONS] --file <PATH>

Options:
  --file,   -f <PATH>   Read Brainfuck code from PATH instead of positional "<code>"
  --memory, -m <CELLS>  Tape size in cells (default 30000)
  --timeout <MS>        Stop the run after MS milliseconds of wall-clock time
  --help,   -h          Show this help

Notes:
- Program output is streamed to stdout as it is produced.
- Input (`,`) consumes bytes from stdin as they arrive. When none are pending the
  program waits; it never reads EOF as a value.
- Characters outside of Brainfuck's ><+-.,[] are ignored.
- Ctrl+C stops the run and keeps the output produced so far.
- Moving the pointer off either end of the tape stops the run with an error.
- Settings fall back to JBF_MEMORY_SIZE, JBF_TIMEOUT_MS and then the [engine]
  section of jbf.toml in the user config directory.

Examples:
- Load Brainfuck code from a file:
    {0} run --file ./program.bf
- Echo typed input until interrupted:
    {0} run ",[.,]"
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
