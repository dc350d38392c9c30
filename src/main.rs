use clap::Parser;
use std::env;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use tapebf::cli_util::print_engine_error;
use tapebf::config::{self, SettingsLayer};
use tapebf::{load_program, CellWidth, EngineError, Interpreter, LoopStrategy, StepControl};

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} [OPTIONS] <FILE> [INPUT]

Runs the Brainfuck program in FILE. Characters other than ><+-.,[] are
ignored. INPUT (default: empty) is consumed one character per `,`; once it
runs out `,` leaves the current cell unchanged.

Options:
  --trace,  -t            Print a step-by-step table of operations to stderr
  --max-steps <N>         Abort after N steps (fallback TAPEBF_MAX_STEPS; default unlimited)
  --timeout <MS>          Wall-clock timeout in milliseconds (fallback TAPEBF_TIMEOUT_MS; default none)
  --cell-width <WIDTH>    byte | word | wide (fallback TAPEBF_CELL_WIDTH; default byte)
  --tape-cells <N>        Cells allocated up front (fallback TAPEBF_TAPE_CELLS; default 30000, max 16777216)
  --loop-strategy <S>     scan | jump-table (fallback TAPEBF_LOOP_STRATEGY; default scan)
  --help,   -h            Show this help

Settings not given as flags or environment variables are read from the
[engine] section of $XDG_CONFIG_HOME/tapebf.toml (or the file named by
TAPEBF_CONFIG).

Examples:
    {0} ./hello.bf
    {0} ./echo.bf "some input"
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "tapebf", disable_help_flag = true)]
struct Cli {
    /// Print a step-by-step table of operations to stderr
    #[arg(short = 't', long = "trace")]
    trace: bool,

    /// Maximum interpreter steps before abort
    #[arg(long = "max-steps", value_name = "N")]
    max_steps: Option<usize>,

    /// Wall-clock timeout in milliseconds
    #[arg(long = "timeout", value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Arithmetic width of a tape cell
    #[arg(long = "cell-width", value_enum, value_name = "WIDTH")]
    cell_width: Option<CellWidth>,

    /// Cells allocated before execution starts
    #[arg(long = "tape-cells", value_name = "N")]
    tape_cells: Option<usize>,

    /// How a skipped loop finds its end
    #[arg(long = "loop-strategy", value_enum, value_name = "S")]
    loop_strategy: Option<LoopStrategy>,

    /// Path to the program source
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Characters consumed by `,`
    #[arg(value_name = "INPUT", allow_hyphen_values = true)]
    input: Option<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,
}

fn run(program: &str, cli: Cli) -> i32 {
    if cli.help {
        usage_and_exit(program, 0);
    }

    let Some(path) = cli.file else {
        usage_and_exit(program, 2);
    };

    let code = match load_program(&path) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return 1;
        }
    };
    let input = cli.input.unwrap_or_default();

    // Resolve limits: flags -> env -> config file -> defaults
    let settings = config::resolve(SettingsLayer {
        tape_cells: cli.tape_cells,
        cell_width: cli.cell_width,
        loop_strategy: cli.loop_strategy,
        max_steps: cli.max_steps,
        timeout_ms: cli.timeout_ms,
    });
    let timeout_ms = settings.timeout_ms;

    // Ctrl+C raises the same flag the timeout uses
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        eprintln!("{program}: failed to set ctrl+c handler: {e}");
        let _ = io::stderr().flush();
        return 1;
    }

    // Execute on a worker thread with cooperative cancellation
    let (tx, rx) = mpsc::channel::<Result<String, EngineError>>();
    let interpreter = Interpreter::new(settings.engine);
    let control = StepControl::new(None, cancel.clone());
    let worker_code = code.clone();
    let trace = cli.trace;

    thread::spawn(move || {
        let res = if trace {
            let mut err = BufWriter::new(io::stderr().lock());
            let res = interpreter.execute_traced_with_control(&worker_code, &input, &control, &mut err);
            let _ = err.flush();
            res
        } else {
            interpreter.execute_with_control(&worker_code, &input, &control)
        };
        let _ = tx.send(res);
    });

    let received = match timeout_ms {
        Some(ms) => rx.recv_timeout(Duration::from_millis(ms)),
        None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
    };

    match received {
        Ok(Ok(output)) => {
            println!("{output}");
            let _ = io::stdout().flush();
            0
        }
        Ok(Err(EngineError::StepLimitExceeded { limit })) => {
            eprintln!("Execution aborted: step limit exceeded ({limit})");
            let _ = io::stderr().flush();
            1
        }
        Ok(Err(EngineError::Canceled)) => {
            eprintln!("Execution aborted: interrupted");
            let _ = io::stderr().flush();
            1
        }
        Ok(Err(other)) => {
            print_engine_error(Some(program), &code, &other);
            1
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            eprintln!(
                "Execution aborted: wall-clock timeout exceeded ({} ms)",
                timeout_ms.unwrap_or_default()
            );
            let _ = io::stderr().flush();
            1
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            eprintln!("{program}: interpreter thread exited unexpectedly");
            let _ = io::stderr().flush();
            1
        }
    }
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("tapebf"));

    let cli = Cli::parse();
    let code = run(&program, cli);
    std::process::exit(code);
}
