//! The interpreter engine.
//!
//! [`Interpreter::execute`] takes an instruction string and an input string
//! and returns everything the program printed. All run state lives in an
//! [`ExecutionState`] created for that call and dropped when it returns.
//!
//! Semantics:
//! - `>` / `<` move the data pointer; the tape grows at whichever end the
//!   pointer runs off (see [`Tape`]).
//! - `+` / `-` wrap according to the configured [`CellWidth`](crate::CellWidth).
//! - `.` appends the character whose code point is the current cell value;
//!   values that are not Unicode scalar values become U+FFFD.
//! - `,` copies the next input character into the current cell. Once input
//!   is exhausted it leaves the cell unchanged.
//! - `[` with a zero cell skips to the matching `]`; otherwise its position
//!   is pushed on the loop stack. `]` with a non-zero cell jumps back to the
//!   position on top of the loop stack; otherwise it pops it.
//! - Any other character is ignored.

use std::fmt;
use std::io::{self, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::config::{EngineConfig, LoopStrategy};
use crate::tape::Tape;

/// Errors that end an execution early.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A `[` or `]` has no partner.
    #[error("Unmatched bracket {kind} at instruction {ip}")]
    UnmatchedBracket { ip: usize, kind: BracketKind },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: usize },

    /// Execution aborted due to cooperative cancellation (e.g., timeout)
    #[error("Execution aborted: cancelled")]
    Canceled,

    /// Writing a trace row failed.
    #[error("Failed to write trace at instruction {ip}: {source}")]
    Trace {
        ip: usize,
        #[source]
        source: io::Error,
    },
}

impl EngineError {
    /// Instruction index the error points at, when there is one.
    pub fn ip(&self) -> Option<usize> {
        match self {
            EngineError::UnmatchedBracket { ip, .. } | EngineError::Trace { ip, .. } => Some(*ip),
            EngineError::StepLimitExceeded { .. } | EngineError::Canceled => None,
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

/// Controls for cooperative cancellation and step limiting.
#[derive(Debug, Clone, Default)]
pub struct StepControl {
    pub max_steps: Option<usize>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl StepControl {
    pub fn new(max_steps: Option<usize>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self { max_steps, cancel_flag }
    }
}

/// Matching bracket positions, computed once per execution.
///
/// Brackets without a partner map to `None`; the engine only reports them
/// when execution actually reaches one, so both loop strategies fail at the
/// same point.
#[derive(Debug, Clone)]
pub struct JumpTable {
    targets: Vec<Option<usize>>,
}

impl JumpTable {
    pub fn build(program: &[char]) -> Self {
        let mut targets = vec![None; program.len()];
        let mut open: Vec<usize> = Vec::new();
        for (i, &c) in program.iter().enumerate() {
            match c {
                '[' => open.push(i),
                ']' => {
                    if let Some(start) = open.pop() {
                        targets[start] = Some(i);
                        targets[i] = Some(start);
                    }
                }
                _ => {}
            }
        }
        Self { targets }
    }

    /// The partner of the bracket at `ip`.
    pub fn matching(&self, ip: usize) -> Option<usize> {
        self.targets.get(ip).copied().flatten()
    }
}

/// Whether instructions are being executed or a loop body is being skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Scanning,
    /// Looking for the `]` that closes the `[` at `origin`.
    Skipping { origin: usize, depth: usize },
}

/// Everything one execution owns.
struct ExecutionState {
    program: Vec<char>,
    input: Vec<char>,
    tape: Tape,
    ip: usize,
    loop_stack: Vec<usize>,
    input_cursor: usize,
    output: String,
    mode: Mode,
    jumps: Option<JumpTable>,
}

impl ExecutionState {
    fn new(config: &EngineConfig, instructions: &str, input: &str) -> Self {
        let program: Vec<char> = instructions.chars().collect();
        let jumps = match config.loop_strategy {
            LoopStrategy::Scan => None,
            LoopStrategy::JumpTable => Some(JumpTable::build(&program)),
        };
        Self {
            program,
            input: input.chars().collect(),
            tape: Tape::new(config.tape_cells, config.cell_width),
            ip: 0,
            loop_stack: Vec::new(),
            input_cursor: 0,
            output: String::new(),
            mode: Mode::Scanning,
            jumps,
        }
    }

    /// Execute the instruction at `ip`. Returns a description of the effect
    /// when `describe` is set.
    fn dispatch(&mut self, instr: char, describe: bool) -> Result<Option<String>, EngineError> {
        let mut action: Option<String> = if describe { Some(String::new()) } else { None };
        let ptr_before = self.tape.pointer();
        let cell_before = self.tape.get();

        match instr {
            '>' => {
                self.tape.move_right();
                if let Some(a) = action.as_mut() { *a = format!("Moved pointer head to index {}", self.tape.pointer()); }
            }
            '<' => {
                let grew = ptr_before == 0;
                self.tape.move_left();
                if let Some(a) = action.as_mut() {
                    *a = if grew {
                        "Grew tape at the head; pointer stays at index 0".to_string()
                    } else {
                        format!("Moved pointer head to index {}", self.tape.pointer())
                    };
                }
            }
            '+' => {
                self.tape.increment();
                if let Some(a) = action.as_mut() { *a = format!("Increment cell[{}] from {} to {}", ptr_before, cell_before, self.tape.get()); }
            }
            '-' => {
                self.tape.decrement();
                if let Some(a) = action.as_mut() { *a = format!("Decrement cell[{}] from {} to {}", ptr_before, cell_before, self.tape.get()); }
            }
            '.' => {
                let ch = char::from_u32(cell_before).unwrap_or(char::REPLACEMENT_CHARACTER);
                self.output.push(ch);
                if let Some(a) = action.as_mut() { *a = format!("Output {:?}", ch); }
            }
            ',' => {
                if let Some(&ch) = self.input.get(self.input_cursor) {
                    self.tape.set(ch as u32);
                    self.input_cursor += 1;
                    if let Some(a) = action.as_mut() { *a = format!("Read {:?} -> cell[{}] = {}", ch, ptr_before, self.tape.get()); }
                } else if let Some(a) = action.as_mut() {
                    *a = "Input exhausted; cell unchanged".to_string();
                }
            }
            '[' => {
                if cell_before != 0 {
                    self.loop_stack.push(self.ip);
                    if let Some(a) = action.as_mut() { *a = "Enter loop (cell != 0)".to_string(); }
                } else if let Some(jumps) = self.jumps.as_ref() {
                    let Some(close) = jumps.matching(self.ip) else {
                        return Err(EngineError::UnmatchedBracket { ip: self.ip, kind: BracketKind::Open });
                    };
                    if let Some(a) = action.as_mut() { *a = format!("Cell is 0; jump forward to matching ']' at IP {}", close); }
                    self.ip = close;
                } else {
                    self.mode = Mode::Skipping { origin: self.ip, depth: 1 };
                    if let Some(a) = action.as_mut() { *a = "Cell is 0; skip loop body".to_string(); }
                }
            }
            ']' => {
                let Some(&open) = self.loop_stack.last() else {
                    return Err(EngineError::UnmatchedBracket { ip: self.ip, kind: BracketKind::Close });
                };
                if cell_before != 0 {
                    if let Some(a) = action.as_mut() { *a = format!("Cell != 0; jump back to matching '[' at IP {}", open); }
                    self.ip = open;
                } else {
                    self.loop_stack.pop();
                    if let Some(a) = action.as_mut() { *a = "Exit loop (cell is 0)".to_string(); }
                }
            }
            _ => {
                if let Some(a) = action.as_mut() { *a = "Ignored".to_string(); }
            }
        }

        Ok(action)
    }

    /// Consume one character of a skipped loop body.
    fn skip(&mut self, instr: char, origin: usize, depth: usize) -> String {
        let depth = match instr {
            '[' => depth + 1,
            ']' => depth - 1,
            _ => depth,
        };
        if depth == 0 {
            self.mode = Mode::Scanning;
            format!("Found ']' matching '[' at IP {}", origin)
        } else {
            self.mode = Mode::Skipping { origin, depth };
            format!("Skip (depth {})", depth)
        }
    }
}

/// A string-in, string-out interpreter.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    config: EngineConfig,
}

impl Interpreter {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run `instructions` against `input` and return the program's output.
    pub fn execute(&self, instructions: &str, input: &str) -> Result<String, EngineError> {
        self.run(instructions, input, None, None::<&mut io::Sink>)
    }

    /// Execute with cooperative cancellation and optional step limit.
    /// A step limit on `control` takes precedence over the configured one.
    pub fn execute_with_control(
        &self,
        instructions: &str,
        input: &str,
        control: &StepControl,
    ) -> Result<String, EngineError> {
        self.run(instructions, input, Some(control), None::<&mut io::Sink>)
    }

    /// Execute while writing a step-by-step table of operations to `trace`.
    pub fn execute_traced<W: Write>(
        &self,
        instructions: &str,
        input: &str,
        trace: &mut W,
    ) -> Result<String, EngineError> {
        self.run(instructions, input, None, Some(trace))
    }

    /// Traced execution with cooperative cancellation and optional step limit.
    pub fn execute_traced_with_control<W: Write>(
        &self,
        instructions: &str,
        input: &str,
        control: &StepControl,
        trace: &mut W,
    ) -> Result<String, EngineError> {
        self.run(instructions, input, Some(control), Some(trace))
    }

    fn run<W: Write>(
        &self,
        instructions: &str,
        input: &str,
        control: Option<&StepControl>,
        mut trace: Option<&mut W>,
    ) -> Result<String, EngineError> {
        let mut state = ExecutionState::new(&self.config, instructions, input);
        let max_steps = control.and_then(|c| c.max_steps).or(self.config.max_steps);
        let mut step: usize = 0;

        if let Some(w) = trace.as_mut() {
            write_header(w).map_err(|source| EngineError::Trace { ip: 0, source })?;
        }

        loop {
            if state.ip >= state.program.len() {
                if let Mode::Skipping { origin, .. } = state.mode {
                    return Err(EngineError::UnmatchedBracket { ip: origin, kind: BracketKind::Open });
                }
                break;
            }

            if let Some(ctrl) = control {
                if ctrl.cancel_flag.load(Ordering::Relaxed) {
                    return Err(EngineError::Canceled);
                }
            }
            if let Some(max) = max_steps {
                if step >= max {
                    return Err(EngineError::StepLimitExceeded { limit: max });
                }
            }

            let ip = state.ip;
            let instr = state.program[ip];
            let (ptr_before, cell_before) = (state.tape.pointer(), state.tape.get());

            let action = match state.mode {
                Mode::Scanning => state.dispatch(instr, trace.is_some())?,
                Mode::Skipping { origin, depth } => {
                    let action = state.skip(instr, origin, depth);
                    trace.is_some().then_some(action)
                }
            };

            if let Some(w) = trace.as_mut() {
                writeln!(
                    w,
                    "{:<4} | {:<3} | {:<3} | {:<4} |  {}    | {}",
                    step,
                    ip,
                    ptr_before,
                    cell_before,
                    instr,
                    action.unwrap_or_default()
                )
                .map_err(|source| EngineError::Trace { ip, source })?;
            }

            step += 1;
            state.ip += 1;
        }

        if let Some(&open) = state.loop_stack.last() {
            return Err(EngineError::UnmatchedBracket { ip: open, kind: BracketKind::Open });
        }

        Ok(state.output)
    }
}

fn write_header<W: Write>(w: &mut W) -> io::Result<()> {
    writeln!(w, "STEP | IP  | PTR | CELL | INSTR | ACTION")?;
    writeln!(w, "-----+-----+-----+------+-------+------------------------------------------------")
}

/// Run `instructions` with the default configuration.
pub fn execute(instructions: &str, input: &str) -> Result<String, EngineError> {
    Interpreter::default().execute(instructions, input)
}
