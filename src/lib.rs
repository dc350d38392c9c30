//! A small Brainfuck interpreter with a string-in, string-out engine.
//!
//! The engine runs an instruction string against an input string and hands
//! back everything the program printed. It performs no I/O of its own.
//!
//! Features and behaviors:
//! - The tape starts with 30,000 zeroed cells and grows at either end, so the
//!   data pointer can never fall off it.
//! - Cells wrap at 8 bits by default; 16- and 32-bit cells are available.
//! - `,` consumes the next input character; once input runs out it is a no-op.
//! - `.` appends the character whose code point is the current cell value.
//! - Unbalanced brackets are reported when execution reaches them.
//! - Characters outside `><+-.,[]` are ignored by the engine and stripped by
//!   the program loader.
//!
//! Quick start:
//!
//! ```
//! use tapebf::execute;
//!
//! let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
//! assert_eq!(execute(code, "").unwrap(), "Hello World!\n");
//! assert_eq!(execute(",.", "A").unwrap(), "A");
//! ```

pub mod cli_util;
pub mod config;
pub mod engine;
pub mod program;
pub mod tape;

pub use config::{CellWidth, EngineConfig, LoopStrategy, Settings, SettingsLayer};
pub use engine::{execute, BracketKind, EngineError, Interpreter, JumpTable, StepControl};
pub use program::{filter_instructions, is_instruction, load_program, LoadError, INSTRUCTIONS};
pub use tape::Tape;
