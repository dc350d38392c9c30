use std::fs;
use std::path::{Path, PathBuf};

/// The eight recognized instruction symbols.
pub const INSTRUCTIONS: [char; 8] = ['>', '<', '+', '-', '.', ',', '[', ']'];

/// Errors raised while loading a program file.
#[derive(Debug, thiserror::Error)]
#[error("Error reading the file: {source}")]
pub struct LoadError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub fn is_instruction(c: char) -> bool {
    INSTRUCTIONS.contains(&c)
}

/// Strip every character that is not an instruction.
pub fn filter_instructions(source: &str) -> String {
    source.chars().filter(|&c| is_instruction(c)).collect()
}

/// Read the program at `path` as UTF-8 and return its instructions.
pub fn load_program(path: impl AsRef<Path>) -> Result<String, LoadError> {
    let path = path.as_ref();
    let source = fs::read_to_string(path).map_err(|source| LoadError {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(filter_instructions(&source))
}
