use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("tapebf").unwrap();
    // Keep the caller's environment and config file out of the picture.
    cmd.env("TAPEBF_CONFIG", "/nonexistent/tapebf.toml")
        .env_remove("TAPEBF_TAPE_CELLS")
        .env_remove("TAPEBF_CELL_WIDTH")
        .env_remove("TAPEBF_LOOP_STRATEGY")
        .env_remove("TAPEBF_MAX_STEPS")
        .env_remove("TAPEBF_TIMEOUT_MS")
        .timeout(Duration::from_secs(5));
    cmd
}

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn program_file(content: &str) -> tempfile::NamedTempFile {
    let mut tf = tempfile::NamedTempFile::new().expect("tempfile");
    write!(tf, "{}", content).unwrap();
    tf
}

fn infinite_bf() -> &'static str {
    "+[]" // increments to 1, then [] does nothing forever
}

#[test]
fn runs_hello_world_demo() {
    cargo_bin()
        .arg(demo("hello.bf"))
        .assert()
        .success()
        .stdout("Hello World!\n\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn hello_world_with_jump_table() {
    cargo_bin()
        .args(["--loop-strategy", "jump-table"])
        .arg(demo("hello.bf"))
        .assert()
        .success()
        .stdout("Hello World!\n\n");
}

#[test]
fn passes_input_to_program() {
    cargo_bin()
        .arg(demo("echo3.bf"))
        .arg("abc")
        .assert()
        .success()
        .stdout("abc\n");
}

#[test]
fn missing_input_reads_as_no_op() {
    let tf = program_file(",.");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .success()
        .stdout("\0\n");
}

#[test]
fn input_may_start_with_a_hyphen() {
    let tf = program_file(",.");
    cargo_bin()
        .arg(tf.path())
        .arg("-x")
        .assert()
        .success()
        .stdout("-\n");
}

#[test]
fn huge_tape_cells_is_clamped() {
    let tf = program_file("+.");
    cargo_bin()
        .args(["--tape-cells", "18446744073709551615"])
        .arg(tf.path())
        .assert()
        .success()
        .stdout("\u{1}\n")
        .stderr(predicate::str::is_empty());
}

#[test]
fn lone_left_move_does_not_fail() {
    let tf = program_file("<");
    cargo_bin().arg(tf.path()).assert().success().stdout("\n");
}

#[test]
fn unreadable_file_is_reported() {
    let dir = tempfile::tempdir().expect("tempdir");
    cargo_bin()
        .arg(dir.path().join("nope.bf"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error reading the file"));
}

#[test]
fn no_file_prints_usage() {
    cargo_bin()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn help_flag_exits_zero() {
    cargo_bin()
        .arg("--help")
        .assert()
        .success()
        .stderr(predicate::str::contains("Usage:").and(predicate::str::contains("--max-steps")));
}

#[test]
fn unmatched_open_bracket_is_reported_with_position() {
    let tf = program_file("+.-[+");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .code(1)
        .stderr(
            predicate::str::contains("unmatched bracket '['")
                .and(predicate::str::contains("at instruction 3")),
        );
}

#[test]
fn stray_close_bracket_is_reported() {
    let tf = program_file("]");
    cargo_bin()
        .arg(tf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unmatched bracket ']'"));
}

#[test]
fn step_limit_flag() {
    // Once "ab" is consumed every read is a no-op, so the loop never ends.
    let tf = program_file(",[.,]");
    cargo_bin()
        .arg("--max-steps")
        .arg("50")
        .arg(tf.path())
        .arg("ab")
        .assert()
        .failure()
        .stderr(predicate::str::contains("step limit exceeded (50)"))
        .stdout(predicate::str::contains("Execution aborted").not());
}

#[test]
fn step_limit_from_env() {
    let tf = program_file(infinite_bf());
    cargo_bin()
        .env("TAPEBF_MAX_STEPS", "40")
        .arg(tf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("step limit exceeded (40)"));
}

#[test]
fn flag_overrides_env() {
    let tf = program_file(infinite_bf());
    cargo_bin()
        .env("TAPEBF_MAX_STEPS", "5")
        .args(["--max-steps", "30"])
        .arg(tf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("step limit exceeded (30)"));
}

#[test]
fn step_limit_from_config_file() {
    let config = program_file("[engine]\nmax_steps = 20\n");
    let tf = program_file(infinite_bf());
    cargo_bin()
        .env("TAPEBF_CONFIG", config.path())
        .arg(tf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("step limit exceeded (20)"));
}

#[test]
fn timeout_aborts_infinite_loop() {
    let tf = program_file(infinite_bf());
    cargo_bin()
        .args(["--timeout", "100"])
        .arg(tf.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("wall-clock timeout exceeded (100 ms)"))
        .stdout(predicate::str::contains("Execution aborted").not());
}

#[test]
fn trace_goes_to_stderr() {
    let tf = program_file(">");
    cargo_bin()
        .arg("--trace")
        .arg(tf.path())
        .assert()
        .success()
        .stdout("\n")
        .stderr(
            predicate::str::contains("STEP | IP")
                .and(predicate::str::contains("Moved pointer head to index 1")),
        );
}

#[test]
fn cell_width_controls_input_range() {
    let tf = program_file(",.");
    cargo_bin()
        .args(["--cell-width", "word"])
        .arg(tf.path())
        .arg("Ω")
        .assert()
        .success()
        .stdout("Ω\n");

    cargo_bin()
        .arg(tf.path())
        .arg("Ω")
        .assert()
        .success()
        .stdout("\u{a9}\n");
}

#[test]
fn unknown_cell_width_is_rejected() {
    let tf = program_file("+");
    cargo_bin()
        .args(["--cell-width", "nibble"])
        .arg(tf.path())
        .assert()
        .failure();
}
