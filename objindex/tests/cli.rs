// CLI tests: drive the `objindex` binary end to end.
//
// Covers report output on the demo traces, exit codes for each failure
// class, and the JSON provenance block.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicUsize, Ordering};

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn objindex_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_objindex"))
}

fn demo(name: &str) -> PathBuf {
    project_root().join("traces").join(name)
}

/// Unique counter for temp file names (avoids collisions in parallel tests).
static COUNTER: AtomicUsize = AtomicUsize::new(0);

fn temp_path(prefix: &str, ext: &str) -> PathBuf {
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("{}_{}_{}.{}", prefix, std::process::id(), n, ext))
}

fn write_temp(prefix: &str, ext: &str, contents: &str) -> PathBuf {
    let path = temp_path(prefix, ext);
    std::fs::write(&path, contents).expect("failed to write temp file");
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("non-UTF8 path")
}

fn run(args: &[&str]) -> Output {
    Command::new(objindex_binary())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run objindex")
}

fn stdout(output: &Output) -> String {
    String::from_utf8(output.stdout.clone()).expect("non-UTF8 output")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

// ── Success ─────────────────────────────────────────────────────────────────

#[test]
fn text_report_on_stdout() {
    let output = run(&[arg(&demo("loop_collapse.trace"))]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "#1:(unknown pid 1)\n#0:(unknown pid 3)\n    #2:(unknown pid 2)\n"
    );
}

#[test]
fn locations_flag_resolves_program_points() {
    let output = run(&[
        arg(&demo("recursion.trace")),
        "--locations",
        arg(&demo("locations.json")),
    ]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("#0:(rec.js:2:13)\n"));
}

#[test]
fn json_report_carries_provenance() {
    let trace = demo("loop_collapse.trace");
    let output = run(&[arg(&trace), "--emit", "json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));

    let json: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    let source = std::fs::read_to_string(&trace).unwrap();
    let expected = objindex::report::Provenance::of_trace(&source).trace_hash_hex();
    assert_eq!(json["summary"]["trace_sha256"], expected.as_str());
    assert_eq!(json["summary"]["tool_version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["summary"]["total_count"], 3);
    assert_eq!(json["summary"]["access_point"], 0);
}

#[test]
fn output_flag_writes_file() {
    let out = temp_path("objindex_cli_out", "txt");
    let output = run(&[arg(&demo("constructors.trace")), "-o", arg(&out)]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).is_empty());
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written, "#1:(unknown pid 1)\n#2:(unknown pid 2)\n");
    let _ = std::fs::remove_file(&out);
}

#[test]
fn evict_on_reclaim_flag() {
    let output = run(&[arg(&demo("constructors.trace")), "--evict-on-reclaim"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(stdout(&output), "#1:(unknown pid 1)\n#1:(unknown pid 2)\n");
}

#[test]
fn access_pid_flag_moves_the_sentinel() {
    let trace = write_temp(
        "objindex_cli_access",
        "trace",
        "script-enter\nliteral 1 @1\nget 4 @1\nfunction-enter\nliteral 2 @2\nfunction-exit\nget 3 @2\nscript-exit\n",
    );
    let output = run(&[arg(&trace), "--access-pid", "900"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "#1:(unknown pid 1)\n#0:(unknown pid 2)\n    #1:(access)\n"
    );
    let _ = std::fs::remove_file(&trace);
}

// ── Failures ────────────────────────────────────────────────────────────────

#[test]
fn syntax_error_exits_1_with_location() {
    let trace = write_temp("objindex_cli_syntax", "trace", "call 1\nliteral 7\n");
    let output = run(&[arg(&trace)]);
    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains(":2:"), "stderr: {}", err);
    assert!(err.contains("error[E0002]"), "stderr: {}", err);
    assert!(stdout(&output).is_empty());
    let _ = std::fs::remove_file(&trace);
}

#[test]
fn missing_trace_exits_2() {
    let output = run(&["/nonexistent/objindex/missing.trace"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn bad_location_map_exits_2() {
    let map = write_temp("objindex_cli_map", "json", r#"{"seven": {"file": "a.js", "line": 1}}"#);
    let output = run(&[arg(&demo("loop_collapse.trace")), "-l", arg(&map)]);
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("'seven'"), "stderr: {}", stderr(&output));
    let _ = std::fs::remove_file(&map);
}

#[test]
fn protocol_violation_exits_3_without_report() {
    let trace = write_temp(
        "objindex_cli_unbalanced",
        "trace",
        "script-enter\nliteral 1 @1\nscript-exit\nscript-exit\n",
    );
    let output = run(&[arg(&trace)]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stdout(&output).is_empty());
    let err = stderr(&output);
    assert!(err.contains("trace line 4"), "stderr: {}", err);
    assert!(err.contains("protocol violation"), "stderr: {}", err);
    let _ = std::fs::remove_file(&trace);
}

#[test]
fn open_frames_exit_3() {
    let trace = write_temp("objindex_cli_open", "trace", "script-enter\nfunction-enter\n");
    let output = run(&[arg(&trace)]);
    assert_eq!(output.status.code(), Some(3));
    let _ = std::fs::remove_file(&trace);
}
