use std::process::Command;

#[test]
fn cli_smoke_help() {
    let exe = env!("CARGO_BIN_EXE_taskbell");
    let output = Command::new(exe)
        .arg("--help")
        .output()
        .expect("failed to run taskbell --help");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("watch"));
    assert!(stdout.contains("dark-mode"));
}

#[test]
fn unknown_command_reports_invalid_input() {
    let exe = env!("CARGO_BIN_EXE_taskbell");
    let output = Command::new(exe)
        .arg("frobnicate")
        .output()
        .expect("failed to run taskbell");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: invalid_input"));
}
