//! End-to-end CLI tests against the built binary.

use std::process::Command;

fn hive() -> Command {
    Command::new(env!("CARGO_BIN_EXE_hive"))
}

#[test]
fn eval_chunk_runs_and_drains() {
    let output = hive()
        .args(["--pool-size", "2", "-e", "print('from eval')"])
        .output()
        .expect("run hive");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).contains("from eval"));
}

#[test]
fn script_file_with_processes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("echo.lua");
    std::fs::write(
        &script,
        r#"
        local out = hive.channel.new()
        local p = hive.process.new(function(ch, v) ch:put(v * 2) end, nil, 2)
        for i = 1, 10 do
            p(out, i)
        end
        local total, seen = 0, 0
        while seen < 10 do
            local v = out:try_get()
            if v ~= nil then
                total = total + v
                seen = seen + 1
            end
        end
        print("total=" .. total)
        "#,
    )
    .expect("write script");

    let output = hive()
        .args(["--pool-size", "2"])
        .arg(&script)
        .output()
        .expect("run hive");
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(
        String::from_utf8_lossy(&output.stdout).contains("total=110"),
        "stdout: {}",
        String::from_utf8_lossy(&output.stdout)
    );
}

#[test]
fn missing_script_is_an_error() {
    let output = hive().output().expect("run hive");
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("nothing to run"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn lua_errors_fail_the_process() {
    let output = hive()
        .args(["--pool-size", "0", "-e", "error('host failure')"])
        .output()
        .expect("run hive");
    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("host failure"),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
