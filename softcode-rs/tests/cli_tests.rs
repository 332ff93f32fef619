/// End-to-end tests: run text through the `softcode` binary and verify what
/// it prints.
///
/// Each case passes `-f` (skip config lookup) so results don't depend on the
/// machine's own config files.  Messages go either on the command line or,
/// one per line, through stdin.

use std::io::Write;
use std::process::{Command, Stdio};

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Path to the `softcode` binary built by this Cargo workspace.
fn binary() -> std::path::PathBuf {
    std::path::PathBuf::from(env!("CARGO_BIN_EXE_softcode"))
}

/// Run the binary with `args`, feeding `stdin`, and return stdout lines.
fn run(args: &[&str], stdin: &str) -> Vec<String> {
    let mut child = Command::new(binary())
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn softcode binary");
    {
        let input = child.stdin.as_mut().expect("stdin not open");
        input.write_all(stdin.as_bytes()).expect("write to stdin");
    }
    let out = child.wait_with_output().expect("wait failed");
    assert!(
        out.status.success(),
        "softcode exited with {}: {}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout)
        .lines()
        .map(str::to_owned)
        .collect()
}

fn check(args: &[&str], stdin: &str, expected: &[&str]) {
    let got = run(args, stdin);
    assert_eq!(got, expected, "\nargs: {args:?}\nstdin:\n{stdin}");
}

// ── Test cases ────────────────────────────────────────────────────────────────

#[test]
fn whole_expression_argument() {
    check(&["-f", "--", "add(5,6)"], "", &["11"]);
}

#[test]
fn embedded_calls_argument() {
    check(&["-f", "--", "2 + 2 = [add(2,2)]"], "", &["2 + 2 = 4"]);
}

#[test]
fn stdin_lines_render_in_order() {
    check(
        &["-f"],
        "[add(1,1)]\nplain text\n[ucstr(done)]\n",
        &["2", "plain text", "DONE"],
    );
}

#[test]
fn unknown_function_is_left_alone() {
    check(&["-f", "--", "[nosuchfn(1)] ok"], "", &["[nosuchfn(1)] ok"]);
}

#[test]
fn oversized_repeat_does_not_crash() {
    check(
        &["-f"],
        "[repeat(a,1e30)]\n[repeat(ab,2)]\n",
        &["[repeat(a,1e30)]", "abab"],
    );
}

#[test]
fn scope_flag_substitutes() {
    check(&["-f", "-s%N=Bob", "--", "Hello %N!"], "", &["Hello Bob!"]);
}

#[test]
fn markup_label() {
    check(
        &["-f", "-m", "-lmarkup", "--", "%cred;[add(1,2)]%cn;"],
        "",
        &["<span style='color: red'>3</span>"],
    );
}

#[test]
fn config_file_rules_and_scope() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "; test config").unwrap();
    writeln!(file, "/set %L=the Void").unwrap();
    writeln!(file, r#"/sub shout "!" "!!!""#).unwrap();
    let path = file.path().to_str().unwrap().to_owned();
    check(
        &["-f", &path, "-lshout", "--", "Welcome to %L!"],
        "",
        &["Welcome to the Void!!!"],
    );
}

#[test]
fn command_line_scope_overrides_config() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "/set %N=Config").unwrap();
    let path = file.path().to_str().unwrap().to_owned();
    check(&["-f", &path, "-s%N=Flag", "--", "%N"], "", &["Flag"]);
}

#[test]
fn bad_flag_fails() {
    let status = Command::new(binary())
        .arg("-z")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .expect("failed to spawn softcode binary");
    assert!(!status.success());
}
