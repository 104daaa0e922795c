//! Tests for Claude process spawning and control.

use claude_runner::cli::{exit_signal_name, ClaudeProcess, ClaudeProcessBuilder, SpawnError};

#[test]
fn builder_new_creates_with_prompt() {
    let builder = ClaudeProcessBuilder::new("Fix the bug");
    let args = builder.build_args();

    assert_eq!(
        args,
        vec!["-p", "Fix the bug", "--output-format", "stream-json", "--verbose"]
    );
}

#[test]
fn builder_without_verbose() {
    let builder = ClaudeProcessBuilder::new("task").verbose(false);
    let args = builder.build_args();

    assert!(!args.contains(&"--verbose".to_string()));
    assert_eq!(args.len(), 4);
}

#[test]
fn builder_prompt_is_a_single_argument() {
    let builder = ClaudeProcessBuilder::new("what is --verbose; rm -rf /");
    let args = builder.build_args();

    assert_eq!(args[1], "what is --verbose; rm -rf /");
    assert_eq!(builder.prompt(), "what is --verbose; rm -rf /");
}

#[test]
fn builder_working_dir() {
    use std::path::PathBuf;

    let builder = ClaudeProcessBuilder::new("task").working_dir("/tmp/my-worktree");

    assert_eq!(
        builder.get_working_dir(),
        Some(&PathBuf::from("/tmp/my-worktree"))
    );
}

#[test]
fn builder_working_dir_not_set() {
    let builder = ClaudeProcessBuilder::new("task");
    assert!(builder.get_working_dir().is_none());
}

#[test]
fn spawn_missing_binary_is_not_found() {
    let builder = ClaudeProcessBuilder::new("task");
    let result = ClaudeProcess::spawn_with_binary("/nonexistent/claude-binary", &builder);

    match result {
        Err(SpawnError::NotFound { program }) => {
            assert_eq!(program, "/nonexistent/claude-binary");
        }
        other => panic!("Expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn spawn_echo_and_wait() {
    let builder = ClaudeProcessBuilder::new("ignored");
    let mut process = ClaudeProcess::spawn_with_binary("echo", &builder).unwrap();

    assert!(process.id().is_some());

    let status = process.wait().await.unwrap();
    assert!(status.success());
    assert_eq!(exit_signal_name(&status), None);
}

#[tokio::test]
async fn take_stdout_once() {
    let builder = ClaudeProcessBuilder::new("hello");
    let mut process = ClaudeProcess::spawn_with_binary("echo", &builder).unwrap();

    assert!(process.take_stdout().is_some());
    assert!(process.take_stdout().is_none());

    process.wait().await.unwrap();
}

#[tokio::test]
async fn take_stderr_once() {
    let builder = ClaudeProcessBuilder::new("test");
    let mut process = ClaudeProcess::spawn_with_binary("echo", &builder).unwrap();

    assert!(process.take_stderr().is_some());
    assert!(process.take_stderr().is_none());

    process.wait().await.unwrap();
}

#[tokio::test]
async fn leading_args_come_before_claude_args() {
    use tokio::io::AsyncReadExt;

    let builder = ClaudeProcessBuilder::new("my prompt").verbose(false);
    let leading = vec![
        "-c".to_string(),
        r#"printf '%s|' "$@""#.to_string(),
        "stub".to_string(),
    ];
    let mut process = ClaudeProcess::spawn_with_command("sh", &leading, &builder).unwrap();

    let mut stdout = process.take_stdout().unwrap();
    let mut output = String::new();
    stdout.read_to_string(&mut output).await.unwrap();
    process.wait().await.unwrap();

    assert_eq!(output, "-p|my prompt|--output-format|stream-json|");
}

#[tokio::test]
async fn stdin_is_closed() {
    use tokio::io::AsyncReadExt;

    let builder = ClaudeProcessBuilder::new("task");
    let leading = vec![
        "-c".to_string(),
        "cat; echo done".to_string(),
        "stub".to_string(),
    ];
    let mut process = ClaudeProcess::spawn_with_command("sh", &leading, &builder).unwrap();

    let mut stdout = process.take_stdout().unwrap();
    let mut output = String::new();
    stdout.read_to_string(&mut output).await.unwrap();

    assert_eq!(output, "done\n");
    assert!(process.wait().await.unwrap().success());
}

#[cfg(unix)]
#[tokio::test]
async fn terminate_sends_sigterm() {
    let builder = ClaudeProcessBuilder::new("10");
    let leading = vec!["-c".to_string(), "exec sleep 10".to_string(), "stub".to_string()];
    let mut process = ClaudeProcess::spawn_with_command("sh", &leading, &builder).unwrap();

    process.terminate().unwrap();
    let status = process.wait().await.unwrap();

    assert!(!status.success());
    assert_eq!(exit_signal_name(&status).as_deref(), Some("SIGTERM"));
}

#[cfg(unix)]
#[tokio::test]
async fn start_kill_sends_sigkill() {
    let builder = ClaudeProcessBuilder::new("10");
    let leading = vec![
        "-c".to_string(),
        "trap '' TERM; exec sleep 10".to_string(),
        "stub".to_string(),
    ];
    let mut process = ClaudeProcess::spawn_with_command("sh", &leading, &builder).unwrap();

    process.start_kill().unwrap();
    let status = process.wait().await.unwrap();

    assert_eq!(exit_signal_name(&status).as_deref(), Some("SIGKILL"));
}

#[tokio::test]
async fn spawn_with_working_dir() {
    use tokio::io::AsyncReadExt;

    let dir = tempfile::tempdir().unwrap();
    let builder = ClaudeProcessBuilder::new("task").working_dir(dir.path());
    let leading = vec!["-c".to_string(), "pwd -P".to_string(), "stub".to_string()];
    let mut process = ClaudeProcess::spawn_with_command("sh", &leading, &builder).unwrap();

    let mut stdout = process.take_stdout().unwrap();
    let mut output = String::new();
    stdout.read_to_string(&mut output).await.unwrap();
    process.wait().await.unwrap();

    let expected = dir.path().canonicalize().unwrap();
    assert_eq!(output.trim(), expected.to_str().unwrap());
}
