//! Subprocess helpers for the ffmpeg adapters.

use std::io::{BufReader, Read, Write};
use std::process::{Command, ExitStatus, Stdio};

/// Captured result of a finished tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Last few stderr lines, for error messages.
    pub fn stderr_tail(&self) -> String {
        stderr_tail(&self.stderr, 6)
    }
}

/// Whether `binary` resolves on `PATH`.
pub fn command_exists(binary: &str) -> bool {
    Command::new("sh")
        .arg("-c")
        .arg(format!("command -v {binary} >/dev/null 2>&1"))
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Run `program` to completion, optionally feeding `stdin`.
///
/// stdout and stderr are drained on helper threads so a full pipe never
/// blocks the child while we are still writing its input.
pub fn run_tool(program: &str, args: &[String], stdin: Option<&[u8]>) -> std::io::Result<ToolOutput> {
    tracing::debug!(program, args = ?args, "running tool");
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn()?;

    let stdout_task = child.stdout.take().map(|stdout| {
        std::thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(buf)
        })
    });
    let stderr_task = child.stderr.take().map(|stderr| {
        std::thread::spawn(move || -> String {
            let mut reader = BufReader::new(stderr);
            let mut output = String::new();
            match reader.read_to_string(&mut output) {
                Ok(_) => output,
                Err(err) => format!("<failed to read {err}>"),
            }
        })
    });

    let mut write_result = Ok(());
    if let (Some(bytes), Some(mut pipe)) = (stdin, child.stdin.take()) {
        write_result = pipe.write_all(bytes);
        // closing stdin signals end of input
        drop(pipe);
    }

    let status = child.wait()?;

    let stdout = match stdout_task {
        Some(task) => task
            .join()
            .map_err(|_| std::io::Error::other("stdout reader panicked"))??,
        None => Vec::new(),
    };
    let stderr = match stderr_task {
        Some(task) => task
            .join()
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
        None => String::new(),
    };

    // A broken pipe just means the child exited early; its status says why.
    if status.success() {
        write_result?;
    }

    Ok(ToolOutput {
        status,
        stdout,
        stderr,
    })
}

/// The last `lines` non-empty lines of `stderr`.
pub fn stderr_tail(stderr: &str, lines: usize) -> String {
    let kept: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    kept[kept.len().saturating_sub(lines)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = "a\n\nb\nc\n  d  \n";
        assert_eq!(stderr_tail(stderr, 2), "c\nd");
        assert_eq!(stderr_tail(stderr, 10), "a\nb\nc\nd");
        assert_eq!(stderr_tail("", 3), "");
    }

    #[test]
    fn test_command_exists() {
        assert!(command_exists("sh"));
        assert!(!command_exists("rhythmcam-definitely-not-a-binary"));
    }

    #[test]
    fn test_run_tool_round_trips_stdin() {
        let out = run_tool("cat", &[], Some(b"hello")).unwrap();
        assert!(out.success());
        assert_eq!(out.stdout, b"hello");
    }

    #[test]
    fn test_run_tool_reports_failure_status() {
        let args = vec!["-c".to_string(), "echo oops >&2; exit 3".to_string()];
        let out = run_tool("sh", &args, None).unwrap();
        assert!(!out.success());
        assert_eq!(out.stderr_tail(), "oops");
    }
}
