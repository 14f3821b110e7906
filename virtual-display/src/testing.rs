//! Scripted [`CommandRunner`] for tests.
//!
//! Commands are keyed by their full command line (`"hyprctl monitors"`).
//! Anything not scripted succeeds with empty output.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tokio::process::{Child, Command};

use crate::runner::{CommandOutput, CommandRunner};

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Missing,
    Hang,
}

#[derive(Debug, Default)]
struct Script {
    replies: HashMap<String, Reply>,
    failing_spawns: Vec<String>,
    exiting_spawns: HashMap<String, i32>,
    calls: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    script: Arc<Mutex<Script>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self, line: &str, reply: Reply) -> Self {
        self.script
            .lock()
            .unwrap()
            .replies
            .insert(line.to_owned(), reply);
        self.clone()
    }

    /// Exit with `code` and print `stdout`.
    pub fn respond(&self, line: &str, code: i32, stdout: &str) -> Self {
        self.script(
            line,
            Reply::Output(CommandOutput {
                code: Some(code),
                stdout: stdout.to_owned(),
                stderr: String::new(),
            }),
        )
    }

    /// Behave as if the program could not be started.
    pub fn missing(&self, line: &str) -> Self {
        self.script(line, Reply::Missing)
    }

    /// Never finish.
    pub fn hang(&self, line: &str) -> Self {
        self.script(line, Reply::Hang)
    }

    /// Make background launches of `program` fail.
    pub fn fail_spawn(&self, program: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .failing_spawns
            .push(program.to_owned());
        self.clone()
    }

    /// Background launches of `program` start a child that has already exited
    /// with `code` by the time `spawn` returns.
    pub fn spawn_exits(&self, program: &str, code: i32) -> Self {
        self.script
            .lock()
            .unwrap()
            .exiting_spawns
            .insert(program.to_owned(), code);
        self.clone()
    }

    /// Every command line seen so far, in order, spawns included.
    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn count(&self, line: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == line).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn record(&self, program: &str, args: &[&str]) -> String {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.script.lock().unwrap().calls.push(line.clone());
        line
    }
}

impl CommandRunner for FakeRunner {
    async fn output(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let line = self.record(program, args);
        let reply = self.script.lock().unwrap().replies.get(&line).cloned();
        match reply {
            Some(Reply::Output(out)) => Ok(out),
            Some(Reply::Missing) => Err(anyhow!("{}: not found", program)),
            Some(Reply::Hang) => std::future::pending().await,
            None => Ok(CommandOutput {
                code: Some(0),
                stdout: String::new(),
                stderr: String::new(),
            }),
        }
    }

    fn spawn(&self, program: &str, args: &[&str]) -> Result<Child> {
        self.record(program, args);
        let exit_code = {
            let script = self.script.lock().unwrap();
            if script.failing_spawns.iter().any(|p| p == program) {
                return Err(anyhow!("Failed to spawn {}", program));
            }
            script.exiting_spawns.get(program).copied()
        };

        // Stand-in for the real server so callers get a live child to manage.
        let mut command = match exit_code {
            Some(code) => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(format!("exit {}", code));
                command
            }
            None => {
                let mut command = Command::new("sleep");
                command.arg("30");
                command
            }
        };
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if exit_code.is_some() {
            // Reap it here so the exit is already visible to the caller.
            let deadline = Instant::now() + Duration::from_secs(10);
            while child.try_wait()?.is_none() {
                if Instant::now() > deadline {
                    return Err(anyhow!("{} stand-in did not exit", program));
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        Ok(child)
    }
}
