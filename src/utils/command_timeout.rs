// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

const WAIT_INTERVAL: Duration = Duration::from_millis(10);

/// Execute a command with a timeout.
/// Returns the raw `Output` if the command completes within the timeout.
/// On timeout the child is killed and reaped before `Error::Timeout` is returned.
pub fn run_command_with_timeout(command: &str, args: &[&str], timeout: Duration) -> Result<Output> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| Error::Command {
            command: command.to_string(),
            code: None,
            stderr: e.to_string(),
        })?;

    // Pipes are drained concurrently so a large report cannot block the child.
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None if Instant::now() >= deadline => {
                if let Err(e) = child.kill() {
                    tracing::warn!("Failed to kill '{command}' after timeout: {e}");
                }
                let _ = child.wait();
                return Err(Error::Timeout(timeout));
            }
            None => thread::sleep(WAIT_INTERVAL),
        }
    };

    Ok(Output {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Run a command and return its stdout, failing on a non-zero exit status.
pub fn run_for_stdout(command: &str, args: &[&str], timeout: Duration) -> Result<String> {
    let output = run_command_with_timeout(command, args, timeout)?;
    let command_line = || {
        std::iter::once(command)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    };
    if !output.status.success() {
        return Err(Error::Command {
            command: command_line(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    String::from_utf8(output.stdout).map_err(|source| Error::NotUtf8 {
        command: command_line(),
        source,
    })
}
