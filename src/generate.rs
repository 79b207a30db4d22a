//! Text-generation boundary.
//!
//! The pipeline treats generation as an opaque "prompt in, completion out"
//! call with a deadline. The shipped implementation shells out to a local
//! model runner (`ollama run <model>` by default), feeding the prompt on
//! stdin. A missing executable is an environment problem for the whole run
//! and is surfaced at construction time, never as a per-request error.

use std::env;
use std::fmt;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

#[derive(Debug)]
pub enum GenerationError {
    /// The child exceeded its deadline and was killed.
    Timeout { limit: Duration },
    /// The child could not be run or exited unsuccessfully.
    Process(String),
}

impl fmt::Display for GenerationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { limit } => {
                write!(f, "text generation timed out after {:.0?}", limit)
            }
            Self::Process(detail) => write!(f, "text generation process failed: {}", detail),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Fatal environment error: the generation executable does not exist.
#[derive(Debug)]
pub struct EnvError {
    pub executable: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "text-generation executable `{}` not found on PATH",
            self.executable
        )
    }
}

impl std::error::Error for EnvError {}

pub trait TextGenerator {
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError>;
}

const EXIT_POLL: Duration = Duration::from_millis(25);

/// Runs an external text-generation executable, one blocking subprocess per
/// request.
#[derive(Debug, Clone)]
pub struct ModelRunner {
    executable: PathBuf,
    args: Vec<String>,
}

impl ModelRunner {
    /// The conventional `ollama run <model>` invocation.
    pub fn new(model: &str) -> Result<Self, EnvError> {
        Self::with_executable("ollama", vec!["run".to_string(), model.to_string()])
    }

    pub fn with_executable(executable: &str, args: Vec<String>) -> Result<Self, EnvError> {
        let resolved = resolve_executable(executable).ok_or_else(|| EnvError {
            executable: executable.to_string(),
        })?;
        Ok(Self {
            executable: resolved,
            args,
        })
    }
}

fn resolve_executable(name: &str) -> Option<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(candidate))
        .find(|p| p.is_file())
}

impl TextGenerator for ModelRunner {
    fn generate(&self, prompt: &str, timeout: Duration) -> Result<String, GenerationError> {
        let mut child = Command::new(&self.executable)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| GenerationError::Process(e.to_string()))?;

        if let Some(mut stdin) = child.stdin.take() {
            // a child that exits without reading its input closes the pipe
            // early; that is its business, the exit status tells the story
            let _ = stdin.write_all(prompt.as_bytes());
        }

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| GenerationError::Process("stdout was not captured".to_string()))?;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut buf = String::new();
            let result = stdout.read_to_string(&mut buf).map(|_| buf);
            tx.send(result).ok();
        });

        let deadline = Instant::now() + timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if Instant::now() >= deadline {
                        warn!("generation exceeded {:?}, killing child", timeout);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(GenerationError::Timeout { limit: timeout });
                    }
                    thread::sleep(EXIT_POLL);
                }
                Err(e) => return Err(GenerationError::Process(e.to_string())),
            }
        };

        let output = rx
            .recv_timeout(Duration::from_secs(5))
            .map_err(|_| GenerationError::Process("output reader thread died".to_string()))?
            .map_err(|e| GenerationError::Process(e.to_string()))?;

        if !status.success() {
            return Err(GenerationError::Process(format!(
                "generator exited with {}",
                status
            )));
        }
        debug!("generation produced {} bytes", output.len());
        Ok(output.trim().to_string())
    }
}

/// Replays canned completions, round-robin. Test double for the subprocess
/// runner.
#[derive(Debug)]
pub struct MockGenerator {
    responses: Vec<String>,
    cursor: AtomicUsize,
}

impl MockGenerator {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }
}

impl TextGenerator for MockGenerator {
    fn generate(&self, _prompt: &str, _timeout: Duration) -> Result<String, GenerationError> {
        if self.responses.is_empty() {
            return Err(GenerationError::Process(
                "mock generator has no responses".to_string(),
            ));
        }
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self.responses[idx % self.responses.len()].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_executable_is_an_env_error() {
        let err = ModelRunner::with_executable("definitely-not-a-real-binary-9f2c", vec![])
            .unwrap_err();
        assert!(err.to_string().contains("definitely-not-a-real-binary-9f2c"));
    }

    #[cfg(unix)]
    #[test]
    fn cat_echoes_the_prompt() {
        let runner = ModelRunner::with_executable("cat", vec![]).unwrap();
        let out = runner
            .generate("hello model\n", Duration::from_secs(10))
            .unwrap();
        assert_eq!(out, "hello model");
    }

    #[cfg(unix)]
    #[test]
    fn slow_child_times_out_and_dies() {
        let runner = ModelRunner::with_executable("sleep", vec!["5".to_string()]).unwrap();
        let started = Instant::now();
        let err = runner
            .generate("ignored", Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, GenerationError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn mock_round_robins() {
        let generator = MockGenerator::new(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(generator.generate("", Duration::ZERO).unwrap(), "a");
        assert_eq!(generator.generate("", Duration::ZERO).unwrap(), "b");
        assert_eq!(generator.generate("", Duration::ZERO).unwrap(), "a");
    }
}
