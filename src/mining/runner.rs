use crate::error::{MiningError, Result};
use crate::matcher::Matcher;
use crate::mining::installer::{ExecutableInstaller, KEY_MINER, SALT_MINER};
use crate::mining::{MiningJob, SaltMiner};
use crate::utils::config::MiningConfig;
use alloy::primitives::B256;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::process::{Child, Command};

/// Runs the bundled GPU miners as child processes.
///
/// Each call takes at least `min_duration`, even when a match shows up
/// immediately, and the child is killed once a match has been read.
#[derive(Clone, Debug)]
pub struct ProcessMiner {
    installer: ExecutableInstaller,
    min_duration: Duration,
    max_attempts: u32,
}

impl ProcessMiner {
    pub fn new(config: &MiningConfig) -> Self {
        Self {
            installer: ExecutableInstaller::new(&config.executables_dir, &config.work_dir),
            min_duration: config.min_duration,
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn installer(&self) -> &ExecutableInstaller {
        &self.installer
    }

    /// Program path and arguments for one invocation.
    pub fn command_for(&self, job: &MiningJob, matcher: &Matcher) -> (PathBuf, Vec<String>) {
        let pattern = matcher.command_pattern().to_string();
        match job {
            MiningJob::Salt {
                deployer,
                init_code_path,
            } => (
                self.installer.binary_path(SALT_MINER),
                vec![
                    "-A".to_string(),
                    format!("{deployer:#x}"),
                    "-i".to_string(),
                    absolute(init_code_path).display().to_string(),
                    "--matching".to_string(),
                    pattern,
                ],
            ),
            MiningJob::PrivateKey => (
                self.installer.binary_path(KEY_MINER),
                vec![
                    "--contract".to_string(),
                    "--matching".to_string(),
                    pattern,
                ],
            ),
        }
    }

    async fn mine_once(&self, job: &MiningJob, matcher: &Matcher) -> std::result::Result<B256, MiningError> {
        let started = Instant::now();
        let (program, args) = self.command_for(job, matcher);
        let program_name = program.display().to_string();
        tracing::info!("[MINER] searching {} for pattern {}", job.label(), matcher.command_pattern());

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(self.installer.work_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| MiningError::Spawn {
                program: program_name.clone(),
                source,
            })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            MiningError::Unreadable(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "miner stdout was not captured",
            ))
        })?;
        let mut lines = BufReader::new(stdout).lines();

        match first_secret(&mut lines, matcher).await {
            Ok(Some(secret)) => {
                let elapsed = started.elapsed();
                if elapsed < self.min_duration {
                    tokio::time::sleep(self.min_duration - elapsed).await;
                }
                terminate(&mut child).await;
                tracing::info!(
                    "[MINER] {} found in {:.3}s",
                    job.label(),
                    started.elapsed().as_secs_f64()
                );
                Ok(secret)
            }
            Ok(None) => {
                let status = match child.wait().await {
                    Ok(status) => status.to_string(),
                    Err(err) => err.to_string(),
                };
                Err(MiningError::ExitedWithoutMatch {
                    program: program_name,
                    status,
                })
            }
            Err(err) => {
                terminate(&mut child).await;
                Err(err)
            }
        }
    }
}

#[async_trait]
impl SaltMiner for ProcessMiner {
    async fn mine(&self, job: &MiningJob, matcher: &Matcher) -> Result<B256> {
        let started = Instant::now();
        let result = self.mine_with_restarts(job, matcher).await;
        if result.is_err() {
            self.hold_until_floor(started).await;
        }
        result
    }
}

impl ProcessMiner {
    async fn mine_with_restarts(&self, job: &MiningJob, matcher: &Matcher) -> Result<B256> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            self.installer.prepare()?;
            match self.mine_once(job, matcher).await {
                Ok(secret) => return Ok(secret),
                Err(err) if err.is_restartable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        "[MINER] attempt {}/{} failed, restarting: {}",
                        attempt,
                        self.max_attempts,
                        err
                    );
                }
                Err(err) if err.is_restartable() => {
                    return Err(MiningError::AttemptsExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    }
                    .into());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Failures honour the same minimum duration as matches, counted from
    /// the first attempt.
    async fn hold_until_floor(&self, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed < self.min_duration {
            tokio::time::sleep(self.min_duration - elapsed).await;
        }
    }
}

/// Reads lines until one carries a matching address; that line must also
/// carry the secret. `Ok(None)` means the stream ended first.
pub(crate) async fn first_secret<R>(
    lines: &mut Lines<R>,
    matcher: &Matcher,
) -> std::result::Result<Option<B256>, MiningError>
where
    R: AsyncBufRead + Unpin,
{
    while let Some(line) = lines.next_line().await.map_err(MiningError::Unreadable)? {
        let line = line.to_ascii_lowercase();
        if matcher.address_pattern().find_in(&line).is_none() {
            continue;
        }
        return match matcher.secret_pattern().find_in(&line) {
            Some(secret) => Ok(Some(secret)),
            None => Err(MiningError::MissingSecret { line }),
        };
    }
    Ok(None)
}

async fn terminate(child: &mut Child) {
    if let Err(err) = child.start_kill() {
        tracing::debug!("[MINER] kill failed (already exited?): {}", err);
    }
    let _ = child.wait().await;
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;

    const SECRET: &str = "0x4f3edf983ac636a65a842ce7c78d9aa706d3b113bce9c46f30d7d21715b23b1d";

    fn lines_of(raw: &'static [u8]) -> Lines<BufReader<&'static [u8]>> {
        BufReader::new(raw).lines()
    }

    #[tokio::test]
    async fn test_first_matching_line_wins() {
        let matcher = Matcher::new("abcd", "").unwrap();
        let output = b"Devices:\n  GPU0: 0x1111111111111111111111111111111111111111\n  Private: 0x4F3EDF983AC636A65A842CE7C78D9AA706D3B113BCE9C46F30D7D21715B23B1D Address: 0xABCD000000000000000000000000000000000001\n  Private: 0x0000000000000000000000000000000000000000000000000000000000000001 Address: 0xabcd000000000000000000000000000000000002\n";
        let mut lines = lines_of(output);
        let secret = first_secret(&mut lines, &matcher).await.unwrap().unwrap();
        assert_eq!(format!("{secret:#x}"), SECRET);
    }

    #[tokio::test]
    async fn test_matching_line_without_secret_is_rejected() {
        let matcher = Matcher::new("abcd", "").unwrap();
        let mut lines = lines_of(b"Address: 0xabcd000000000000000000000000000000000001\n");
        assert!(matches!(
            first_secret(&mut lines, &matcher).await,
            Err(MiningError::MissingSecret { .. })
        ));
    }

    #[tokio::test]
    async fn test_end_of_output_without_match() {
        let matcher = Matcher::new("abcd", "").unwrap();
        let mut lines = lines_of(b"Initializing OpenCL...\nRunning...\n");
        assert!(first_secret(&mut lines, &matcher).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_utf8_output_is_unreadable() {
        let matcher = Matcher::new("abcd", "").unwrap();
        let mut lines = lines_of(b"\xff\xfe garbage\n");
        assert!(matches!(
            first_secret(&mut lines, &matcher).await,
            Err(MiningError::Unreadable(_))
        ));
    }

    #[test]
    fn test_command_lines_for_each_job() {
        let miner = ProcessMiner::new(&MiningConfig {
            executables_dir: PathBuf::from("/opt/bin"),
            work_dir: PathBuf::from("/tmp/work"),
            ..MiningConfig::default()
        });
        let matcher = Matcher::new("dead", "").unwrap();

        let (program, args) = miner.command_for(&MiningJob::PrivateKey, &matcher);
        assert!(program.starts_with("/tmp/work"));
        assert_eq!(args[0], "--contract");
        assert_eq!(args[2], matcher.command_pattern().to_string());

        let job = MiningJob::Salt {
            deployer: Address::repeat_byte(0x01),
            init_code_path: PathBuf::from("/data/bytecode/Token"),
        };
        let (_, args) = miner.command_for(&job, &matcher);
        assert_eq!(
            args,
            vec![
                "-A".to_string(),
                "0x0101010101010101010101010101010101010101".to_string(),
                "-i".to_string(),
                "/data/bytecode/Token".to_string(),
                "--matching".to_string(),
                format!("dead{}", "X".repeat(36)),
            ]
        );
    }
}
