use crate::error::MiningError;
use std::fs;
use std::path::{Path, PathBuf};

pub const SALT_MINER: &str = "eradicate2";
pub const KEY_MINER: &str = "profanity";
/// OpenCL kernels both miners load from their working directory.
pub const KERNEL_FILES: [&str; 3] = ["keccak.cl", "profanity.cl", "eradicate2.cl"];

pub fn platform_binary_name(name: &str) -> String {
    if cfg!(target_os = "linux") {
        format!("{name}.x64")
    } else {
        name.to_string()
    }
}

/// Places the miner binaries and kernels into the working directory.
/// Safe to call before every mining run; present files are left alone.
#[derive(Clone, Debug)]
pub struct ExecutableInstaller {
    source_dir: PathBuf,
    work_dir: PathBuf,
}

impl ExecutableInstaller {
    pub fn new(source_dir: impl Into<PathBuf>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn binary_path(&self, name: &str) -> PathBuf {
        self.work_dir.join(platform_binary_name(name))
    }

    pub fn prepare(&self) -> Result<(), MiningError> {
        fs::create_dir_all(&self.work_dir).map_err(|e| environment(&self.work_dir, e))?;
        for binary in [SALT_MINER, KEY_MINER] {
            let path = self.install(&platform_binary_name(binary))?;
            ensure_executable(&path)?;
        }
        for kernel in KERNEL_FILES {
            self.install(kernel)?;
        }
        Ok(())
    }

    fn install(&self, file_name: &str) -> Result<PathBuf, MiningError> {
        let target = self.work_dir.join(file_name);
        if target.is_file() {
            return Ok(target);
        }
        let source = self.source_dir.join(file_name);
        if !source.is_file() {
            return Err(MiningError::Environment {
                path: source,
                reason: "bundled file is missing".to_string(),
            });
        }
        fs::copy(&source, &target).map_err(|e| environment(&target, e))?;
        tracing::info!("[MINER] installed {} into {}", file_name, self.work_dir.display());
        Ok(target)
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> Result<(), MiningError> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .map_err(|e| environment(path, e))?
        .permissions();
    if permissions.mode() & 0o111 == 0o111 {
        return Ok(());
    }
    permissions.set_mode(permissions.mode() | 0o755);
    fs::set_permissions(path, permissions).map_err(|e| environment(path, e))
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> Result<(), MiningError> {
    Ok(())
}

fn environment(path: &Path, err: std::io::Error) -> MiningError {
    MiningError::Environment {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_sources(dir: &Path) {
        for binary in [SALT_MINER, KEY_MINER] {
            fs::write(dir.join(platform_binary_name(binary)), b"#!/bin/sh\n").unwrap();
        }
        for kernel in KERNEL_FILES {
            fs::write(dir.join(kernel), b"// kernel").unwrap();
        }
    }

    #[test]
    fn test_prepare_copies_everything_and_is_idempotent() {
        let source = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        seed_sources(source.path());
        let installer = ExecutableInstaller::new(source.path(), work.path().join("run"));

        installer.prepare().unwrap();
        for kernel in KERNEL_FILES {
            assert!(installer.work_dir().join(kernel).is_file());
        }
        assert!(installer.binary_path(KEY_MINER).is_file());

        fs::write(installer.work_dir().join("keccak.cl"), b"// local edit").unwrap();
        installer.prepare().unwrap();
        assert_eq!(
            fs::read(installer.work_dir().join("keccak.cl")).unwrap(),
            b"// local edit"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_prepare_marks_binaries_executable() {
        use std::os::unix::fs::PermissionsExt;

        let source = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        seed_sources(source.path());
        let installer = ExecutableInstaller::new(source.path(), work.path());
        installer.prepare().unwrap();

        for binary in [SALT_MINER, KEY_MINER] {
            let mode = fs::metadata(installer.binary_path(binary))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[test]
    fn test_missing_bundled_file_is_an_environment_error() {
        let source = tempfile::tempdir().unwrap();
        let work = tempfile::tempdir().unwrap();
        let installer = ExecutableInstaller::new(source.path(), work.path());
        assert!(matches!(
            installer.prepare(),
            Err(MiningError::Environment { .. })
        ));
    }
}
