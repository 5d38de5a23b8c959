//! Common test utilities and fixtures for kubepipe.
//!
//! The main fixture is a private `bin/` directory where tests install fake
//! `kubectl`/`helm` scripts. Executors built from [`TestContext::config`]
//! put that directory first on the child PATH, so no real cluster tooling
//! is ever touched.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use kubepipe::security::SecurityMode;
use kubepipe::types::EngineConfig;

/// Test context providing common setup for integration tests.
pub struct TestContext {
    /// Temporary directory for test file operations.
    pub temp_dir: tempfile::TempDir,
}

impl TestContext {
    /// Creates a new test context with an empty `bin/` directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        std::fs::create_dir_all(temp_dir.path().join("bin")).expect("failed to create bin dir");
        Self { temp_dir }
    }

    /// Returns the path to the temporary directory.
    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.temp_dir.path().to_path_buf()
    }

    /// Directory holding fake tools.
    #[must_use]
    pub fn bin_dir(&self) -> PathBuf {
        self.temp_dir.path().join("bin")
    }

    /// Installs an executable shell script named `name` into `bin/`.
    ///
    /// `body` is the script without the shebang line.
    ///
    /// # Panics
    ///
    /// Panics if the script cannot be written or made executable.
    #[cfg(unix)]
    pub fn install_fake_tool(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.bin_dir().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("failed to write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
            .expect("failed to chmod script");
        path
    }

    /// PATH with the fake `bin/` directory in front of the inherited one.
    #[must_use]
    pub fn path_env(&self) -> String {
        let inherited = std::env::var("PATH").unwrap_or_default();
        if inherited.is_empty() {
            self.bin_dir().display().to_string()
        } else {
            format!("{}:{}", self.bin_dir().display(), inherited)
        }
    }

    /// Strict-mode config whose children resolve programs through [`path_env`](Self::path_env).
    #[must_use]
    pub fn config(&self) -> EngineConfig {
        EngineConfig::default().with_env("PATH", self.path_env())
    }

    /// Config whose children can only see the fake `bin/` directory.
    #[must_use]
    pub fn isolated_config(&self) -> EngineConfig {
        EngineConfig::default().with_env("PATH", self.bin_dir().display().to_string())
    }

    /// Permissive-mode variant of [`config`](Self::config).
    #[must_use]
    pub fn permissive_config(&self) -> EngineConfig {
        self.config().with_security_mode(SecurityMode::Permissive)
    }

    /// Reads a file written by a fake tool, relative to the temp directory.
    #[must_use]
    pub fn read(&self, name: impl AsRef<Path>) -> Option<String> {
        std::fs::read_to_string(self.temp_dir.path().join(name)).ok()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
