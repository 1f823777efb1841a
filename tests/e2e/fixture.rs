//! E2E test fixture: an isolated project directory and binary runner.

use std::path::PathBuf;

use assert_cmd::Command;
use bazaar::storage::Catalog;
use bazaar::test_utils::fixtures::TempProject;

pub struct E2EFixture {
    pub project: TempProject,
    pub catalog_path: Option<PathBuf>,
}

impl E2EFixture {
    pub fn new(scenario: &str) -> Self {
        println!("[E2E] scenario: {scenario}");
        Self {
            project: TempProject::new(),
            catalog_path: None,
        }
    }

    /// The binary with config and database pinned inside the temp dir.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bazaar"));
        cmd.current_dir(&self.project.root)
            .env("BAZAAR_CONFIG", self.project.root.join("absent.toml"))
            .env("BAZAAR_DB", self.project.db_path())
            .env_remove("RUST_LOG");
        cmd
    }

    pub fn std_cmd(&self) -> std::process::Command {
        let mut cmd = std::process::Command::new(env!("CARGO_BIN_EXE_bazaar"));
        cmd.current_dir(&self.project.root)
            .env("BAZAAR_CONFIG", self.project.root.join("absent.toml"))
            .env("BAZAAR_DB", self.project.db_path())
            .env_remove("RUST_LOG");
        cmd
    }

    /// `init` then `import` of `catalog`.
    pub fn seed(&mut self, catalog: &Catalog) {
        self.cmd().args(["init"]).assert().success();
        let path = self.project.write_catalog("catalog.json", catalog);
        self.cmd()
            .arg("import")
            .arg(&path)
            .assert()
            .success();
        self.catalog_path = Some(path);
    }

    /// Run with `--json` and parse stdout.
    pub fn json(&self, args: &[&str]) -> serde_json::Value {
        let output = self.cmd().arg("--json").args(args).output().expect("run bazaar");
        assert!(
            output.status.success(),
            "bazaar {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    }
}
