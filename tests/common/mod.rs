#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper struct to run tix commands in an isolated temp directory
pub struct TixTest {
    pub temp_dir: TempDir,
    binary_path: PathBuf,
}

impl TixTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        TixTest {
            temp_dir,
            binary_path: PathBuf::from(env!("CARGO_BIN_EXE_tix")),
        }
    }

    pub fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(args)
            .current_dir(self.temp_dir.path())
            .env_remove("TIX_ROOT")
            .env_remove("TIX_LOG");
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .expect("Failed to execute tix command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Expected command {:?} to fail, but it succeeded\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    /// Create a ticket and return its id
    pub fn create(&self, args: &[&str]) -> String {
        let mut full = vec!["create"];
        full.extend_from_slice(args);
        self.run_success(&full).trim().to_string()
    }

    /// Ids printed by a `--field id` listing
    pub fn ids(&self, args: &[&str]) -> Vec<String> {
        let mut full = args.to_vec();
        full.extend_from_slice(&["--field", "id"]);
        self.run_success(&full)
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn items_dir(&self) -> PathBuf {
        self.temp_dir.path().join(".tix").join("items")
    }

    pub fn ticket_path(&self, id: &str) -> PathBuf {
        self.items_dir().join(format!("{id}.md"))
    }

    pub fn read_ticket(&self, id: &str) -> String {
        fs::read_to_string(self.ticket_path(id)).expect("Failed to read ticket file")
    }

    pub fn ticket_exists(&self, id: &str) -> bool {
        self.ticket_path(id).exists()
    }

    pub fn write_ticket(&self, id: &str, content: &str) {
        fs::create_dir_all(self.items_dir()).expect("Failed to create .tix/items directory");
        fs::write(self.ticket_path(id), content).expect("Failed to write ticket file");
    }

    pub fn write_config(&self, content: &str) {
        let dir = self.temp_dir.path().join(".tix");
        fs::create_dir_all(&dir).expect("Failed to create .tix directory");
        fs::write(dir.join("config.yaml"), content).expect("Failed to write config file");
    }

    /// Names left in the lock directory
    pub fn lock_files(&self) -> Vec<String> {
        match fs::read_dir(self.items_dir().join(".locks")) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Minimal valid ticket file
pub fn ticket_content(id: &str, status: &str, title: &str) -> String {
    let closed = if status == "closed" {
        "closed: 2026-01-05T00:00:00Z\n"
    } else {
        ""
    };
    format!(
        "---\nid: {id}\nschema_version: 1\nblocked-by: []\ncreated: 2026-01-04T10:00:00Z\npriority: 2\nstatus: {status}\ntype: task\n{closed}---\n# {title}\n"
    )
}
