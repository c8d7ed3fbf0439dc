#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Workbook export with a three-row perk sheet and a two-row drawback sheet.
pub const WORKBOOK: &str = r#"[
  {"sheetName": "Chapter 1: Perks", "data": [
    {"Name": "Flight", "Cost": "50 CP", "Tier": 1},
    {"Name": "Speed", "Cost": "Free", "Tier": 2},
    {"Name": "Strength", "Cost": "200 CP", "Tier": 3}
  ]},
  {"sheetName": "Drawbacks", "data": [
    {"Title": "Curse", "Points": "+100"},
    {"Title": "Hunted", "Points": "+200"}
  ]}
]"#;

pub const CYOA: &str = r#"{
  "rows": [
    {"id": "powers", "title": "Powers", "objects": [
      {"id": "o1", "title": "Blaster", "text": "Shoots things", "addons": [
        {"title": "Overcharge", "text": "More"}, {"title": "Focus"}
      ]},
      {"id": "o2", "title": "Brute"}
    ]},
    {"id": "origins", "titleText": "Origins", "objects": [
      {"id": "o3", "title": "Cauldron"}
    ]}
  ]
}"#;

pub const PERKS_CSV: &str = "Name,Cost\nFlight,50 CP\nSpeed,Free\n,\n";

/// Scratch directory holding input files and the state snapshot.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file");
        path
    }

    pub fn state_path(&self) -> PathBuf {
        self.temp_dir.path().join("state.json")
    }

    pub fn state_json(&self) -> serde_json::Value {
        let text = fs::read_to_string(self.state_path()).expect("read state");
        serde_json::from_str(&text).expect("parse state")
    }

    /// The binary with `--state` pointing into this workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("table-roller").expect("binary exists");
        cmd.arg("--state").arg(self.state_path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    /// Loads the sample workbook with every group selected.
    pub fn load_workbook(&self) {
        let input = self.write("book.json", WORKBOOK);
        self.command()
            .args(["load", "--select-all", "-i"])
            .arg(&input)
            .assert()
            .success();
    }
}
