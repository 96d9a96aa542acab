use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_stack_kdl(&self, content: &str) {
        let path = self.root.path().join("stack.kdl");
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_local_kdl(&self, content: &str) {
        let path = self.root.path().join("stack.local.kdl");
        fs::write(path, content).unwrap();
    }

    #[allow(dead_code)]
    pub fn write_state_json(&self, state: &stratus_cloud::DeployState) {
        let dir = self.root.path().join(".stratus");
        fs::create_dir_all(&dir).unwrap();
        let json = serde_json::to_string_pretty(state).unwrap();
        fs::write(dir.join("state.json"), json).unwrap();
    }

    #[allow(dead_code)]
    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// プロジェクトルートをカレントディレクトリにしたコマンドを作る
    ///
    /// 実行環境の STRATUS_* 変数がテストに漏れないよう外しておく。
    #[allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("stratus").unwrap();
        cmd.current_dir(self.root.path());
        cmd.env_remove("STRATUS_PROJECT_ROOT");
        cmd.env_remove("STRATUS_TOPOLOGY");
        cmd
    }
}
