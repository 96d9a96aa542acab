//! ファイル自動発見機能
//!
//! 規約ベースのディレクトリ構造からKDLファイルを自動的に発見します。

use crate::error::{Result, StackError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// 発見されたファイル群
#[derive(Debug, Clone, Default)]
pub struct DiscoveredFiles {
    /// ルートファイル (stack.kdl)
    pub root: Option<PathBuf>,
    /// ローカルオーバーライドファイル (stack.local.kdl)
    pub local_override: Option<PathBuf>,
    /// 環境変数ファイル (.env)
    pub env_file: Option<PathBuf>,
}

/// プロジェクトルートを検出
///
/// 以下の優先順位で検索:
/// 1. 環境変数 STRATUS_PROJECT_ROOT
/// 2. カレントディレクトリから上に向かって以下を探す:
///    - stack.kdl
///    - .stratus/stack.kdl
#[tracing::instrument]
pub fn find_project_root() -> Result<PathBuf> {
    // 1. 環境変数
    if let Ok(root) = std::env::var("STRATUS_PROJECT_ROOT") {
        let path = PathBuf::from(&root);
        debug!(env_root = %root, "Checking STRATUS_PROJECT_ROOT");
        if path.join("stack.kdl").exists() || path.join(".stratus/stack.kdl").exists() {
            info!(project_root = %path.display(), "Found project root from environment variable");
            return Ok(path);
        }
    }

    // 2. カレントディレクトリから上に向かって探す
    let start_dir = std::env::current_dir()?;
    let mut current = start_dir.clone();
    debug!(start_dir = %start_dir.display(), "Searching for project root");

    loop {
        let stack_file = current.join("stack.kdl");
        debug!(checking = %current.display(), "Looking for stack.kdl");
        if stack_file.exists() {
            info!(project_root = %current.display(), "Found project root (stack.kdl)");
            return Ok(current);
        }

        let stratus_dir_file = current.join(".stratus/stack.kdl");
        if stratus_dir_file.exists() {
            info!(project_root = %current.display(), "Found project root (.stratus/stack.kdl)");
            return Ok(current);
        }

        // 親ディレクトリへ
        if !current.pop() {
            break;
        }
    }

    warn!(start_dir = %start_dir.display(), "Project root not found");
    Err(StackError::ProjectRootNotFound(start_dir))
}

/// プロジェクトルートからファイルを自動発見
#[tracing::instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn discover_files(project_root: &Path) -> Result<DiscoveredFiles> {
    debug!("Starting file discovery");
    let mut discovered = DiscoveredFiles::default();

    // stack.kdl または .stratus/stack.kdl
    let root_file = project_root.join("stack.kdl");
    let stratus_root_file = project_root.join(".stratus/stack.kdl");
    if root_file.exists() {
        debug!(file = %root_file.display(), "Found root file");
        discovered.root = Some(root_file);
    } else if stratus_root_file.exists() {
        debug!(file = %stratus_root_file.display(), "Found root file in .stratus/");
        discovered.root = Some(stratus_root_file);
    }

    // stack.local.kdl または .stratus/stack.local.kdl
    let local_override = project_root.join("stack.local.kdl");
    let stratus_local_override = project_root.join(".stratus/stack.local.kdl");
    if local_override.exists() {
        debug!(file = %local_override.display(), "Found local override file");
        discovered.local_override = Some(local_override);
    } else if stratus_local_override.exists() {
        debug!(file = %stratus_local_override.display(), "Found local override file in .stratus/");
        discovered.local_override = Some(stratus_local_override);
    }

    // .env または .stratus/.env
    let env_file = project_root.join(".env");
    let stratus_env_file = project_root.join(".stratus/.env");
    if env_file.exists() {
        debug!(file = %env_file.display(), "Found .env file");
        discovered.env_file = Some(env_file);
    } else if stratus_env_file.exists() {
        debug!(file = %stratus_env_file.display(), "Found .env file in .stratus/");
        discovered.env_file = Some(stratus_env_file);
    }

    Ok(discovered)
}
