//! 統合ローダー
//!
//! ファイル発見、テンプレート展開、パースを統合

use crate::discovery::{DiscoveredFiles, discover_files, find_project_root};
use crate::error::{Result, StackError};
use crate::model::StackSpec;
use crate::parser::parse_stack_string;
use crate::template::{TemplateProcessor, Variables, extract_variables};
use std::path::Path;
use tracing::{debug, info, instrument};

/// プロジェクト全体をロードしてStackSpecを生成
///
/// 以下の処理を実行:
/// 1. プロジェクトルートの検出
/// 2. ファイルの自動発見
/// 3. 変数の収集
/// 4. テンプレート展開
/// 5. KDLパース
/// 6. ローカルオーバーライドのマージ
#[instrument]
pub fn load_stack() -> Result<StackSpec> {
    info!("Starting stack load");
    let project_root = find_project_root()?;
    load_stack_from_root(&project_root)
}

/// 指定されたルートディレクトリからスタックをロード
#[instrument(skip(project_root), fields(project_root = %project_root.display()))]
pub fn load_stack_from_root(project_root: &Path) -> Result<StackSpec> {
    // 1. ファイル発見
    debug!("Step 1: Discovering files");
    let discovered = discover_files(project_root)?;

    let Some(root_file) = &discovered.root else {
        return Err(StackError::ProjectRootNotFound(project_root.to_path_buf()));
    };

    // 2. 変数収集とテンプレート準備
    debug!("Step 2: Preparing template processor");
    let mut processor = prepare_template_processor(&discovered, project_root)?;

    // 3. テンプレート展開とパース
    debug!("Step 3: Expanding and parsing stack file");
    let rendered = processor.render_file(root_file)?;
    let default_name = project_root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();
    let mut spec = parse_stack_string(&rendered, default_name)?;

    // 4. ローカルオーバーライドのマージ
    if let Some(local_file) = &discovered.local_override {
        debug!(file = %local_file.display(), "Step 4: Merging local override");
        let rendered = processor.render_file(local_file)?;
        // 名前は stack ノードで明示された場合のみ上書きされる
        let override_spec = parse_stack_string(&rendered, String::new())?;
        spec.merge(override_spec);
    }

    info!(stack = %spec.name, "Stack loaded successfully");
    Ok(spec)
}

/// テンプレートプロセッサを準備
fn prepare_template_processor(
    discovered: &DiscoveredFiles,
    project_root: &Path,
) -> Result<TemplateProcessor> {
    let mut processor = TemplateProcessor::new();
    let mut all_variables = Variables::new();

    // 0. ビルトイン変数を追加（PROJECT_ROOT）
    processor.add_variable(
        "PROJECT_ROOT",
        serde_json::Value::String(project_root.to_string_lossy().to_string()),
    );

    // 1. variables ブロック（stack.kdl → stack.local.kdl の順、後勝ち）
    if let Some(root_file) = &discovered.root {
        let content = std::fs::read_to_string(root_file).map_err(|e| StackError::IoError {
            path: root_file.clone(),
            message: e.to_string(),
        })?;
        let vars = extract_variables(&content)?;
        all_variables.extend(vars);
    }
    if let Some(local_file) = &discovered.local_override {
        let content = std::fs::read_to_string(local_file).map_err(|e| StackError::IoError {
            path: local_file.clone(),
            message: e.to_string(),
        })?;
        let vars = extract_variables(&content)?;
        all_variables.extend(vars);
    }

    // 2. .env ファイルから変数を追加
    if let Some(env_file) = &discovered.env_file {
        processor.add_env_file_variables(env_file)?;
    }

    // 3. 環境変数を追加（STRATUS_*, CI_*, APP_* プレフィックスのみ）
    processor.add_env_variables();

    // 4. 収集した変数を追加（最も優先度が高い）
    debug!(vars = ?all_variables, "Adding all collected variables to processor");
    processor.add_variables(all_variables);

    Ok(processor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_stack_basic() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(
            project_root.join("stack.kdl"),
            r#"
variables {
    registry "ghcr.io/myorg"
    app_version "1.0.0"
}

stack "hello-web" topology="hardened"

service {
    image "{{ registry }}/web:{{ app_version }}"
    port 8080
}
"#,
        )?;

        let spec = load_stack_from_root(project_root)?;

        assert_eq!(spec.name, "hello-web");
        assert_eq!(
            spec.topology,
            Some(crate::model::Topology::Hardened)
        );

        // テンプレート展開の確認
        assert_eq!(
            spec.service.image.as_deref(),
            Some("ghcr.io/myorg/web:1.0.0")
        );
        assert_eq!(spec.service.port, Some(8080));

        Ok(())
    }

    #[test]
    fn test_load_stack_in_stratus_dir() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::create_dir_all(project_root.join(".stratus"))?;
        fs::write(
            project_root.join(".stratus/stack.kdl"),
            r#"
stack "dotdir-stack"

service {
    image "nginx:alpine"
}
"#,
        )?;

        let spec = load_stack_from_root(project_root)?;
        assert_eq!(spec.name, "dotdir-stack");
        assert_eq!(spec.service.image.as_deref(), Some("nginx:alpine"));

        Ok(())
    }

    #[test]
    fn test_load_stack_with_local_override() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(
            project_root.join("stack.kdl"),
            r#"
stack "hello-web"

service {
    image "myapp:15"
    port 8080
    cpu 256
}
"#,
        )?;

        // stack.local.kdl（オーバーライド）
        fs::write(
            project_root.join("stack.local.kdl"),
            r#"
service {
    port 3000
}
"#,
        )?;

        let spec = load_stack_from_root(project_root)?;

        // stack.local.kdl の定義が優先される
        assert_eq!(spec.service.port, Some(3000));
        // 未指定のフィールドは元の値を維持
        assert_eq!(spec.service.image.as_deref(), Some("myapp:15"));
        assert_eq!(spec.service.cpu, Some(256));
        // stack ノードがないオーバーライドは名前を変えない
        assert_eq!(spec.name, "hello-web");

        Ok(())
    }

    #[test]
    fn test_load_stack_with_env_file() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(
            project_root.join(".env"),
            r#"
REGISTRY=ghcr.io/myorg
IMAGE_TAG=v1.2.3
"#,
        )?;

        fs::write(
            project_root.join("stack.kdl"),
            r#"
stack "env-stack"

service {
    image "{{ REGISTRY }}/api:{{ IMAGE_TAG }}"
}
"#,
        )?;

        let spec = load_stack_from_root(project_root)?;
        assert_eq!(
            spec.service.image.as_deref(),
            Some("ghcr.io/myorg/api:v1.2.3")
        );

        Ok(())
    }

    #[test]
    fn test_load_stack_variables_win_over_env_file() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(project_root.join(".env"), "IMAGE_TAG=from-env\n")?;
        fs::write(
            project_root.join("stack.kdl"),
            r#"
variables {
    IMAGE_TAG "from-variables"
}

stack "priority-stack"

service {
    image "app:{{ IMAGE_TAG }}"
}
"#,
        )?;

        let spec = load_stack_from_root(project_root)?;
        assert_eq!(spec.service.image.as_deref(), Some("app:from-variables"));

        Ok(())
    }

    #[test]
    fn test_load_stack_missing_root_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let result = load_stack_from_root(temp_dir.path());

        assert!(matches!(
            result,
            Err(StackError::ProjectRootNotFound(_))
        ));
    }

    #[test]
    fn test_loaded_stack_builds_a_valid_graph() -> Result<()> {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_root = temp_dir.path();

        fs::write(
            project_root.join("stack.kdl"),
            r#"
stack "end-to-end" topology="routed"

network {
    nat-gateways 1
}

service {
    image "myapp:latest"
    port 9000
}
"#,
        )?;

        let spec = load_stack_from_root(project_root)?;
        let topology = spec.topology.unwrap_or_default();
        let graph = crate::blueprint::build(&spec, topology, &crate::Catalog::new())?;
        graph.validate()?;

        assert_eq!(graph.name, "end-to-end");

        Ok(())
    }
}
