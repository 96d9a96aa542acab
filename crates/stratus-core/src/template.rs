//! テンプレート展開機能
//!
//! Teraを使用してKDLファイルのテンプレート展開を行います。

use crate::error::{Result, StackError};
use std::collections::HashMap;
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, info};

/// 変数コンテキスト
pub type Variables = HashMap<String, serde_json::Value>;

/// テンプレートプロセッサ
pub struct TemplateProcessor {
    tera: Tera,
    context: Context,
}

impl TemplateProcessor {
    /// 新しいテンプレートプロセッサを作成
    pub fn new() -> Self {
        Self {
            tera: Tera::default(),
            context: Context::new(),
        }
    }

    /// 変数を追加
    pub fn add_variable(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.context.insert(key.into(), &value);
    }

    /// 複数の変数を追加
    pub fn add_variables(&mut self, variables: Variables) {
        for (key, value) in variables {
            self.context.insert(key, &value);
        }
    }

    /// 環境変数を追加（安全なもののみ）
    ///
    /// セキュリティ上の理由から、以下のプレフィックスを持つ環境変数のみを許可:
    /// - STRATUS_*: Stratus専用の環境変数
    /// - CI_*: CI/CD環境の変数
    /// - APP_*: アプリケーション設定
    #[tracing::instrument(skip(self))]
    pub fn add_env_variables(&mut self) {
        const ALLOWED_PREFIXES: &[&str] = &["STRATUS_", "CI_", "APP_"];
        let mut count = 0;

        for (key, value) in std::env::vars() {
            // 許可されたプレフィックスを持つ環境変数のみを追加
            if ALLOWED_PREFIXES
                .iter()
                .any(|prefix| key.starts_with(prefix))
            {
                debug!(key = %key, "Adding environment variable");
                self.context.insert(key, &serde_json::Value::String(value));
                count += 1;
            }
        }

        info!(
            env_var_count = count,
            "Added filtered environment variables"
        );
    }

    /// .env ファイルから変数を読み込んで追加
    ///
    /// .env ファイルの変数はプレフィックス制限なしで全て読み込まれます。
    /// これは .env が明示的に配置されたファイルであるためです。
    #[tracing::instrument(skip(self))]
    pub fn add_env_file_variables(&mut self, env_file_path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(env_file_path).map_err(|e| StackError::IoError {
            path: env_file_path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        for line in content.lines() {
            let line = line.trim();

            // 空行とコメント行をスキップ
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            // KEY=VALUE 形式をパース
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim();
                let value = value.trim();

                // クォートを除去（"value" や 'value' の場合）
                let value = strip_quotes(value);

                debug!(key = %key, "Adding variable from .env file");
                self.context
                    .insert(key, &serde_json::Value::String(value.to_string()));
                count += 1;
            }
        }

        info!(
            env_file = %env_file_path.display(),
            variable_count = count,
            "Loaded variables from .env file"
        );

        Ok(())
    }

    /// 文字列をテンプレートとして展開
    pub fn render_str(&mut self, template: &str) -> Result<String> {
        self.tera.render_str(template, &self.context).map_err(|e| {
            // Teraのエラーから詳細情報を抽出
            let error_detail = extract_tera_error_detail(&e);
            StackError::TemplateRenderError(error_detail)
        })
    }

    /// ファイルを読み込んでテンプレート展開
    pub fn render_file(&mut self, path: &Path) -> Result<String> {
        let content = std::fs::read_to_string(path).map_err(|e| StackError::IoError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        self.render_str(&content).map_err(|e| {
            // TemplateRenderErrorをより詳細なTemplateErrorに変換
            if let StackError::TemplateRenderError(msg) = e {
                StackError::TemplateError {
                    file: path.to_path_buf(),
                    line: None,
                    message: msg,
                }
            } else {
                e
            }
        })
    }
}

impl Default for TemplateProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// KDLファイルから変数定義を抽出
///
/// variables { ... } ブロックを探してHashMapに変換。
/// 正規表現を使用してブロックを抽出することで、ドキュメント内の他の場所にある
/// テンプレート変数 {{ ... }} によるパースエラーを回避します。
pub fn extract_variables(kdl_content: &str) -> Result<Variables> {
    use regex::Regex;

    let re = Regex::new(r"(?s)variables\s*\{(?P<content>.*?)\}")
        .map_err(|e| StackError::InvalidConfig(format!("正規表現のコンパイルエラー: {}", e)))?;

    let mut all_vars = HashMap::new();

    for cap in re.captures_iter(kdl_content) {
        if let Some(var_content) = cap.name("content") {
            // ブロックの中身だけをダミーのKDLとしてパース
            let dummy_kdl = format!("extracted {{\n{}\n}}", var_content.as_str());
            let doc: kdl::KdlDocument = dummy_kdl.parse().map_err(|e| {
                StackError::InvalidConfig(format!("KDL パースエラー (変数抽出ブロック): {}", e))
            })?;

            if let Some(node) = doc.nodes().first()
                && let Some(children) = node.children()
            {
                for var_node in children.nodes() {
                    let key = var_node.name().value().to_string();
                    if let Some(entry) = var_node.entries().first() {
                        let value = kdl_value_to_json(entry.value());
                        all_vars.insert(key, value);
                    }
                }
            }
        }
    }

    Ok(all_vars)
}

/// クォートを除去するヘルパー関数
///
/// "value" → value
/// 'value' → value
/// value → value
fn strip_quotes(s: &str) -> &str {
    if (s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')) {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Teraエラーから詳細情報を抽出
///
/// Teraのエラーメッセージを解析して、未定義変数などの具体的な情報を取得します。
fn extract_tera_error_detail(e: &tera::Error) -> String {
    use std::error::Error;

    // エラーチェーンを走査して詳細を収集
    let mut details = Vec::new();
    details.push(e.to_string());

    // sourceチェーンをたどる
    let mut source = e.source();
    while let Some(err) = source {
        details.push(err.to_string());
        source = err.source();
    }

    // 未定義変数のパターンを検出
    let full_error = details.join(" | ");

    // Teraの典型的なエラーパターンを解析
    if full_error.contains("not found in context") {
        // 変数名を抽出: "Variable `xxx` not found in context"
        if let Some(start) = full_error.find("Variable `")
            && let Some(end) = full_error[start..].find("` not found")
        {
            let var_name = &full_error[start + 10..start + end];
            return format!(
                "未定義の変数: `{}`\nヒント: variables ブロックで定義するか、.env ファイルに追加してください",
                var_name
            );
        }
    }

    // フィルターエラーの検出
    if full_error.contains("Filter") && full_error.contains("not found") {
        return format!("未定義のフィルター\n詳細: {full_error}");
    }

    // その他のエラーはそのまま返す
    full_error
}

/// KDL値をJSON値に変換
fn kdl_value_to_json(value: &kdl::KdlValue) -> serde_json::Value {
    if let Some(s) = value.as_string() {
        serde_json::Value::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        // i128をi64に変換してからJSONに変換
        serde_json::Value::Number((i as i64).into())
    } else if let Some(f) = value.as_float() {
        serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    } else if let Some(b) = value.as_bool() {
        serde_json::Value::Bool(b)
    } else {
        serde_json::Value::Null
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_variable_expansion() {
        let mut processor = TemplateProcessor::new();
        processor.add_variable("name", serde_json::Value::String("world".to_string()));

        let template = "Hello {{ name }}!";
        let result = processor.render_str(template).unwrap();

        assert_eq!(result, "Hello world!");
    }

    #[test]
    fn test_nested_variables() {
        let mut processor = TemplateProcessor::new();
        processor.add_variable("registry", serde_json::Value::String("ghcr.io/acme".to_string()));
        processor.add_variable("tag", serde_json::Value::String("v2".to_string()));

        let template = r#"image "{{ registry }}/api:{{ tag }}""#;
        let result = processor.render_str(template).unwrap();

        assert_eq!(result, r#"image "ghcr.io/acme/api:v2""#);
    }

    #[test]
    fn test_filter_lower() {
        let mut processor = TemplateProcessor::new();
        processor.add_variable("name", serde_json::Value::String("HELLO".to_string()));

        let template = "{{ name | lower }}";
        let result = processor.render_str(template).unwrap();

        assert_eq!(result, "hello");
    }

    #[test]
    fn test_if_condition() {
        let mut processor = TemplateProcessor::new();
        processor.add_variable("is_prod", serde_json::Value::Bool(true));

        let template = r#"
{% if is_prod %}
count 3
{% else %}
count 1
{% endif %}
"#;
        let result = processor.render_str(template).unwrap();

        assert!(result.contains("count 3"));
        assert!(!result.contains("count 1"));
    }

    #[test]
    fn test_for_loop() {
        let mut processor = TemplateProcessor::new();
        let keys = ["API_URL", "CACHE_URL", "QUEUE_URL"];
        processor.add_variable(
            "endpoints",
            serde_json::Value::Array(
                keys.iter()
                    .map(|s| serde_json::Value::String(s.to_string()))
                    .collect(),
            ),
        );

        let template = r#"
env {
{% for endpoint in endpoints %}
    {{ endpoint }} "https://example.invalid"
{% endfor %}
}
"#;
        let result = processor.render_str(template).unwrap();

        assert!(result.contains("API_URL"));
        assert!(result.contains("CACHE_URL"));
        assert!(result.contains("QUEUE_URL"));
    }

    #[test]
    fn test_extract_variables() {
        let kdl = r#"
variables {
    app_version "1.0.0"
    port 8080
    debug #true
}
"#;

        let vars = extract_variables(kdl).unwrap();

        assert_eq!(vars.get("app_version").unwrap(), "1.0.0");
        assert_eq!(vars.get("port").unwrap(), 8080);
        assert_eq!(vars.get("debug").unwrap(), true);
    }

    #[test]
    fn test_extract_multiple_variables_blocks() {
        let kdl = r#"
variables {
    name "first"
}

cluster {}

variables {
    name "second"
}
"#;

        let vars = extract_variables(kdl).unwrap();

        // 最後の定義が優先される（後勝ち）
        assert_eq!(vars.get("name").unwrap(), "second");
    }

    #[test]
    fn test_undefined_variable_error() {
        let mut processor = TemplateProcessor::new();

        let template = "Hello {{ undefined_var }}!";
        let result = processor.render_str(template);

        assert!(result.is_err());

        // エラーメッセージに変数名が含まれていることを確認
        let err = result.unwrap_err();
        let err_msg = err.to_string();
        assert!(
            err_msg.contains("undefined_var"),
            "エラーメッセージに変数名が含まれていません: {}",
            err_msg
        );
    }

    #[test]
    fn test_env_variables_filtering() {
        // 環境変数を設定
        unsafe {
            std::env::set_var("STRATUS_IMAGE_TAG", "v42");
            std::env::set_var("CI_PIPELINE_ID", "12345");
            std::env::set_var("APP_NAME", "myapp");
            std::env::set_var("SECRET_KEY", "should_not_be_included");
        }

        let mut processor = TemplateProcessor::new();
        processor.add_env_variables();

        // 許可されたプレフィックスの変数は展開できる
        let template1 = "{{ STRATUS_IMAGE_TAG }}";
        assert_eq!(processor.render_str(template1).unwrap(), "v42");

        let template2 = "{{ CI_PIPELINE_ID }}";
        assert_eq!(processor.render_str(template2).unwrap(), "12345");

        let template3 = "{{ APP_NAME }}";
        assert_eq!(processor.render_str(template3).unwrap(), "myapp");

        // 許可されていない変数は展開できない（エラーになる）
        let template4 = "{{ SECRET_KEY }}";
        assert!(processor.render_str(template4).is_err());

        // クリーンアップ
        unsafe {
            std::env::remove_var("STRATUS_IMAGE_TAG");
            std::env::remove_var("CI_PIPELINE_ID");
            std::env::remove_var("APP_NAME");
            std::env::remove_var("SECRET_KEY");
        }
    }

    #[test]
    fn test_env_file_variables() {
        let temp_dir = tempfile::tempdir().unwrap();
        let env_file = temp_dir.path().join(".env");

        // .env ファイルを作成
        std::fs::write(
            &env_file,
            r#"
# コメント行
REGISTRY_HOST=ghcr.io/acme
IMAGE_TAG=abc123
DATABASE_URL="postgres://localhost/db"
EMPTY_VALUE=
QUOTED_SINGLE='single quoted'

# 空行の後
API_KEY=secret-key-123
"#,
        )
        .unwrap();

        let mut processor = TemplateProcessor::new();
        processor.add_env_file_variables(&env_file).unwrap();

        // 変数が正しく読み込まれていることを確認
        assert_eq!(
            processor.render_str("{{ REGISTRY_HOST }}").unwrap(),
            "ghcr.io/acme"
        );
        assert_eq!(processor.render_str("{{ IMAGE_TAG }}").unwrap(), "abc123");
        // ダブルクォートが除去されている
        assert_eq!(
            processor.render_str("{{ DATABASE_URL }}").unwrap(),
            "postgres://localhost/db"
        );
        // シングルクォートが除去されている
        assert_eq!(
            processor.render_str("{{ QUOTED_SINGLE }}").unwrap(),
            "single quoted"
        );
        // 空の値
        assert_eq!(processor.render_str("{{ EMPTY_VALUE }}").unwrap(), "");
        // プレフィックス制限なしで読み込まれている
        assert_eq!(
            processor.render_str("{{ API_KEY }}").unwrap(),
            "secret-key-123"
        );
    }

    #[test]
    fn test_strip_quotes() {
        assert_eq!(strip_quotes("\"hello\""), "hello");
        assert_eq!(strip_quotes("'hello'"), "hello");
        assert_eq!(strip_quotes("hello"), "hello");
        assert_eq!(strip_quotes("\"hello"), "\"hello"); // 不完全なクォート
        assert_eq!(strip_quotes(""), "");
    }
}
