//! サービスセクションのパース

use crate::error::{Result, StackError};
use crate::model::{BuildSection, ServiceSection};
use kdl::KdlNode;

/// serviceノードをパース
///
/// KDL形式：
/// ```kdl
/// service {
///     image "sample/web:latest"
///     cpu 256
///     memory 512
///     count 1
///     port 8080
///     public-ip #false
///     grace-seconds 30
///     env {
///         APP_MODE "production"
///     }
/// }
/// ```
pub(super) fn parse_service(node: &KdlNode) -> Result<ServiceSection> {
    let mut section = ServiceSection::default();

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "image" => {
                    section.image = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_string())
                        .map(String::from);
                }
                "build" => {
                    section.build = Some(parse_build(child)?);
                }
                "cpu" => {
                    section.cpu = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u32);
                }
                "memory" => {
                    section.memory = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u32);
                }
                "count" => {
                    section.count = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u32);
                }
                "port" => {
                    section.port = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u16);
                }
                "public-ip" | "public_ip" => {
                    section.public_ip = child.entries().first().and_then(|e| e.value().as_bool());
                }
                "grace-seconds" | "grace_seconds" => {
                    section.grace_seconds = child
                        .entries()
                        .first()
                        .and_then(|e| e.value().as_integer())
                        .map(|v| v as u64);
                }
                "env" | "environment" => {
                    if let Some(env_children) = child.children() {
                        for env_node in env_children.nodes() {
                            let key = env_node.name().value().to_string();
                            let value = env_node
                                .entries()
                                .first()
                                .and_then(|e| e.value().as_string())
                                .unwrap_or("")
                                .to_string();
                            section.env.insert(key, value);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Ok(section)
}

/// buildノードをパース
///
/// KDL形式：
/// ```kdl
/// build context="./app" dockerfile="./app/Dockerfile"
/// ```
fn parse_build(node: &KdlNode) -> Result<BuildSection> {
    let context = node
        .get("context")
        .and_then(|v| v.as_string())
        .map(String::from)
        .or_else(|| {
            node.entries()
                .first()
                .and_then(|e| e.value().as_string())
                .map(String::from)
        })
        .ok_or_else(|| {
            StackError::InvalidConfig("build に context が指定されていません".to_string())
        })?;

    let dockerfile = node
        .get("dockerfile")
        .and_then(|v| v.as_string())
        .map(String::from);

    Ok(BuildSection {
        context,
        dockerfile,
    })
}
