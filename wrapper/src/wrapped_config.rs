//! Parsing of the `--wrapped-config` JSON.
//!
//! Three shapes are accepted, matching what MCP clients commonly store:
//! a bare launch spec, a single-entry named map, and a full `mcpServers`
//! document (first entry wins).

use std::collections::HashMap;

use mcpower_core::McpowerErr;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LaunchSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: Option<HashMap<String, String>>,
}

/// The wrapped server: how to spawn it, plus the identity reported to the
/// policy service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedServer {
    pub name: String,
    pub transport: String,
    pub launch: LaunchSpec,
}

pub fn parse_wrapped_config(raw: &str) -> Result<WrappedServer, McpowerErr> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| McpowerErr::InvalidConfig(format!("not valid JSON: {e}")))?;

    let object = value
        .as_object()
        .ok_or_else(|| McpowerErr::InvalidConfig("expected a JSON object".to_string()))?;

    // Bare launch spec: {"command": ..., "args": [...]}.
    if object.contains_key("command") {
        let launch: LaunchSpec = serde_json::from_value(value.clone())
            .map_err(|e| McpowerErr::InvalidConfig(e.to_string()))?;
        let name = server_name_from_command(&launch.command);
        return Ok(WrappedServer {
            name,
            transport: "stdio".to_string(),
            launch,
        });
    }

    // MCPConfig document: {"mcpServers": {"name": {...}}}.
    let candidates = match object.get("mcpServers") {
        Some(servers) => servers
            .as_object()
            .ok_or_else(|| McpowerErr::InvalidConfig("mcpServers must be an object".to_string()))?,
        None => object,
    };

    let (name, spec) = candidates
        .iter()
        .next()
        .ok_or_else(|| McpowerErr::InvalidConfig("no server configured".to_string()))?;
    if spec.get("url").is_some() {
        return Err(McpowerErr::InvalidConfig(
            "url-based servers are not supported; configure a command".to_string(),
        ));
    }
    let launch: LaunchSpec = serde_json::from_value(spec.clone())
        .map_err(|e| McpowerErr::InvalidConfig(format!("server '{name}': {e}")))?;
    Ok(WrappedServer {
        name: name.clone(),
        transport: "stdio".to_string(),
        launch,
    })
}

fn server_name_from_command(command: &str) -> String {
    command
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(command)
        .to_string()
}
