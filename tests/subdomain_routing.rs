//! Host validation against a config loaded from disk.

use std::fs;

use mcp_proxy_logging::config::loader::{apply_environment_with, load_config};
use mcp_proxy_logging::routing::validate_subdomain;
use mcp_proxy_logging::{ChannelRegistry, ProxyConfig, SubdomainValidator};
use tempfile::TempDir;

mod common;

const CONFIG: &str = r#"{
    "mcpServers": {
        "memory": { "command": "npx", "args": ["-y", "@modelcontextprotocol/server-memory"] },
        "sequential-thinking": { "command": "npx", "args": ["-y", "server-sequential-thinking"] }
    }
}"#;

fn load(temp_dir: &TempDir) -> ProxyConfig {
    let path = temp_dir.path().join("config.json");
    fs::write(&path, CONFIG).unwrap();
    let mut config = load_config(&path).unwrap();
    apply_environment_with(&mut config, |key| match key {
        "MCP_DOMAIN" => Some("example.com".to_string()),
        _ => None,
    });
    config
}

#[test]
fn test_loaded_config_drives_host_validation() {
    let temp_dir = TempDir::new().unwrap();
    let config = load(&temp_dir);
    let validator = SubdomainValidator::from_config(&config);

    assert_eq!(validator.suffix(), ".mcp.example.com");
    assert_eq!(validator.validate("memory.mcp.example.com"), Some("memory"));
    assert_eq!(
        validator.validate("sequential-thinking.mcp.example.com:8443"),
        Some("sequential-thinking")
    );
    assert_eq!(validator.validate("unknown.mcp.example.com"), None);
    assert_eq!(validator.validate("memory.example.com"), None);
    assert_eq!(validator.validate(".mcp.example.com"), None);

    // The free function agrees with the precomputed validator.
    assert_eq!(
        validate_subdomain(&config.domain, "memory.mcp.example.com", &config),
        Some("memory".to_string())
    );
}

#[tokio::test]
async fn test_routed_server_logs_to_its_own_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = load(&temp_dir);
    let validator = SubdomainValidator::from_config(&config);
    let registry = ChannelRegistry::new(common::settings_in(temp_dir.path())).unwrap();

    let server = validator.validate("memory.mcp.example.com").unwrap();
    let channel = registry.resolve(&format!("{server}-7f3a")).unwrap();
    channel.info("handled request");

    let lines = common::read_lines(&temp_dir.path().join("mcp-memory.log"));
    assert!(lines.last().unwrap().ends_with("[INFO] handled request"));

    registry.shutdown().await.unwrap();
}
