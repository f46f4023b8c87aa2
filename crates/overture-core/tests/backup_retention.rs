mod support;

use serde_json::json;

use overture_core::client::AdapterRegistry;
use overture_core::config::{McpDefinition, SyncSettings};
use overture_core::discovery::StaticDetector;
use overture_core::env::EnvMap;
use overture_core::sync::{SyncOptions, SyncOrchestrator};
use overture_core::types::ClientId;

use support::{Sandbox, args, config_with, read_json};

#[tokio::test]
async fn retention_keeps_newest_backups_per_client() {
    let sandbox = Sandbox::new();
    let cursor_json = sandbox.home().join(".cursor/mcp.json");
    let gemini_json = sandbox.home().join(".gemini/settings.json");
    sandbox.write_json(&cursor_json, &json!({"mcpServers": {}}));
    sandbox.write_json(&gemini_json, &json!({"mcpServers": {}}));

    let registry = AdapterRegistry::with_default_clients();
    let detector = StaticDetector::found();
    let ctx = sandbox.context();
    let env = EnvMap::new();
    let orchestrator = SyncOrchestrator::new(&registry, &detector, &ctx, &env);
    let options = SyncOptions {
        clients: Some(vec![ClientId::Cursor, ClientId::GeminiCli]),
        skip_binary_detection: true,
        ..Default::default()
    };

    for round in 0..4 {
        let round = round.to_string();
        let mut config = config_with(vec![McpDefinition::stdio("srv", "server", args(&[round.as_str()]))]);
        config.sync.backup_retention = 2;
        let report = orchestrator.sync(&config, &options).await;
        assert!(report.is_success());
        assert!(report.results.iter().all(|r| r.backup_path.is_some()));
    }

    let mut settings = SyncSettings::default();
    settings.backup_retention = 2;
    let service = ctx.backup_service(&settings);
    let cursor_backups = service.list_backups(Some(ClientId::Cursor)).await.unwrap();
    let gemini_backups = service.list_backups(Some(ClientId::GeminiCli)).await.unwrap();
    assert_eq!(cursor_backups.len(), 2);
    assert_eq!(gemini_backups.len(), 2);
    assert_eq!(sandbox.backups().len(), 4);

    // newest backup holds the config written by the third round
    let latest = service
        .restore_latest(ClientId::Cursor, &cursor_json)
        .await
        .unwrap();
    assert_eq!(latest.path, cursor_backups[1].path);
    assert_eq!(read_json(&cursor_json)["mcpServers"]["srv"]["args"], json!(["2"]));
}

#[tokio::test]
async fn backups_disabled_writes_without_backup() {
    let sandbox = Sandbox::new();
    let cursor_json = sandbox.home().join(".cursor/mcp.json");
    sandbox.write_json(&cursor_json, &json!({"mcpServers": {}}));

    let mut config = config_with(vec![McpDefinition::stdio("srv", "server", Vec::new())]);
    config.sync.backup = false;
    let registry = AdapterRegistry::with_default_clients();
    let detector = StaticDetector::found();
    let ctx = sandbox.context();
    let env = EnvMap::new();

    let report = SyncOrchestrator::new(&registry, &detector, &ctx, &env)
        .sync(
            &config,
            &SyncOptions {
                clients: Some(vec![ClientId::Cursor]),
                skip_binary_detection: true,
                ..Default::default()
            },
        )
        .await;

    assert!(report.is_success());
    assert!(report.results[0].backup_path.is_none());
    assert!(sandbox.backups().is_empty());
    assert!(read_json(&cursor_json)["mcpServers"].get("srv").is_some());
}
