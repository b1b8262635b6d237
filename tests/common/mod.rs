use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use guardchat::config::TransportConfig;
use guardchat::router::FallbackRouter;
use guardchat::transport::TransportDescriptor;

/// Transport config pointing REST (and optionally GraphQL) at mock servers
#[allow(dead_code)]
pub fn transport_config(rest_uri: &str, graphql_uri: Option<&str>) -> TransportConfig {
    let mut cfg = TransportConfig::default();
    cfg.rest.base_url = format!("{}/api", rest_uri);
    cfg.rest.timeout_seconds = 5;
    cfg.graphql.endpoint = graphql_uri.map(|uri| format!("{}/graphql", uri));
    cfg
}

#[allow(dead_code)]
pub fn router_for(cfg: &TransportConfig) -> Arc<FallbackRouter> {
    let descriptor = TransportDescriptor::resolve(cfg);
    Arc::new(FallbackRouter::new(descriptor).expect("failed to build router"))
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
