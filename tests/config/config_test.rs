//! Coverage for config parsing and template registry construction.

use std::io::Write;

use podguard::config::{load_config, ClusterConfig, Config};

const FULL_CONFIG: &str = r#"
[cluster]
api_url = "https://k8s.internal:6443"
namespace = "ci"
token_env = "CI_K8S_TOKEN"

[security]
dynamic_service_account_security = true

[[templates]]
id = "prod"
name = "prod-agent"
protected = true
service_account = "prod-deployer"

[[templates]]
id = "build"
name = "builder"
"#;

#[test]
fn parse_full_config() {
    let config = match toml::from_str::<Config>(FULL_CONFIG) {
        Ok(config) => config,
        Err(err) => panic!("full config should parse: {err}"),
    };

    assert_eq!(config.cluster.api_url, "https://k8s.internal:6443");
    assert_eq!(config.cluster.namespace, "ci");
    assert_eq!(config.cluster.timeout_secs, ClusterConfig::default().timeout_secs);
    assert!(config.provision_settings().dynamic_service_account_security);

    let registry = config.template_registry().expect("registry");
    assert_eq!(registry.len(), 2);
    let prod = registry.get("prod").expect("prod template");
    assert!(prod.protected);
    assert!(!registry.get("build").expect("build template").protected);
}

#[test]
fn duplicate_template_ids_are_config_errors() {
    let toml_str = r#"
[[templates]]
id = "prod"
name = "a"

[[templates]]
id = "prod"
name = "b"
"#;
    let config: Config = toml::from_str(toml_str).expect("parse");
    assert!(config.template_registry().is_err());
}

#[test]
fn templates_dir_merges_with_inline_templates() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::write(
        dir.path().join("staging.toml"),
        "id = \"staging\"\nname = \"staging-agent\"\nprotected = true\n",
    )
    .expect("write template");

    let mut config: Config =
        toml::from_str("[[templates]]\nid = \"build\"\nname = \"builder\"\n").expect("parse");
    config.templates_dir = Some(dir.path().to_path_buf());

    let registry = config.template_registry().expect("registry");
    assert!(registry.get("staging").expect("from dir").protected);
    assert!(registry.get("build").is_some());
}

#[test]
fn load_config_reports_path_on_error() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(file, "[security").expect("write");

    let err = load_config(file.path()).expect_err("broken TOML");
    assert!(err.to_string().contains(&file.path().display().to_string()));
}

#[test]
fn load_config_reads_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(FULL_CONFIG.as_bytes()).expect("write");

    let config = load_config(file.path()).expect("load");
    assert_eq!(config.templates.len(), 2);
}
