use std::fs;
use std::path::Path;
use tracing::info;

mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn mount_protocol(server: &MockServer, slug: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/protocol/{slug}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
    }

    pub async fn mount_commits(server: &MockServer, repo: &str, count: usize) {
        let items: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"sha": "{repo}-{i}"}}"#))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/repos/{repo}/commits")))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("[{}]", items.join(","))),
            )
            .mount(server)
            .await;
    }

    pub fn write_config(
        dir: &std::path::Path,
        server_uri: &str,
        output_dir: &std::path::Path,
    ) -> std::path::PathBuf {
        let config_path = dir.join("config.yaml");
        let config_content = format!(
            r#"
projects:
  - ticker: BTC
    name: Bitcoin
    defillama_slug: bitcoin
    github_repos: ["bitcoin/bitcoin"]
    category: core
    target_allocation: 0.5
  - ticker: ETH
    name: Ethereum
    defillama_slug: ethereum
    github_repos: ["ethereum/go-ethereum"]
    category: core
    target_allocation: 0.5
settings:
  max_retries: 1
  http_timeout_secs: 5
providers:
  defillama:
    base_url: {server_uri}
  github:
    base_url: {server_uri}
portfolio:
  dca_amount: 1000.0
  holdings:
    btc: 2000.0
    ETH: 0.0
output_dir: {}
"#,
            output_dir.display()
        );
        std::fs::write(&config_path, config_content).expect("Failed to write config file");
        config_path
    }
}

fn read_report(output_dir: &Path) -> serde_json::Value {
    let entry = fs::read_dir(output_dir)
        .expect("output directory should exist")
        .filter_map(Result::ok)
        .find(|e| {
            let name = e.file_name().to_string_lossy().to_string();
            name.starts_with("analysis_") && name.ends_with(".json")
        })
        .expect("report file should be written");
    let content = fs::read_to_string(entry.path()).expect("report should be readable");
    serde_json::from_str(&content).expect("report should be valid JSON")
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_protocol(
        &server,
        "bitcoin",
        200,
        r#"{"mcap": 1800000000000, "fdv": 1850000000000, "price": 95000.0}"#,
    )
    .await;
    test_utils::mount_protocol(
        &server,
        "ethereum",
        200,
        r#"{"mcap": 480000000000, "fdv": 1000000000000, "price": 4000.0}"#,
    )
    .await;
    test_utils::mount_commits(&server, "bitcoin/bitcoin", 50).await;
    test_utils::mount_commits(&server, "ethereum/go-ethereum", 75).await;

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let output_dir = temp_dir.path().join("reports");
    let config_path = test_utils::write_config(temp_dir.path(), &server.uri(), &output_dir);

    let result = cryptodca::run_command(
        cryptodca::AppCommand::Analyze {
            dca_amount: None,
            output_dir: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Analyze failed with: {:?}", result.err());

    let data = read_report(&output_dir);
    info!(report = %data, "Report written");

    let projects = data["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 2);

    let btc = &projects[0];
    assert_eq!(btc["ticker"], "BTC");
    assert_eq!(btc["dev_commits_30d"], 50);
    assert_eq!(btc["health_status"], "OK");

    let eth = &projects[1];
    assert_eq!(eth["ticker"], "ETH");
    assert_eq!(eth["dev_commits_30d"], 75);
    assert_eq!(eth["health_status"], "OK");
    assert_eq!(eth["fdv_health"]["status"], "HEALTHY");

    // BTC gap 0, ETH gap 1500: the whole amount goes to ETH.
    let recs = data["rebalance_recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 1);
    assert_eq!(recs[0]["ticker"], "ETH");
    assert_eq!(recs[0]["amount_usd"], 1000.0);
    assert_eq!(recs[0]["quantity"], 0.25);

    assert_eq!(data["summary"]["total_commits"], 125);
}

#[test_log::test(tokio::test)]
async fn test_partial_failure_keeps_successful_projects() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_protocol(
        &server,
        "bitcoin",
        200,
        r#"{"mcap": 1800000000000, "fdv": 1850000000000, "price": 95000.0}"#,
    )
    .await;
    test_utils::mount_protocol(&server, "ethereum", 404, r#"{"error": "Not found"}"#).await;
    test_utils::mount_commits(&server, "bitcoin/bitcoin", 50).await;

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let default_output = temp_dir.path().join("unused");
    let config_path = test_utils::write_config(temp_dir.path(), &server.uri(), &default_output);
    let output_dir = temp_dir.path().join("override");

    let result = cryptodca::run_command(
        cryptodca::AppCommand::Analyze {
            dca_amount: Some(500.0),
            output_dir: Some(output_dir.clone()),
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Analyze failed with: {:?}", result.err());
    assert!(!default_output.exists());

    let data = read_report(&output_dir);
    let projects = data["projects"].as_array().unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0]["ticker"], "BTC");
    assert_eq!(data["rebalance_recommendations"].as_array().unwrap().len(), 0);
}

#[test_log::test(tokio::test)]
async fn test_fails_when_no_project_is_analyzed() {
    let server = wiremock::MockServer::start().await;
    test_utils::mount_protocol(&server, "bitcoin", 500, "").await;
    test_utils::mount_protocol(&server, "ethereum", 404, "").await;

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let output_dir = temp_dir.path().join("reports");
    let config_path = test_utils::write_config(temp_dir.path(), &server.uri(), &output_dir);

    let result = cryptodca::run_command(
        cryptodca::AppCommand::Analyze {
            dca_amount: None,
            output_dir: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("analysis should fail");
    assert_eq!(err.to_string(), "Failed to analyze any projects");
    assert!(!output_dir.exists());
}

#[test_log::test(tokio::test)]
async fn test_rejects_negative_amount() {
    let server = wiremock::MockServer::start().await;
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let output_dir = temp_dir.path().join("reports");
    let config_path = test_utils::write_config(temp_dir.path(), &server.uri(), &output_dir);

    let result = cryptodca::run_command(
        cryptodca::AppCommand::Analyze {
            dca_amount: Some(-5.0),
            output_dir: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
async fn test_validate_command() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path =
        test_utils::write_config(temp_dir.path(), "http://localhost:1", temp_dir.path());

    let result = cryptodca::run_command(
        cryptodca::AppCommand::Validate,
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(result.is_ok(), "Validate failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_missing_config_fails() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let missing = temp_dir.path().join("nope.yaml");

    let result =
        cryptodca::run_command(cryptodca::AppCommand::Validate, Some(missing.to_str().unwrap()))
            .await;

    let err = result.expect_err("missing config should fail");
    assert!(
        err.to_string()
            .contains("Configuration file not found or unreadable")
    );
}

#[test_log::test(tokio::test)]
async fn test_invalid_allocation_fails() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(
        &config_path,
        r#"
projects:
  - ticker: BTC
    name: Bitcoin
    defillama_slug: bitcoin
    category: core
    target_allocation: 0.3
  - ticker: ETH
    name: Ethereum
    defillama_slug: ethereum
    category: core
    target_allocation: 0.3
"#,
    )
    .expect("Failed to write config file");

    let result = cryptodca::run_command(
        cryptodca::AppCommand::Validate,
        Some(config_path.to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("invalid allocation should fail");
    assert!(format!("{err:#}").contains("Total target allocation is 0.60"));
}
