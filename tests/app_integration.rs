use finanalyze::AppCommand;
use finanalyze::core::analyzer::IngestError;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tracing::info;

const ANALYZE_PATH: &str = "/api/analyze/bank/statement";

// Adds automatic logging to test
mod test_utils {
    use super::ANALYZE_PATH;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_analyzer_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path(ANALYZE_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }
}

const SUCCESS_BODY: &str = r#"{
    "success": 1,
    "message": "Bank statement analyzed successfully.",
    "status_code": 200,
    "result": {
        "account_info": {
            "account_holder": "ASHA RAO",
            "bank_name": "Bank of Rust",
            "ifsc_code": "RUST0000042",
            "statement_period": { "from": "01-01-2024", "to": "31-01-2024" }
        },
        "confidence_summary": { "high_confidence_txns": 2, "overall_score": 0.95, "total_transactions": 2 },
        "merchant_insights": {
            "Swiggy": { "count": 3, "avg_amount": 250.0, "last_seen": "2024-01-20" },
            "Amazon": { "count": 1, "avg_amount": 1200.0, "last_seen": "2024-01-12" }
        },
        "transactions": [
            { "transaction_date": "2024-01-20", "amount": 250.0, "balance": 49750.0,
              "transaction_type": "DEBIT", "narration": "UPI/SWIGGY", "payment_method": "UPI",
              "receiver_details": { "name": "Swiggy" } },
            { "transaction_date": "2024-01-01", "amount": 50000.0, "balance": 50000.0,
              "transaction_type": "CREDIT", "narration": "SALARY JAN", "payment_method": "NEFT" }
        ]
    }
}"#;

fn write_config(dir: &Path, analyzer_url: &str) -> String {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
        analyzer:
          url: "{analyzer_url}"
          timeout_secs: 10
    "#
    );
    fs::write(&config_path, config_content).expect("Failed to write config file");
    config_path.to_string_lossy().into_owned()
}

fn write_statement(dir: &Path) -> std::path::PathBuf {
    let statement = dir.join("january.csv");
    fs::write(&statement, "date,amount\n2024-01-01,50000\n").expect("Failed to write statement");
    statement
}

fn analyze(file: std::path::PathBuf, json: bool, endpoint: Option<String>) -> AppCommand {
    AppCommand::Analyze {
        file,
        json,
        endpoint,
        timeout_secs: None,
    }
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_analyzer_mock_server(200, SUCCESS_BODY).await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &format!("{}{ANALYZE_PATH}", mock_server.uri()));
    let statement = write_statement(dir.path());

    let result = finanalyze::run_command(analyze(statement, false, None), Some(&config_path)).await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );
}

#[test_log::test(tokio::test)]
async fn test_json_output_flow() {
    let mock_server = test_utils::create_analyzer_mock_server(200, SUCCESS_BODY).await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &format!("{}{ANALYZE_PATH}", mock_server.uri()));
    let statement = write_statement(dir.path());

    let result = finanalyze::run_command(analyze(statement, true, None), Some(&config_path)).await;
    assert!(result.is_ok(), "JSON flow failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_endpoint_override_beats_config() {
    let mock_server = test_utils::create_analyzer_mock_server(200, SUCCESS_BODY).await;
    let dir = TempDir::new().unwrap();
    // Config points somewhere unreachable; the override must win.
    let config_path = write_config(dir.path(), "http://127.0.0.1:9/api/analyze/bank/statement");
    let statement = write_statement(dir.path());

    let endpoint = format!("{}{ANALYZE_PATH}", mock_server.uri());
    info!(%endpoint, "Overriding analyzer endpoint");
    let result =
        finanalyze::run_command(analyze(statement, false, Some(endpoint)), Some(&config_path))
            .await;
    assert!(result.is_ok(), "Override flow failed with: {:?}", result.err());
}

#[test_log::test(tokio::test)]
async fn test_logical_failure_is_reported() {
    let mock_server = test_utils::create_analyzer_mock_server(
        200,
        r#"{"success": 0, "message": "Unsupported statement layout", "status_code": 200, "result": null}"#,
    )
    .await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &format!("{}{ANALYZE_PATH}", mock_server.uri()));
    let statement = write_statement(dir.path());

    let err = finanalyze::run_command(analyze(statement, false, None), Some(&config_path))
        .await
        .unwrap_err();
    let ingest = err
        .downcast_ref::<IngestError>()
        .expect("error should carry the ingestion failure");
    assert_eq!(ingest.kind(), "logical");
    assert_eq!(ingest.to_string(), "Unsupported statement layout");
}

#[test_log::test(tokio::test)]
async fn test_http_failure_is_reported() {
    let mock_server = test_utils::create_analyzer_mock_server(
        422,
        r#"{"detail": "File is password protected"}"#,
    )
    .await;
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), &format!("{}{ANALYZE_PATH}", mock_server.uri()));
    let statement = write_statement(dir.path());

    let err = finanalyze::run_command(analyze(statement, false, None), Some(&config_path))
        .await
        .unwrap_err();
    let ingest = err.downcast_ref::<IngestError>().unwrap();
    assert_eq!(
        ingest,
        &IngestError::Http {
            status: 422,
            message: "File is password protected".to_string()
        }
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_statement_file() {
    let dir = TempDir::new().unwrap();
    let config_path = write_config(dir.path(), "http://127.0.0.1:9/api/analyze/bank/statement");

    let err = finanalyze::run_command(
        analyze(dir.path().join("missing.pdf"), false, None),
        Some(&config_path),
    )
    .await
    .unwrap_err();
    assert!(err.to_string().contains("Failed to read statement file"));
}
