//! Integration tests for reportview CLI

use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn fixture() -> String {
    format!(
        "{}/tests/fixtures/stock_prices.json",
        env!("CARGO_MANIFEST_DIR")
    )
}

fn run_reportview(args: &[&str]) -> (String, String, bool) {
    let output = Command::new(env!("CARGO_BIN_EXE_reportview"))
        .args(args)
        .env_remove("REPORTVIEW_API_URL")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();

    (stdout, stderr, success)
}

fn view(extra: &[&str]) -> (String, String, bool) {
    let input = fixture();
    let mut args = vec!["view", "--input", input.as_str()];
    args.extend(extra);
    run_reportview(&args)
}

fn view_json(extra: &[&str]) -> serde_json::Value {
    let mut args = extra.to_vec();
    args.extend(["--output", "json"]);
    let (stdout, stderr, success) = view(&args);
    assert!(success, "view failed: {stderr}");
    serde_json::from_str(&stdout).expect("Invalid JSON output")
}

fn row_ids(table: &serde_json::Value) -> Vec<i64> {
    table["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

#[test]
fn test_cli_help() {
    let (stdout, _, success) = run_reportview(&["--help"]);

    assert!(success);
    assert!(stdout.contains("reportview"));
    assert!(stdout.contains("view"));
    assert!(stdout.contains("query"));
    assert!(stdout.contains("build"));
    assert!(stdout.contains("--api-url"));
}

#[test]
fn test_cli_version() {
    let (stdout, _, success) = run_reportview(&["--version"]);

    assert!(success);
    assert!(stdout.contains("reportview"));
}

#[test]
fn test_view_table_output() {
    let (stdout, _, success) = view(&[]);

    assert!(success);
    assert!(stdout.contains("stock_prices"));
    assert!(stdout.contains("Company"));
    assert!(stdout.contains("Close Price"));
    // Dates are shown as MM/DD/YYYY
    assert!(stdout.contains("01/10/2024"));
    assert!(!stdout.contains("2024-01-10"));
    assert!(stdout.contains("5 of 5 rows"));
}

#[test]
fn test_view_json_output() {
    let table = view_json(&[]);

    assert_eq!(
        table["keys"],
        serde_json::json!(["company", "date", "open_price", "close_price", "volume"])
    );
    assert_eq!(table["footer"], "5 of 5 rows");
    assert_eq!(row_ids(&table), vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_company_filter() {
    let (stdout, _, success) = view(&["--company", "INFY"]);

    assert!(success);
    assert!(stdout.contains("2 of 5 rows"));
    assert!(!stdout.contains("TCS"));
}

#[test]
fn test_search() {
    let table = view_json(&["--search", "wipro"]);
    assert_eq!(row_ids(&table), vec![4]);
}

#[test]
fn test_date_range_is_inclusive() {
    let table = view_json(&["--start", "2024-01-10", "--end", "2024-02-12"]);
    assert_eq!(row_ids(&table), vec![1, 2, 3, 4]);
}

#[test]
fn test_numeric_filter_and_sort() {
    let table = view_json(&[
        "--filter",
        "close_price:greater:3000",
        "--sort",
        "close_price",
        "--desc",
    ]);
    assert_eq!(row_ids(&table), vec![5, 2]);
    assert_eq!(table["rows"][0]["values"][3], "3950.75");
}

#[test]
fn test_column_visibility() {
    let table = view_json(&["--columns", "company,close_price", "--hide", "company"]);
    assert_eq!(table["keys"], serde_json::json!(["close_price"]));

    // The last visible column cannot be hidden
    let table = view_json(&["--columns", "company", "--hide", "company"]);
    assert_eq!(table["keys"], serde_json::json!(["company"]));
}

#[test]
fn test_hide_already_hidden_column() {
    let table = view_json(&["--columns", "company,date", "--hide", "close_price"]);
    assert_eq!(table["keys"], serde_json::json!(["company", "date"]));

    let table = view_json(&["--hide", "volume", "--hide", "volume"]);
    assert_eq!(
        table["keys"],
        serde_json::json!(["company", "date", "open_price", "close_price"])
    );
}

#[test]
fn test_csv_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("prices.csv");
    let path_str = path.to_string_lossy().to_string();

    let (_, stderr, success) = view(&[
        "--columns",
        "company,date,volume",
        "--company",
        "WIPRO",
        "--csv",
        &path_str,
    ]);

    assert!(success);
    assert!(stderr.contains("Exported 1 rows"));
    let content = fs::read_to_string(&path).unwrap();
    // Zero volume is falsy and exported as an empty field
    assert_eq!(content, "Company,Date,Volume\n\"WIPRO\",\"02/12/2024\",");
}

#[test]
fn test_csv_export_to_directory() {
    let dir = tempdir().unwrap();
    let dir_str = dir.path().to_string_lossy().to_string();

    let (_, _, success) = view(&["--csv", &dir_str]);

    assert!(success);
    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("stock_prices-"));
    assert!(names[0].ends_with(".csv"));
}

#[test]
fn test_invalid_date_range() {
    let (_, stderr, success) = view(&["--start", "2024-03-01", "--end", "2024-01-01"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_unknown_filter_column() {
    let (_, stderr, success) = view(&["--filter", "nope:1"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
    assert!(stderr.contains("nope"));
}

#[test]
fn test_missing_input_file() {
    let (_, stderr, success) = run_reportview(&["view", "--input", "/nonexistent/file.json"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}

// ============================================================================
// Build command tests
// ============================================================================

#[test]
fn test_build_prints_sql() {
    let (stdout, _, success) = run_reportview(&[
        "build",
        "--report",
        "stock_prices",
        "--column",
        "company",
        "--column",
        "close_price",
        "--order-by",
        "date",
        "--desc",
        "--operation",
        "LIMIT 5",
    ]);

    assert!(success);
    assert_eq!(
        stdout.trim(),
        "SELECT close_price, company FROM stock_prices ORDER BY date DESC LIMIT 5"
    );
}

#[test]
fn test_build_group() {
    let (stdout, _, success) =
        run_reportview(&["build", "--report", "performance", "--group", "Risk"]);

    assert!(success);
    assert_eq!(stdout.trim(), "SELECT volatility, beta FROM performance");
}

#[test]
fn test_build_without_columns() {
    let (_, stderr, success) = run_reportview(&["build", "--report", "dividend"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}

#[test]
fn test_build_unknown_column() {
    let (_, stderr, success) =
        run_reportview(&["build", "--report", "dividend", "--column", "close_price"]);

    assert!(!success);
    assert!(stderr.contains("unknown column"));
}

#[test]
fn test_api_unreachable() {
    let (_, stderr, success) = run_reportview(&["companies", "--api-url", "http://127.0.0.1:9/api"]);

    assert!(!success);
    assert!(stderr.contains("Error:"));
}
