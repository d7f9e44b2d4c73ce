mod common;

use std::{fs, path::Path};

use assert_cmd::Command;
use common::{Line, TestWorkspace, category_scenario, render_csv, schema_script_path};
use predicates::str::contains;

fn bin() -> Command {
    let mut command = Command::cargo_bin("superstore-analytics").expect("binary exists");
    command.env("RUST_LOG", "off");
    command
}

fn load(workspace: &TestWorkspace, lines: &[Line]) -> std::path::PathBuf {
    let source = workspace.write("superstore.csv", &render_csv(lines));
    let db = workspace.join("db").join("superstore.db");
    bin()
        .args(["load", "-i", path_str(&source), "--db", path_str(&db)])
        .args(["--schema", path_str(&schema_script_path())])
        .args(["--input-encoding", "utf-8"])
        .assert()
        .success()
        .stdout(contains("Loaded 10 row(s) x 21 column(s)"));
    db
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf8 path")
}

#[test]
fn load_then_query_category_rollup_as_csv() {
    let workspace = TestWorkspace::new();
    let db = load(&workspace, &category_scenario());

    bin()
        .args(["query", "sales-by-category", "--db", path_str(&db), "--format", "csv"])
        .assert()
        .success()
        .stdout(contains(
            "category,orders,total_sales,total_profit,profit_margin_percent,units_sold",
        ))
        .stdout(contains("Technology,5,2500,500,20,5"))
        .stdout(contains("Furniture,5,1000,-250,-25,5"));
}

#[test]
fn query_writes_json_records_to_a_file() {
    let workspace = TestWorkspace::new();
    let db = load(&workspace, &category_scenario());
    let output = workspace.join("losses.json");

    bin()
        .args(["query", "loss-making-sub-categories", "--db", path_str(&db)])
        .args(["--format", "json", "-o", path_str(&output)])
        .assert()
        .success();

    let records: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read json")).expect("parse json");
    assert_eq!(records[0]["sub_category"], "Tables");
    assert_eq!(records[0]["total_profit"], -250.0);
}

#[test]
fn table_output_aligns_columns() {
    let workspace = TestWorkspace::new();
    let db = load(&workspace, &category_scenario());

    bin()
        .args(["query", "sales-by-region", "--db", path_str(&db)])
        .assert()
        .success()
        .stdout(contains("region  orders  total_sales"))
        .stdout(contains("South"));
}

#[test]
fn unknown_query_is_rejected() {
    let workspace = TestWorkspace::new();
    let db = load(&workspace, &category_scenario());

    bin()
        .args(["query", "sales-by-planet", "--db", path_str(&db)])
        .assert()
        .failure()
        .stderr(contains("Unknown query 'sales-by-planet'"));
}

#[test]
fn query_without_database_points_at_load() {
    let workspace = TestWorkspace::new();
    bin()
        .args(["query", "sales-by-region", "--db", path_str(&workspace.join("none.db"))])
        .assert()
        .failure()
        .stderr(contains("run the load command first"));
}

#[test]
fn catalog_lists_every_section() {
    bin()
        .arg("catalog")
        .assert()
        .success()
        .stdout(contains("overall-performance"))
        .stdout(contains("churn-risk"))
        .stdout(contains("Discount strategy"));
}

#[test]
fn report_runs_a_section() {
    let workspace = TestWorkspace::new();
    let db = load(&workspace, &category_scenario());

    bin()
        .args(["report", "--db", path_str(&db), "--section", "business"])
        .assert()
        .success()
        .stdout(contains("# Business metrics"))
        .stdout(contains("## Loss-making sub-categories (loss-making-sub-categories)"))
        .stdout(contains("Furniture"));
}

#[test]
fn info_reports_rows_and_indexes_as_json() {
    let workspace = TestWorkspace::new();
    let db = load(&workspace, &category_scenario());

    let output = bin()
        .args(["info", "--db", path_str(&db), "--format", "json", "--sample", "2"])
        .output()
        .expect("run info");
    assert!(output.status.success());
    let info: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(info["row_count"], 10);
    assert_eq!(info["indexes"].as_array().map(Vec::len), Some(5));
    assert_eq!(info["columns"][2]["name"], "order_date");
    assert_eq!(info["sample"].as_array().map(Vec::len), Some(2));
}

#[test]
fn validate_flags_dirty_rows() {
    let workspace = TestWorkspace::new();
    let source = workspace.write(
        "dirty.csv",
        &render_csv(&[
            Line::new("CA-1", "C-1", "1/10/2017").shipped("1/5/2017"),
            Line::new("CA-2", "C-2", "1/10/2017").discount(1.5),
        ]),
    );
    bin()
        .args(["validate", "-i", path_str(&source)])
        .assert()
        .failure()
        .stdout(contains("ship_date earlier than order_date"))
        .stderr(contains("2 row(s) failed validation"));

    let clean = workspace.write("clean.csv", &render_csv(&category_scenario()));
    bin()
        .args(["validate", "-i", path_str(&clean)])
        .assert()
        .success()
        .stdout(contains("10 row(s) checked, no issues found"));
}

#[test]
fn strict_load_refuses_dirty_rows() {
    let workspace = TestWorkspace::new();
    let source = workspace.write(
        "dirty.csv",
        &render_csv(&[Line::new("CA-1", "C-1", "1/10/2017").quantity(0)]),
    );
    let db = workspace.join("superstore.db");
    bin()
        .args(["load", "-i", path_str(&source), "--db", path_str(&db), "--strict"])
        .assert()
        .failure()
        .stderr(contains("quantity below 1"));
}

#[test]
fn csv_export_honours_output_encoding() {
    let workspace = TestWorkspace::new();
    let lines = category_scenario()
        .into_iter()
        .map(|line| line.region("Québec"))
        .collect::<Vec<_>>();
    let db = load(&workspace, &lines);
    let output = workspace.join("regions.csv");

    bin()
        .args(["query", "sales-by-region", "--db", path_str(&db), "--format", "csv"])
        .args(["-o", path_str(&output), "--output-encoding", "latin1"])
        .assert()
        .success();

    let bytes = fs::read(&output).expect("read export");
    assert!(bytes.windows(6).any(|w| w == b"Qu\xe9bec"));
}

#[test]
fn validate_rejects_non_numeric_sales() {
    let workspace = TestWorkspace::new();
    let text = render_csv(&[
        Line::new("CA-1", "C-1", "1/10/2017"),
        Line::new("CA-2", "C-2", "1/10/2017").money(777.0, 10.0),
    ])
    .replace(",777,", ",N/A,");
    let source = workspace.write("bad-sales.csv", &text);

    bin()
        .args(["validate", "-i", path_str(&source)])
        .assert()
        .failure()
        .stderr(contains("column 'sales': cannot parse 'N/A' as real"));

    bin()
        .args(["validate", "-i", path_str(&source)])
        .args(["--schema", path_str(&schema_script_path())])
        .assert()
        .failure()
        .stderr(contains("cannot parse 'N/A'"));

    let db = workspace.join("superstore.db");
    bin()
        .args(["load", "-i", path_str(&source), "--db", path_str(&db)])
        .assert()
        .failure()
        .stderr(contains("Row 3 column 'sales'"));
}

#[test]
fn validate_checks_columns_against_schema_script() {
    let workspace = TestWorkspace::new();
    let source = workspace.write("clean.csv", &render_csv(&category_scenario()));
    let script = workspace.write("narrow.sql", "CREATE TABLE superstore (row_id INTEGER);");

    bin()
        .args(["validate", "-i", path_str(&source), "--schema", path_str(&script)])
        .assert()
        .failure()
        .stderr(contains("is not defined by the schema script"));
}
