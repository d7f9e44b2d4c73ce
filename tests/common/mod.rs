#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use superstore_analytics::{
    io_utils::{DEFAULT_SOURCE_ENCODING, resolve_encoding},
    loader::{self, LoadOptions, LoadSummary},
    store::Store,
};
use tempfile::{TempDir, tempdir};

/// Header row of the Superstore extract, before normalization.
pub const SOURCE_HEADERS: [&str; 21] = [
    "Row ID",
    "Order ID",
    "Order Date",
    "Ship Date",
    "Ship Mode",
    "Customer ID",
    "Customer Name",
    "Segment",
    "Country",
    "City",
    "State",
    "Postal Code",
    "Region",
    "Product ID",
    "Category",
    "Sub-Category",
    "Product Name",
    "Sales",
    "Quantity",
    "Discount",
    "Profit",
];

/// Returns the absolute path to the default DDL script shipped with the crate.
pub fn schema_script_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("sql")
        .join("create_superstore.sql")
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn join(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }
}

/// One line item of a synthetic extract. Fields default to a plausible
/// Technology sale so tests only spell out what they assert on.
#[derive(Debug, Clone)]
pub struct Line {
    pub order_id: String,
    pub order_date: String,
    pub ship_date: String,
    pub ship_mode: String,
    pub customer_id: String,
    pub customer_name: String,
    pub segment: String,
    pub city: String,
    pub postal_code: String,
    pub region: String,
    pub product_id: String,
    pub category: String,
    pub sub_category: String,
    pub product_name: String,
    pub sales: f64,
    pub quantity: i64,
    pub discount: f64,
    pub profit: f64,
}

impl Line {
    pub fn new(order_id: &str, customer_id: &str, order_date: &str) -> Self {
        Self {
            order_id: order_id.to_string(),
            order_date: order_date.to_string(),
            ship_date: order_date.to_string(),
            ship_mode: "Standard Class".to_string(),
            customer_id: customer_id.to_string(),
            customer_name: format!("Customer {customer_id}"),
            segment: "Consumer".to_string(),
            city: "Henderson".to_string(),
            postal_code: "42420".to_string(),
            region: "South".to_string(),
            product_id: "TEC-PH-1000".to_string(),
            category: "Technology".to_string(),
            sub_category: "Phones".to_string(),
            product_name: "Desk Phone".to_string(),
            sales: 100.0,
            quantity: 1,
            discount: 0.0,
            profit: 10.0,
        }
    }

    pub fn shipped(mut self, ship_date: &str) -> Self {
        self.ship_date = ship_date.to_string();
        self
    }

    pub fn ship_mode(mut self, mode: &str) -> Self {
        self.ship_mode = mode.to_string();
        self
    }

    pub fn product(mut self, category: &str, sub_category: &str, name: &str) -> Self {
        self.category = category.to_string();
        self.sub_category = sub_category.to_string();
        self.product_name = name.to_string();
        self
    }

    pub fn segment(mut self, segment: &str) -> Self {
        self.segment = segment.to_string();
        self
    }

    pub fn postal_code(mut self, code: &str) -> Self {
        self.postal_code = code.to_string();
        self
    }

    pub fn region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn money(mut self, sales: f64, profit: f64) -> Self {
        self.sales = sales;
        self.profit = profit;
        self
    }

    pub fn discount(mut self, discount: f64) -> Self {
        self.discount = discount;
        self
    }

    pub fn quantity(mut self, quantity: i64) -> Self {
        self.quantity = quantity;
        self
    }

    fn fields(&self, row_id: usize) -> Vec<String> {
        vec![
            row_id.to_string(),
            self.order_id.clone(),
            self.order_date.clone(),
            self.ship_date.clone(),
            self.ship_mode.clone(),
            self.customer_id.clone(),
            self.customer_name.clone(),
            self.segment.clone(),
            "United States".to_string(),
            self.city.clone(),
            "Kentucky".to_string(),
            self.postal_code.clone(),
            self.region.clone(),
            self.product_id.clone(),
            self.category.clone(),
            self.sub_category.clone(),
            self.product_name.clone(),
            self.sales.to_string(),
            self.quantity.to_string(),
            self.discount.to_string(),
            self.profit.to_string(),
        ]
    }
}

/// Renders lines as a comma-separated extract with the source header row.
pub fn render_csv(lines: &[Line]) -> String {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SOURCE_HEADERS).expect("header");
    for (idx, line) in lines.iter().enumerate() {
        writer.write_record(line.fields(idx + 1)).expect("row");
    }
    String::from_utf8(writer.into_inner().expect("flush")).expect("utf8")
}

/// Five profitable Technology lines and five loss-making Furniture lines.
pub fn category_scenario() -> Vec<Line> {
    let mut lines = Vec::new();
    for idx in 0..5 {
        lines.push(
            Line::new(&format!("CA-T{idx}"), &format!("T-{idx}"), "11/8/2016")
                .shipped("11/11/2016")
                .money(500.0, 100.0),
        );
    }
    for idx in 0..5 {
        lines.push(
            Line::new(&format!("CA-F{idx}"), &format!("F-{idx}"), "6/12/2017")
                .shipped("6/16/2017")
                .product("Furniture", "Tables", "Oak Table")
                .money(200.0, -50.0),
        );
    }
    lines
}

/// Loads `lines` into an in-memory store using the default DDL script.
pub fn load_lines(workspace: &TestWorkspace, lines: &[Line]) -> (Store, LoadSummary) {
    let source = workspace.write("superstore.csv", &render_csv(lines));
    let mut store = Store::open_in_memory().expect("store");
    let summary = load_source(&mut store, &source, Some(&schema_script_path())).expect("load");
    (store, summary)
}

pub fn load_source(
    store: &mut Store,
    source: &Path,
    schema: Option<&Path>,
) -> superstore_analytics::error::Result<LoadSummary> {
    let encoding = resolve_encoding(DEFAULT_SOURCE_ENCODING).expect("encoding");
    let mut options = LoadOptions::new(source, encoding);
    options.schema_script = schema;
    loader::load(store, &options)
}
