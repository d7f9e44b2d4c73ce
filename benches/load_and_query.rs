use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use encoding_rs::UTF_8;
use superstore_analytics::loader::{self, LoadOptions};
use superstore_analytics::queries;
use superstore_analytics::store::Store;
use tempfile::TempDir;

const REGIONS: [&str; 4] = ["West", "East", "Central", "South"];
const CATEGORIES: [(&str, &str); 3] = [
    ("Technology", "Phones"),
    ("Furniture", "Tables"),
    ("Office Supplies", "Binders"),
];

fn generate_extract(rows: usize) -> (TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("temp dir");
    let csv_path = temp_dir.path().join("superstore.csv");
    let mut file = File::create(&csv_path).expect("create csv");
    writeln!(
        file,
        "Row ID,Order ID,Order Date,Ship Date,Ship Mode,Customer ID,Customer Name,Segment,Country,\
         City,State,Postal Code,Region,Product ID,Category,Sub-Category,Product Name,Sales,\
         Quantity,Discount,Profit"
    )
    .expect("header");
    for i in 0..rows {
        let (category, sub_category) = CATEGORIES[i % CATEGORIES.len()];
        let region = REGIONS[i % REGIONS.len()];
        let month = (i % 12) + 1;
        let day = (i % 28) + 1;
        let year = 2015 + (i % 4);
        let discount = (i % 9) as f64 / 10.0;
        let sales = 10.0 + (i % 500) as f64 * 1.25;
        let profit = sales * (0.3 - discount);
        writeln!(
            file,
            "{row},CA-{order},{month}/{day}/{year},{month}/{ship}/{year},Standard Class,C-{customer},\
             Customer {customer},Consumer,United States,Henderson,Kentucky,42420,{region},P-{product},\
             {category},{sub_category},Product {product},{sales:.2},{quantity},{discount},{profit:.2}",
            row = i + 1,
            order = i / 2,
            ship = (day + 2).min(28),
            customer = i % 700,
            product = i % 1800,
            quantity = (i % 7) + 1,
        )
        .expect("row");
    }
    (temp_dir, csv_path)
}

fn bench_load_and_query(c: &mut Criterion) {
    let (_dir, csv_path) = generate_extract(10_000);

    let mut group = c.benchmark_group("superstore");
    group.sample_size(10);

    group.bench_function("load_10k_rows", |b| {
        b.iter_batched(
            || Store::open_in_memory().expect("store"),
            |mut store| {
                let options = LoadOptions::new(&csv_path, UTF_8);
                loader::load(&mut store, &options).expect("load");
            },
            BatchSize::PerIteration,
        )
    });

    let mut store = Store::open_in_memory().expect("store");
    loader::load(&mut store, &LoadOptions::new(&csv_path, UTF_8)).expect("load");
    group.bench_function("full_catalog", |b| {
        b.iter(|| {
            for query in queries::catalog() {
                queries::run(&store, query.name).expect(query.name);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_load_and_query);
criterion_main!(benches);
