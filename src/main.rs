fn main() {
    if let Err(err) = superstore_analytics::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
