fn main() {
    if let Err(err) = retail_etl::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
