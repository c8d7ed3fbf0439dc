fn main() {
    if let Err(err) = table_roller::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
