fn main() {
    if let Err(e) = pantry_scan_lib::run() {
        eprintln!("pantry-scan: {e}");
        std::process::exit(1);
    }
}
