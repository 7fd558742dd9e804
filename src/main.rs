fn main() {
    if let Err(e) = oftalmo_lib::run() {
        eprintln!("oftalmo: {e}");
        std::process::exit(1);
    }
}
