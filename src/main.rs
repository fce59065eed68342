fn main() {
    if let Err(e) = objlint::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
