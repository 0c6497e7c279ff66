fn main() {
    if let Err(err) = niche_analyzer::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
