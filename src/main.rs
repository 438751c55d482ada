fn main() {
    if let Err(err) = family_tree::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
