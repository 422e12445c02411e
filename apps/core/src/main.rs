fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match pkgsearch_core::runtime::parse_cli_args(&args) {
        Ok(options) => options,
        Err(error) => {
            eprintln!("[pkgsearch-core] {error}");
            std::process::exit(2);
        }
    };

    if let Err(error) = pkgsearch_core::runtime::run_with_options(options) {
        log::error!("runtime failed: {error}");
        eprintln!("[pkgsearch-core] runtime failed: {error}");
        std::process::exit(1);
    }
}
