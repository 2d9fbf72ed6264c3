fn main() {
    let args: Vec<String> = std::env::args().collect();
    std::process::exit(lifeos_lib::cli::run_with_args(&args));
}
