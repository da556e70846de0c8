use chain_binomial::runner::run_with_args;

fn main() {
    if let Err(error) = run_with_args() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
