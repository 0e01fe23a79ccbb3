mod cli;

fn main() {
    match cli::run() {
        Ok(outcome) => outcome.exit_process(),
        Err(e) => {
            eprintln!("{e:#}"); // pretty anyhow chain
            std::process::exit(1);
        }
    }
}
