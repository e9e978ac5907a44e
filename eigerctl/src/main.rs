use clap::Parser;

fn main() {
    let cli = eigerctl::Cli::parse();
    if let Err(err) = eigerctl::run(cli) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
