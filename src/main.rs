use clap::Parser;

use proctime_lib::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = proctime_lib::run(cli).await {
        log::error!("{}", e);
        eprintln!("Error: {}", e);
        eprintln!("{}", e.recovery_suggestion());
        std::process::exit(1);
    }
}
