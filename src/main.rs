use clap::Parser;
use relic::cli::Cli;
use relic::router::route_command;
use relic::settings::SettingsStore;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let store = SettingsStore::new();

    if let Err(e) = route_command(cli, &store).await {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}
