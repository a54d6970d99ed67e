use anyhow::Result;

use ambigram::app::App;
use ambigram::portal::PortalClient;
use ambigram::wallet;
use ambigram::load_config_with_overrides;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration and reconnect the wallet silently, as on page load
    let config = load_config_with_overrides(None, None)?;
    let outcome = wallet::connect(&config, true);

    let Some(session) = outcome.session else {
        println!("No wallet available; nothing submitted.");
        return Ok(());
    };

    let portal = PortalClient::new(&config, &session)?;
    let mut app = App::new(outcome.provider_detected);
    app.connect(session.address, portal).await;

    // Submit a request and print the refreshed list
    app.submit("https://media.example.com/ambigram.gif").await;
    print!("{}", app.view().render());
    Ok(())
}
