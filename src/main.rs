use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// `LOG_LEVEL` takes `trace`, `debug`, `info`, `warn` or `error`.
fn log_level() -> Level {
    std::env::var("LOG_LEVEL")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(Level::INFO)
}

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(e) = tasklist_backend::rocket_instance().launch().await {
        anyhow::bail!("Rocket server failed to launch: {e}");
    }
    Ok(())
}
