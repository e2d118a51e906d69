use std::{error::Error, net::SocketAddr};

use pantry::{config::Config, routes::routes, state::AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let env = env_logger::Env::default().filter_or("RUST_LOG", "info,sqlx=warn");
    env_logger::Builder::from_env(env).init();

    let config = Config::load()?;
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState::connect(config).await?;
    log::info!("Listening on {address}");

    warp::serve(routes(state)).run(address).await;

    Ok(())
}
