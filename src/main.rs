//! Access code service: loads configuration from the environment (and `.env` when present),
//! then serves the route layer until interrupted.

// std
use std::{net::SocketAddr, sync::Arc};
// crates.io
use color_eyre::Result;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
// self
use lock_code_broker::{config::Config, lock::LockCommandIssuer, server};

const DEFAULT_PORT: u16 = 8080;

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let _ = dotenvy::dotenv();

	tracing_subscriber::registry()
		.with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.with(tracing_subscriber::fmt::layer())
		.init();

	let config = Config::from_env()?;
	let port = match std::env::var("PORT") {
		Ok(raw) => raw.parse()?,
		Err(_) => DEFAULT_PORT,
	};
	let issuer = Arc::new(LockCommandIssuer::from_config(&config)?);
	let app = server::router(issuer);
	let addr = SocketAddr::from(([0, 0, 0, 0], port));
	let listener = tokio::net::TcpListener::bind(addr).await?;

	tracing::info!(%addr, strategy = %config.strategy, "lock code broker listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(async {
			let _ = tokio::signal::ctrl_c().await;
		})
		.await?;

	Ok(())
}
