use std::{error::Error, net::SocketAddr};

use axum_server::tls_rustls::RustlsConfig;
use tracing::{error, info, Level};

use yado::YadoConfig;

use crate::state::AppState;

mod error;
mod extract;
mod handlers;
mod pagination;
mod state;

#[tokio::main]
async fn main() {
    match YadoConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = serve(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("アプリケーションエラー: {}", error)
        }
    }
}

async fn serve(config: &YadoConfig) -> Result<(), Box<dyn Error>> {
    let state = AppState::new(config)?;
    let app = handlers::router(state);
    let addr = config.web.address.parse::<SocketAddr>()?;
    match &config.web.tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            info!("{} で待ち受けます (TLS)", addr);
            axum_server::bind_rustls(addr, rustls)
                .serve(app.into_make_service())
                .await?;
        }
        None => {
            info!("{} で待ち受けます", addr);
            axum_server::bind(addr)
                .serve(app.into_make_service())
                .await?;
        }
    }
    Ok(())
}
