pub mod api;

use log::info;
use std::error::Error;
use std::net::SocketAddr;

use crate::cli::Args;
use api::AppState;

/// HTTP API server. Plain HTTP by default, TLS through axum-server when
/// cert and key paths are configured.
pub struct Server {
    addr: String,
    state: AppState,
    args: Args,
}

impl Server {
    pub fn new(addr: String, state: AppState, args: Args) -> Self {
        Self { addr, state, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let addr = self.addr.parse::<SocketAddr>()?;
        let app = api::router(self.state.clone());

        if self.args.enable_tls {
            let (cert_path, key_path) = match (
                &self.args.tls_cert_path,
                &self.args.tls_key_path,
            ) {
                (Some(cert), Some(key)) => (cert, key),
                _ => {
                    return Err("TLS enabled without cert/key paths".into());
                }
            };

            let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                cert_path,
                key_path
            ).await?;

            info!("HTTPS API server listening on: https://{}", addr);
            axum_server::bind_rustls(addr, tls_config).serve(app.into_make_service()).await?;
        } else {
            info!("HTTP API server listening on: http://{}", addr);
            let listener = tokio::net::TcpListener::bind(addr).await?;
            axum::serve(listener, app.into_make_service()).await?;
        }

        Ok(())
    }
}
