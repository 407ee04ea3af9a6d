use crate::constants::NOT_FOUND;
use crate::dashboard::service::DashboardService;
use crate::req::Method::{GET, POST};
use crate::req::Request;
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot::Receiver;
use tracing::{error, info};

pub struct Server {
    dashboard_svc: Arc<DashboardService>,
}

impl Server {
    pub fn new(dashboard_svc: Arc<DashboardService>) -> Self {
        Self { dashboard_svc }
    }

    pub async fn start(&self, addr: &str, mut shutdown_rx: Receiver<()>) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {}", addr))?;
        info!("Server running on http://{}", addr);

        loop {
            tokio::select! {
                conn = listener.accept() => {
                    let (mut stream, _) = conn?;

                    let dashboard_svc = Arc::clone(&self.dashboard_svc);

                    tokio::spawn(async move {
                        let (reader, writer) = stream.split();
                        if let Err(e) = Self::handle_client(reader, writer, &dashboard_svc).await {
                            error!("Connection error: {:#}", e);
                        }
                    });
                }
                // Shutdown signal check
                _ = &mut shutdown_rx => {
                    info!("Shutting down server...");
                    break;
                }
            }
        }
        Ok(())
    }

    pub async fn handle_client<Reader, Writer>(
        reader: Reader,
        mut writer: Writer,
        dashboard_svc: &Arc<DashboardService>,
    ) -> Result<()>
    where
        Reader: AsyncRead + Unpin,
        Writer: AsyncWrite + Unpin,
    {
        let request = Request::read_from(reader)
            .await
            .context("Failed to read request")?;

        // Route
        let (status_line, content) = match (&request.method, request.path.as_str()) {
            (GET, "/accounts") => dashboard_svc.accounts(&request).await,
            (GET, "/balance") => dashboard_svc.balance(&request).await,
            (GET, "/trading-id") => dashboard_svc.trading_id(&request).await,
            (POST, "/accounts/refresh") => dashboard_svc.refresh(&request).await,
            (POST, "/accounts/select") => dashboard_svc.select(&request).await,
            (POST, "/logout") => dashboard_svc.logout(&request),
            _ => (NOT_FOUND.to_string(), "404 Not Found".to_string()),
        };

        writer
            .write_all(format!("{}{}", status_line, content).as_bytes())
            .await
            .context("Failed to write")
    }
}
