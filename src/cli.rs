use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use crate::config::ProxyConfig;
use crate::dummy::DummyClient;
use crate::proxy::{RpcClient, METHOD_SUBMIT_TX};
use crate::service::Service;
use crate::utils::logging::init_logging;

/// CLI for running the demo application side of the proxy pair.
#[derive(Parser)]
#[clap(name = "ledgerlink", version)]
pub struct Cli {
    #[clap(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Run the demo application: commit server, submit client, optional status surface
    Run {
        /// commit server bind address (host:port)
        #[clap(long, default_value = "127.0.0.1:1338")]
        bind: String,

        /// engine RPC address (host:port)
        #[clap(long, default_value = "127.0.0.1:1337")]
        engine: String,

        /// status HTTP bind address (host:port)
        #[clap(long)]
        status: Option<String>,

        /// call timeout in milliseconds
        #[clap(long, default_value_t = 1000)]
        timeout_ms: u64,

        /// TOML config file; overrides the flags above when present
        #[clap(long)]
        config: Option<PathBuf>,
    },
    /// Submit one transaction to a running engine endpoint
    Submit {
        /// engine RPC address (host:port)
        #[clap(long, default_value = "127.0.0.1:1337")]
        engine: String,

        /// call timeout in milliseconds
        #[clap(long, default_value_t = 1000)]
        timeout_ms: u64,

        /// transaction payload (utf-8 bytes)
        tx: String,
    },
}

pub async fn run_cli() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Run { bind, engine, status, timeout_ms, config } => {
            let cfg = match config {
                Some(path) => ProxyConfig::load(path)?,
                None => ProxyConfig {
                    bind_addr: bind,
                    peer_addr: engine,
                    status_addr: status,
                    timeout_ms,
                },
            };

            let client =
                Arc::new(DummyClient::new(&cfg.peer_addr, &cfg.bind_addr, cfg.timeout()).await?);
            info!("application commit server on {}", client.local_addr());

            if let Some(status_addr) = cfg.status_addr.clone() {
                let service = Service::new(status_addr, client.clone());
                tokio::spawn(async move {
                    if let Err(e) = service.serve().await {
                        error!("status service failed: {:?}", e);
                    }
                });
            }

            tokio::signal::ctrl_c().await?;
            info!("shutting down");
            client.shutdown().await;
            Ok(())
        }
        Cmd::Submit { engine, timeout_ms, tx } => {
            let client = RpcClient::new(engine, Duration::from_millis(timeout_ms));
            let params = serde_json::to_value(tx.into_bytes())?;
            let ack = client.call(METHOD_SUBMIT_TX, params).await?;
            println!("ack: {}", ack);
            Ok(())
        }
    }
}
