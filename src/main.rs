use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ledgerlink::cli::run_cli().await
}
