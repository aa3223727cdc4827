//! fwsync - concurrent configuration sync for firewall management planes
//!
//! This is the main entry point for the fwsync CLI.

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fwsync::cli::run().await
}
