#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mailpilot_cli::cli::run().await
}
