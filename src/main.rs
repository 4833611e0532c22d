#[tokio::main]
async fn main() -> anyhow::Result<()> {
    sitecrawl::cli::run().await
}
