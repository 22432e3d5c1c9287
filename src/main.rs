#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stock_events::run().await
}
