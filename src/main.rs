#[tokio::main]
async fn main() -> anyhow::Result<()> {
    deliverant_gateway_lib::run().await
}
