#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kubit_report::run().await
}
