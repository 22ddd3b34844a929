use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    shadowcaster_cli::main_entry().await
}
