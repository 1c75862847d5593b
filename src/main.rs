use std::io::Result;

#[tokio::main]
async fn main() -> Result<()> {
    simon_server::run_with_config().await
}
