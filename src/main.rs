/*
 * Responsibility
 * - tokio runtime startup
 * - call app::run() (no logic here)
 */
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    rolegate::app::run().await
}
