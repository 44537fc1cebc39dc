use anyhow::Result;
use doit_session::cli::{actions, start};

#[tokio::main]
async fn main() -> Result<()> {
    let (action, globals) = start()?;

    actions::session::handle(action, &globals).await?;

    Ok(())
}
