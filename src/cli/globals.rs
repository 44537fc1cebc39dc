use std::path::PathBuf;

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub api_base_url: String,
    pub token_store: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(api_base_url: String, token_store: PathBuf) -> Self {
        Self {
            api_base_url,
            token_store,
        }
    }
}
