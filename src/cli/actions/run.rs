use crate::cli::{
    actions::{login, search, Action},
    globals::GlobalArgs,
};
use anyhow::Result;

impl Action {
    /// Execute the action
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails
    pub async fn execute(self, globals: &GlobalArgs) -> Result<()> {
        match self {
            Self::Login { .. } => login::handle(self, globals).await,
            Self::CompareStatus { .. } | Self::SearchStatus { .. } | Self::Matches { .. } => {
                search::handle(self, globals).await
            }
        }
    }
}
