pub mod check;
pub mod mark;

#[derive(Debug)]
pub enum Action {
    Check(check::Args),
    Mark(mark::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Self::Check(args) => check::execute(args).await,
            Self::Mark(args) => mark::execute(args).await,
        }
    }
}
