// Persistence trait for the last entered feed URL

pub trait TargetStore: Send + Sync {
    /// The previously saved URL, if any.
    fn load(&self) -> anyhow::Result<Option<String>>;

    fn save(&self, url: &str) -> anyhow::Result<()>;
}
