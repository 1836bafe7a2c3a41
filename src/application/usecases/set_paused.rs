use std::sync::Arc;

use tracing::info;

use crate::domain::repositories::SettingsRepository;

/// Emergency stop switch; takes effect at the next cycle's gate check.
pub struct SetPausedUseCase {
    settings_repo: Arc<dyn SettingsRepository>,
}

impl SetPausedUseCase {
    pub fn new(settings_repo: Arc<dyn SettingsRepository>) -> Self {
        Self { settings_repo }
    }

    pub async fn execute(&self, paused: bool) -> anyhow::Result<()> {
        self.settings_repo.set_paused(paused).await?;
        info!(paused, "dispatch pause flag updated");
        Ok(())
    }
}
