//! Store wiring for a running recall instance.
//!
//! Opens the SQLite stores named by the configuration, seeds the catalog
//! and builds the turn controller and reminder sweep on top of them.

use std::sync::Arc;

use tracing::{debug, info};

use crate::catalog::{CatalogFile, SqliteCatalogStore};
use crate::config::RecallConfig;
use crate::conversation::SqliteConversationStore;
use crate::dialog::DialogEngine;
use crate::error::RecallResult;
use crate::progress::SqliteProgressStore;
use crate::reminders::ReminderSweep;
use crate::scheduling::Scheduler;
use crate::turn::TurnController;

/// Everything a transport needs to serve learners.
pub struct RecallRuntime {
    /// Catalog store, kept concrete for content loading.
    pub catalog: Arc<SqliteCatalogStore>,
    pub progress: Arc<SqliteProgressStore>,
    pub conversations: Arc<SqliteConversationStore>,
    pub turns: Arc<TurnController>,
    pub reminders: Arc<ReminderSweep>,
}

impl RecallRuntime {
    /// Open stores and import the configured catalog.
    pub fn new(config: &RecallConfig) -> RecallResult<Self> {
        let (catalog, progress, conversations) = match &config.database_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                debug!(path = %path.display(), "Opening file-backed stores");
                (
                    SqliteCatalogStore::new(path)?,
                    SqliteProgressStore::new(path)?,
                    SqliteConversationStore::new(path)?,
                )
            }
            None => {
                debug!("Opening in-memory stores");
                (
                    SqliteCatalogStore::in_memory()?,
                    SqliteProgressStore::in_memory()?,
                    SqliteConversationStore::in_memory()?,
                )
            }
        };
        let catalog = Arc::new(catalog);
        let progress = Arc::new(progress);
        let conversations = Arc::new(conversations);

        if let Some(path) = &config.catalog_path {
            let stats = CatalogFile::from_file(path)?.import_into(&catalog)?;
            info!(path = %path.display(), decks = stats.decks, "Loaded catalog");
        }

        let engine = DialogEngine::new(catalog.clone(), progress.clone());
        let turns = Arc::new(TurnController::new(
            engine,
            conversations.clone(),
            config.welcome_message.clone(),
        ));
        let scheduler = Arc::new(Scheduler::new(progress.clone(), catalog.clone()));
        let reminders = Arc::new(ReminderSweep::new(conversations.clone(), scheduler));

        Ok(Self {
            catalog,
            progress,
            conversations,
            turns,
            reminders,
        })
    }
}
