use std::sync::Arc;

use zapdash_db::ZapdashDb;
use zapdash_evolution::EvolutionClient;
use zapdash_sync::SyncEngine;

/// Shared handles for the HTTP layer.
pub struct AppState {
    pub db: Arc<ZapdashDb>,
    pub evolution: Arc<EvolutionClient>,
    pub engine: Arc<SyncEngine>,
}
