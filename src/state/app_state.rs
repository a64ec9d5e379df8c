use std::sync::Arc;

use pm_stream::StreamHandle;

use crate::client::records::RecordClient;
use crate::models::fleet_model::FleetCatalog;

#[derive(Clone)]
pub struct AppState {
    pub stream: Arc<StreamHandle>,
    // None when no record store is configured
    pub records: Option<RecordClient>,
    pub fleet: Arc<FleetCatalog>,
}

impl AppState {
    pub fn new(stream: StreamHandle, records: Option<RecordClient>, fleet: FleetCatalog) -> Self {
        Self {
            stream: Arc::new(stream),
            records,
            fleet: Arc::new(fleet),
        }
    }
}
