//! `echo`: returns the query's `text` as a single text record.

use std::sync::Arc;

use modhost_core::{Query, RecordStream, ResultRecord, Service, ServiceError, once_record};
use tracing::debug;

pub const NAME: &str = "echo";

#[derive(Debug, Default)]
pub struct EchoService;

impl EchoService {
    pub fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for EchoService {
    fn process(&self, query: Query) -> RecordStream {
        let text = query.text("text").unwrap_or_default();
        debug!(len = text.len(), "echo");
        once_record(ResultRecord::text(text))
    }
}
