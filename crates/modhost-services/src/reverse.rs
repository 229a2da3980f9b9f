//! `reverse`: reverses each line of `text` on the blocking pool.

use std::sync::Arc;

use modhost_core::{Query, RecordStream, ResultRecord, Service, ServiceError, blocking_records};

pub const NAME: &str = "reverse";

#[derive(Debug, Default)]
pub struct ReverseService;

impl ReverseService {
    pub fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for ReverseService {
    fn process(&self, query: Query) -> RecordStream {
        let text = query.text("text");
        blocking_records(move |sink| {
            let text = text.ok_or_else(|| ServiceError::failed("missing query parameter 'text'"))?;
            for (line_no, line) in text.lines().enumerate() {
                let reversed: String = line.chars().rev().collect();
                if !sink.send(ResultRecord::text(reversed).with_extra("line", line_no + 1)) {
                    break;
                }
            }
            Ok(())
        })
    }
}
