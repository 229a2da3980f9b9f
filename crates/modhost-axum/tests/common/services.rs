//! Services with observable behaviour for dispatch tests.

use std::sync::Arc;
use std::time::Duration;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::stream;
use modhost_core::{
    Query, RecordStream, ResultRecord, Service, ServiceDescriptor, ServiceError, once_record,
};

/// Records pulled from `multi` so far.
pub static MULTI_PULLS: AtomicUsize = AtomicUsize::new(0);

/// Set when an `endless` stream is dropped.
pub static ENDLESS_DROPPED: AtomicBool = AtomicBool::new(false);

pub fn catalog() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new("demo", Demo::factory),
        ServiceDescriptor::new("multi", Multi::factory),
        ServiceDescriptor::new("two_then_error", TwoThenError::factory),
        ServiceDescriptor::new("empty", Empty::factory),
        ServiceDescriptor::new("panicky", Panicky::factory),
        ServiceDescriptor::new("endless", Endless::factory),
        ServiceDescriptor::new("broken", broken_factory),
    ]
}

fn broken_factory() -> Result<Arc<dyn Service>, ServiceError> {
    Err(ServiceError::Init("model weights missing".into()))
}

#[derive(Debug)]
pub struct Demo;

impl Demo {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for Demo {
    fn process(&self, _query: Query) -> RecordStream {
        once_record(ResultRecord::value("ok"))
    }
}

/// Three records; counts every pull.
#[derive(Debug)]
pub struct Multi;

impl Multi {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for Multi {
    fn process(&self, _query: Query) -> RecordStream {
        Box::pin(stream::unfold(0_u32, |n| async move {
            if n >= 3 {
                return None;
            }
            MULTI_PULLS.fetch_add(1, Ordering::SeqCst);
            Some((Ok::<_, ServiceError>(ResultRecord::value(format!("record-{n}"))), n + 1))
        }))
    }
}

#[derive(Debug)]
pub struct TwoThenError;

impl TwoThenError {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for TwoThenError {
    fn process(&self, _query: Query) -> RecordStream {
        Box::pin(stream::iter(vec![
            Ok(ResultRecord::text("first")),
            Ok(ResultRecord::text("second")),
            Err(ServiceError::failed("generator failed")),
        ]))
    }
}

#[derive(Debug)]
pub struct Empty;

impl Empty {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for Empty {
    fn process(&self, _query: Query) -> RecordStream {
        Box::pin(stream::empty::<Result<ResultRecord, ServiceError>>())
    }
}

/// Panics on the first poll.
#[derive(Debug)]
pub struct Panicky;

impl Panicky {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for Panicky {
    fn process(&self, _query: Query) -> RecordStream {
        Box::pin(stream::unfold(true, |armed| async move {
            assert!(!armed, "inference crashed");
            None::<(Result<ResultRecord, ServiceError>, bool)>
        }))
    }
}

struct DropFlag;

impl Drop for DropFlag {
    fn drop(&mut self) {
        ENDLESS_DROPPED.store(true, Ordering::SeqCst);
    }
}

/// Never ends on its own.
#[derive(Debug)]
pub struct Endless;

impl Endless {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        Ok(Arc::new(Self))
    }
}

impl Service for Endless {
    fn process(&self, _query: Query) -> RecordStream {
        Box::pin(stream::unfold((DropFlag, 0_u64), |(flag, n)| async move {
            Some((Ok::<_, ServiceError>(ResultRecord::value(n)), (flag, n + 1)))
        }))
    }
}

/// Constructor delay of the `slow` service.
pub const SLOW_CONSTRUCTION: Duration = Duration::from_millis(1500);

/// `demo` plus a service whose constructor takes [`SLOW_CONSTRUCTION`].
pub fn slow_catalog() -> Vec<ServiceDescriptor> {
    vec![
        ServiceDescriptor::new("demo", Demo::factory),
        ServiceDescriptor::new("slow", Slow::factory),
    ]
}

#[derive(Debug)]
pub struct Slow;

impl Slow {
    fn factory() -> Result<Arc<dyn Service>, ServiceError> {
        std::thread::sleep(SLOW_CONSTRUCTION);
        Ok(Arc::new(Self))
    }
}

impl Service for Slow {
    fn process(&self, _query: Query) -> RecordStream {
        once_record(ResultRecord::value("loaded"))
    }
}
