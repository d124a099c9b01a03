mod binder;
mod lifecycle;
mod manager;

pub use binder::{BindStep, CatalogBinder, DuckLakeBinder};
pub use lifecycle::{ConnectionState, HealthSnapshot, LifecycleManager};
pub use manager::{EngineHandle, PoolStatus, PooledConnection};
