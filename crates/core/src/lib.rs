pub mod config;
pub mod encoder;
pub mod events;
pub mod metrics;
pub mod orchestrator;
pub mod pool;
pub mod task;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, EncoderConfig, PoolConfig,
};
pub use encoder::{EncodeJob, EncodeReport, Encoder, EncoderError, FlacEncoder};
pub use events::{
    EventDispatcher, EventEnvelope, EventStream, NotificationChannel, OrchestratorEvent,
    TaskObserver,
};
pub use orchestrator::{AddedFile, BatchHandle, BatchSummary, Orchestrator, OrchestratorError};
pub use pool::{JobOutcome, PoolStatus, WorkerPool};
pub use task::{
    destination_path_for, ConversionTask, RegistryError, TaskCounts, TaskId, TaskRegistry,
    TaskStatus,
};
