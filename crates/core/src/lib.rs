pub mod audio;
pub mod cloner;
pub mod config;
pub mod matcher;
pub mod metrics;
pub mod naming;
pub mod pipeline;
pub mod scheduler;
pub mod script;
pub mod steps;
pub mod task;
pub mod testing;

pub use cloner::{ClonerConfig, ClonerError, SubprocessCloner, TtsCloner};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    ServerConfig, StorageConfig,
};
pub use matcher::{EmbeddingProvider, HashEmbedder, MatcherConfig, SequenceBuilder};
pub use pipeline::{Pipeline, PipelineConfig, StepError};
pub use scheduler::{GpuGate, Scheduler, SchedulerConfig, SchedulerError};
pub use script::{validate_inputs, InputError};
pub use task::{
    JsonTaskStore, StepRecord, StepStatus, Task, TaskError, TaskInputs, TaskRegistry, TaskStatus,
    TaskStore,
};
