pub mod config;
pub mod deployment;
pub mod machine;
pub mod template;
pub mod unit;

pub use config::{
    Config, LoggingConfig, PeersConfig, PollingConfig, RetryConfig, SchedulerConfig, StoreConfig,
    TemplatesConfig,
};
pub use deployment::DeploymentRecord;
pub use machine::{addresses_for_role, MachineObject, MachineRecord, Role};
pub use template::{
    entries_for, instance_name, TemplateEntry, TemplateSet, UnitTemplate, ADDRESS_PLACEHOLDER,
    ID_PLACEHOLDER,
};
pub use unit::{
    ActiveState, ConvergenceTarget, SubState, UnitGroup, UnitProgress, UnitSpec, UnitState,
};
