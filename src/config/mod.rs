mod env_vars;
mod export_config;

pub use env_vars::expand_env_vars;

pub use export_config::{
    ConsentConfig,
    DeliveryConfig,
    DeviceConfig,
    ExportConfig,
    LimitsConfig,
    SourceConfig,
    load_or_create_config,
};
