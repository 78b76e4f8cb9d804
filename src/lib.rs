pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use app::pipelines::map_pipeline::MapPipeline;
pub use config::{cli::LocalStorage, CliConfig};
pub use core::etl::EtlEngine;
pub use domain::ports::OutputMode;
pub use utils::error::{MapError, Result};
