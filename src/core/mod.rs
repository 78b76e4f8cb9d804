pub mod aggregator;
pub mod etl;
pub mod filter;
pub mod geography;
pub mod loader;
pub mod normalizer;
pub mod render;

pub use crate::domain::model::{AvailabilityReport, CountryAvailability, DrugRecord};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
