// Adapters layer: concrete implementations for external systems (http / file source, xlsx, viewer).

pub mod source;
pub mod xlsx;
pub mod viewer;
