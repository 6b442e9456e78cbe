//! Command handlers -- one module per subcommand

pub mod ingest;
pub mod record;
pub mod service;
pub mod status;
pub mod verify;
