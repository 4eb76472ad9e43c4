pub mod gate;
pub mod ingest;
pub mod token;
