// handlers/protected/mod.rs - Handlers behind the session gate
//
// Every route here requires a verified credential. Handlers receive the
// identity through the `Identity` extractor; proxied calls forward its raw
// token to the backend.

pub mod admin;
pub mod ingest;
pub mod library;
pub mod pages;
pub mod session;
