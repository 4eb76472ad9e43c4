// handlers/public/mod.rs - Public handlers (no session required)
//
// The session gate classifies these paths as public, so they run whether or
// not the request carries a credential.

pub mod auth;
pub mod health;
pub mod pages;
