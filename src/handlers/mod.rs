// handlers/mod.rs - Two-tier handler layout
//
// Public (gate allows unconditionally) → Protected (verified credential,
// some paths additionally role-gated)

pub mod protected;
pub mod public;
