// handlers/public/auth/mod.rs - Session acquisition and release

pub mod login;
pub mod magic_link;
pub mod session;
pub mod utils;

pub use login::login;
pub use magic_link::{magic_link, verify_magic_link};
pub use session::logout;
