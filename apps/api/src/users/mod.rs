//! # Users
//!
//! Registration, login and profile lookup. Passwords are stored as salted
//! Argon2id hashes; sessions are stateless JWT bearer tokens with a fixed
//! 7-day lifetime and no server-side revocation.

pub mod extract;
pub mod handlers;
pub mod password;
pub mod store;
pub mod token;
