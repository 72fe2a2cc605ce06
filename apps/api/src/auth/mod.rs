//! Identity layer: password hashing, signed tokens, sessions and the
//! `CurrentUser` extractor that gates every resume route.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod session;
pub mod token;
