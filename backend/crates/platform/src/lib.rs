//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (HMAC-SHA256 token signing, Base64)
//! - Password hashing (Argon2id with constant-time verification)
//! - Cookie management

pub mod cookie;
pub mod crypto;
pub mod password;
