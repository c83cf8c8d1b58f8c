//! Authentication core
//!
//! This module provides the credential and token issuance engine:
//! - Password hashing with Argon2id
//! - Application-scoped JWT issuance
//! - Authentication service for register, login, and admin checks

pub mod jwt;
pub mod password;
pub mod service;

pub use jwt::{validate_token, Claims, JwtError, TokenIssuer};
pub use password::{Argon2Hasher, CredentialHasher, PasswordConfig, PasswordError};
pub use service::{AuthError, AuthService};
