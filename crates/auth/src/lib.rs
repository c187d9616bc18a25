//! `keystone-auth`: authentication/authorization boundary.
//!
//! This crate is intentionally decoupled from HTTP and storage: it knows how to
//! hash passwords, mint and verify tokens, and decide whether a principal may
//! reach a route. Loading users is the caller's job.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod password;
pub mod principal;
pub mod roles;
pub mod token;
pub mod user;
pub mod validation;

pub use authorize::{AuthzError, RoleRequirement, authorize, ensure_self_or_admin};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256Jwt, InvalidTtl, JwtIssuer, JwtValidator, SigningError, TokenTtl};
pub use password::{DEFAULT_BCRYPT_COST, PasswordError, PasswordPolicy, hash_password, verify_password};
pub use principal::Principal;
pub use roles::UserRole;
pub use token::generate_token;
pub use user::{SafeUser, User};
pub use validation::{is_valid_email, is_valid_url};
