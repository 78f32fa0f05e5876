//! Business logic services

pub mod auth;
pub mod password;
pub mod session;
pub mod validator;

pub use auth::{AuthError, AuthService, LoginInput, SignupInput};
pub use session::SessionService;
