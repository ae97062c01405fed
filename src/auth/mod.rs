//! Authentication
//!
//! - [`OtpFlow`]: email one-time-password request/verify state
//! - [`SignupForm`], [`LoginForm`]: client-side form checks
//! - [`Session`], [`SessionStore`]: the signed-in user, persisted with a TTL
//! - [`FederatedIdentity`]: claims read from a third-party sign-in credential

mod identity;
mod otp;
mod session;
mod signup;

pub use identity::{FederatedIdentity, IdentityError};
pub use otp::{OtpError, OtpFlow, OtpStep, OtpTicket};
pub use session::{Session, SessionStore, DEFAULT_SESSION_TTL_HOURS};
pub use signup::{LoginForm, SignupForm, MIN_PASSWORD_LEN};
