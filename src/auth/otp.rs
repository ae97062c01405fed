//! Email OTP verification flow
//!
//! Two round-trips: request a code, then verify it. Final submit of the
//! signup/login form stays disabled until verify succeeds, and editing the
//! email starts over.
//!
//! Every request hands out an [`OtpTicket`]. A response whose ticket belongs
//! to an older email is ignored, so a slow reply cannot mark a new address
//! as verified.

use thiserror::Error;

use crate::validation::is_valid_email;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Enter a valid email address")]
    InvalidEmail,

    #[error("Request a code first")]
    NotSent,

    #[error("Enter the code from your email")]
    EmptyCode,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("A request is already in progress")]
    Busy,
}

/// Identifies one request/verify round-trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpTicket {
    generation: u64,
    pub email: String,
    pub code: Option<String>,
}

/// Where the user is in the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpStep {
    EnterEmail,
    CodeSent,
    Verified,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtpFlow {
    email: String,
    code: String,
    otp_sent: bool,
    otp_verified: bool,
    loading: bool,
    generation: u64,
}

impl OtpFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn otp_sent(&self) -> bool {
        self.otp_sent
    }

    pub fn otp_verified(&self) -> bool {
        self.otp_verified
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn step(&self) -> OtpStep {
        if self.otp_verified {
            OtpStep::Verified
        } else if self.otp_sent {
            OtpStep::CodeSent
        } else {
            OtpStep::EnterEmail
        }
    }

    /// Change the email; any change resets sent/verified
    pub fn set_email(&mut self, email: impl Into<String>) {
        let email = email.into();
        if email.trim() == self.email.trim() {
            self.email = email;
            return;
        }

        self.email = email;
        self.code.clear();
        self.otp_sent = false;
        self.otp_verified = false;
        self.loading = false;
        self.generation += 1;
    }

    pub fn set_code(&mut self, code: impl Into<String>) {
        self.code = code.into();
    }

    pub fn can_request(&self) -> bool {
        !self.loading && !self.otp_verified && is_valid_email(&self.email)
    }

    pub fn can_verify(&self) -> bool {
        !self.loading && self.otp_sent && !self.otp_verified && !self.code.trim().is_empty()
    }

    /// Whether the final signup/login action is enabled
    pub fn can_submit(&self) -> bool {
        self.otp_verified && !self.loading
    }

    pub fn begin_request(&mut self) -> Result<OtpTicket, OtpError> {
        if self.loading {
            return Err(OtpError::Busy);
        }
        if self.otp_verified {
            return Err(OtpError::AlreadyVerified);
        }
        if !is_valid_email(&self.email) {
            return Err(OtpError::InvalidEmail);
        }

        self.loading = true;
        Ok(OtpTicket {
            generation: self.generation,
            email: self.email.trim().to_string(),
            code: None,
        })
    }

    /// Record the outcome of a code request. Returns false if the ticket is stale.
    pub fn finish_request(&mut self, ticket: &OtpTicket, sent: bool) -> bool {
        if ticket.generation != self.generation {
            return false;
        }

        self.loading = false;
        if sent {
            self.otp_sent = true;
            self.code.clear();
        }
        true
    }

    pub fn begin_verify(&mut self) -> Result<OtpTicket, OtpError> {
        if self.loading {
            return Err(OtpError::Busy);
        }
        if self.otp_verified {
            return Err(OtpError::AlreadyVerified);
        }
        if !self.otp_sent {
            return Err(OtpError::NotSent);
        }
        let code = self.code.trim();
        if code.is_empty() {
            return Err(OtpError::EmptyCode);
        }

        let ticket = OtpTicket {
            generation: self.generation,
            email: self.email.trim().to_string(),
            code: Some(code.to_string()),
        };
        self.loading = true;
        Ok(ticket)
    }

    /// Record the outcome of a verify call. Returns false if the ticket is stale.
    pub fn finish_verify(&mut self, ticket: &OtpTicket, verified: bool) -> bool {
        if ticket.generation != self.generation {
            return false;
        }

        self.loading = false;
        self.otp_verified = verified;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_with_sent_code() -> OtpFlow {
        let mut flow = OtpFlow::new();
        flow.set_email("amina@example.com");
        let ticket = flow.begin_request().unwrap();
        assert!(flow.finish_request(&ticket, true));
        flow
    }

    #[test]
    fn test_submit_disabled_until_verified() {
        let mut flow = OtpFlow::new();
        assert!(!flow.can_submit());

        flow.set_email("amina@example.com");
        let ticket = flow.begin_request().unwrap();
        assert!(flow.loading());
        assert!(!flow.can_submit());

        flow.finish_request(&ticket, true);
        assert_eq!(flow.step(), OtpStep::CodeSent);
        assert!(!flow.can_submit());

        flow.set_code("123456");
        let ticket = flow.begin_verify().unwrap();
        assert_eq!(ticket.code.as_deref(), Some("123456"));
        flow.finish_verify(&ticket, true);

        assert_eq!(flow.step(), OtpStep::Verified);
        assert!(flow.can_submit());
    }

    #[test]
    fn test_failed_verify_keeps_submit_disabled() {
        let mut flow = flow_with_sent_code();
        flow.set_code("000000");
        let ticket = flow.begin_verify().unwrap();
        flow.finish_verify(&ticket, false);

        assert!(!flow.can_submit());
        assert!(flow.otp_sent());
        assert!(flow.can_verify());
    }

    #[test]
    fn test_changing_email_resets_flags() {
        let mut flow = flow_with_sent_code();
        flow.set_code("123456");
        let ticket = flow.begin_verify().unwrap();
        flow.finish_verify(&ticket, true);
        assert!(flow.otp_verified());

        flow.set_email("other@example.com");
        assert!(!flow.otp_sent());
        assert!(!flow.otp_verified());
        assert!(!flow.can_submit());
        assert_eq!(flow.code(), "");
    }

    #[test]
    fn test_same_email_does_not_reset() {
        let mut flow = flow_with_sent_code();
        flow.set_email("amina@example.com");
        assert!(flow.otp_sent());
    }

    #[test]
    fn test_stale_response_is_ignored() {
        let mut flow = flow_with_sent_code();
        flow.set_code("123456");
        let ticket = flow.begin_verify().unwrap();

        flow.set_email("other@example.com");
        assert!(!flow.finish_verify(&ticket, true));
        assert!(!flow.otp_verified());
    }

    #[test]
    fn test_guards() {
        let mut flow = OtpFlow::new();
        flow.set_email("not-an-email");
        assert_eq!(flow.begin_request(), Err(OtpError::InvalidEmail));
        assert_eq!(flow.begin_verify(), Err(OtpError::NotSent));

        let mut flow = flow_with_sent_code();
        assert_eq!(flow.begin_verify(), Err(OtpError::EmptyCode));

        flow.set_code("1");
        let _ticket = flow.begin_verify().unwrap();
        assert_eq!(flow.begin_verify(), Err(OtpError::Busy));
        assert_eq!(flow.begin_request(), Err(OtpError::Busy));
    }
}
