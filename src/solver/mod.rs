//! Captcha token solver collaborator
//!
//! The walker never solves captchas itself. It asks a [`TokenSolver`] for a
//! proof token scoped to a page and site key, and presents that token to the
//! checkpoint and bypass services.

mod credentials;
mod twocaptcha;

pub use credentials::read_credentials;
pub use twocaptcha::TwoCaptchaSolver;

use crate::SolverError;
use async_trait::async_trait;

/// Produces proof tokens for captcha-gated pages
#[async_trait]
pub trait TokenSolver: Send + Sync {
    /// Solves the challenge on `page_url` for `site_key`
    async fn solve_challenge(&self, page_url: &str, site_key: &str)
        -> Result<String, SolverError>;
}
