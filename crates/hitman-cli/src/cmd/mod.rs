pub mod approve;
pub mod batch;
pub mod bonus;
pub mod ledger;
pub mod qualification;
pub mod workers;

use anyhow::Context;
use hitman_core::diagnostics::{ConsoleDiagnostics, Diagnostics, TracingDiagnostics};
use hitman_core::mturk::MTurkClient;
use std::path::PathBuf;

/// Global options shared by every subcommand.
pub struct Session {
    pub dir: PathBuf,
    pub json: bool,
    pub sandbox: bool,
    pub endpoint: Option<String>,
}

impl Session {
    pub fn client(&self) -> anyhow::Result<MTurkClient> {
        let client = MTurkClient::from_env(self.sandbox, self.endpoint.as_deref())
            .context("failed to configure marketplace client")?;
        tracing::debug!(endpoint = client.endpoint(), "marketplace client ready");
        Ok(client)
    }

    /// Progress goes to the console unless stdout is reserved for JSON.
    pub fn diagnostics(&self) -> Box<dyn Diagnostics> {
        if self.json {
            Box::new(TracingDiagnostics)
        } else {
            Box::new(ConsoleDiagnostics)
        }
    }
}
