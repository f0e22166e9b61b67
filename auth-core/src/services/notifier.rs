use async_trait::async_trait;
use std::sync::Mutex;

/// Delivers password-reset codes to account holders.
#[async_trait]
pub trait ResetCodeNotifier: Send + Sync {
    async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), anyhow::Error>;
}

/// Records that a code was issued. The code itself is never logged.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl ResetCodeNotifier for LogNotifier {
    async fn send_reset_code(&self, email: &str, _code: &str) -> Result<(), anyhow::Error> {
        tracing::info!(email = %email, "Password reset code issued");
        Ok(())
    }
}

/// Keeps every delivered code in memory.
#[derive(Debug, Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_code_for(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().map(|sent| sent.len()).unwrap_or_default()
    }
}

#[async_trait]
impl ResetCodeNotifier for MockNotifier {
    async fn send_reset_code(&self, email: &str, code: &str) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .map_err(|_| anyhow::anyhow!("Notifier lock poisoned"))?
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}
