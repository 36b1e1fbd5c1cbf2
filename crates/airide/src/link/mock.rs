//! Logging stand-in for the USB serial link.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::info;

use super::HardwareLink;
use crate::error::{Error, Result};

/// A helmet link that only logs what it would write.
///
/// Sent lines are also kept in memory so callers can inspect them.
#[derive(Debug, Clone, Default)]
pub struct MockSerialLink {
    connected: Arc<AtomicBool>,
    sent_count: Arc<AtomicU64>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl MockSerialLink {
    /// Create a closed link.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a link that is already open.
    #[must_use]
    pub fn connected() -> Self {
        let link = Self::new();
        link.connected.store(true, Ordering::SeqCst);
        link
    }

    /// Close the link.
    pub fn disconnect(&self) {
        info!("Simulated serial disconnect");
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Number of lines written since creation.
    #[must_use]
    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::SeqCst)
    }

    /// Lines written so far, oldest first.
    #[must_use]
    pub fn sent_messages(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl HardwareLink for MockSerialLink {
    fn name(&self) -> &'static str {
        "mock-serial"
    }

    async fn connect(&self) -> bool {
        info!("Simulated serial connection active");
        self.connected.store(true, Ordering::SeqCst);
        true
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn send(&self, message: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::link("serial link not connected"));
        }
        info!(%message, "Simulated serial write");
        self.sent_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.to_string());
        }
        Ok(())
    }
}
