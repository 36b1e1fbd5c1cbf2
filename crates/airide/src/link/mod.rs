//! Connection to the helmet's display unit.
//!
//! The helmet receives one text line per instruction. The serial protocol
//! itself is out of scope; [`MockSerialLink`] stands in for it.

mod mock;

pub use mock::MockSerialLink;

use crate::error::Result;

/// Format the line sent to the helmet for one instruction.
#[must_use]
pub fn format_message(instruction: &str, meters: f64) -> String {
    format!("Indicazione: {instruction} | Metri: {meters} m")
}

/// A link to the helmet's microcontroller.
#[async_trait::async_trait]
pub trait HardwareLink: Send + Sync {
    /// Human-readable name of this link (for logging).
    fn name(&self) -> &'static str;

    /// Open the link. Returns whether the helmet answered.
    async fn connect(&self) -> bool;

    /// Check if the link is open.
    fn is_connected(&self) -> bool;

    /// Send one line to the helmet.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is not open or the write fails.
    async fn send(&self, message: &str) -> Result<()>;
}
