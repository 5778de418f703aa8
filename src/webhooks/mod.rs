//! Webhook signing and outgoing delivery.

pub mod signature;
pub mod transport;

pub use signature::{SIGNATURE_HEADER, parse_signature_header, sign, verify_signature};
pub use transport::{DeliveryError, HttpWebhookTransport, WebhookTarget};
