//! Click-to-dial and SMS for the CRM.
//!
//! [`Dialer`] is the page-side client: it hits `/crm/util/dial/...` or
//! `/crm/util/send_message/...` and turns the JSON answer into a redirect, an
//! alert, or a callback. [`app::router`] serves those endpoints on top of a
//! [`Telephony`] provider.

pub mod app;
pub mod browser;
pub mod config;
pub mod dialer;
pub mod error;
pub mod handlers;
pub mod provider;
pub mod transport;
pub mod types;

pub use browser::{Browser, TerminalBrowser};
pub use dialer::{DialOutcome, Dialer, MessageOptions, SendOutcome};
pub use error::DialerError;
pub use provider::{ProviderError, RingCentral, Telephony};
pub use transport::{HttpTransport, Transport};
pub use types::{DialRequest, MessageRequest, ServerResponse};
