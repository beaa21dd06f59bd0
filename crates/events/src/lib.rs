//! Background loops and outbound notifications.
//!
//! - [`Monitor`]: per-task outcome counters and the statistics read from
//!   them.
//! - [`Alerter`]: hourly success-rate check with per-level cool-down.
//! - [`ExpiryScanner`] and [`Notifier`]: the daily expiry scan and
//!   per-user, per-checkpoint email dispatch.
//! - [`delivery`]: SMTP email and chat webhook channels.

pub mod alerter;
pub mod delivery;
pub mod monitor;
pub mod notifier;
pub mod scanner;

pub use alerter::{AlertConfig, Alerter, TickOutcome};
pub use delivery::email::{EmailConfig, EmailDelivery, EmailError, EmailMessage, Mailer};
pub use delivery::webhook::{ChatMessage, WebhookDelivery, WebhookError, WebhookSink};
pub use monitor::{ErrorBreakdown, HourlyStat, Monitor, SuccessRate};
pub use notifier::{DispatchOutcome, ExpiryCandidate, Notifier, SkipReason};
pub use scanner::{ExpiryScanner, ScanSummary};
