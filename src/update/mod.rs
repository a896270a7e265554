//! Self-update support
//!
//! - `checker`: the periodic check state machine (skip rules, lazy client
//!   construction, backup on detection)
//! - `transport`: the client seam plus the GitHub releases implementation

pub mod checker;
pub mod transport;

pub use checker::{CheckOutcome, ClientState, SkipReason, UpdateCheckState, UpdateChecker};
pub use transport::{
    GitHubTransport, GitHubTransportFactory, ReleaseInfo, UpdateTransport, UpdateTransportFactory,
};
