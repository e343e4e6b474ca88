/// Messaging module for the command/status boundary
///
/// - **Commands**: requests from the remote sender (imperative, one at a time)
/// - **Status events**: transitions that happened to a player (broadcast)
///
/// ## Architecture
///
/// ```text
/// ┌──────────┐   Command    ┌───────────────┐   StatusEvent   ┌───────────┐
/// │ Decoder  │ ───────────> │ PlayerManager │ ──────────────> │ StatusBus │
/// │ (remote) │              │               │                 │           │
/// └──────────┘              └───────────────┘                 └───────────┘
///                                                                   │
///                                                                   │ Publishes
///                                                                   ▼
///                                                            ┌─────────────┐
///                                                            │ Subscribers │
///                                                            │ (UI, wire)  │
///                                                            └─────────────┘
/// ```
pub mod bus;
pub mod commands;
pub mod events;

// Re-export commonly used types
pub use bus::StatusBus;
pub use commands::{Action, Command};
pub use events::{StatusEvent, StatusKind};
