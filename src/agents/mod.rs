pub mod mod_installer;
pub mod mod_scanner;
pub mod notifier;
pub mod service_controller;
pub mod update_decider;

pub use mod_installer::ModInstaller;
pub use mod_scanner::ModScannerAgent;
pub use notifier::{LogNotifier, Notifier, WebhookNotifier};
pub use service_controller::{CommandRunner, ServiceController, SystemRunner};
pub use update_decider::{Decision, UpdateDecider};
