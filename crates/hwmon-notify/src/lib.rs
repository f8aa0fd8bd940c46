pub mod notifier;
pub mod providers;
pub mod message;
pub mod manager;

pub use notifier::{Notifier, NotifyResult};
pub use providers::{PushbulletNotifier, SlackNotifier, WebhookNotifier};
pub use message::{NotifyMessage, NotifyLevel, NotifyChannel};
pub use manager::NotifyManager;
