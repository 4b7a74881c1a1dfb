pub mod extraction;
pub mod notifier;
pub mod queued;
