pub mod notification_dto;
pub mod notification_handlers;
pub mod notification_models;
pub mod notification_repository;
pub mod notification_scheduler;
pub mod notification_service;
pub mod read_state_service;

pub use notification_models::{Notification, NotificationType};
pub use notification_repository::{EvictionPolicy, InsertOutcome, NotificationRepository};
pub use notification_scheduler::start_reconcile_job;
pub use notification_service::{NotificationService, PushFailure};
pub use read_state_service::ReadStateService;
