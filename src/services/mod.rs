pub mod attendance;
pub mod dashboard;
pub mod ids;
pub mod notifications;
pub mod pagination;
