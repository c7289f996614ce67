pub mod config;
pub mod handler;
pub mod mailer;
pub mod metrics;

pub use config::Config;
pub use handler::handle_status_change;
pub use mailer::Mailer;
