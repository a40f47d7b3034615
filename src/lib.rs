pub mod bot;
pub mod config;
pub mod conversation;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod telegram;
pub mod types;
pub mod unisender;

pub use bot::run;
