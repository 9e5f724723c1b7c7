//! Fire-and-forget user notifications (layout warnings and the like).

use colored::*;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Warning,
    Error,
}

/// Receives side-channel messages; must never block the build.
pub trait Notifier: Send + Sync {
    fn notify(&self, level: StatusLevel, title: &str, message: &str);
}

/// Prints notifications to stderr.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: StatusLevel, title: &str, message: &str) {
        let marker = match level {
            StatusLevel::Info => "ℹ".blue(),
            StatusLevel::Warning => "⚠".yellow(),
            StatusLevel::Error => "x".red(),
        };
        eprintln!("{} {} {}", marker, title.bold(), message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: StatusLevel,
    pub title: String,
    pub message: String,
}

/// Keeps notifications in memory, for embedding front ends and tests.
#[derive(Default)]
pub struct MemoryNotifier {
    messages: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    pub fn messages(&self) -> Vec<Notification> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: StatusLevel, title: &str, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(Notification {
                level,
                title: title.to_string(),
                message: message.to_string(),
            });
        }
    }
}
