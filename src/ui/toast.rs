//! Toast notifications.
//!
//! Every user-visible outcome — success confirmations, rejections, rollbacks —
//! flows through the [`Notifier`] trait. The console implementation prints
//! styled lines; [`MemoryNotifier`] collects toasts for programmatic callers
//! and tests.

use std::sync::Mutex;

use console::style;

use crate::ui::icons::{CHECK, CROSS, INFO};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: ToastLevel, message: &str);

    fn success(&self, message: &str) {
        self.notify(ToastLevel::Success, message);
    }

    fn error(&self, message: &str) {
        self.notify(ToastLevel::Error, message);
    }

    fn info(&self, message: &str) {
        self.notify(ToastLevel::Info, message);
    }
}

/// Styled terminal output.
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: ToastLevel, message: &str) {
        match level {
            ToastLevel::Success => println!("{}{}", CHECK, style(message).green()),
            ToastLevel::Error => eprintln!("{}{}", CROSS, style(message).red()),
            ToastLevel::Info => println!("{}{}", INFO, style(message).cyan()),
        }
    }
}

/// Collects toasts instead of printing them.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    toasts: Mutex<Vec<Toast>>,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.toasts.lock().expect("toast lock poisoned").clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.toasts().into_iter().map(|t| t.message).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.toasts()
            .into_iter()
            .filter(|t| t.level == ToastLevel::Error)
            .map(|t| t.message)
            .collect()
    }

    pub fn clear(&self) {
        self.toasts.lock().expect("toast lock poisoned").clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, level: ToastLevel, message: &str) {
        self.toasts
            .lock()
            .expect("toast lock poisoned")
            .push(Toast {
                level,
                message: message.to_string(),
            });
    }
}
