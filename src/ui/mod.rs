//! Terminal presentation: toasts, icons, and the board rendering.

pub mod board_view;
pub mod icons;
pub mod toast;

pub use toast::{ConsoleNotifier, MemoryNotifier, Notifier, Toast, ToastLevel};
