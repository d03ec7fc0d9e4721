//! Shared UI icons with plain-text fallbacks for non-unicode terminals.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "[i]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static FLAME: Emoji<'_, '_> = Emoji("🔥 ", "[DEL]");
