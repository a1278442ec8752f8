use crate::services::commands::{Permission, COMMANDS};

/// `?join - ... | ?help - ... | Mod only: ?so - ... | ...`
pub fn help_text(prefix: &str) -> String {
    let line = |public: bool| -> Vec<String> {
        COMMANDS
            .iter()
            .filter(|c| (c.permission == Permission::Everyone) == public)
            .map(|c| format!("{}{} - {}", prefix, c.name, c.description))
            .collect()
    };

    let mut message = line(true).join(" | ");
    let restricted = line(false);
    if !restricted.is_empty() {
        message.push_str(" | Mod only: ");
        message.push_str(&restricted.join(" | "));
    }
    message
}
