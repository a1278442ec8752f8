// File: shoutbot-core/src/services/command_parser.rs

use crate::platforms::SenderRoles;

/// A chat line that started with the command prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Lowercased, `@` removed.
    pub name: String,
    /// Everything after the name, trimmed.
    pub arguments: String,
    pub argument_list: Vec<String>,
    pub roles: SenderRoles,
}

impl ParsedCommand {
    /// First argument with any leading `@` stripped.
    pub fn first_argument_login(&self) -> Option<String> {
        self.argument_list
            .first()
            .map(|a| a.trim_start_matches('@').to_lowercase())
            .filter(|a| !a.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMMAND_PREFIX)
    }
}

impl CommandParser {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `None` for anything that is not a command.
    pub fn parse(&self, raw: &str, roles: SenderRoles) -> Option<ParsedCommand> {
        let body = raw.trim_start().strip_prefix(self.prefix.as_str())?;

        let (head, rest) = match body.find(char::is_whitespace) {
            Some(idx) => body.split_at(idx),
            None => (body, ""),
        };
        let name = head.replace('@', "").to_lowercase();
        if name.is_empty() {
            return None;
        }

        let arguments = rest.trim().to_string();
        let argument_list = arguments.split_whitespace().map(str::to_string).collect();

        Some(ParsedCommand {
            name,
            arguments,
            argument_list,
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoutout_with_arguments() {
        let parsed = CommandParser::default()
            .parse("?so @alice extra", SenderRoles::default())
            .unwrap();
        assert_eq!(parsed.name, "so");
        assert_eq!(parsed.argument_list, vec!["@alice", "extra"]);
        assert_eq!(parsed.arguments, "@alice extra");
        assert_eq!(parsed.first_argument_login().as_deref(), Some("alice"));
    }

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(CommandParser::default().parse("hello world", SenderRoles::default()), None);
        assert_eq!(CommandParser::default().parse("?", SenderRoles::default()), None);
        assert_eq!(CommandParser::default().parse("? so", SenderRoles::default()), None);
    }

    #[test]
    fn name_is_lowercased_and_roles_kept() {
        let roles = SenderRoles { moderator: true, broadcaster: false, bot: false };
        let parsed = CommandParser::new("!").parse("!@AddSO   bob  ", roles).unwrap();
        assert_eq!(parsed.name, "addso");
        assert_eq!(parsed.arguments, "bob");
        assert_eq!(parsed.argument_list, vec!["bob"]);
        assert!(parsed.roles.moderator);
    }
}
