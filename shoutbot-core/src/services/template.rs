// File: shoutbot-core/src/services/template.rs

use shoutbot_common::models::{Channel, ChannelLiveInfo, Pronoun, TwitchUser};

/// Renders shoutout templates.
///
/// Placeholders are `{token}` substrings; the capitalized forms (`{Subject}`,
/// `{Tense}`, ...) produce capitalized words. Substitution is a single pass,
/// so text coming from a stream title is never itself expanded. Unknown
/// placeholders are left as written.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateEngine;

struct Words {
    subject: String,
    object: String,
    present: &'static str,
    past: &'static str,
}

impl Words {
    fn for_pronoun(pronoun: Option<&Pronoun>) -> Self {
        let fallback = Pronoun::they_them();
        let p = pronoun.unwrap_or(&fallback);
        let singular = p.is_singular();
        Self {
            subject: p.subject.to_lowercase(),
            object: p.object.to_lowercase(),
            present: if singular { "is" } else { "are" },
            past: if singular { "was" } else { "were" },
        }
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl TemplateEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn render(
        &self,
        template: &str,
        channel: &Channel,
        target: &TwitchUser,
        live_info: Option<&ChannelLiveInfo>,
        pronoun: Option<&Pronoun>,
    ) -> String {
        let words = Words::for_pronoun(pronoun);

        let info = match live_info {
            Some(info) if info.has_stream_details() => info,
            _ => {
                return format!(
                    "Check out @{}, give {} a follow!",
                    target.display_name, words.object
                );
            }
        };

        let tense = if target.is_live { words.present } else { words.past };
        let resolve = |token: &str| -> Option<String> {
            Some(match token {
                "name" | "displayname" => target.display_name.clone(),
                "username" => target.username.clone(),
                "id" => target.id.clone(),
                "link" => target.link(),
                "channel" => channel.name.clone(),
                "subject" => words.subject.clone(),
                "Subject" => capitalize(&words.subject),
                "object" => words.object.clone(),
                "Object" => capitalize(&words.object),
                "tense" => tense.to_string(),
                "Tense" => capitalize(tense),
                "presentTense" => words.present.to_string(),
                "PresentTense" => capitalize(words.present),
                "pastTense" => words.past.to_string(),
                "PastTense" => capitalize(words.past),
                "game" => info.game_name.clone().unwrap_or_default(),
                "title" => info.title.clone().unwrap_or_default(),
                "status" => (if target.is_live { "live" } else { "offline" }).to_string(),
                "Status" => (if target.is_live { "Live" } else { "Offline" }).to_string(),
                _ => return None,
            })
        };

        let mut out = String::with_capacity(template.len() + 64);
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let token = &after[..close];
                    match resolve(token) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push('{');
                            out.push_str(token);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push_str(&rest[open..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoutbot_common::models::DEFAULT_SHOUTOUT_TEMPLATE;

    fn bob(is_live: bool) -> TwitchUser {
        let mut u = TwitchUser::new("2", "bob", "Bob");
        u.is_live = is_live;
        u
    }

    fn info(game: &str, title: &str) -> ChannelLiveInfo {
        ChannelLiveInfo {
            broadcaster_id: "2".into(),
            game_name: Some(game.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn he() -> Pronoun {
        Pronoun {
            name: "hehim".into(),
            subject: "He".into(),
            object: "Him".into(),
            singular: true,
        }
    }

    #[test]
    fn default_template_with_pronoun() {
        let out = TemplateEngine.render(
            DEFAULT_SHOUTOUT_TEMPLATE,
            &Channel::new("1", "alice"),
            &bob(true),
            Some(&info("Celeste", "any% runs")),
            Some(&he()),
        );
        assert_eq!(
            out,
            "Check out @Bob! he is streaming Celeste: any% runs. Go give him a follow!"
        );
    }

    #[test]
    fn offline_plural_default() {
        let out = TemplateEngine.render(
            "{Subject} {Tense} {status} playing {game} ({link})",
            &Channel::new("1", "alice"),
            &bob(false),
            Some(&info("Celeste", "t")),
            None,
        );
        assert_eq!(out, "They Were offline playing Celeste (https://www.twitch.tv/bob)");
    }

    #[test]
    fn fallback_when_game_or_title_missing() {
        let ch = Channel::new("1", "alice");
        let templates = ["{game} {title}", "", "no placeholders at all"];
        for t in templates {
            let out = TemplateEngine.render(t, &ch, &bob(true), Some(&info("", "")), Some(&he()));
            assert_eq!(out, "Check out @Bob, give him a follow!");
        }
        let out = TemplateEngine.render("{game}", &ch, &bob(true), None, None);
        assert_eq!(out, "Check out @Bob, give them a follow!");
    }

    #[test]
    fn title_text_is_not_reexpanded() {
        let out = TemplateEngine.render(
            "{title} {unknown} {id",
            &Channel::new("1", "alice"),
            &bob(true),
            Some(&info("Art", "drawing {link}")),
            None,
        );
        assert_eq!(out, "drawing {link} {unknown} {id");
    }
}
