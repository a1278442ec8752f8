//! src/platforms/twitch_irc/client.rs

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter, split};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use async_trait::async_trait;
use tokio_native_tls::native_tls;
use tokio_native_tls::TlsConnector;
use tracing::{debug, error, info, warn};

use crate::platforms::{ChatEvent, ChatMessage, ChatTransport, SenderRoles};
use crate::Error;

/// Minimal representation of a parsed IRC line from Twitch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTwitchMsg {
    pub tags: Option<String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
    pub trailing: Option<String>,
}

impl ParsedTwitchMsg {
    pub fn parse_irc_line(line: &str) -> Self {
        let mut msg = Self::default();
        let mut rest = line.trim();

        if rest.starts_with('@') {
            match rest.split_once(' ') {
                Some((tags, after)) => {
                    msg.tags = Some(tags.to_string());
                    rest = after;
                }
                None => {
                    msg.tags = Some(rest.to_string());
                    return msg;
                }
            }
        }

        if let Some(stripped) = rest.strip_prefix(':') {
            match stripped.split_once(' ') {
                Some((prefix, after)) => {
                    msg.prefix = Some(prefix.to_string());
                    rest = after;
                }
                None => {
                    msg.prefix = Some(stripped.to_string());
                    return msg;
                }
            }
        }

        let (command, args) = rest.split_once(' ').unwrap_or((rest, ""));
        msg.command = command.to_uppercase();

        let middle = match args.strip_prefix(':') {
            Some(trailing) => {
                msg.trailing = Some(trailing.to_string());
                ""
            }
            None => match args.split_once(" :") {
                Some((middle, trailing)) => {
                    msg.trailing = Some(trailing.to_string());
                    middle
                }
                None => args,
            },
        };
        msg.params = middle.split_whitespace().map(str::to_string).collect();
        msg
    }

    pub fn tag(&self, key: &str) -> Option<String> {
        self.tags.as_deref().and_then(|t| extract_tag_value(t, key))
    }

    /// Nick part of a `nick!user@host` prefix.
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split('!').next().unwrap_or(prefix))
    }

    /// First param with the leading `#` removed.
    pub fn channel(&self) -> Option<String> {
        self.params.first().map(|c| c.trim_start_matches('#').to_lowercase())
    }
}

/// `#name`, lowercased.
pub fn irc_channel(name: &str) -> String {
    format!("#{}", name.trim_start_matches('#').to_lowercase())
}

/// Turns one parsed line into the event the session cares about, if any.
/// `own_login` is the nick this connection authenticated as.
pub fn translate(parsed: &ParsedTwitchMsg, own_login: &str) -> Option<ChatEvent> {
    match parsed.command.as_str() {
        "PRIVMSG" => {
            let channel = parsed.channel()?;
            let login = parsed.nick()?.to_lowercase();
            let badges = parsed.tag("badges").unwrap_or_default();
            let display_name = parsed
                .tag("display-name")
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| login.clone());
            let roles = SenderRoles {
                moderator: parsed.tag("mod").as_deref() == Some("1")
                    || badges.split(',').any(|b| b.starts_with("moderator/")),
                broadcaster: badges.split(',').any(|b| b.starts_with("broadcaster/")),
                bot: login == own_login,
            };
            Some(ChatEvent::Message(ChatMessage {
                channel,
                room_id: parsed.tag("room-id").unwrap_or_default(),
                user_id: parsed.tag("user-id").unwrap_or_default(),
                login,
                display_name,
                text: parsed.trailing.clone().unwrap_or_default(),
                roles,
            }))
        }
        "JOIN" if parsed.nick().is_some_and(|n| n.eq_ignore_ascii_case(own_login)) => {
            Some(ChatEvent::Connected)
        }
        "NOTICE" => {
            let text = parsed.trailing.clone().unwrap_or_default();
            if text.contains("Login authentication failed") || text.contains("Improperly formatted auth") {
                Some(ChatEvent::Error(text))
            } else {
                Some(ChatEvent::Notice(text))
            }
        }
        "RECONNECT" => Some(ChatEvent::Closed),
        _ => None,
    }
}

/// Low-level IRC client that connects to Twitch via TLS and feeds one
/// channel's events into a bounded queue.
pub struct TwitchIrcClient {
    raw_outgoing: mpsc::UnboundedSender<String>,
    read_task: JoinHandle<()>,
    write_task: JoinHandle<()>,
}

impl TwitchIrcClient {
    /// Connects to `host:port` with TLS, sends PASS/NICK/CAP, spawns the
    /// read/write tasks and joins `channel`.
    pub async fn connect(
        host: &str,
        port: u16,
        login: &str,
        oauth_token: &str,
        channel: &str,
        events: mpsc::Sender<ChatEvent>,
    ) -> Result<Self, Error> {
        let tcp = TcpStream::connect((host, port))
            .await
            .map_err(|e| Error::Chat(format!("TCP connect error: {e}")))?;

        let native_connector = native_tls::TlsConnector::new()
            .map_err(|e| Error::Chat(format!("TlsConnector::new() => {e}")))?;
        let connector = TlsConnector::from(native_connector);
        let tls_stream = connector
            .connect(host, tcp)
            .await
            .map_err(|e| Error::Chat(format!("TLS connect() => {e}")))?;

        let (read_half, write_half) = split(tls_stream);
        let (tx_outgoing, rx_outgoing) = mpsc::unbounded_channel::<String>();

        let write_task = tokio::spawn(Self::writer_loop(write_half, rx_outgoing));

        let pass = if oauth_token.starts_with("oauth:") {
            oauth_token.to_string()
        } else {
            format!("oauth:{oauth_token}")
        };
        let own_login = login.to_lowercase();
        for line in [
            format!("PASS {pass}"),
            format!("NICK {own_login}"),
            "CAP REQ :twitch.tv/commands twitch.tv/tags twitch.tv/membership".to_string(),
            format!("JOIN {}", irc_channel(channel)),
        ] {
            tx_outgoing
                .send(line)
                .map_err(|_| Error::Chat("writer closed during handshake".into()))?;
        }

        let read_task = tokio::spawn(Self::reader_loop(
            read_half,
            own_login,
            events,
            tx_outgoing.clone(),
        ));

        Ok(Self {
            raw_outgoing: tx_outgoing,
            read_task,
            write_task,
        })
    }

    async fn reader_loop<R>(
        read_half: R,
        own_login: String,
        events: mpsc::Sender<ChatEvent>,
        tx_outgoing: mpsc::UnboundedSender<String>,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(read_half);
        let mut line_buffer = String::new();

        loop {
            line_buffer.clear();
            match reader.read_line(&mut line_buffer).await {
                Ok(0) => {
                    info!("(TwitchIrcClient) read_loop => EOF");
                    break;
                }
                Ok(_) => {
                    let line = line_buffer.trim_end();
                    if line.is_empty() {
                        continue;
                    }
                    debug!("<< {}", line);

                    let parsed = ParsedTwitchMsg::parse_irc_line(line);
                    if parsed.command == "PING" {
                        let payload = parsed.trailing.as_deref().unwrap_or("tmi.twitch.tv");
                        tx_outgoing.send(format!("PONG :{payload}")).ok();
                        continue;
                    }

                    let Some(evt) = translate(&parsed, &own_login) else {
                        continue;
                    };
                    match evt {
                        // Chat traffic never waits on the handler; a full
                        // queue drops the message.
                        ChatEvent::Message(_) => {
                            if let Err(mpsc::error::TrySendError::Full(_)) = events.try_send(evt) {
                                warn!("(TwitchIrcClient) event queue full, dropping chat message");
                            }
                        }
                        ChatEvent::Closed => {
                            info!("(TwitchIrcClient) server requested reconnect");
                            break;
                        }
                        other => {
                            if events.send(other).await.is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    error!("(TwitchIrcClient) read error => {:?}", e);
                    let _ = events.send(ChatEvent::Error(e.to_string())).await;
                    break;
                }
            }
        }

        let _ = events.send(ChatEvent::Closed).await;
        info!("(TwitchIrcClient) reader_loop ended.");
    }

    async fn writer_loop<W>(write_half: W, mut rx_outgoing: mpsc::UnboundedReceiver<String>)
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = BufWriter::new(write_half);

        while let Some(line) = rx_outgoing.recv().await {
            if line.starts_with("PASS ") {
                debug!(">> PASS oauth:<redacted>");
            } else {
                debug!(">> {}", line);
            }
            let framed = format!("{line}\r\n");
            if let Err(e) = writer.write_all(framed.as_bytes()).await {
                error!("writer error => {:?}", e);
                break;
            }
            if let Err(e) = writer.flush().await {
                error!("writer flush error => {:?}", e);
                break;
            }
        }

        info!("(TwitchIrcClient) writer_loop ended.");
    }

    fn send_raw_line(&self, line: String) -> Result<(), Error> {
        self.raw_outgoing
            .send(line)
            .map_err(|_| Error::Chat("connection is closed".into()))
    }
}

#[async_trait]
impl ChatTransport for TwitchIrcClient {
    async fn send_privmsg(&self, channel: &str, text: &str) -> Result<(), Error> {
        // A CR or LF would end the line early and let the rest be read as a
        // raw command.
        let text = text.replace(['\r', '\n'], " ");
        self.send_raw_line(format!("PRIVMSG {} :{}", irc_channel(channel), text))
    }

    async fn close(&self) -> Result<(), Error> {
        self.read_task.abort();
        self.write_task.abort();
        Ok(())
    }
}

impl Drop for TwitchIrcClient {
    fn drop(&mut self) {
        self.read_task.abort();
        self.write_task.abort();
    }
}

/// Extracts `key=value` from a tag string like `@badge-info=;user-id=1234;...`.
fn extract_tag_value(tag_str: &str, key: &str) -> Option<String> {
    tag_str
        .trim_start_matches('@')
        .split(';')
        .filter_map(|kv| kv.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| unescape_tag_value(v))
}

fn unescape_tag_value(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('s') => out.push(' '),
            Some(':') => out.push(';'),
            Some('\\') => out.push('\\'),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}
