//! Plain-text remote control protocol.
//!
//! One command per TCP connection: the client writes the command as UTF-8,
//! the server answers with a single response string and closes the socket.
//!
//! | Command                 | Response                      |
//! |-------------------------|-------------------------------|
//! | `<N>` (1-based)         | `Listening to <title>`        |
//! | `off`                   | `Off`                         |
//! | `on` / `resume`         | `On`                          |
//! | `pause`                 | `Pause`                       |
//! | `toggle` / empty string | `Toggle <title>`              |
//! | `info` / `nowplaying`   | now-playing text              |
//! | `sleep` / `wake`        | `Sleep` / `Wake`              |
//! | anything else           | `Unknown input`               |
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

pub const UNKNOWN_INPUT: &str = "Unknown input";
pub const IDLE_PLACEHOLDER: &str = "Nothing playing...";

/// Largest response a client needs to buffer.
pub const MAX_RESPONSE_LEN: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCommand {
    /// Play the Nth station in catalog order (1-based).
    Play(usize),
    Off,
    Resume,
    Pause,
    Toggle,
    Info,
    Sleep,
    Wake,
    Unknown(String),
}

impl RemoteCommand {
    /// Parse one inbound command. Surrounding whitespace is ignored, so
    /// `echo pause | nc` style clients work; an empty command toggles.
    pub fn parse(raw: &str) -> Self {
        let msg = raw.trim();
        if !msg.is_empty() && msg.bytes().all(|b| b.is_ascii_digit()) {
            // Too many digits to fit is simply out of range.
            return Self::Play(msg.parse().unwrap_or(usize::MAX));
        }
        match msg {
            "" | "toggle" => Self::Toggle,
            "off" => Self::Off,
            "on" | "resume" => Self::Resume,
            "pause" => Self::Pause,
            "info" | "nowplaying" => Self::Info,
            "sleep" => Self::Sleep,
            "wake" => Self::Wake,
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Response texts. The empty string is a valid response ("nothing to do").
pub mod response {
    pub fn listening_to(title: &str) -> String {
        format!("Listening to {}", title)
    }

    pub fn no_station(n: usize, len: usize) -> String {
        if len == 0 {
            format!("No station {} (no stations loaded)", n)
        } else {
            format!("No station {} (1-{})", n, len)
        }
    }

    pub fn toggle(title: &str) -> String {
        format!("Toggle {}", title)
    }

    pub fn error(message: impl std::fmt::Display) -> String {
        format!("Error: {}", message)
    }

    pub const OFF: &str = "Off";
    pub const ON: &str = "On";
    pub const PAUSE: &str = "Pause";
    pub const SLEEP: &str = "Sleep";
    pub const WAKE: &str = "Wake";
    pub const NONE: &str = "";
}

/// Send one command and return the server's response.
///
/// The command goes out newline-terminated so an empty command is still one
/// byte on the wire; a connection that closes silently is not a command.
pub async fn send_command(address: &str, command: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(address).await?;
    stream.write_all(command_line(command).as_bytes()).await?;
    stream.shutdown().await?;

    let mut buf = Vec::with_capacity(MAX_RESPONSE_LEN);
    (&mut stream)
        .take(MAX_RESPONSE_LEN as u64)
        .read_to_end(&mut buf)
        .await?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn command_line(command: &str) -> String {
    if command.ends_with('\n') {
        command.to_string()
    } else {
        format!("{}\n", command)
    }
}
