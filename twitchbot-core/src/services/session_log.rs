// twitchbot-core/src/services/session_log.rs
//
// Human readable chat transcript. Lines are rendered with terminal colors for
// the console and appended without them to `<log_dir>/<YYYY-MM-DD>.log` by a
// single writer task, so callers on the receive loop never touch the disk.

use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::message::{ChatMessage, Rgb};
use crate::utils::time::{dt_str, today_str};
use crate::Error;

static UNCOLOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[^m]*m").expect("static uncolor regex"));

const BOT_NAME_STYLE: &str = "\x1b[1m\x1b[3m\x1b[38;5;21m";
const RESET: &str = "\x1b[m";

/// Badge prefix -> (background, glyph), in display order.
const BADGES: &[(&str, Rgb, char)] = &[
    ("staff/", Rgb(0, 0, 0), '⚙'),
    ("moderator/", Rgb(0, 173, 3), '⚔'),
    ("vip/", Rgb(224, 5, 185), '♦'),
    ("broadcaster/", Rgb(233, 25, 22), '☞'),
    ("founder/", Rgb(130, 5, 180), '★'),
    ("subscriber/", Rgb(130, 5, 180), '★'),
    ("premium/", Rgb(0, 160, 214), '♕'),
    ("turbo/", Rgb(89, 57, 154), '♕'),
    ("sub-gift-leader/", Rgb(230, 186, 72), '◘'),
    ("sub-gifter/", Rgb(88, 226, 193), '◘'),
    ("hype-train/", Rgb(183, 125, 29), '♕'),
    ("bits/", Rgb(203, 200, 208), '▴'),
    ("bits-leader/", Rgb(230, 186, 72), '♦'),
    ("partner/", Rgb(145, 70, 255), '☑'),
];

pub fn strip_ansi(s: &str) -> String {
    UNCOLOR_RE.replace_all(s, "").into_owned()
}

fn bg(color: Rgb) -> String {
    format!("\x1b[48;2;{:03};{:03};{:03}m", color.0, color.1, color.2)
}

fn render_badges(msg: &ChatMessage) -> String {
    let badges = msg.badges();
    let mut out = String::new();
    for (prefix, color, glyph) in BADGES {
        for badge in &badges {
            if badge.starts_with(prefix) {
                out.push_str(&format!("{}{}{}", bg(*color), glyph, RESET));
            }
        }
    }
    out
}

/// Colored transcript line for an inbound chat message.
pub fn render_input(msg: &ChatMessage) -> String {
    let Rgb(r, g, b) = msg.color();
    let color_start = format!("\x1b[1m\x1b[38;2;{};{};{}m", r, g, b);
    let name = msg.display_name();

    if msg.is_action {
        return format!(
            "{}{}{}\x1b[3m * {}\x1b[22m {}{}",
            dt_str(),
            render_badges(msg),
            color_start,
            name,
            msg.text,
            RESET,
        );
    }

    let text = match msg.bg_color() {
        Some(color) => format!("{}{}{}", bg(color), msg.text, RESET),
        None => msg.text.clone(),
    };
    format!(
        "{}{}<{}{}{}> {}",
        dt_str(),
        render_badges(msg),
        color_start,
        name,
        RESET,
        text,
    )
}

/// Colored transcript line for something the bot said.
pub fn render_output(bot_name: &str, text: &str) -> String {
    format!("{}<{}{}{}> {}", dt_str(), BOT_NAME_STYLE, bot_name, RESET, text)
}

enum LogCommand {
    Line(String),
    Flush(oneshot::Sender<()>),
}

/// Handle to the transcript writer. Cheap to clone; the writer task stops
/// once every handle is gone.
#[derive(Clone)]
pub struct SessionLog {
    dir: PathBuf,
    tx: mpsc::UnboundedSender<LogCommand>,
}

impl SessionLog {
    /// Spawns the writer task, so this must run inside a tokio runtime.
    /// With `echo`, every line is also printed, colors included.
    pub fn new(dir: impl Into<PathBuf>, echo: bool) -> Self {
        let dir = dir.into();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(dir.clone(), echo, rx));
        Self { dir, tx }
    }

    pub fn path_for_today(&self) -> PathBuf {
        log_path(&self.dir)
    }

    /// Queues `line`; lines reach the file in the order they were queued.
    pub fn write_message(&self, line: &str) -> Result<(), Error> {
        self.tx
            .send(LogCommand::Line(line.to_string()))
            .map_err(|_| writer_gone())
    }

    /// Resolves once every line queued before this call has been written.
    pub async fn flush(&self) -> Result<(), Error> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .send(LogCommand::Flush(done_tx))
            .map_err(|_| writer_gone())?;
        done_rx.await.map_err(|_| writer_gone())
    }
}

fn writer_gone() -> Error {
    Error::Io(std::io::Error::other("session log writer is not running"))
}

fn log_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.log", today_str()))
}

async fn run_writer(dir: PathBuf, echo: bool, mut rx: mpsc::UnboundedReceiver<LogCommand>) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            LogCommand::Line(line) => {
                if echo {
                    println!("{}", line);
                }
                if let Err(e) = append(&dir, &strip_ansi(&line)).await {
                    warn!("could not write session log: {}", e);
                }
            }
            LogCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

async fn append(dir: &Path, line: &str) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await?;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path(dir))
        .await?;
    file.write_all(format!("{}\n", line).as_bytes()).await?;
    file.flush().await
}
