// twitchbot-core/tests/irc_session.rs
//
// Drives whole IRC sessions over in-memory streams.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{split, AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::sync::{mpsc, watch, Mutex};
use tokio::time::timeout;

use twitchbot_core::builtin_commands::simple::TextReply;
use twitchbot_core::platforms::twitch_irc::TwitchIrcRuntime;
use twitchbot_core::services::SessionLog;
use twitchbot_core::test_utils::helpers::{test_config, FakeMsg};
use twitchbot_core::{Error, Registry};

/// The server's view of one connection.
struct Peer {
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Peer {
    async fn next_line(&mut self) -> Option<String> {
        timeout(Duration::from_secs(120), self.lines.next_line())
            .await
            .expect("timed out waiting for the bot")
            .expect("read from bot")
    }

    async fn send(&mut self, line: &str) {
        self.send_bytes(line.as_bytes()).await;
    }

    async fn send_bytes(&mut self, raw: &[u8]) {
        self.writer.write_all(raw).await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn expect_registration(&mut self) {
        assert_eq!(self.next_line().await.as_deref(), Some("PASS oauth:testtoken"));
        assert_eq!(self.next_line().await.as_deref(), Some("NICK testbot"));
        assert_eq!(self.next_line().await.as_deref(), Some("JOIN #testchannel"));
        assert_eq!(self.next_line().await.as_deref(), Some("CAP REQ :twitch.tv/tags"));
    }
}

/// A runtime whose connections come from the returned sender.
fn start_bot(
    registry: Registry,
) -> (
    mpsc::UnboundedSender<DuplexStream>,
    watch::Sender<bool>,
    tokio::task::JoinHandle<Result<(), Error>>,
    tempfile::TempDir,
) {
    let log_dir = tempfile::tempdir().unwrap();
    let session_log = Arc::new(SessionLog::new(log_dir.path(), false));
    let runtime = TwitchIrcRuntime::new(Arc::new(test_config()), registry, session_log);

    let (conn_tx, conn_rx) = mpsc::unbounded_channel::<DuplexStream>();
    let conn_rx = Arc::new(Mutex::new(conn_rx));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(runtime.run_with(
        move || {
            let conn_rx = conn_rx.clone();
            async move {
                conn_rx
                    .lock()
                    .await
                    .recv()
                    .await
                    .ok_or_else(|| Error::Platform("no more connections".into()))
            }
        },
        shutdown_rx,
    ));
    (conn_tx, shutdown_tx, task, log_dir)
}

fn connect(conn_tx: &mpsc::UnboundedSender<DuplexStream>) -> Peer {
    let (client, server) = tokio::io::duplex(64 * 1024);
    conn_tx.send(client).unwrap();
    let (read, writer) = split(server);
    Peer {
        lines: BufReader::new(read).lines(),
        writer,
    }
}

fn hello_registry() -> Registry {
    let mut registry = Registry::new();
    registry
        .command(&["!hello"], false, Arc::new(TextReply("hello {user}!")))
        .unwrap();
    registry
}

#[tokio::test]
async fn session_registers_answers_and_shuts_down() {
    let (conn_tx, shutdown_tx, task, _log_dir) = start_bot(hello_registry());
    let mut peer = connect(&conn_tx);
    peer.expect_registration().await;

    peer.send("PING :tmi.twitch.tv\r\n").await;
    assert_eq!(peer.next_line().await.as_deref(), Some("PONG :tmi.twitch.tv"));

    let config = test_config();
    peer.send(&FakeMsg::new(&config, "!hello").user("Viewer").build()).await;
    assert_eq!(
        peer.next_line().await.as_deref(),
        Some("PRIVMSG #testchannel :hello Viewer!")
    );

    // unhandled chat gets no reply; the next answer is for the next command
    peer.send(&FakeMsg::new(&config, "just chatting").build()).await;
    peer.send(&FakeMsg::new(&config, "!HELLO").user("Other").build()).await;
    assert_eq!(
        peer.next_line().await.as_deref(),
        Some("PRIVMSG #testchannel :hello Other!")
    );

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
    // the bot closed its side
    assert_eq!(peer.next_line().await, None);
}

#[tokio::test(start_paused = true)]
async fn reconnects_after_the_server_hangs_up() {
    let (conn_tx, shutdown_tx, task, _log_dir) = start_bot(hello_registry());

    let mut first = connect(&conn_tx);
    first.expect_registration().await;
    drop(first);

    let mut second = connect(&conn_tx);
    second.expect_registration().await;

    let config = test_config();
    second.send(&FakeMsg::new(&config, "!hello").user("Back").build()).await;
    assert_eq!(
        second.next_line().await.as_deref(),
        Some("PRIVMSG #testchannel :hello Back!")
    );

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_backoff() {
    let (conn_tx, shutdown_tx, task, _log_dir) = start_bot(hello_registry());

    let mut peer = connect(&conn_tx);
    peer.expect_registration().await;
    drop(peer);

    tokio::time::sleep(Duration::from_secs(1)).await;
    shutdown_tx.send(true).unwrap();
    timeout(Duration::from_secs(2), task)
        .await
        .expect("runtime stopped before the backoff elapsed")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn malformed_input_keeps_the_session() {
    let (conn_tx, shutdown_tx, task, _log_dir) = start_bot(hello_registry());
    let mut peer = connect(&conn_tx);
    peer.expect_registration().await;

    let config = test_config();
    let mut not_utf8 = FakeMsg::new(&config, "caf").build().trim_end().as_bytes().to_vec();
    not_utf8.extend_from_slice(b"\xe9\r\n");
    peer.send_bytes(&not_utf8).await;
    peer.send_bytes(b"\xff\xfe garbage\r\n").await;
    peer.send("@only-tags\r\n").await;
    peer.send("\r\n").await;

    peer.send(&FakeMsg::new(&config, "!hello").user("Viewer").build()).await;
    assert_eq!(
        peer.next_line().await.as_deref(),
        Some("PRIVMSG #testchannel :hello Viewer!")
    );

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn non_chat_lines_reach_line_patterns() {
    let mut registry = hello_registry();
    registry
        .on_line(r":tmi\.twitch\.tv USERNOTICE #\S+.*", Arc::new(TextReply("welcome!")))
        .unwrap();
    let (conn_tx, shutdown_tx, task, _log_dir) = start_bot(registry);
    let mut peer = connect(&conn_tx);
    peer.expect_registration().await;

    peer.send(":tmi.twitch.tv USERNOTICE #testchannel :hi\r\n").await;
    assert_eq!(
        peer.next_line().await.as_deref(),
        Some("PRIVMSG #testchannel :welcome!")
    );

    shutdown_tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}
