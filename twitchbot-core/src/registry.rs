//! src/registry.rs
//!
//! Tables mapping commands, patterns, channel-points rewards, bits amounts
//! and timers to handlers. Built once at startup by explicit registration
//! calls, then shared read-only behind an `Arc`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use twitchbot_common::error::Error;

use crate::context::HandlerContext;
use crate::message::ChatMessage;

/// Leading command token of a chat body: one or more `!` and a word.
static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<cmd>!+\w+)").expect("static command regex"));

/// Command-shaped tokens inside a registered pattern's source.
static COMMAND_PATTERN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!+\w+").expect("static command pattern regex"));

/// A unit of bot behavior. `Ok(None)` means "handled, nothing to say".
///
/// The returned text is rendered once more against the triggering message,
/// so any chat-supplied text interpolated into it must go through
/// [`crate::template::esc`] first.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn invoke(&self, ctx: &HandlerContext, msg: &ChatMessage) -> Result<Option<String>, Error>;
}

/// What a pattern is matched against.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// The whole raw line (tags and prefix included), anchored at both ends.
    Line(Regex),
    /// The chat body, anchored at its start.
    Message(Regex),
}

impl Pattern {
    pub fn line(source: &str) -> Result<Self, Error> {
        Ok(Pattern::Line(Regex::new(&format!("^(?:{})$", source))?))
    }

    pub fn message(source: &str) -> Result<Self, Error> {
        Ok(Pattern::Message(Regex::new(&format!("^(?:{})", source))?))
    }

    /// `msg` is `None` for lines that are not chat messages; only `Line`
    /// patterns can match those. `/me` actions never match a `Message`
    /// pattern.
    fn is_match(&self, line: &str, msg: Option<&ChatMessage>) -> bool {
        match self {
            Pattern::Line(re) => re.is_match(line),
            Pattern::Message(re) => msg.is_some_and(|m| !m.is_action && re.is_match(&m.text)),
        }
    }
}

struct PatternEntry {
    source: String,
    pattern: Pattern,
    handler: Arc<dyn Handler>,
}

/// A handler driven by a timer instead of chat input.
#[derive(Clone)]
pub struct PeriodicEntry {
    pub interval: Duration,
    pub handler: Arc<dyn Handler>,
}

/// Which rule produced a match. Mostly useful for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ChannelPoints(String),
    Bits(u64),
    Command(String),
    Pattern(usize),
}

pub enum Resolution {
    Handler {
        handler: Arc<dyn Handler>,
        message: ChatMessage,
        route: Route,
    },
    /// A line pattern matched a line that is not a chat message.
    Line {
        handler: Arc<dyn Handler>,
        line: String,
        route: Route,
    },
    /// A channel-points redemption with no registered reward handler.
    UnhandledReward { reward_id: String, message: ChatMessage },
    Unhandled,
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Handler { route, .. } => write!(f, "Handler({:?})", route),
            Resolution::Line { route, .. } => write!(f, "Line({:?})", route),
            Resolution::UnhandledReward { reward_id, .. } => {
                write!(f, "UnhandledReward({})", reward_id)
            }
            Resolution::Unhandled => write!(f, "Unhandled"),
        }
    }
}

/// Collapses a run of leading `!` to one and lowercases: `!!Foo` -> `!foo`.
pub fn normalize_command(cmd: &str) -> String {
    format!("!{}", cmd.trim_start_matches('!').to_lowercase())
}

#[derive(Default)]
pub struct Registry {
    commands: HashMap<String, Arc<dyn Handler>>,
    patterns: Vec<PatternEntry>,
    channel_points: HashMap<String, Arc<dyn Handler>>,
    bits: HashMap<u64, Arc<dyn Handler>>,
    secret: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
    periodic: Vec<PeriodicEntry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern against the whole raw line, chat message or not.
    pub fn on_line(&mut self, source: &str, handler: Arc<dyn Handler>) -> Result<(), Error> {
        let pattern = Pattern::line(source)?;
        self.push_pattern(source, pattern, handler);
        Ok(())
    }

    /// Pattern against the start of the chat body.
    pub fn on_message(&mut self, source: &str, handler: Arc<dyn Handler>) -> Result<(), Error> {
        let pattern = Pattern::message(source)?;
        self.push_pattern(source, pattern, handler);
        Ok(())
    }

    fn push_pattern(&mut self, source: &str, pattern: Pattern, handler: Arc<dyn Handler>) {
        debug!("registering pattern #{} => {}", self.patterns.len(), source);
        self.patterns.push(PatternEntry {
            source: source.to_string(),
            pattern,
            handler,
        });
    }

    /// Registers one handler under every name in `names`. The first name is
    /// canonical; the rest are secret. With `secret`, all of them are.
    pub fn command(
        &mut self,
        names: &[&str],
        secret: bool,
        handler: Arc<dyn Handler>,
    ) -> Result<(), Error> {
        let Some((first, rest)) = names.split_first() else {
            return Err(Error::Registry("command needs at least one name".into()));
        };

        let keys: Vec<String> = names.iter().map(|n| normalize_command(n)).collect();
        if let Some(dup) = keys.iter().find(|k| self.commands.contains_key(*k)) {
            return Err(Error::Registry(format!("command '{}' already registered", dup)));
        }

        for key in &keys {
            self.commands.insert(key.clone(), handler.clone());
        }
        if secret {
            self.secret.extend(keys.iter().cloned());
        } else {
            self.secret.extend(keys.iter().skip(1).cloned());
        }

        let canonical = normalize_command(first);
        for alias in rest {
            self.aliases.insert(normalize_command(alias), canonical.clone());
        }
        debug!("registered command {:?} (secret={})", keys, secret);
        Ok(())
    }

    /// Extra names for an already registered command. Aliases are secret.
    pub fn alias(&mut self, canonical: &str, aliases: &[&str]) -> Result<(), Error> {
        let canonical = normalize_command(canonical);
        let handler = self
            .commands
            .get(&canonical)
            .cloned()
            .ok_or_else(|| Error::Registry(format!("cannot alias unknown command '{}'", canonical)))?;

        for alias in aliases {
            let key = normalize_command(alias);
            if self.commands.contains_key(&key) {
                return Err(Error::Registry(format!("command '{}' already registered", key)));
            }
            self.commands.insert(key.clone(), handler.clone());
            self.secret.insert(key.clone());
            self.aliases.insert(key, canonical.clone());
        }
        Ok(())
    }

    pub fn channel_points(&mut self, reward_id: &str, handler: Arc<dyn Handler>) -> Result<(), Error> {
        if reward_id.is_empty() {
            return Err(Error::Registry("reward id must not be empty".into()));
        }
        if self.channel_points.insert(reward_id.to_string(), handler).is_some() {
            return Err(Error::Registry(format!("reward '{}' already registered", reward_id)));
        }
        Ok(())
    }

    /// Handler for donations whose amount ends in `bits_mod` (0..=99).
    pub fn bits(&mut self, bits_mod: u64, handler: Arc<dyn Handler>) -> Result<(), Error> {
        if bits_mod >= 100 {
            return Err(Error::Registry(format!("bits suffix {} is not below 100", bits_mod)));
        }
        if self.bits.insert(bits_mod, handler).is_some() {
            return Err(Error::Registry(format!("bits suffix {} already registered", bits_mod)));
        }
        Ok(())
    }

    pub fn periodic(&mut self, interval: Duration, handler: Arc<dyn Handler>) -> Result<(), Error> {
        if interval.is_zero() {
            return Err(Error::Registry("periodic interval must be positive".into()));
        }
        self.periodic.push(PeriodicEntry { interval, handler });
        Ok(())
    }

    pub fn periodic_entries(&self) -> &[PeriodicEntry] {
        &self.periodic
    }

    pub fn is_secret(&self, cmd: &str) -> bool {
        self.secret.contains(&normalize_command(cmd))
    }

    /// Canonical name behind an alias, if `cmd` is one.
    pub fn canonical_for(&self, cmd: &str) -> Option<&str> {
        self.aliases.get(&normalize_command(cmd)).map(String::as_str)
    }

    /// Every non-secret command: command-shaped tokens found in pattern
    /// sources plus the command table, sorted, with `!help` first.
    pub fn visible_commands(&self) -> Vec<String> {
        let mut possible: BTreeSet<String> = self
            .patterns
            .iter()
            .filter_map(|entry| COMMAND_PATTERN_RE.find(&entry.source))
            .map(|m| m.as_str().to_string())
            .collect();
        possible.extend(self.commands.keys().cloned());

        let mut visible = vec!["!help".to_string()];
        visible.extend(
            possible
                .into_iter()
                .filter(|cmd| !self.secret.contains(cmd) && cmd != "!help"),
        );
        visible
    }

    /// Picks the single handler for `line`, in strict order: channel-points
    /// reward, bits suffix, command table, then patterns in registration
    /// order. Lines that are not chat messages only go through the line
    /// patterns.
    pub fn resolve(&self, line: &str) -> Resolution {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some(message) = ChatMessage::parse(line) else {
            return match self.match_pattern(line, None) {
                Some((i, handler)) => Resolution::Line {
                    handler,
                    line: line.to_string(),
                    route: Route::Pattern(i),
                },
                None => Resolution::Unhandled,
            };
        };

        if let Some(reward_id) = message.tag("custom-reward-id").filter(|id| !id.is_empty()) {
            let reward_id = reward_id.to_string();
            return match self.channel_points.get(&reward_id) {
                Some(handler) => Resolution::Handler {
                    handler: handler.clone(),
                    message,
                    route: Route::ChannelPoints(reward_id),
                },
                None => Resolution::UnhandledReward { reward_id, message },
            };
        }

        if let Some(bits) = message.bits() {
            if let Some(handler) = self.bits.get(&(bits % 100)) {
                return Resolution::Handler {
                    handler: handler.clone(),
                    message,
                    route: Route::Bits(bits),
                };
            }
        }

        let command = COMMAND_RE
            .captures(message.text.trim())
            .filter(|_| !message.is_action)
            .map(|caps| normalize_command(&caps["cmd"]));
        if let Some(cmd) = command {
            if let Some(handler) = self.commands.get(&cmd) {
                return Resolution::Handler {
                    handler: handler.clone(),
                    message,
                    route: Route::Command(cmd),
                };
            }
        }

        match self.match_pattern(line, Some(&message)) {
            Some((i, handler)) => Resolution::Handler {
                handler,
                message,
                route: Route::Pattern(i),
            },
            None => Resolution::Unhandled,
        }
    }

    fn match_pattern(&self, line: &str, message: Option<&ChatMessage>) -> Option<(usize, Arc<dyn Handler>)> {
        self.patterns
            .iter()
            .enumerate()
            .find(|(_, entry)| entry.pattern.is_match(line, message))
            .map(|(i, entry)| (i, entry.handler.clone()))
    }
}
