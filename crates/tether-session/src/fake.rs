//! In-memory transport that plays a remote host running tmux.

use std::{collections::BTreeMap, sync::Mutex};

use async_trait::async_trait;
use tether_core::{Error, RemoteOutput, SessionKey, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    Unreachable,
    NoTmux,
    /// Another client creates each session just before ours does.
    Racing,
}

#[derive(Debug, Default)]
struct Pane {
    pending: String,
    typed: Vec<String>,
    screen: Vec<String>,
}

#[derive(Debug, Default)]
struct State {
    connection_alive: bool,
    ensure_calls: usize,
    teardown_calls: usize,
    sessions: BTreeMap<String, Pane>,
    executed: Vec<String>,
    interactive: Vec<String>,
    attach_status: i32,
}

pub struct FakeTransport {
    mode: Mode,
    state: Mutex<State>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::with_mode(Mode::Normal)
    }

    pub fn unreachable() -> Self {
        Self::with_mode(Mode::Unreachable)
    }

    pub fn without_tmux() -> Self {
        Self::with_mode(Mode::NoTmux)
    }

    pub fn racing() -> Self {
        Self::with_mode(Mode::Racing)
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            state: Mutex::new(State::default()),
        }
    }

    pub fn executed(&self) -> Vec<String> {
        self.state.lock().unwrap().executed.clone()
    }

    pub fn interactive(&self) -> Vec<String> {
        self.state.lock().unwrap().interactive.clone()
    }

    pub fn sessions(&self) -> Vec<String> {
        self.state.lock().unwrap().sessions.keys().cloned().collect()
    }

    pub fn typed(&self, alias: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .sessions
            .get(alias)
            .map(|pane| pane.typed.clone())
            .unwrap_or_default()
    }

    pub fn ensure_calls(&self) -> usize {
        self.state.lock().unwrap().ensure_calls
    }

    pub fn teardown_calls(&self) -> usize {
        self.state.lock().unwrap().teardown_calls
    }

    pub fn set_attach_status(&self, status: i32) {
        self.state.lock().unwrap().attach_status = status;
    }

    fn connection_error(key: &SessionKey) -> Error {
        Error::Connection {
            target: key.connection_id(),
            detail: "ssh: connect to host: Connection refused".into(),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn ensure(&self, key: &SessionKey) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.ensure_calls += 1;
        if self.mode == Mode::Unreachable {
            return Err(Self::connection_error(key));
        }
        state.connection_alive = true;
        Ok(())
    }

    async fn is_alive(&self, _key: &SessionKey) -> bool {
        self.state.lock().unwrap().connection_alive
    }

    async fn exec(&self, key: &SessionKey, remote_command: &str) -> Result<RemoteOutput, Error> {
        let mut state = self.state.lock().unwrap();
        state.executed.push(remote_command.to_string());
        match self.mode {
            Mode::Unreachable => Err(Self::connection_error(key)),
            Mode::NoTmux => Ok(RemoteOutput {
                status: 127,
                stdout: String::new(),
                stderr: "sh: 1: tmux: not found".into(),
            }),
            Mode::Normal => Ok(run_script(&mut state, remote_command, false)),
            Mode::Racing => Ok(run_script(&mut state, remote_command, true)),
        }
    }

    async fn exec_interactive(
        &self,
        key: &SessionKey,
        remote_command: &str,
    ) -> Result<i32, Error> {
        let mut state = self.state.lock().unwrap();
        state.interactive.push(remote_command.to_string());
        if self.mode == Mode::Unreachable {
            return Err(Self::connection_error(key));
        }
        Ok(state.attach_status)
    }

    async fn teardown(&self, _key: &SessionKey) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.teardown_calls += 1;
        state.connection_alive = false;
        Ok(())
    }
}

/// `tmux a || tmux b`: run `b` only if `a` failed.
fn run_script(state: &mut State, script: &str, racing: bool) -> RemoteOutput {
    let words: Vec<String> = shlex::split(script)
        .unwrap()
        .into_iter()
        .filter(|w| w != "2>/dev/null")
        .collect();

    let mut last = RemoteOutput::default();
    for alternative in words.split(|w| w == "||") {
        last = run_chain(state, alternative, racing);
        if last.success() {
            break;
        }
    }
    last
}

/// `tmux a ... \; b ...`: run each tmux command until one fails.
fn run_chain(state: &mut State, words: &[String], racing: bool) -> RemoteOutput {
    assert_eq!(words.first().map(String::as_str), Some("tmux"), "{words:?}");

    let mut last = RemoteOutput::default();
    for command in split_commands(&words[1..]) {
        last = run_tmux(state, &command, racing);
        if !last.success() {
            break;
        }
    }
    last
}

/// tmux's argv rule: a trailing `;` ends a command, a trailing `\;` is a
/// literal semicolon.
fn split_commands(words: &[String]) -> Vec<Vec<String>> {
    let mut commands = vec![Vec::new()];
    for word in words {
        let current = commands.last_mut().unwrap();
        match word.strip_suffix(';') {
            Some(head) => {
                if let Some(literal) = head.strip_suffix('\\') {
                    current.push(format!("{literal};"));
                } else {
                    if !head.is_empty() {
                        current.push(head.to_string());
                    }
                    commands.push(Vec::new());
                }
            }
            None => current.push(word.clone()),
        }
    }
    commands.retain(|c| !c.is_empty());
    commands
}

fn run_tmux(state: &mut State, args: &[String], racing: bool) -> RemoteOutput {
    let target = flag_value(args, "-t").map(|t| t.trim_start_matches('=').trim_end_matches(':'));
    let fail = |msg: String| RemoteOutput {
        status: 1,
        stdout: String::new(),
        stderr: msg,
    };
    let ok = |stdout: String| RemoteOutput {
        status: 0,
        stdout,
        stderr: String::new(),
    };

    match args[0].as_str() {
        "has-session" => {
            let name = target.unwrap();
            if state.sessions.contains_key(name) {
                ok(String::new())
            } else {
                fail(format!("can't find session: {name}"))
            }
        }
        "new-session" => {
            let name = flag_value(args, "-s").unwrap().to_string();
            if racing {
                state.sessions.entry(name.clone()).or_default();
            }
            if state.sessions.contains_key(&name) {
                return fail(format!("duplicate session: {name}"));
            }
            state.sessions.insert(name, Pane::default());
            ok(String::new())
        }
        "send-keys" => {
            let name = target.unwrap();
            let Some(pane) = state.sessions.get_mut(name) else {
                return fail(format!("can't find pane: {name}"));
            };
            let literal = args.iter().any(|a| a == "-l");
            let keys = positional(args);
            if literal {
                pane.pending.push_str(&keys.join(" "));
            } else {
                for key in keys {
                    if key == "Enter" {
                        let line = std::mem::take(&mut pane.pending);
                        pane.screen.push(format!("$ {line}"));
                        if let Some(rest) = line.strip_prefix("echo ") {
                            pane.screen.push(shlex::split(rest).unwrap().join(" "));
                        }
                        pane.typed.push(line);
                    }
                }
            }
            ok(String::new())
        }
        "capture-pane" => {
            let name = target.unwrap();
            match state.sessions.get(name) {
                Some(pane) => {
                    let mut text = pane.screen.join("\n");
                    text.push_str("\n\n\n\n");
                    ok(text)
                }
                None => fail(format!("can't find pane: {name}")),
            }
        }
        "kill-session" => {
            let name = target.unwrap();
            if state.sessions.remove(name).is_some() {
                ok(String::new())
            } else {
                fail(format!("can't find session: {name}"))
            }
        }
        other => fail(format!("unknown command: {other}")),
    }
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// Arguments after the option block (`--` ends it explicitly).
fn positional(args: &[String]) -> Vec<String> {
    if let Some(i) = args.iter().position(|a| a == "--") {
        return args[i + 1..].to_vec();
    }
    let mut rest = Vec::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-t" => i += 2,
            a if a.starts_with('-') => i += 1,
            a => {
                rest.push(a.to_string());
                i += 1;
            }
        }
    }
    rest
}
