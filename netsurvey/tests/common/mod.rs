#![allow(dead_code)]
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::rc::Rc;

/// In-memory modem that answers each command with a scripted response and
/// panics on any command it did not expect.
#[derive(Clone, Default)]
pub struct ScriptedPort {
    state: Rc<RefCell<State>>,
}

#[derive(Default)]
struct State {
    script: VecDeque<(String, String)>,
    line: Vec<u8>,
    pending: VecDeque<u8>,
    sent: Vec<String>,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects `command` next and answers with `lines` followed by `OK`.
    pub fn ok(self, command: &str, lines: &[&str]) -> Self {
        let mut response = String::new();
        for line in lines {
            response.push_str(&format!("\r\n{line}\r\n"));
        }
        response.push_str("\r\nOK\r\n");
        self.raw(command, &response)
    }

    /// Expects `command` next and answers with the given final result code.
    pub fn fail(self, command: &str, result_code: &str) -> Self {
        self.raw(command, &format!("\r\n{result_code}\r\n"))
    }

    pub fn raw(self, command: &str, response: &str) -> Self {
        self.state
            .borrow_mut()
            .script
            .push_back((command.to_string(), response.to_string()));
        self
    }

    pub fn sent(&self) -> Vec<String> {
        self.state.borrow().sent.clone()
    }

    pub fn assert_done(&self) {
        let state = self.state.borrow();
        assert!(
            state.script.is_empty(),
            "commands never sent: {:?}",
            state.script.iter().map(|(c, _)| c).collect::<Vec<_>>()
        );
    }
}

impl Read for ScriptedPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        if state.pending.is_empty() {
            return Err(io::ErrorKind::TimedOut.into());
        }

        let n = buf.len().min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }

        Ok(n)
    }
}

impl Write for ScriptedPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();
        state.line.extend_from_slice(buf);

        while let Some(pos) = state.line.iter().position(|b| *b == b'\r') {
            let raw: Vec<u8> = state.line.drain(..=pos).collect();
            let command = String::from_utf8_lossy(&raw[..raw.len() - 1]).to_string();

            let (expected, response) = state
                .script
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected command {command:?}"));
            assert_eq!(command, expected, "unexpected command");

            state.sent.push(command);
            state.pending.extend(response.bytes());
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
