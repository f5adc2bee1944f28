use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use respawn::probe::LivenessProber;

/// A fake prober answering from per-command scripts.
///
/// Each `is_alive` call pops the next scripted answer for that command line;
/// once the script is exhausted the command's steady state is used, and
/// `default` for commands never mentioned.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    default: bool,
    scripts: Mutex<HashMap<String, VecDeque<bool>>>,
    steady: Mutex<HashMap<String, bool>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedProber {
    /// Every command is reported dead unless scripted otherwise.
    pub fn all_dead() -> Self {
        Self::default()
    }

    /// Every command is reported alive unless scripted otherwise.
    pub fn all_alive() -> Self {
        Self {
            default: true,
            ..Self::default()
        }
    }

    /// Queue answers for `command_line`, consumed one per call.
    pub fn script(&self, command_line: &str, answers: &[bool]) {
        self.scripts
            .lock()
            .unwrap()
            .entry(command_line.to_string())
            .or_default()
            .extend(answers.iter().copied());
    }

    /// Answer used for `command_line` after its script runs out.
    pub fn set_alive(&self, command_line: &str, alive: bool) {
        self.steady
            .lock()
            .unwrap()
            .insert(command_line.to_string(), alive);
    }

    /// Command lines probed so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, command_line: &str) -> bool {
        self.calls.lock().unwrap().push(command_line.to_string());

        if let Some(answer) = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(command_line)
            .and_then(|q| q.pop_front())
        {
            return answer;
        }

        self.steady
            .lock()
            .unwrap()
            .get(command_line)
            .copied()
            .unwrap_or(self.default)
    }
}

impl LivenessProber for ScriptedProber {
    fn is_alive<'a>(
        &'a self,
        command_line: &'a str,
    ) -> Pin<Box<dyn Future<Output = bool> + Send + 'a>> {
        let alive = self.answer(command_line);
        Box::pin(async move { alive })
    }
}
