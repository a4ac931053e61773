//! # Timed script interpreter module
//!
//! This module provides an interpreter for timed command scripts. A script is
//! a list of entries of the form
//!
//! ```text
//! <start time in seconds>: <JSON command>;
//! ```
//!
//! The JSON payload is deserialised into the caller's command type, so the
//! same interpreter serves any executable which is driven from a script.
//! Anything outside of an entry (blank lines, `#` comments) is ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::fs;
use regex::RegexBuilder;
use serde::de::DeserializeOwned;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A command which is scripted to occur at a specific time.
#[derive(Debug, Clone, PartialEq)]
pub struct Command<C> {
    /// The time the command is supposed to execute at
    pub exec_time_s: f64,

    /// The command to run
    pub cmd: C
}

/// A script interpreter.
///
/// After initialising with the path to the script to run use `.pop_next` to
/// walk the script in order.
#[derive(Debug)]
pub struct ScriptInterpreter<C> {
    cmds: VecDeque<Command<C>>
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0}")]
    ScriptNotFound(String),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error(
        "Script contains an invalid timestamp: {0}. \
        Should be a float (like 1.0)")]
    InvalidTimestamp(String),

    #[error("Script contains an invalid command at {0} s: {1}")]
    InvalidCommand(f64, serde_json::Error),

    #[error("Script command at {0} s starts before the previous command at {1} s")]
    OutOfOrder(f64, f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C> ScriptInterpreter<C>
where
    C: DeserializeOwned
{

    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {

        // Get the path in a buffer
        let path = PathBuf::from(script_path.as_ref());
        
        // Check that the script file exists.
        if !path.exists() {
            return Err(
                ScriptError::ScriptNotFound(path.display().to_string()));
        }

        // Load the script into a string
        let script = fs::read_to_string(&path)
            .map_err(ScriptError::ScriptLoadError)?;

        Self::from_str(&script)
    }

    /// Create a new interpreter from the contents of a script.
    pub fn from_str(script: &str) -> Result<Self, ScriptError> {

        // Empty queue of commands
        let mut cmd_queue: VecDeque<Command<C>> = VecDeque::new();

        // Go through the script executing __the magic regex__.
        let re = RegexBuilder::
            new(r"^\s*(\d+(\.\d+)?)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .expect("script regex is valid");

        for cap in re.captures_iter(script) {
            // Both groups are mandatory in the regex so they always exist
            let time_str = &cap[1];
            let payload = &cap[3];

            // Parse the exec time
            let exec_time_s: f64 = time_str.parse()
                .map_err(|e| ScriptError::InvalidTimestamp(format!("{}", e)))?;

            // Scripts must be written in time order, otherwise a command
            // would silently wait behind a later one
            if let Some(prev) = cmd_queue.back() {
                if exec_time_s < prev.exec_time_s {
                    return Err(ScriptError::OutOfOrder(exec_time_s, prev.exec_time_s))
                }
            }

            // Parse the command from the payload. The scripts contain JSON only.
            let cmd: C = serde_json::from_str(payload)
                .map_err(|e| ScriptError::InvalidCommand(exec_time_s, e))?;

            cmd_queue.push_back(Command {
                exec_time_s,
                cmd
            });
        }

        if cmd_queue.is_empty() {
            return Err(ScriptError::ScriptEmpty)
        }

        Ok(ScriptInterpreter {
            cmds: cmd_queue
        })
    }
}

impl<C> ScriptInterpreter<C> {

    /// Take the next command in the script, regardless of its start time.
    pub fn pop_next(&mut self) -> Option<Command<C>> {
        self.cmds.pop_front()
    }

    /// Get the number of commands left in the script
    pub fn get_num_cmds(&self) -> usize {
        self.cmds.len()
    }

    /// Get the start time of the last command in seconds
    pub fn get_duration(&self) -> f64 {
        match self.cmds.back() {
            Some(c) => c.exec_time_s,
            None => 0f64
        }
    }

}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
    enum TestCmd {
        Go { x: f64 },
        Halt
    }

    const SCRIPT: &str = "
        # warm up
        0.0: {\"type\": \"GO\", \"x\": 1.5};
        1.5: {\"type\": \"HALT\"};
        2: {\"type\": \"GO\", \"x\": -3};
    ";

    #[test]
    fn test_parse_script() {
        let mut si: ScriptInterpreter<TestCmd> = ScriptInterpreter::from_str(SCRIPT).unwrap();

        assert_eq!(si.get_num_cmds(), 3);
        assert_eq!(si.get_duration(), 2.0);
        assert_eq!(si.pop_next(), Some(Command { exec_time_s: 0.0, cmd: TestCmd::Go { x: 1.5 } }));
    }

    #[test]
    fn test_bad_scripts() {
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::from_str("# nothing here"),
            Err(ScriptError::ScriptEmpty)
        ));
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::from_str("1.0: {\"type\": \"JUMP\"};"),
            Err(ScriptError::InvalidCommand(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::from_str(
                "2.0: {\"type\": \"HALT\"};\n1.0: {\"type\": \"HALT\"};"
            ),
            Err(ScriptError::OutOfOrder(_, _))
        ));
        assert!(matches!(
            ScriptInterpreter::<TestCmd>::new("/definitely/not/a/script.txt"),
            Err(ScriptError::ScriptNotFound(_))
        ));
    }
}
