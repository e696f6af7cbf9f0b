//! Argv-style command specification.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

/// Specification for a command to execute.
///
/// Arguments are stored as discrete `OsString` elements, never shell
/// strings, so shell metacharacters in test labels or paths are inert.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub cwd: Option<PathBuf>,
    pub env: Option<HashMap<OsString, OsString>>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: None,
        }
    }

    /// Add a single argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add an environment override.
    #[must_use]
    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Build a `std::process::Command` from this spec.
    #[must_use]
    pub fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        if let Some(env) = &self.env {
            command.envs(env);
        }
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args() {
        let cmd = CommandSpec::new("runner")
            .arg("--flag")
            .args(["a", "b"])
            .cwd("/tmp");
        assert_eq!(cmd.program, OsString::from("runner"));
        assert_eq!(cmd.args.len(), 3);
        assert_eq!(cmd.cwd, Some(PathBuf::from("/tmp")));
    }

    #[test]
    fn test_shell_metacharacters_stay_inert() {
        let cmd = CommandSpec::new("echo").arg("hello; rm -rf /");
        // One discrete argument; nothing for a shell to interpret.
        assert_eq!(cmd.args, [OsString::from("hello; rm -rf /")]);
    }

    #[test]
    fn test_env_overrides_accumulate() {
        let cmd = CommandSpec::new("t").env("A", "1").env("B", "2");
        let env = cmd.env.as_ref().unwrap();
        assert_eq!(env.len(), 2);
        assert_eq!(env[&OsString::from("A")], OsString::from("1"));
    }

    #[test]
    fn test_to_command_preserves_program() {
        let cmd = CommandSpec::new("echo").arg("hi");
        let command = cmd.to_command();
        assert_eq!(command.get_program(), "echo");
    }
}
