//! Typed worker command lines
//!
//! Commands are assembled as ordered flag/value pairs and only turned into a
//! string at the very end, so a flag can never be silently dropped by a
//! misplaced string concatenation.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Environment-expanded location of the cache credentials file written by the
/// job preparation task.
pub const REDIS_ARGUMENTS_FILE: &str =
    "$AZ_BATCH_JOB_PREP_WORKING_DIR/azfinsim.$AZ_BATCH_JOB_ID.args";

/// How the worker is launched inside its container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "module")]
pub enum Launcher {
    /// `python3 -m <module>` wrapped in a shell so environment variables expand
    PythonModule(String),
    /// Arguments handed straight to the container entrypoint
    ContainerEntrypoint,
}

/// One element of a worker command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandArg {
    /// A bare switch such as `-p`
    Flag(String),
    /// A flag followed by a value that is quoted when rendered
    Value { flag: String, value: String },
    /// A flag followed by a value left for the worker shell to expand
    Expanded { flag: String, value: String },
}

/// Where pricing and generator tasks read and write trades.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheSource {
    /// Redis cache whose connection arguments sit in the job-prep directory
    Redis,
    /// Shared filesystem path
    Filesystem { path: String },
}

impl CacheSource {
    pub fn filesystem(path: impl Into<String>) -> Self {
        Self::Filesystem { path: path.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerCommand {
    launcher: Launcher,
    args: Vec<CommandArg>,
}

impl WorkerCommand {
    /// Whether `flag` appears anywhere in the command.
    pub fn has_flag(&self, flag: &str) -> bool {
        self.args.iter().any(|arg| match arg {
            CommandArg::Flag(f) => f == flag,
            CommandArg::Value { flag: f, .. } | CommandArg::Expanded { flag: f, .. } => f == flag,
        })
    }

    /// Value passed with `flag`, if any.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            CommandArg::Value { flag: f, value } | CommandArg::Expanded { flag: f, value }
                if f == flag =>
            {
                Some(value.as_str())
            }
            _ => None,
        })
    }

    /// Render the command line in the form the batch service expects.
    pub fn render(&self) -> String {
        let args = self
            .args
            .iter()
            .map(render_arg)
            .collect::<Vec<_>>()
            .join(" ");

        match &self.launcher {
            Launcher::PythonModule(module) => {
                let inner = if args.is_empty() {
                    format!("python3 -m {}", module)
                } else {
                    format!("python3 -m {} {}", module, args)
                };
                format!("/bin/sh -c \"{}\"", inner.replace('"', "\\\""))
            }
            Launcher::ContainerEntrypoint => args,
        }
    }
}

fn render_arg(arg: &CommandArg) -> String {
    match arg {
        CommandArg::Flag(flag) => flag.clone(),
        CommandArg::Value { flag, value } => format!("{} {}", flag, shell_words::quote(value)),
        CommandArg::Expanded { flag, value } => format!("{} {}", flag, value),
    }
}

pub struct WorkerCommandBuilder {
    command: WorkerCommand,
}

impl WorkerCommandBuilder {
    pub fn python_module(module: &str) -> Self {
        Self::with_launcher(Launcher::PythonModule(module.to_string()))
    }

    pub fn entrypoint() -> Self {
        Self::with_launcher(Launcher::ContainerEntrypoint)
    }

    fn with_launcher(launcher: Launcher) -> Self {
        Self {
            command: WorkerCommand {
                launcher,
                args: Vec::new(),
            },
        }
    }

    pub fn flag(mut self, flag: &str) -> Self {
        self.command.args.push(CommandArg::Flag(flag.to_string()));
        self
    }

    pub fn value(mut self, flag: &str, value: impl Display) -> Self {
        self.command.args.push(CommandArg::Value {
            flag: flag.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn expanded(mut self, flag: &str, value: impl Display) -> Self {
        self.command.args.push(CommandArg::Expanded {
            flag: flag.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn cache(self, source: &CacheSource) -> Self {
        match source {
            CacheSource::Redis => self
                .value("--cache-type", "redis")
                .expanded("--arguments", REDIS_ARGUMENTS_FILE),
            CacheSource::Filesystem { path } => self
                .value("--cache-type", "filesystem")
                .value("--cache-path", path),
        }
    }

    pub fn build(self) -> WorkerCommand {
        self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_python_module() {
        let cmd = WorkerCommandBuilder::python_module("azfinsim")
            .value("--start-trade", 0)
            .value("--trade-window", 250)
            .build();

        assert_eq!(
            cmd.render(),
            "/bin/sh -c \"python3 -m azfinsim --start-trade 0 --trade-window 250\""
        );
    }

    #[test]
    fn test_redis_arguments_stay_unquoted() {
        let cmd = WorkerCommandBuilder::python_module("azfinsim")
            .cache(&CacheSource::Redis)
            .build();

        let rendered = cmd.render();
        assert!(rendered.contains(
            "--arguments $AZ_BATCH_JOB_PREP_WORKING_DIR/azfinsim.$AZ_BATCH_JOB_ID.args"
        ));
        assert_eq!(cmd.value_of("--cache-type"), Some("redis"));
    }

    #[test]
    fn test_values_with_spaces_are_quoted() {
        let cmd = WorkerCommandBuilder::python_module("azfinsim.merge")
            .cache(&CacheSource::filesystem("/mnt/shared/my run"))
            .build();

        assert!(cmd.render().contains("--cache-path '/mnt/shared/my run'"));
    }

    #[test]
    fn test_entrypoint_renders_bare_arguments() {
        let cmd = WorkerCommandBuilder::entrypoint()
            .flag("-p")
            .value("-s", 30)
            .build();

        assert_eq!(cmd.render(), "-p -s 30");
        assert!(cmd.has_flag("-p"));
        assert!(!cmd.has_flag("-i"));
    }
}
