//! Configuration loading helpers for the `bridgecheck` CLI.
//!
//! The logic here filters CLI arguments destined for `ortho-config` so the
//! loader only receives supported flags while clap parses the remaining
//! command tokens.

use std::ffi::{OsStr, OsString};

use bridgecheck_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

/// Configuration flags that take a value.
///
/// Keep in sync with the fields of [`Config`].
const CONFIG_VALUE_FLAGS: &[&str] = &[
    "--config-path",
    "--plan-path",
    "--log-filter",
    "--log-format",
    "--install-root-var",
    "--host-plugin",
    "--guest-tag",
    "--interpreter",
    "--step-timeout-secs",
];

/// Configuration flags that stand alone.
const CONFIG_SWITCHES: &[&str] = &["--require-plugin"];

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags must appear before the subcommand. Flags after it
    /// are handed to clap, which rejects them.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn process_config_flag(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }

    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };

    if CONFIG_SWITCHES.contains(&flag) {
        return FlagAction::Include { needs_value: false };
    }
    if CONFIG_VALUE_FLAGS.contains(&flag) {
        return FlagAction::Include {
            needs_value: !has_inline_value,
        };
    }
    FlagAction::Skip
}

/// Arguments partitioned between the configuration loader and clap.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by the leading configuration flags.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by everything after the configuration flags.
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some((program, rest)) = args.split_first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_arguments: Vec::new(),
        };
    };

    let mut config_arguments = vec![program.clone()];
    let mut consumed = 0usize;
    let mut pending_value = false;
    for argument in rest {
        if pending_value {
            pending_value = false;
        } else {
            match process_config_flag(argument) {
                FlagAction::Include { needs_value } => pending_value = needs_value,
                FlagAction::Skip => break,
            }
        }
        config_arguments.push(argument.clone());
        consumed += 1;
    }

    let command_arguments = std::iter::once(program)
        .chain(rest.iter().skip(consumed))
        .cloned()
        .collect();
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline_value("--log-filter=debug", FlagAction::Include { needs_value: false })]
    #[case::separate_value("--log-filter", FlagAction::Include { needs_value: true })]
    #[case::switch("--require-plugin", FlagAction::Include { needs_value: false })]
    #[case::subcommand("run", FlagAction::Skip)]
    #[case::unknown("--unknown", FlagAction::Skip)]
    #[case::help("--help", FlagAction::Skip)]
    fn classifies_flags(#[case] argument: &str, #[case] expected: FlagAction) {
        assert_eq!(process_config_flag(OsStr::new(argument)), expected);
    }

    #[test]
    fn leading_config_flags_go_to_the_loader() {
        let args = os_args(&[
            "bridgecheck",
            "--plan-path",
            "suite.json",
            "--require-plugin",
            "--log-format=json",
            "plan",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&[
                "bridgecheck",
                "--plan-path",
                "suite.json",
                "--require-plugin",
                "--log-format=json",
            ])
        );
        assert_eq!(split.command_arguments, os_args(&["bridgecheck", "plan"]));
    }

    #[test]
    fn flags_after_the_subcommand_stay_with_clap() {
        let args = os_args(&["bridgecheck", "run", "--plan-path", "suite.json"]);
        let split = split_config_arguments(&args);
        assert_eq!(split.config_arguments, os_args(&["bridgecheck"]));
        assert_eq!(split.command_arguments, args);
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert!(split.command_arguments.is_empty());
    }
}
