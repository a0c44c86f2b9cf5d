//! Diagnostic error types for rich error reporting via miette.
//!
//! Every fatal condition in the startup negotiation unwinds through one of
//! these types to the top-level CLI driver, which prints the diagnostic and
//! exits non-zero. Transient conditions (missing inspection tooling, signals
//! to already-dead processes, failed probes) are never represented here.

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal outcomes of port-conflict resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum ConflictError {
    #[error("startup aborted")]
    #[diagnostic(
        code(portside::conflicts::aborted),
        help("no processes were harmed; resolve the conflicting ports and re-run")
    )]
    Aborted,

    #[error("declined to kill the processes using port {port}")]
    #[diagnostic(
        code(portside::conflicts::kill_declined),
        help("free the port yourself, or re-run and pick a different port")
    )]
    KillDeclined { port: u16 },

    #[error("--kill requires confirmation in non-interactive sessions")]
    #[diagnostic(
        code(portside::conflicts::kill_not_confirmed),
        help("pass --yes to confirm killing conflicting processes without a terminal")
    )]
    KillNotConfirmed,

    #[error("cannot resolve port conflicts without a terminal")]
    #[diagnostic(
        code(portside::conflicts::no_terminal),
        help("re-run with --kill --yes to terminate conflicting processes unattended")
    )]
    NoTerminal,

    #[error("port {port} is still in use after killing {}", listeners.join(", "))]
    #[diagnostic(
        code(portside::conflicts::still_in_use),
        help("a listener refused to die; inspect it manually (e.g. lsof -i :{port})")
    )]
    PortStillInUse { port: u16, listeners: Vec<String> },
}

/// Fatal outcomes of local-stack coordination.
#[derive(Debug, Error, Diagnostic)]
pub enum StackError {
    #[error("the local stack is required in local mode")]
    #[diagnostic(
        code(portside::stack::start_declined),
        help("start the stack yourself, or run with --mode dev to target a remote backend")
    )]
    StartDeclined,

    #[error("stack {action} command exited with {}", code.map(|c| c.to_string()).unwrap_or_else(|| "a signal".to_string()))]
    #[diagnostic(code(portside::stack::command_failed))]
    CommandFailed {
        action: String,
        code: Option<i32>,
        #[help]
        help: Option<String>,
    },

    #[error("failed to spawn stack {action} command")]
    #[diagnostic(code(portside::stack::spawn_failed))]
    SpawnFailed {
        action: String,
        #[source]
        source: io::Error,
    },
}

/// Fatal outcomes of the product hand-off.
#[derive(Debug, Error, Diagnostic)]
pub enum StartupError {
    #[error("failed to spawn '{program}'")]
    #[diagnostic(
        code(portside::startup::spawn_failed),
        help("is the dev-server binary on your PATH?")
    )]
    SpawnFailed {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Errors in the declarative product/port configuration.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("no portside.toml found")]
    #[diagnostic(
        code(portside::config::not_found),
        help(
            "create a portside.toml at your repository root, or point PORTSIDE_CONFIG at one.\nSearched from: {searched_from}"
        )
    )]
    NotFound { searched_from: String },

    #[error("failed to read config: {}", path.display())]
    #[diagnostic(code(portside::config::read_error))]
    ReadError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("product '{name}' is not defined in {path}")]
    #[diagnostic(code(portside::config::unknown_product))]
    UnknownProduct {
        name: String,
        path: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("no products defined in {path}")]
    #[diagnostic(
        code(portside::config::no_products),
        help("add a [products.<name>] section with a run command")
    )]
    NoProducts { path: String },

    #[error("product '{product}' does not support mode '{mode}'")]
    #[diagnostic(
        code(portside::config::unsupported_mode),
        help("supported modes: {supported}")
    )]
    UnsupportedMode {
        product: String,
        mode: String,
        supported: String,
    },

    #[error("port binding '{service}' in product '{product}' declares port 0")]
    #[diagnostic(
        code(portside::config::invalid_port),
        help("ports must be positive integers")
    )]
    InvalidPort { product: String, service: String },

    #[error("option '{option}' has non-port value '{value}'")]
    #[diagnostic(
        code(portside::config::invalid_option_value),
        help("option values feeding port bindings must be positive integers")
    )]
    InvalidOptionValue { option: String, value: String },

    #[error("invalid option override '{arg}'")]
    #[diagnostic(
        code(portside::config::invalid_option_flag),
        help("option overrides use key=value form, e.g. -o port=3889")
    )]
    InvalidOptionFlag { arg: String },

    #[error("product '{product}' has an unparseable run command")]
    #[diagnostic(code(portside::config::invalid_run_command))]
    InvalidRunCommand {
        product: String,
        #[help]
        details: Option<String>,
    },
}

/// TOML parse failures with source code highlighting.
#[derive(Debug, Error, Diagnostic)]
#[error("failed to parse configuration")]
#[diagnostic(code(portside::config::parse_error))]
pub struct ConfigParseError {
    #[source_code]
    pub src: NamedSource<String>,

    #[label("{message}")]
    pub span: SourceSpan,

    pub message: String,

    #[help]
    pub help: Option<String>,
}

impl ConfigParseError {
    pub fn from_toml_error(path: &std::path::Path, contents: String, err: toml::de::Error) -> Self {
        let message = err.message().to_string();

        let span = err
            .span()
            .map(|r| SourceSpan::from(r.start..r.end))
            .unwrap_or_else(|| SourceSpan::from(0..0));

        Self {
            src: NamedSource::new(path.display().to_string(), contents),
            span,
            message,
            help: Some("check TOML syntax at https://toml.io".to_string()),
        }
    }
}

/// Find the most similar product name for suggestions.
pub fn find_similar_product<'a>(
    name: &str,
    available: impl Iterator<Item = &'a str>,
) -> Option<String> {
    use fuzzy_matcher::FuzzyMatcher;
    use fuzzy_matcher::skim::SkimMatcherV2;

    let matcher = SkimMatcherV2::default();
    available
        .filter_map(|candidate| {
            matcher
                .fuzzy_match(candidate, name)
                .map(|score| (candidate, score))
        })
        .max_by_key(|(_, score)| *score)
        .filter(|(_, score)| *score > 0)
        .map(|(candidate, _)| format!("did you mean '{candidate}'?"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_error_display() {
        let err = ConflictError::Aborted;
        assert_eq!(err.to_string(), "startup aborted");

        let err = ConflictError::KillDeclined { port: 3888 };
        assert_eq!(
            err.to_string(),
            "declined to kill the processes using port 3888"
        );

        let err = ConflictError::PortStillInUse {
            port: 9099,
            listeners: vec!["node server.js".to_string(), "(unknown)".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "port 9099 is still in use after killing node server.js, (unknown)"
        );
    }

    #[test]
    fn test_stack_error_display() {
        let err = StackError::StartDeclined;
        assert!(err.to_string().contains("local stack"));

        let err = StackError::CommandFailed {
            action: "start".to_string(),
            code: Some(125),
            help: None,
        };
        assert_eq!(err.to_string(), "stack start command exited with 125");

        let err = StackError::CommandFailed {
            action: "stop".to_string(),
            code: None,
            help: None,
        };
        assert_eq!(err.to_string(), "stack stop command exited with a signal");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownProduct {
            name: "wbe".to_string(),
            path: "portside.toml".to_string(),
            suggestion: Some("did you mean 'web'?".to_string()),
        };
        assert_eq!(err.to_string(), "product 'wbe' is not defined in portside.toml");

        let err = ConfigError::InvalidOptionFlag {
            arg: "port".to_string(),
        };
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_find_similar_product() {
        let products = ["web", "admin", "docs-site", "worker"];

        let suggestion = find_similar_product("wb", products.iter().copied());
        assert_eq!(suggestion, Some("did you mean 'web'?".to_string()));

        let suggestion = find_similar_product("xyz123", products.iter().copied());
        assert!(suggestion.is_none());
    }

    #[test]
    fn test_config_parse_error() {
        let contents = "[products.web]\nrun = ".to_string();
        let err = toml::from_str::<toml::Value>(&contents).unwrap_err();
        let parse_err =
            ConfigParseError::from_toml_error(std::path::Path::new("test.toml"), contents, err);

        assert!(parse_err.to_string().contains("failed to parse"));
    }
}
