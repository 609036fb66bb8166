//! Launch command declaration
//!
//! The final pipeline stage declares (never executes) the container's
//! default command: a process manager bound to all interfaces on a port
//! resolved from the environment at container start, delegating to a
//! `module:attribute` entry point inside the application.

use crate::error::{StrataError, StrataResult};
use serde::Deserialize;

/// Launch section of the pipeline manifest
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchSpec {
    /// Process manager binary (default: gunicorn)
    #[serde(default = "default_server")]
    pub server: String,

    /// Environment variable holding the bind port, read at container start
    #[serde(default = "default_port_env")]
    pub port_env: String,

    /// Whether the port variable must be present at container start.
    /// When true (the default) there is no fallback: an unset variable is
    /// the process manager's fatal startup error.
    #[serde(default = "default_true")]
    pub port_required: bool,

    /// Fallback port, only meaningful when `port_required = false`
    pub port_default: Option<u16>,

    /// Application entry point as "module:attribute"
    pub entry_point: String,

    /// Extra arguments appended to the server command
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_server() -> String {
    "gunicorn".to_string()
}

fn default_port_env() -> String {
    "PORT".to_string()
}

fn default_true() -> bool {
    true
}

/// Parsed "module:attribute" entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub module: String,
    pub attribute: String,
}

impl EntryPoint {
    /// Parse a "module:attribute" pair
    pub fn parse(value: &str) -> StrataResult<Self> {
        let (module, attribute) = value.split_once(':').ok_or_else(|| {
            StrataError::EntryPointInvalid {
                value: value.to_string(),
                reason: "expected 'module:attribute'".to_string(),
            }
        })?;
        for part in [module, attribute] {
            let valid = !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
            if !valid {
                return Err(StrataError::EntryPointInvalid {
                    value: value.to_string(),
                    reason: format!("'{}' is not a valid identifier path", part),
                });
            }
        }
        Ok(Self {
            module: module.to_string(),
            attribute: attribute.to_string(),
        })
    }
}

impl LaunchSpec {
    /// Validate the declaration
    pub fn validate(&self) -> StrataResult<()> {
        if self.server.trim().is_empty() {
            return Err(StrataError::User(
                "Launch server must not be empty".to_string(),
            ));
        }
        validate_env_var_name(&self.port_env)?;
        if !self.port_required && self.port_default.is_none() {
            return Err(StrataError::PortVariableInvalid {
                value: self.port_env.clone(),
                reason: "optional port requires port_default".to_string(),
            });
        }
        if self.port_required && self.port_default.is_some() {
            return Err(StrataError::PortVariableInvalid {
                value: self.port_env.clone(),
                reason: "required port must not declare a fallback".to_string(),
            });
        }
        EntryPoint::parse(&self.entry_point)?;
        Ok(())
    }

    /// The shell expression for the bind port, expanded at container start
    pub fn port_expr(&self) -> String {
        match (self.port_required, self.port_default) {
            (true, _) => format!("${}", self.port_env),
            (false, Some(default)) => format!("${{{}:-{}}}", self.port_env, default),
            // validate() rules this combination out
            (false, None) => format!("${}", self.port_env),
        }
    }

    /// Full launch command line, shell form so the port variable is
    /// resolved by the container at start, not at build time
    pub fn command(&self) -> String {
        let mut parts = vec![
            self.server.clone(),
            "--bind".to_string(),
            format!("0.0.0.0:{}", self.port_expr()),
        ];
        parts.extend(self.args.iter().cloned());
        parts.push(self.entry_point.clone());
        parts.join(" ")
    }
}

/// Validate a POSIX environment variable name
fn validate_env_var_name(name: &str) -> StrataResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StrataError::PortVariableInvalid {
            value: name.to_string(),
            reason: "not a valid environment variable name".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(toml: &str) -> LaunchSpec {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn entry_point_parse_valid() {
        let ep = EntryPoint::parse("app:app").unwrap();
        assert_eq!(ep.module, "app");
        assert_eq!(ep.attribute, "app");

        let ep = EntryPoint::parse("myservice.wsgi:application").unwrap();
        assert_eq!(ep.module, "myservice.wsgi");
        assert_eq!(ep.attribute, "application");
    }

    #[test]
    fn entry_point_parse_invalid() {
        assert!(EntryPoint::parse("app").is_err());
        assert!(EntryPoint::parse(":app").is_err());
        assert!(EntryPoint::parse("app:").is_err());
        assert!(EntryPoint::parse("app:app app").is_err());
    }

    #[test]
    fn required_port_has_no_fallback() {
        let launch = spec(r#"entry_point = "app:app""#);
        assert!(launch.validate().is_ok());
        assert_eq!(launch.port_expr(), "$PORT");
        assert_eq!(launch.command(), "gunicorn --bind 0.0.0.0:$PORT app:app");
    }

    #[test]
    fn optional_port_renders_fallback() {
        let launch = spec(
            r#"
entry_point = "app:app"
port_required = false
port_default = 8000
"#,
        );
        assert!(launch.validate().is_ok());
        assert_eq!(launch.port_expr(), "${PORT:-8000}");
    }

    #[test]
    fn optional_port_without_default_rejected() {
        let launch = spec(
            r#"
entry_point = "app:app"
port_required = false
"#,
        );
        assert!(launch.validate().is_err());
    }

    #[test]
    fn required_port_with_default_rejected() {
        let launch = spec(
            r#"
entry_point = "app:app"
port_default = 8000
"#,
        );
        let err = launch.validate().unwrap_err();
        assert!(err.to_string().contains("must not declare a fallback"));
    }

    #[test]
    fn custom_port_env() {
        let launch = spec(
            r#"
entry_point = "app:app"
port_env = "HTTP_PORT"
"#,
        );
        assert!(launch.validate().is_ok());
        assert_eq!(launch.port_expr(), "$HTTP_PORT");
    }

    #[test]
    fn invalid_port_env_rejected() {
        for bad in ["", "1PORT", "PORT NUM", "PORT-NUM"] {
            assert!(validate_env_var_name(bad).is_err(), "accepted '{}'", bad);
        }
    }

    #[test]
    fn extra_args_appear_before_entry_point() {
        let launch = spec(
            r#"
entry_point = "app:app"
args = ["--workers", "4"]
"#,
        );
        assert_eq!(
            launch.command(),
            "gunicorn --bind 0.0.0.0:$PORT --workers 4 app:app"
        );
    }
}
