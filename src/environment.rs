use std::{convert::Infallible, fmt, str::FromStr};

/// Flag used to select the active environment on the command line
pub const ACTIVE_ENV_FLAG: &str = "active-env";

/// Environment the application runs in, selects which `.env.{name}` files are read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActiveEnvironment {
    Development,
    Testing,
    Production,
    Other(String),
}

impl From<&str> for ActiveEnvironment {
    fn from(s: &str) -> Self {
        match s {
            "dev" | "development" => Self::Development,
            "test" | "testing" => Self::Testing,
            "prod" | "production" => Self::Production,
            other => Self::Other(other.to_string()),
        }
    }
}

impl FromStr for ActiveEnvironment {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for ActiveEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActiveEnvironment {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "dev",
            Self::Testing => "test",
            Self::Production => "prod",
            Self::Other(name) => name,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, Self::Testing)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Takes the `-active-env` or `--active-env` flag out of `args`.
///
/// Both `--active-env=prod` and `--active-env prod` are accepted. A flag
/// without value, or with an empty value, is left in place. The remaining
/// arguments are returned in their original order.
pub fn active_environment<I>(args: I) -> (Option<ActiveEnvironment>, Vec<String>)
where
    I: IntoIterator,
    I::Item: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();

    for (i, arg) in args.iter().enumerate() {
        let Some(flag) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            continue;
        };

        let (value, consumed) = if flag == ACTIVE_ENV_FLAG {
            match args.get(i + 1) {
                Some(next) => (next.clone(), 2),
                None => break,
            }
        } else if let Some(value) = flag
            .strip_prefix(ACTIVE_ENV_FLAG)
            .and_then(|rest| rest.strip_prefix('='))
        {
            (value.to_string(), 1)
        } else {
            continue;
        };

        if value.is_empty() {
            break;
        }

        let mut rest = args[..i].to_vec();
        rest.extend_from_slice(&args[i + consumed..]);
        return (Some(ActiveEnvironment::from(value.as_str())), rest);
    }

    (None, args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        let tests = [
            ("dev", ActiveEnvironment::Development),
            ("development", ActiveEnvironment::Development),
            ("test", ActiveEnvironment::Testing),
            ("testing", ActiveEnvironment::Testing),
            ("prod", ActiveEnvironment::Production),
            ("production", ActiveEnvironment::Production),
            ("staging", ActiveEnvironment::Other("staging".to_string())),
        ];

        for (input, want) in tests {
            let env: ActiveEnvironment = input.parse().unwrap();
            assert_eq!(env, want, "{}", input);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(ActiveEnvironment::Production.to_string(), "prod");
        assert_eq!(ActiveEnvironment::Development.to_string(), "dev");
        assert_eq!(ActiveEnvironment::Other("qa".to_string()).to_string(), "qa");
    }

    #[test]
    fn test_predicates() {
        assert!(ActiveEnvironment::Production.is_production());
        assert!(!ActiveEnvironment::Development.is_production());
        assert!(ActiveEnvironment::Development.is_development());
        assert!(ActiveEnvironment::Testing.is_testing());
    }

    #[test]
    fn test_active_environment_flag() {
        let (env, rest) = active_environment(["app", "--active-env", "prod", "serve"]);
        assert_eq!(env, Some(ActiveEnvironment::Production));
        assert_eq!(rest, vec!["app", "serve"]);

        let (env, rest) = active_environment(["app", "-active-env=dev"]);
        assert_eq!(env, Some(ActiveEnvironment::Development));
        assert_eq!(rest, vec!["app"]);
    }

    #[test]
    fn test_active_environment_missing() {
        let (env, rest) = active_environment(["app", "serve"]);
        assert_eq!(env, None);
        assert_eq!(rest, vec!["app", "serve"]);

        let (env, rest) = active_environment(["app", "--active-env"]);
        assert_eq!(env, None);
        assert_eq!(rest, vec!["app", "--active-env"]);

        let (env, _) = active_environment(["app", "--active-env="]);
        assert_eq!(env, None);

        let (env, rest) = active_environment(["app", "--active-envy=x"]);
        assert_eq!(env, None);
        assert_eq!(rest, vec!["app", "--active-envy=x"]);
    }
}
