//! Environment variable substitution

use once_cell::sync::Lazy;
use regex::Regex;
use retailscope_core::RetailscopeError;

/// `{{ env.VAR_NAME }}` or `{{ env.VAR_NAME | default value }}`
static ENV_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*(?:\|\s*([^}]*?))?\s*\}\}").unwrap()
});

/// Environment variable substitutor
pub struct EnvSubstitutor {
    /// Whether to fail on missing variables that have no default
    strict: bool,
    /// Whether to load a `.env` file before substituting
    load_dotenv: bool,
}

impl EnvSubstitutor {
    /// Strict substitutor that loads `.env`
    pub fn new() -> Self {
        Self {
            strict: true,
            load_dotenv: true,
        }
    }

    /// Leaves placeholders for missing variables in place
    pub fn lenient() -> Self {
        Self {
            strict: false,
            load_dotenv: true,
        }
    }

    /// Skip `.env` loading (the process environment only)
    pub fn without_dotenv(mut self) -> Self {
        self.load_dotenv = false;
        self
    }

    /// Substitute environment variables in the given content
    pub fn substitute(&self, content: &str) -> Result<String, RetailscopeError> {
        if self.load_dotenv {
            // A missing .env file is normal
            let _ = dotenvy::dotenv();
        }

        let mut missing: Vec<String> = Vec::new();
        let result = ENV_PATTERN.replace_all(content, |caps: &regex::Captures<'_>| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => match caps.get(2) {
                    Some(default) => unquote(default.as_str().trim()).to_string(),
                    None => {
                        if self.strict {
                            missing.push(var_name.to_string());
                        }
                        caps[0].to_string()
                    }
                },
            }
        });

        if !missing.is_empty() {
            missing.dedup();
            return Err(RetailscopeError::EnvVarNotFound(missing.join(", ")));
        }

        Ok(result.into_owned())
    }

    /// Check if a string contains environment variable placeholders
    pub fn has_placeholders(content: &str) -> bool {
        ENV_PATTERN.is_match(content)
    }

    /// Names of variables referenced without a default
    pub fn required_vars(content: &str) -> Vec<String> {
        ENV_PATTERN
            .captures_iter(content)
            .filter(|cap| cap.get(2).is_none())
            .map(|cap| cap[1].to_string())
            .collect()
    }
}

impl Default for EnvSubstitutor {
    fn default() -> Self {
        Self::new()
    }
}

fn unquote(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted {
        &value[1..value.len() - 1]
    } else {
        value
    }
}
