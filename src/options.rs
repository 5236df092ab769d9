use std::{fmt, sync::Arc, time::Duration};

use serde::{de, Deserialize, Deserializer};

use crate::{CallFailure, ConfigurationError};

const ENV_MAX_RETRIES: &str = "BITCOIND_RPC_MAX_RETRIES";
const ENV_RETRY_DELAY_MS: &str = "BITCOIND_RPC_RETRY_DELAY_MS";
const ENV_TIMEOUT_MS: &str = "BITCOIND_RPC_TIMEOUT_MS";

/// Sink for retry notices.
///
/// Invoked once per failed attempt that is followed by another attempt, with
/// the 1-based attempt number, the method name and the failure.
pub trait RetryLogger: Send + Sync {
    fn log(&self, attempt: usize, method: &str, error: &CallFailure);
}

impl<F> RetryLogger for F
where
    F: Fn(usize, &str, &CallFailure) + Send + Sync,
{
    fn log(&self, attempt: usize, method: &str, error: &CallFailure) {
        self(attempt, method, error)
    }
}

/// Logger that forwards retry notices to `tracing` at warn level.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

#[cfg(feature = "tracing")]
impl RetryLogger for TracingLogger {
    fn log(&self, attempt: usize, method: &str, error: &CallFailure) {
        tracing::warn!(attempt, method, error = %error, "retrying rpc call");
    }
}

/// Configures per-attempt timeout and retry behavior.
#[derive(Clone)]
pub struct ClientOptions {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: usize,
    /// Fixed delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Per-attempt timeout in milliseconds. Must be positive.
    pub timeout_ms: u64,
    /// Optional retry notice sink. Disabled when `None`.
    pub logger: Option<Arc<dyn RetryLogger>>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            max_retries: 0,
            retry_delay_ms: 100,
            timeout_ms: 5_000,
            logger: None,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("logger", &self.logger.as_ref().map(|_| "<logger>"))
            .finish()
    }
}

impl ClientOptions {
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay_ms(mut self, retry_delay_ms: u64) -> Self {
        self.retry_delay_ms = retry_delay_ms;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_logger(mut self, logger: impl RetryLogger + 'static) -> Self {
        self.logger = Some(Arc::new(logger));
        self
    }

    /// Total number of attempts a single call may make.
    pub fn attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Rejects values the retry loop cannot honor.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.timeout_ms == 0 {
            return Err(ConfigurationError::InvalidOption {
                name: "timeout_ms",
                reason: "must be greater than zero".to_owned(),
            });
        }
        Ok(())
    }

    /// Builds options from the positional `(max_retries, retry_delay_ms, logger)`
    /// call shape. Zero values keep the defaults.
    pub fn legacy(
        max_retries: i64,
        retry_delay_ms: i64,
        logger: Option<Arc<dyn RetryLogger>>,
    ) -> Result<Self, ConfigurationError> {
        OptionOverrides {
            max_retries: Some(max_retries),
            retry_delay_ms: Some(retry_delay_ms),
            timeout_ms: None,
            logger,
        }
        .apply_to(Self::default())
    }

    /// Reads overrides from the environment.
    ///
    /// - `BITCOIND_RPC_MAX_RETRIES`
    /// - `BITCOIND_RPC_RETRY_DELAY_MS`
    /// - `BITCOIND_RPC_TIMEOUT_MS`
    ///
    /// Unset, empty or zero variables keep the defaults.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup<L>(lookup: L) -> Result<Self, ConfigurationError>
    where
        L: Fn(&str) -> Option<String>,
    {
        OptionOverrides {
            max_retries: env_integer(&lookup, ENV_MAX_RETRIES, "max_retries")?,
            retry_delay_ms: env_integer(&lookup, ENV_RETRY_DELAY_MS, "retry_delay_ms")?,
            timeout_ms: env_integer(&lookup, ENV_TIMEOUT_MS, "timeout_ms")?,
            logger: None,
        }
        .apply_to(Self::default())
    }
}

/// Loosely-typed option overrides, as accepted from JSON or the environment.
///
/// A field that is absent, `null`, `false`, `""` or zero counts as not
/// provided and the default is retained. Negative values are rejected.
#[derive(Clone, Default, Deserialize)]
pub struct OptionOverrides {
    #[serde(default, alias = "maxRetries", deserialize_with = "falsy_integer")]
    pub max_retries: Option<i64>,
    #[serde(default, alias = "retryDelayMs", deserialize_with = "falsy_integer")]
    pub retry_delay_ms: Option<i64>,
    #[serde(default, alias = "timeoutMs", deserialize_with = "falsy_integer")]
    pub timeout_ms: Option<i64>,
    #[serde(skip)]
    pub logger: Option<Arc<dyn RetryLogger>>,
}

impl fmt::Debug for OptionOverrides {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionOverrides")
            .field("max_retries", &self.max_retries)
            .field("retry_delay_ms", &self.retry_delay_ms)
            .field("timeout_ms", &self.timeout_ms)
            .field("logger", &self.logger.as_ref().map(|_| "<logger>"))
            .finish()
    }
}

impl OptionOverrides {
    /// Applies the provided fields on top of `base` and validates the result.
    pub fn apply_to(self, mut base: ClientOptions) -> Result<ClientOptions, ConfigurationError> {
        if let Some(value) = provided("max_retries", self.max_retries)? {
            base.max_retries =
                usize::try_from(value).map_err(|_| ConfigurationError::InvalidOption {
                    name: "max_retries",
                    reason: format!("{value} does not fit in usize"),
                })?;
        }
        if let Some(value) = provided("retry_delay_ms", self.retry_delay_ms)? {
            base.retry_delay_ms = value;
        }
        if let Some(value) = provided("timeout_ms", self.timeout_ms)? {
            base.timeout_ms = value;
        }
        if let Some(logger) = self.logger {
            base.logger = Some(logger);
        }
        base.validate()?;
        Ok(base)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseInteger {
    Integer(i64),
    Flag(bool),
    Text(String),
}

fn falsy_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<LooseInteger>::deserialize(deserializer)? {
        None | Some(LooseInteger::Flag(false)) => Ok(None),
        Some(LooseInteger::Integer(value)) => Ok(Some(value)),
        Some(LooseInteger::Text(text)) if text.is_empty() => Ok(None),
        Some(LooseInteger::Text(text)) => Err(de::Error::custom(format!(
            "expected an integer, got string {text:?}"
        ))),
        Some(LooseInteger::Flag(true)) => {
            Err(de::Error::custom("expected an integer, got boolean true"))
        }
    }
}

fn provided(name: &'static str, value: Option<i64>) -> Result<Option<u64>, ConfigurationError> {
    match value {
        None | Some(0) => Ok(None),
        Some(value) if value < 0 => Err(ConfigurationError::InvalidOption {
            name,
            reason: format!("must not be negative, got {value}"),
        }),
        Some(value) => Ok(Some(value.unsigned_abs())),
    }
}

fn env_integer<L>(
    lookup: &L,
    var: &str,
    name: &'static str,
) -> Result<Option<i64>, ConfigurationError>
where
    L: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|err| ConfigurationError::InvalidOption {
            name,
            reason: format!("{var}={raw:?}: {err}"),
        })
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use super::{ClientOptions, OptionOverrides, RetryLogger};
    use crate::{CallFailure, ConfigurationError};

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_allow_a_single_attempt() {
        let options = ClientOptions::default();
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.retry_delay_ms, 100);
        assert_eq!(options.timeout_ms, 5_000);
        assert!(options.logger.is_none());
        assert_eq!(options.attempts(), 1);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientOptions::default()
            .with_timeout_ms(0)
            .validate()
            .expect_err("zero timeout must fail");
        assert!(matches!(
            err,
            ConfigurationError::InvalidOption {
                name: "timeout_ms",
                ..
            }
        ));
    }

    #[test]
    fn overrides_accept_camel_case_json() {
        let overrides: OptionOverrides =
            serde_json::from_str(r#"{"maxRetries": 3, "retryDelayMs": 25, "timeoutMs": 900}"#)
                .expect("overrides must parse");
        let options = overrides
            .apply_to(ClientOptions::default())
            .expect("overrides must apply");
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_delay_ms, 25);
        assert_eq!(options.timeout_ms, 900);
    }

    #[test]
    fn zero_overrides_keep_defaults() {
        let overrides: OptionOverrides =
            serde_json::from_str(r#"{"max_retries": 0, "retry_delay_ms": 0, "timeout_ms": 0}"#)
                .expect("overrides must parse");
        let options = overrides
            .apply_to(ClientOptions::default().with_max_retries(4))
            .expect("zero overrides must apply");
        assert_eq!(options.max_retries, 4);
        assert_eq!(options.retry_delay_ms, 100);
        assert_eq!(options.timeout_ms, 5_000);
    }

    #[test]
    fn empty_false_and_null_overrides_keep_defaults() {
        let overrides: OptionOverrides = serde_json::from_str(
            r#"{"maxRetries": "", "retryDelayMs": false, "timeoutMs": null}"#,
        )
        .expect("falsy overrides must parse");
        assert_eq!(overrides.max_retries, None);
        assert_eq!(overrides.retry_delay_ms, None);
        assert_eq!(overrides.timeout_ms, None);

        let options = overrides
            .apply_to(ClientOptions::default())
            .expect("falsy overrides must apply");
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.retry_delay_ms, 100);
        assert_eq!(options.timeout_ms, 5_000);
    }

    #[test]
    fn non_empty_string_and_true_overrides_are_rejected() {
        let err = serde_json::from_str::<OptionOverrides>(r#"{"maxRetries": "three"}"#)
            .expect_err("text must not parse");
        assert!(err.to_string().contains("three"));

        serde_json::from_str::<OptionOverrides>(r#"{"timeoutMs": true}"#)
            .expect_err("true must not parse");
    }

    #[test]
    fn env_overrides_are_applied() {
        let options = ClientOptions::from_lookup(env(&[
            ("BITCOIND_RPC_MAX_RETRIES", "3"),
            ("BITCOIND_RPC_RETRY_DELAY_MS", " 250 "),
            ("BITCOIND_RPC_TIMEOUT_MS", "1500"),
        ]))
        .expect("env must apply");
        assert_eq!(options.max_retries, 3);
        assert_eq!(options.retry_delay_ms, 250);
        assert_eq!(options.timeout_ms, 1_500);
    }

    #[test]
    fn empty_unset_or_zero_env_keeps_defaults() {
        let options = ClientOptions::from_lookup(env(&[
            ("BITCOIND_RPC_MAX_RETRIES", ""),
            ("BITCOIND_RPC_RETRY_DELAY_MS", "   "),
            ("BITCOIND_RPC_TIMEOUT_MS", "0"),
        ]))
        .expect("empty env must apply");
        assert_eq!(options.max_retries, 0);
        assert_eq!(options.retry_delay_ms, 100);
        assert_eq!(options.timeout_ms, 5_000);

        let options = ClientOptions::from_lookup(env(&[])).expect("unset env must apply");
        assert_eq!(options.timeout_ms, 5_000);
    }

    #[test]
    fn unparsable_env_is_an_invalid_option() {
        let err = ClientOptions::from_lookup(env(&[("BITCOIND_RPC_TIMEOUT_MS", "soon")]))
            .expect_err("unparsable env must fail");
        match err {
            ConfigurationError::InvalidOption { name, reason } => {
                assert_eq!(name, "timeout_ms");
                assert!(reason.contains("BITCOIND_RPC_TIMEOUT_MS"));
            }
            other => panic!("expected invalid option, got {other:?}"),
        }

        let err = ClientOptions::from_lookup(env(&[("BITCOIND_RPC_MAX_RETRIES", "-2")]))
            .expect_err("negative env must fail");
        assert!(matches!(
            err,
            ConfigurationError::InvalidOption {
                name: "max_retries",
                ..
            }
        ));
    }

    #[test]
    fn negative_overrides_are_rejected() {
        let err = OptionOverrides {
            max_retries: Some(-1),
            ..OptionOverrides::default()
        }
        .apply_to(ClientOptions::default())
        .expect_err("negative retries must fail");
        assert!(matches!(
            err,
            ConfigurationError::InvalidOption {
                name: "max_retries",
                ..
            }
        ));

        let err = OptionOverrides {
            timeout_ms: Some(-5),
            ..OptionOverrides::default()
        }
        .apply_to(ClientOptions::default())
        .expect_err("negative timeout must fail");
        assert!(err.to_string().contains("timeout_ms"));
    }

    #[test]
    fn legacy_shape_sets_retries_and_logger() {
        let logger: Arc<dyn RetryLogger> = Arc::new(|_: usize, _: &str, _: &CallFailure| {});
        let options = ClientOptions::legacy(5, 0, Some(logger)).expect("legacy must apply");
        assert_eq!(options.max_retries, 5);
        assert_eq!(options.retry_delay_ms, 100);
        assert!(options.logger.is_some());
        assert_eq!(options.attempts(), 6);
    }

    #[test]
    fn debug_hides_logger() {
        let options = ClientOptions::default().with_logger(|_: usize, _: &str, _: &CallFailure| {});
        let debug = format!("{options:?}");
        assert!(debug.contains("<logger>"));
    }
}
