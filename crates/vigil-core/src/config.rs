use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::VigilError;

/// Top-level configuration loaded from `.vigil.toml`.
///
/// The host process owns loading order (CLI flags > env vars > local config >
/// defaults); this type only parses the file layer and supplies defaults.
///
/// # Examples
///
/// ```
/// use vigil_core::VigilConfig;
///
/// let config = VigilConfig::default();
/// assert!(config.triage.auto_respond);
/// assert_eq!(config.monitor.poll_interval_secs, 60);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VigilConfig {
    /// Classification and dispatch settings.
    #[serde(default)]
    pub triage: TriageConfig,
    /// Polling and tracking settings.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Escalation rules, evaluated in order on every tick.
    #[serde(default)]
    pub escalation: Vec<EscalationRule>,
}

impl VigilConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Io`] if the file cannot be read, or
    /// [`VigilError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, VigilError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`VigilError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use vigil_core::VigilConfig;
    ///
    /// let toml = r#"
    /// [triage]
    /// auto_respond = false
    /// "#;
    /// let config = VigilConfig::from_toml(toml).unwrap();
    /// assert!(!config.triage.auto_respond);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, VigilError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Classification and dispatch behavior.
///
/// # Examples
///
/// ```
/// use vigil_core::TriageConfig;
///
/// let config = TriageConfig::default();
/// assert_eq!(config.max_response_length, 2000);
/// assert_eq!(config.confidence_threshold, 0.3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriageConfig {
    /// Post replies automatically (default: true).
    #[serde(default = "default_auto_respond")]
    pub auto_respond: bool,
    /// Delay before posting a non-urgent reply, in seconds (default: 30).
    #[serde(default = "default_response_delay_secs")]
    pub response_delay_secs: u64,
    /// Maximum reply length in characters (default: 2000).
    #[serde(default = "default_max_response_length")]
    pub max_response_length: usize,
    /// Logins whose comments are never processed.
    #[serde(default)]
    pub ignore_users: Vec<String>,
    /// Minimum winning intent score before trusting the classifier's top
    /// pick over the ambiguous default (default: 0.3).
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
    /// Comments older than this many days are skipped (default: 7).
    #[serde(default = "default_max_comment_age_days")]
    pub max_comment_age_days: i64,
    /// Login of the automation identity, used to recognize our own replies.
    #[serde(default = "default_automation_login")]
    pub automation_login: String,
}

fn default_auto_respond() -> bool {
    true
}

fn default_response_delay_secs() -> u64 {
    30
}

fn default_max_response_length() -> usize {
    2000
}

fn default_confidence_threshold() -> f64 {
    0.3
}

fn default_max_comment_age_days() -> i64 {
    7
}

fn default_automation_login() -> String {
    "vigil-bot".into()
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            auto_respond: default_auto_respond(),
            response_delay_secs: default_response_delay_secs(),
            max_response_length: default_max_response_length(),
            ignore_users: Vec::new(),
            confidence_threshold: default_confidence_threshold(),
            max_comment_age_days: default_max_comment_age_days(),
            automation_login: default_automation_login(),
        }
    }
}

impl TriageConfig {
    /// Reply delay as a [`Duration`].
    pub fn response_delay(&self) -> Duration {
        Duration::from_secs(self.response_delay_secs)
    }
}

/// Polling and tracking behavior.
///
/// # Examples
///
/// ```
/// use vigil_core::MonitorConfig;
///
/// let config = MonitorConfig::default();
/// assert_eq!(config.retry_attempts, 3);
/// assert!(config.track_resolution);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between poll ticks (default: 60).
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    /// Trackers older than this expire, in seconds (default: 7 days).
    #[serde(default = "default_max_tracking_time_secs")]
    pub max_tracking_time_secs: u64,
    /// Active trackers unresolved past this are flagged, in seconds
    /// (default: 24 hours).
    #[serde(default = "default_resolution_timeout_secs")]
    pub resolution_timeout_secs: u64,
    /// Retry attempts for collaborator calls (default: 3).
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    /// Surface failed poll ticks to the notification sink (default: false).
    #[serde(default)]
    pub alert_on_failure: bool,
    /// Record resolution events and metrics (default: true).
    #[serde(default = "default_track_resolution")]
    pub track_resolution: bool,
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_tracking_time_secs() -> u64 {
    7 * 24 * 60 * 60
}

fn default_resolution_timeout_secs() -> u64 {
    24 * 60 * 60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_track_resolution() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            max_tracking_time_secs: default_max_tracking_time_secs(),
            resolution_timeout_secs: default_resolution_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            alert_on_failure: false,
            track_resolution: default_track_resolution(),
        }
    }
}

impl MonitorConfig {
    /// Poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Maximum tracking time as a [`chrono::Duration`].
    pub fn max_tracking_time(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.max_tracking_time_secs as i64)
    }

    /// Resolution timeout as a [`chrono::Duration`].
    pub fn resolution_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.resolution_timeout_secs as i64)
    }
}

/// Condition tag an [`EscalationRule`] evaluates.
///
/// Unknown tags deserialize to [`EscalationCondition::Unknown`] and never
/// fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationCondition {
    /// Comment priority is Blocking.
    Blocking,
    /// Comment priority is Critical.
    Critical,
    /// Tracker has been open longer than the rule's delay.
    UnresolvedTime,
    /// No response posted and the tracker is older than the rule's delay.
    NoResponse,
    /// Interaction count reached the rule's threshold.
    MultipleInteractions,
    /// Unrecognized tag; never matches.
    #[serde(other)]
    Unknown,
}

/// Action tag an [`EscalationRule`] executes when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationAction {
    /// Best-effort send through the notification sink.
    Notify,
    /// Post an escalation comment on the pull request.
    Comment,
    /// Mark the comment assigned to the recipients.
    Assign,
}

/// A named condition/action pair; fires at most once per tracker.
///
/// # Examples
///
/// ```
/// use vigil_core::{EscalationAction, EscalationCondition, EscalationRule};
///
/// let rule: EscalationRule = toml::from_str(r#"
/// name = "quick-escalation"
/// condition = "blocking"
/// action = "notify"
/// recipients = ["oncall"]
/// "#).unwrap();
/// assert_eq!(rule.condition, EscalationCondition::Blocking);
/// assert_eq!(rule.action, EscalationAction::Notify);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationRule {
    /// Unique rule name; dedup key for the fire-once invariant.
    pub name: String,
    /// What triggers the rule.
    pub condition: EscalationCondition,
    /// Numeric threshold for count-based conditions (default: 0).
    #[serde(default)]
    pub threshold: u32,
    /// What happens when the rule fires.
    pub action: EscalationAction,
    /// Who gets notified or assigned.
    #[serde(default)]
    pub recipients: Vec<String>,
    /// Grace period for time-based conditions, in seconds (default: 0).
    #[serde(default)]
    pub delay_secs: u64,
    /// Retry budget for the action (default: 3).
    #[serde(default = "default_retry_attempts")]
    pub max_retries: u32,
}

impl EscalationRule {
    /// Grace period as a [`chrono::Duration`].
    pub fn delay(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.delay_secs as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = VigilConfig::default();
        assert!(config.triage.auto_respond);
        assert_eq!(config.triage.response_delay_secs, 30);
        assert_eq!(config.triage.max_response_length, 2000);
        assert_eq!(config.triage.confidence_threshold, 0.3);
        assert_eq!(config.triage.max_comment_age_days, 7);
        assert!(config.triage.ignore_users.is_empty());
        assert_eq!(config.monitor.poll_interval_secs, 60);
        assert_eq!(config.monitor.max_tracking_time_secs, 7 * 24 * 60 * 60);
        assert_eq!(config.monitor.resolution_timeout_secs, 24 * 60 * 60);
        assert!(!config.monitor.alert_on_failure);
        assert!(config.monitor.track_resolution);
        assert!(config.escalation.is_empty());
    }

    #[test]
    fn parse_minimal_toml() {
        let toml = r#"
[triage]
auto_respond = false
response_delay_secs = 5
"#;
        let config = VigilConfig::from_toml(toml).unwrap();
        assert!(!config.triage.auto_respond);
        assert_eq!(config.triage.response_delay_secs, 5);
        // Unspecified sections fall back to defaults.
        assert_eq!(config.monitor.poll_interval_secs, 60);
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[triage]
auto_respond = true
ignore_users = ["dependabot[bot]", "renovate"]
confidence_threshold = 0.5
automation_login = "triage-agent"

[monitor]
poll_interval_secs = 30
max_tracking_time_secs = 3600
alert_on_failure = true

[[escalation]]
name = "blocking-now"
condition = "blocking"
action = "notify"
recipients = ["oncall"]

[[escalation]]
name = "stale-comment"
condition = "unresolved_time"
action = "comment"
delay_secs = 7200
"#;
        let config = VigilConfig::from_toml(toml).unwrap();
        assert_eq!(config.triage.ignore_users.len(), 2);
        assert_eq!(config.triage.automation_login, "triage-agent");
        assert_eq!(config.monitor.poll_interval_secs, 30);
        assert!(config.monitor.alert_on_failure);
        assert_eq!(config.escalation.len(), 2);
        assert_eq!(config.escalation[0].condition, EscalationCondition::Blocking);
        assert_eq!(config.escalation[1].action, EscalationAction::Comment);
        assert_eq!(config.escalation[1].delay().num_seconds(), 7200);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = VigilConfig::from_toml("").unwrap();
        assert!(config.triage.auto_respond);
        assert_eq!(config.monitor.retry_attempts, 3);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = VigilConfig::from_toml("{{invalid}}");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_escalation_condition_parses_as_unknown() {
        let rule: EscalationRule = toml::from_str(
            r#"
name = "future-rule"
condition = "sentiment_drop"
action = "notify"
"#,
        )
        .unwrap();
        assert_eq!(rule.condition, EscalationCondition::Unknown);
    }

    #[test]
    fn duration_accessors() {
        let config = VigilConfig::default();
        assert_eq!(config.triage.response_delay().as_secs(), 30);
        assert_eq!(config.monitor.poll_interval().as_secs(), 60);
        assert_eq!(config.monitor.max_tracking_time().num_days(), 7);
        assert_eq!(config.monitor.resolution_timeout().num_hours(), 24);
    }
}
