use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

pub const ENV_PREFIX: &str = "UCLA_MONITOR";
pub const SLACK_ENV_PREFIX: &str = "SLACK";

const DEFAULT_INTERVAL_SECS: u64 = 15;
const ENROLLMENT_URL: &str = "https://be.my.ucla.edu/ClassPlanner/ClassPlan.aspx";

/// A course to watch: display label plus the code shown on the class block's
/// second line (`<code> - <description>`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrackedCourse {
    pub label: String,
    pub code: String,
}

impl TrackedCourse {
    pub fn new(label: &str, code: &str) -> Self {
        Self {
            label: label.to_string(),
            code: code.to_string(),
        }
    }
}

impl FromStr for TrackedCourse {
    type Err = String;

    /// Parses `LABEL=CODE`, e.g. `SCAND60=60`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, code) = s
            .split_once('=')
            .ok_or_else(|| format!("expected LABEL=CODE, got {:?}", s))?;
        let (label, code) = (label.trim(), code.trim());
        if label.is_empty() || code.is_empty() {
            return Err(format!("label and code must be non-empty in {:?}", s));
        }
        Ok(Self::new(label, code))
    }
}

impl fmt::Display for TrackedCourse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.label, self.code)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Seconds between polls.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_courses")]
    pub courses: Vec<TrackedCourse>,
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL_SECS
}

fn default_url() -> String {
    ENROLLMENT_URL.to_string()
}

fn default_courses() -> Vec<TrackedCourse> {
    vec![
        TrackedCourse::new("AERO", "A"),
        TrackedCourse::new("SCAND60", "60"),
        TrackedCourse::new("M61", "61"),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            url: default_url(),
            courses: default_courses(),
        }
    }
}

impl Settings {
    /// Defaults, then the TOML file at `path` if it exists, then
    /// `UCLA_MONITOR_*` environment variables.
    pub fn load(path: &Path) -> Result<Self> {
        Self::load_with(path, Environment::with_prefix(ENV_PREFIX).try_parsing(true))
    }

    fn load_with(path: &Path, env: Environment) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to load settings from {:?}", path))?
            .try_deserialize()
            .context("Invalid monitor settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// CLI values replace configured ones when given.
    pub fn apply_overrides(&mut self, interval: Option<u64>, courses: Vec<TrackedCourse>) -> Result<()> {
        if let Some(interval) = interval {
            self.interval = interval;
        }
        if !courses.is_empty() {
            self.courses = courses;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval == 0 {
            bail!("interval must be at least 1 second");
        }
        if self.courses.is_empty() {
            bail!("no courses to track");
        }
        if let Some(c) = self
            .courses
            .iter()
            .find(|c| c.label.trim().is_empty() || c.code.trim().is_empty())
        {
            bail!("course {:?} needs both a label and a code", c);
        }
        Ok(())
    }
}

/// Slack credentials, read from `SLACK_BOT_TOKEN`, `SLACK_USER_ID` and
/// `SLACK_CHANNEL`.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackSettings {
    pub bot_token: String,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

impl SlackSettings {
    pub fn from_env() -> Result<Self> {
        Self::load_with(Environment::with_prefix(SLACK_ENV_PREFIX))
    }

    fn load_with(env: Environment) -> Result<Self> {
        let settings: SlackSettings = Config::builder()
            .add_source(env)
            .build()?
            .try_deserialize()
            .context("SLACK_BOT_TOKEN must be set")?;
        if settings.channel.is_none() && settings.user_id.is_none() {
            bail!("set SLACK_CHANNEL, or SLACK_USER_ID for direct messages");
        }
        Ok(settings)
    }
}
