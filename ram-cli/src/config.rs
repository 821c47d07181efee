use anyhow::{Context, Result};
use ram_core::{ReminderPolicy, SequencerConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::state::ensure_ram_home;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmSection,
    pub sequencer: SequencerConfig,
    pub reminders: RemindersSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// Any OpenAI-compatible chat-completions endpoint.
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.4,
            timeout_secs: 30,
            max_tokens: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemindersSection {
    pub enabled: bool,
    pub nudge_interval_hours: i64,
    pub loop_check_minutes: i64,
    pub cluster_cache_minutes: i64,
    /// IANA name; decides where "today" ends for the agenda.
    pub timezone: String,
}

impl Default for RemindersSection {
    fn default() -> Self {
        let policy = ReminderPolicy::default();
        Self {
            enabled: policy.enabled,
            nudge_interval_hours: policy.nudge_interval_hours,
            loop_check_minutes: policy.loop_check_minutes,
            cluster_cache_minutes: policy.cluster_cache_minutes,
            timezone: "America/Chicago".to_string(),
        }
    }
}

impl RemindersSection {
    pub fn policy(&self) -> ReminderPolicy {
        ReminderPolicy {
            enabled: self.enabled,
            nudge_interval_hours: self.nudge_interval_hours,
            loop_check_minutes: self.loop_check_minutes,
            cluster_cache_minutes: self.cluster_cache_minutes,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_ram_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    parse_config(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn parse_config(s: &str) -> Result<Config> {
    Ok(toml::from_str(s)?)
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load_config()?;
    println!("# {}", config_path()?.display());
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ram_core::EnergyLevel;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = parse_config("").unwrap();
        assert_eq!(cfg.sequencer, SequencerConfig::default());
        assert_eq!(cfg.reminders.policy(), ReminderPolicy::default());
        assert_eq!(cfg.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg = parse_config(
            r#"
[llm]
model = "llama3"

[sequencer]
adaptive_penalty = 40

[sequencer.energy_match.low]
low = 50
medium = 10
high = -80

[reminders]
timezone = "Europe/Lisbon"
"#,
        )
        .unwrap();

        assert_eq!(cfg.llm.model, "llama3");
        assert_eq!(cfg.llm.timeout_secs, 30);
        assert_eq!(cfg.sequencer.adaptive_penalty, 40);
        assert_eq!(cfg.sequencer.analysis_window, 50);
        assert_eq!(
            cfg.sequencer.energy_match.score(EnergyLevel::High, EnergyLevel::Low),
            -80
        );
        assert_eq!(cfg.reminders.timezone, "Europe/Lisbon");
        assert_eq!(cfg.reminders.nudge_interval_hours, 6);
    }

    #[test]
    fn defaults_survive_a_round_trip() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        let back = parse_config(&text).unwrap();
        assert_eq!(back.sequencer, SequencerConfig::default());
        assert_eq!(back.reminders.timezone, "America/Chicago");
    }
}
