use std::env;
use std::time::Duration;

/// Tunables for the engine, all overridable from the environment so
/// deployments can reshape phase pacing and role balance without a rebuild.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub night_duration: Duration,
    pub day_duration: Duration,
    pub vote_duration: Duration,
    /// How long the results screen stays up before the session is archived.
    pub results_duration: Duration,
    pub doctor_enabled: bool,
    pub prostitute_enabled: bool,
    /// Relative weight of a privilege-bonus holder in the mafia-seat draw.
    pub privilege_weight: f64,
    pub settlement_url: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            night_duration: Duration::from_secs(60),
            day_duration: Duration::from_secs(90),
            vote_duration: Duration::from_secs(60),
            results_duration: Duration::from_secs(15),
            doctor_enabled: true,
            prostitute_enabled: true,
            privilege_weight: 2.0,
            settlement_url: None,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let secs = |var: &str, fallback: Duration| {
            env::var(var)
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback)
        };
        let flag = |var: &str, fallback: bool| {
            env::var(var).map(|v| v == "true").unwrap_or(fallback)
        };

        Self {
            night_duration: secs("PHASE_NIGHT_SECONDS", defaults.night_duration),
            day_duration: secs("PHASE_DAY_SECONDS", defaults.day_duration),
            vote_duration: secs("PHASE_VOTE_SECONDS", defaults.vote_duration),
            results_duration: secs("PHASE_RESULTS_SECONDS", defaults.results_duration),
            doctor_enabled: flag("ROLE_DOCTOR_ENABLED", defaults.doctor_enabled),
            prostitute_enabled: flag("ROLE_PROSTITUTE_ENABLED", defaults.prostitute_enabled),
            privilege_weight: env::var("PRIVILEGE_MAFIA_WEIGHT")
                .ok()
                .and_then(|v| v.parse::<f64>().ok())
                .filter(|w| *w >= 1.0)
                .unwrap_or(defaults.privilege_weight),
            settlement_url: env::var("SETTLEMENT_URL").ok().filter(|v| !v.is_empty()),
        }
    }
}
