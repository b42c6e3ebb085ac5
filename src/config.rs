#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// What to do when a plan already exists for the requested (user, week).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicatePolicy {
    Reject,
    Replace,
}

impl std::str::FromStr for DuplicatePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "replace" => Ok(Self::Replace),
            other => anyhow::bail!("unknown duplicate plan policy: {other}"),
        }
    }
}

/// Knobs for the weekly plan generator.
#[derive(Debug, Clone)]
pub struct PlanConfig {
    pub scale_min: f64,
    pub scale_max: f64,
    pub duplicate_policy: DuplicatePolicy,
    pub no_repeat_window_days: usize,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            scale_min: 0.5,
            scale_max: 2.0,
            duplicate_policy: DuplicatePolicy::Reject,
            no_repeat_window_days: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub cookie_secure: bool,
    pub plan: PlanConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nutriplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nutriplan-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES", 60)?,
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES", 60 * 24 * 14)?,
        };

        let defaults = PlanConfig::default();
        let plan = PlanConfig {
            scale_min: env_parse("PLAN_SCALE_MIN", defaults.scale_min)?,
            scale_max: env_parse("PLAN_SCALE_MAX", defaults.scale_max)?,
            duplicate_policy: env_parse("PLAN_DUPLICATE_POLICY", defaults.duplicate_policy)?,
            no_repeat_window_days: env_parse(
                "PLAN_NO_REPEAT_WINDOW_DAYS",
                defaults.no_repeat_window_days,
            )?,
        };
        plan.validate()?;

        Ok(Self {
            database_url,
            jwt,
            cookie_secure: env_parse("COOKIE_SECURE", false)?,
            plan,
        })
    }
}

impl PlanConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.scale_min > 0.0, "PLAN_SCALE_MIN must be positive");
        anyhow::ensure!(
            self.scale_min <= self.scale_max,
            "PLAN_SCALE_MIN must not exceed PLAN_SCALE_MAX"
        );
        Ok(())
    }
}

/// Reads an optional env var, falling back to `default` when unset.
/// A set but unparsable value is a startup error.
fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid {key}={raw}: {e}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_policy_parses_case_insensitively() {
        assert_eq!("Replace".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Replace);
        assert_eq!(" reject ".parse::<DuplicatePolicy>().unwrap(), DuplicatePolicy::Reject);
        assert!("overwrite".parse::<DuplicatePolicy>().is_err());
    }

    #[test]
    fn plan_config_rejects_inverted_bounds() {
        let cfg = PlanConfig {
            scale_min: 2.5,
            scale_max: 2.0,
            ..PlanConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(PlanConfig::default().validate().is_ok());
    }
}
