/// Engine tuning knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrently scheduled joiner clones per statement.
    /// Main rows beyond this bound are shed at scheduling time, not queued.
    pub max_nested_requests: usize,
}

pub const DEFAULT_MAX_NESTED_REQUESTS: usize = 50;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_nested_requests: DEFAULT_MAX_NESTED_REQUESTS,
        }
    }
}

impl EngineConfig {
    pub fn new(max_nested_requests: usize) -> Self {
        Self {
            max_nested_requests,
        }
    }

    /// Read overrides from the environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var("FEDQL_MAX_NESTED_REQUESTS") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.max_nested_requests = n,
                _ => {
                    tracing::warn!("Ignoring invalid FEDQL_MAX_NESTED_REQUESTS value: {}", raw);
                }
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.max_nested_requests, DEFAULT_MAX_NESTED_REQUESTS);
    }

    #[test]
    fn explicit_limit() {
        let config = EngineConfig::new(3);
        assert_eq!(config.max_nested_requests, 3);
    }
}
