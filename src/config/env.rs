use super::IntentHookConfig;

/// Bind address override
pub const ENV_BIND_ADDR: &str = "INTENT_HOOK_BIND_ADDR";

/// Webhook body size limit override (bytes)
pub const ENV_BODY_SIZE_LIMIT_BYTES: &str = "INTENT_HOOK_BODY_SIZE_LIMIT_BYTES";

impl IntentHookConfig {
    /// Apply overrides from process environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup; unparseable values are ignored
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_BIND_ADDR) {
            if !v.trim().is_empty() {
                self.server.bind_addr = v.trim().to_string();
            }
        }
        if let Some(v) = lookup(ENV_BODY_SIZE_LIMIT_BYTES) {
            if let Ok(n) = v.trim().parse::<usize>() {
                self.api.body_size_limit_bytes = n;
            }
        }
    }
}
