use std::sync::LazyLock;

use derive_from_env::FromEnv;

#[derive(FromEnv)]
#[from_env(prefix = "TERMSINK")]
#[allow(non_snake_case)]
pub struct TermsinkConfig {
    #[from_env(default = "automatic")]
    pub COLOR_MODE: String,
    #[from_env(default = "[%Y-%m-%d %H:%M:%S.%e] [%^%l%$] %v")]
    pub PATTERN: String,
}

pub static TERMSINK_CONFIG: LazyLock<TermsinkConfig> =
    LazyLock::new(|| TermsinkConfig::from_env().unwrap());

#[test]
fn test_default_pattern_matches_formatter_default() {
    if std::env::var_os("TERMSINK_PATTERN").is_none() {
        assert_eq!(TERMSINK_CONFIG.PATTERN, crate::pattern::DEFAULT_PATTERN);
    }
}
