use std::fs;
use std::path::Path;

/// Loads `KEY=value` pairs from a dotenv file without overriding variables
/// that are already set. A missing file is not an error.
pub fn load_dot_env(path: &Path) {
    if !path.exists() {
        return;
    }

    let content = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!("[ENV] Failed to read {}: {}", path.display(), e);
            return;
        }
    };

    for (key, value) in parse_dot_env(&content) {
        if std::env::var_os(&key).is_some() {
            continue;
        }
        std::env::set_var(key, value);
    }
}

fn parse_dot_env(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some((key, value)) = trimmed.split_once('=') else {
            continue;
        };

        let value_no_comment = value.split('#').next().unwrap_or("").trim();
        let parsed = if value_no_comment.len() >= 2
            && ((value_no_comment.starts_with('"') && value_no_comment.ends_with('"'))
                || (value_no_comment.starts_with('\'') && value_no_comment.ends_with('\'')))
        {
            &value_no_comment[1..value_no_comment.len() - 1]
        } else {
            value_no_comment
        };

        pairs.push((key.trim().to_string(), parsed.to_string()));
    }
    pairs
}

/// Loads `./.env` and warns about keys the RPC and explorer clients need.
pub fn harden_env_setup() {
    load_dot_env(Path::new(".env"));
    for key in ["ETH_RPC_URL", "DEPLOYER_PRIVATE_KEY", "ETHERSCAN_API_KEY"] {
        if std::env::var(key).is_err() {
            tracing::warn!("[ENV] {} is not set", key);
        }
    }
}
