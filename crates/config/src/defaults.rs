//! Default configuration for acme-tools
//!
//! Written by `acme-tools config init` as a starting point. Every value
//! shown here matches the built-in default, except the placeholders for
//! the email address and the domains.

/// Embedded default configuration in TOML format
pub const DEFAULT_CONFIG_TOML: &str = r#"
# acme-tools configuration

[account]
email = "admin@example.com"
# Use Let's Encrypt staging while testing. Set `directory` to use another CA.
staging = true
file = "~/.config/acme-tools/account.json"

[certificate]
domains = ["example.com", "*.example.com"]
key-type = "RSA2048"
output-dir = "certs"
timeout-secs = 120

[dns-provider]
type = "digitalocean"
# Falls back to DO_AUTH_TOKEN, then DO_AUTH_TOKEN_FILE (default ~/.dotoken)
# credentials-file = "/etc/acme-tools/digitalocean.token"
api-timeout-secs = 30

[propagation]
initial-delay-secs = 0
check-interval-secs = 2
timeout-secs = 120
# nameservers = ["1.1.1.1", "8.8.8.8"]
"#;
