use anyhow::Context as _;
use clap::Args;
use clap::builder::BoolishValueParser;
use unrelated_jira_tools::JiraConfig;
use unrelated_jira_tools::config::DEFAULT_TIMEOUT_SECONDS;
use unrelated_jira_tools::retry::RetryPolicy;

/// Connection and policy settings. Every flag can also come from its `JIRA_*` variable; an
/// explicit flag wins.
#[derive(Debug, Clone, Args)]
pub struct JiraArgs {
    /// Jira base URL, e.g. `https://example.atlassian.net`.
    #[arg(long = "url", env = "JIRA_URL")]
    pub url: Option<String>,

    /// Account name for API-token (basic) auth.
    #[arg(long, env = "JIRA_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Personal access token (bearer auth). Mutually exclusive with username + API token.
    #[arg(long, env = "JIRA_PERSONAL_ACCESS_TOKEN", hide_env_values = true)]
    pub personal_access_token: Option<String>,

    /// Refuse every write tool. Directly before a subcommand, pass an explicit value
    /// (`--read-only=true`).
    #[arg(
        long,
        env = "JIRA_READ_ONLY",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub read_only: bool,

    /// Comma-separated allow-list of tool names. Empty means all tools.
    #[arg(long, env = "JIRA_ENABLED_TOOLS", value_delimiter = ',')]
    pub enabled_tools: Vec<String>,

    /// Per-attempt request timeout in seconds.
    #[arg(long = "timeout", env = "JIRA_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub timeout_seconds: u64,

    #[arg(
        long = "verify-ssl",
        env = "JIRA_VERIFY_SSL",
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "true",
        default_missing_value = "true"
    )]
    pub verify_ssl: bool,

    /// Total attempts per request, including the first one. Overrides `--max-retries`.
    #[arg(long, env = "JIRA_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,

    /// Retries after the first attempt.
    #[arg(
        long,
        env = "JIRA_MAX_RETRIES",
        value_parser = clap::value_parser!(u32).range(0..=9)
    )]
    pub max_retries: Option<u32>,
}

impl JiraArgs {
    /// Build the library config. Validation happens once, inside the dispatcher constructor.
    pub fn into_config(self) -> anyhow::Result<JiraConfig> {
        let base_url = self
            .url
            .filter(|u| !u.trim().is_empty())
            .context("missing Jira URL (set --url or JIRA_URL)")?;

        let mut retry = RetryPolicy::default();
        if let Some(attempts) = self.max_attempts.or(self.max_retries.map(|r| r + 1)) {
            retry.maximum_attempts = attempts;
        }

        let mut config = JiraConfig::new(base_url)
            .with_read_only(self.read_only)
            .with_enabled_tools(
                self.enabled_tools
                    .into_iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty()),
            )
            .with_retry(retry);
        config.username = self.username;
        config.api_token = self.api_token;
        config.personal_access_token = self.personal_access_token;
        config.timeout_seconds = self.timeout_seconds;
        config.verify_tls = self.verify_ssl;
        Ok(config)
    }
}
