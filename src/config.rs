use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub data_file: PathBuf,
    pub uploads_dir: PathBuf,
    pub public_dir: PathBuf,
    pub public_base_url: String,
    pub discord: DiscordConfig,
    pub close_channel_delay: Duration,
}

/// Chat platform credentials and the channels the bot works in.
#[derive(Clone, Debug, Default)]
pub struct DiscordConfig {
    pub token: String,
    pub api_base: String,
    pub guild_id: String,
    pub requests_channel_id: String,
    pub announcements_channel_id: String,
    pub tickets_category_id: String,
    pub bot_user_id: String,
    /// Hex Ed25519 key the platform signs interaction requests with.
    pub application_public_key: String,
}

impl DiscordConfig {
    pub fn is_enabled(&self) -> bool {
        !self.token.is_empty()
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let port: u16 = var_or("PORT", "3000").parse().unwrap_or(3000);
        Ok(Self {
            port,
            data_file: var_or("DATA_FILE", "data.json").into(),
            uploads_dir: var_or("UPLOADS_DIR", "public/uploads").into(),
            public_dir: var_or("PUBLIC_DIR", "public").into(),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
            discord: DiscordConfig {
                token: var_or("DISCORD_TOKEN", ""),
                api_base: var_or("DISCORD_API_BASE", "https://discord.com/api/v10"),
                guild_id: var_or("GUILD_ID", ""),
                requests_channel_id: var_or("CHANNEL_ID_REQUESTS", ""),
                announcements_channel_id: var_or("CHANNEL_ID_ANNOUNCEMENTS", ""),
                tickets_category_id: var_or("CATEGORY_ID_TICKETS", ""),
                bot_user_id: var_or("BOT_USER_ID", ""),
                application_public_key: var_or("APPLICATION_PUBLIC_KEY", ""),
            },
            close_channel_delay: Duration::from_secs(
                var_or("CLOSE_CHANNEL_DELAY_SECS", "5").parse().unwrap_or(5),
            ),
        })
    }

    /// Config rooted in `dir`, with the platform adapter disabled. Used by tests and tooling.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            port: 0,
            data_file: dir.join("data.json"),
            uploads_dir: dir.join("uploads"),
            public_dir: dir.join("public"),
            public_base_url: "http://localhost".to_string(),
            discord: DiscordConfig::default(),
            close_channel_delay: Duration::from_secs(5),
        }
    }
}
