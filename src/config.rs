use std::path::PathBuf;
use std::time::Duration;

#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

// every option has a default, running the binary bare does the normal scrape
#[derive(clap::Parser, Debug)]
#[clap(about = "Resolves live channel pages into a playable m3u playlist")]
pub struct AppConfig {
    // production or development, production logs to a file instead of stdout
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,

    // page with the channel buttons
    #[clap(long, env, default_value = "https://hattrick.ws/")]
    pub source_url: String,

    // timeout for the channel list request
    #[clap(long, env, default_value = "15")]
    pub list_timeout_secs: u64,

    // where the playlist ends up, relative to the working directory
    #[clap(long, env, default_value = "hattrick.m3u8")]
    pub output_path: PathBuf,

    // number of chrome processes, every resolution shares these
    #[clap(long, env, default_value = "5")]
    pub pool_size: usize,

    // falls back to searching PATH and the usual install locations
    #[clap(long, env)]
    pub chrome_path: Option<PathBuf>,

    // bound on page load, also the overall deadline of one resolution
    #[clap(long, env, default_value = "45000")]
    pub navigation_timeout_ms: u64,

    // how long to keep listening after load before scanning frames
    #[clap(long, env, default_value = "3000")]
    pub grace_period_ms: u64,

    // unset means one task per channel with no cap, the pool is the only limit
    #[clap(long, env)]
    pub max_concurrent_resolutions: Option<usize>,

    // probe every manifest name under a token path instead of trusting the first one
    #[clap(long, env)]
    pub verify_manifests: bool,

    // e.g. planetary.lovecdn.ru, every resolved address gets moved onto this host
    #[clap(long, env)]
    pub mirror_host: Option<String>,

    #[clap(
        long,
        env,
        default_value = "https://resource-m.calcionapoli24.it/www/thumbs/1200x/1590651555_987.jpg"
    )]
    pub logo_url: String,

    #[clap(long, env, default_value = "Sky Sport IPTV")]
    pub group_title: String,
}

impl AppConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn list_timeout(&self) -> Duration {
        Duration::from_secs(self.list_timeout_secs)
    }
}

impl Default for AppConfig {
    // same values as the clap defaults, tests build on this
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            sentry_dsn: None,
            source_url: "https://hattrick.ws/".to_string(),
            list_timeout_secs: 15,
            output_path: PathBuf::from("hattrick.m3u8"),
            pool_size: 5,
            chrome_path: None,
            navigation_timeout_ms: 45_000,
            grace_period_ms: 3_000,
            max_concurrent_resolutions: None,
            verify_manifests: false,
            mirror_host: None,
            logo_url: "https://resource-m.calcionapoli24.it/www/thumbs/1200x/1590651555_987.jpg"
                .to_string(),
            group_title: "Sky Sport IPTV".to_string(),
        }
    }
}
