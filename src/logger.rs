/* Logger initialization */
use std::{panic, thread};

use tracing::{error, level_filters::LevelFilter};
use tracing_appender::non_blocking::WorkerGuard;

use crate::CargoEnv;

pub struct LoggerGuards {
    pub _tracing_guard: WorkerGuard,
    // only there when a dsn was configured
    pub _sentry_guard: Option<sentry::ClientInitGuard>,
}

pub struct Logger {}

impl Logger {
    pub fn init(cargo_env: CargoEnv, sentry_dsn: Option<String>) -> LoggerGuards {
        // progress of a run is the whole point in development, production keeps the chrome chatter
        // and per request decisions as well
        let max_level = match cargo_env {
            CargoEnv::Development => LevelFilter::INFO,
            CargoEnv::Production => LevelFilter::DEBUG,
        };

        // scheduled runs in production write to a file, interactive runs want stdout
        let (non_blocking, guard) = match cargo_env {
            CargoEnv::Development => tracing_appender::non_blocking(std::io::stdout()),
            CargoEnv::Production => {
                tracing_appender::non_blocking(tracing_appender::rolling::daily("logs", "hattrick.log"))
            }
        };

        let sentry_guard = sentry_dsn.map(|dsn| {
            sentry::init((
                dsn,
                sentry::ClientOptions {
                    release: sentry::release_name!(),
                    environment: Some(environment_name(cargo_env).into()),
                    attach_stacktrace: true,
                    ..Default::default()
                },
            ))
        });

        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(non_blocking);

        let registry = tracing_subscriber::registry()
            .with(max_level)
            .with(fmt_layer);

        if sentry_guard.is_some() {
            registry.with(sentry_tracing::layer()).init();
        } else {
            registry.init();
        }

        install_panic_hook();

        // both guards have to outlive main or buffered lines get lost
        LoggerGuards {
            _tracing_guard: guard,
            _sentry_guard: sentry_guard,
        }
    }
}

fn environment_name(cargo_env: CargoEnv) -> &'static str {
    match cargo_env {
        CargoEnv::Development => "development",
        CargoEnv::Production => "production",
    }
}

// panics inside resolution tasks would otherwise only show up as a JoinError
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let thread = thread::current();
        let thread = thread.name().unwrap_or("unknown");
        let msg = panic_message(info.payload());
        let backtrace = backtrace::Backtrace::new();

        match info.location() {
            Some(location) => error!(
                target: "panic", "thread '{}' panicked at '{}': {}:{}\n{:?}",
                thread,
                msg,
                location.file(),
                location.line(),
                backtrace
            ),
            None => error!(
                target: "panic", "thread '{}' panicked at '{}'\n{:?}",
                thread,
                msg,
                backtrace
            ),
        }
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "Box<Any>"
    }
}
