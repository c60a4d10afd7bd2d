use std::str::FromStr;
use std::sync::Once;

use log::{info, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

const CONSOLE_APPENDER: &str = "stderr";
const LOG_FORMAT_CONSOLE: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:>5.5})} [{T:>15.15}] {t:<30.30} : {m}{n}";
// third party crates that are too chatty at debug level
const QUIET_TARGETS: [&str; 3] = ["hyper", "hyper_util", "reqwest"];

static INIT: Once = Once::new();

/// Installs the console logger. Only the first call has any effect.
pub fn init(level: &str) {
    INIT.call_once(|| {
        let root_level = match LevelFilter::from_str(level) {
            Ok(e) => e,
            Err(e) => {
                eprintln!("Failed to parse log level {}, {}", level, e);
                LevelFilter::Info
            }
        };

        let console = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(LOG_FORMAT_CONSOLE)))
            .build();
        let mut builder = Config::builder()
            .appender(Appender::builder().build(CONSOLE_APPENDER, Box::new(console)));
        for target in QUIET_TARGETS {
            builder = builder.logger(Logger::builder().build(target, LevelFilter::Warn));
        }

        let config = match builder.build(Root::builder().appender(CONSOLE_APPENDER).build(root_level)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to build logger config, {}", e);
                return;
            }
        };

        match log4rs::init_config(config) {
            Ok(_) => info!("logger initialized at level {}", root_level),
            Err(e) => eprintln!("Failed to configure logger, {}", e),
        }
    });
}
