use log::{LevelFilter, info};

use crate::EPOCH;

/// Console logger with a level, run-relative timestamp and thread prefix.
pub fn init_logger(level_filter: Option<LevelFilter>) {
    let level_filter = level_filter.unwrap_or(LevelFilter::Info);
    fern::Dispatch::new()
        .format(|out, message, record| {
            let thread = std::thread::current();
            let elapsed = EPOCH.elapsed().as_secs();
            let prefix = format!(
                "[{}] [{:0>2}:{:0>2}:{:0>2}] <{}>",
                record.level(),
                elapsed / 3600,
                (elapsed / 60) % 60,
                elapsed % 60,
                thread.name().unwrap_or("-"),
            );
            out.finish(format_args!("{prefix:<27}{message}"))
        })
        .level(level_filter)
        .chain(std::io::stdout())
        .apply()
        .expect("could not initialize logger");
    info!(
        "time: {}",
        humantime::format_rfc3339_seconds(std::time::SystemTime::now())
    );
}
