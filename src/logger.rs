use crate::env;
use log::{Level, Log, Metadata, Record};

struct Logger;

static LOGGER: Logger = Logger;

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= *env::PORTSIDE_LOG
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        match record.level() {
            Level::Error => eprintln!("{} {}", console::style("error").red().bold(), record.args()),
            Level::Warn => eprintln!("{} {}", console::style("warn").yellow(), record.args()),
            Level::Info => eprintln!("{}", record.args()),
            Level::Debug | Level::Trace => eprintln!(
                "{}",
                console::style(format!("[{}] {}", record.target(), record.args())).dim()
            ),
        }
    }

    fn flush(&self) {}
}

pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(*env::PORTSIDE_LOG);
    }
}
