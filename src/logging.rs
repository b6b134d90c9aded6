//! Log output for the probe.
//!
//! The library never touches the global logger. Everything it reports goes to the
//! [`log::Log`] instance handed to it, which lets tests capture the output and lets
//! the binary route it to both a file and the console.

use std::path::Path;

use log::{Level, LevelFilter, Log, Record};

/// Log a formatted message to an explicit [`Log`] instance.
macro_rules! emit {
    ($logger:expr, $level:expr, $($arg:tt)+) => {
        $crate::logging::write_record($logger, $level, module_path!(), format_args!($($arg)+))
    };
}
pub(crate) use emit;

#[doc(hidden)]
pub fn write_record(logger: &dyn Log, level: Level, target: &str, args: core::fmt::Arguments<'_>) {
    logger.log(&Record::builder().level(level).target(target).args(args).build());
}

/// Build the two sinks used by the command line tool.
///
/// * `log_file` - appended to, everything from debug upward, full timestamp and target.
/// * stdout - info upward, time of day only.
///
/// Returns the most verbose level enabled and the logger itself, ready to be installed
/// with [`log::set_boxed_logger`] or leaked and shared.
pub fn build_dispatch(
    log_file: impl AsRef<Path>,
) -> Result<(LevelFilter, Box<dyn Log>), std::io::Error> {
    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(LevelFilter::Debug)
        .chain(fern::log_file(log_file)?);

    let console = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} - {} - {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                message
            ))
        })
        .level(LevelFilter::Info)
        .chain(std::io::stdout());

    Ok(fern::Dispatch::new()
        .level(LevelFilter::Debug)
        .chain(file)
        .chain(console)
        .into_log())
}
