use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

pub mod bytes;
pub mod gff;
pub mod gff_json;
pub mod ini;
pub mod locstring;
pub mod resref;
pub mod tlk;
pub mod twoda;

pub fn initialize_logger(
    log_level: LevelFilter,
    file_path: Option<&str>,
) -> Result<(), SetLoggerError> {
    // Build a stderr logger - always for now.
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();

    let mut config_builder = Config::builder();
    let mut root_builder = Root::builder();

    if let Some(path) = file_path {
        // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
        if let Ok(logfile) = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{l} - {m}\n")))
            .build(path)
        {
            config_builder =
                config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
            root_builder = root_builder.appender("logfile");
        }
    }

    let config = config_builder
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(root_builder.appender("stderr").build(log_level))
        .expect("logger config is statically well-formed");

    // Use this to change log levels at runtime.
    let _handle = log4rs::init_config(config)?;

    Ok(())
}
