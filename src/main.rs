use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use waldiez::cli;

fn main() {
    let outcome = match cli::parse(std::env::args_os()) {
        Ok(args) => {
            setup_logging(args.verbose);
            cli::dispatch(&args)
        }
        Err(outcome) => outcome,
    };
    std::process::exit(outcome.code);
}

fn setup_logging(verbosity: u8) {
    let filter = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    // Only our own spans and events; dependencies stay quiet
    let module_filter = filter_fn(|metadata| metadata.target().starts_with("waldiez"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    let filtered_layer = fmt_layer.with_filter(filter).with_filter(module_filter);

    tracing_subscriber::registry().with(filtered_layer).init();

    match filter {
        LevelFilter::INFO => tracing::info!("log level: info"),
        LevelFilter::DEBUG => tracing::debug!("log level: debug"),
        LevelFilter::TRACE => tracing::trace!("log level: trace"),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use waldiez::cli::Cli;
    use waldiez::util::testing;

    #[test]
    fn verify_cli() {
        testing::init_test_setup();
        Cli::command().debug_assert();
    }
}
