//! Logger setup.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use env_logger::{Builder, Env, Target};

use crate::error::Result;

const DEFAULT_FILTER: &str = "letterbot=info";

/// Installs the global logger.
///
/// With a log file, the file is truncated and receives every record;
/// otherwise records go to stderr. `RUST_LOG` overrides the default filter.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(DEFAULT_FILTER));

    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} {:<5} {}:{} {}",
            buf.timestamp_seconds(),
            record.level(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = File::create(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    builder.try_init()?;
    Ok(())
}
