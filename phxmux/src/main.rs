mod command;
mod config;
mod feed;
mod shell;

use anyhow::Result;
use env_logger::{Builder, Env};
use std::io::Write;

fn setup_logger() {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder
        .format_timestamp_millis()
        .format(|buf, record| {
            let lvl = buf.default_level_style(record.level()).bold();

            writeln!(
                buf,
                "{} - [{lvl}{:5}{lvl:#}] {}:{} - {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or_default(),
                record.line().unwrap_or_default(),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Always)
        .init();
}

#[tokio::main]
pub async fn main() -> Result<()> {
    setup_logger();

    let cli = config::cli();

    let config = config::load(&cli)?;

    let mut shell = shell::Shell::new(config.connection);

    shell.run().await
}
