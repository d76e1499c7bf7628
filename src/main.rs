mod connection;
mod event;
mod lyrics;
mod pool;
mod progress;
mod state;
mod timer;
mod ui;

use crate::connection::{Backoff, WsConnector};
use crate::lyrics::LyricOptions;
use crate::progress::ProgressReconciler;
use crate::state::StateStore;
use clap::Parser;
use std::error::Error;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application configuration from CLI
#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Config {
    /// Websocket endpoint of the player's event source
    #[arg(long, env = "LYRICSYNC_URL", default_value = "ws://127.0.0.1:8765")]
    pub url: String,
    /// Forward offset added to every progress update, in milliseconds
    #[arg(long, default_value_t = 140)]
    pub compensation_ms: u64,
    /// How often the reconciled position is republished, in Hz
    #[arg(long, default_value_t = 60)]
    pub refresh_hz: u32,
    /// First reconnect delay in milliseconds
    #[arg(long, default_value_t = 500)]
    pub backoff_min_ms: u64,
    /// Upper bound for the reconnect delay in milliseconds
    #[arg(long, default_value_t = 30_000)]
    pub backoff_max_ms: u64,
    /// Reconnect after this many seconds without a frame (0 disables)
    #[arg(long, default_value_t = 30)]
    pub idle_timeout_secs: u64,
    /// Frame sent after every successful connect, e.g. a subscription request
    #[arg(long)]
    pub subscribe: Option<String>,
    /// Display time given to the last line of line-level lyrics, in milliseconds
    #[arg(long, default_value_t = lyrics::types::DEFAULT_LAST_LINE_MS)]
    pub last_line_ms: u64,
    /// Disable karaoke (per-syllable) timing overlays
    #[arg(long = "no-karaoke")]
    pub no_karaoke: bool,
    /// Disable translation overlays
    #[arg(long = "no-translation")]
    pub no_translation: bool,
    /// Log at debug level to stderr unless RUST_LOG says otherwise
    #[arg(long)]
    pub debug_log: bool,
}

impl Config {
    pub fn compensation(&self) -> Duration {
        Duration::from_millis(self.compensation_ms)
    }

    pub fn refresh_interval(&self) -> Duration {
        pool::refresh_interval(self.refresh_hz)
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(
            Duration::from_millis(self.backoff_min_ms),
            Duration::from_millis(self.backoff_max_ms),
        )
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }

    pub fn lyric_options(&self) -> LyricOptions {
        LyricOptions {
            karaoke: !self.no_karaoke,
            translation: !self.no_translation,
            last_line_ms: self.last_line_ms,
        }
    }
}

fn init_logging(debug_log: bool) {
    let default = if debug_log { "lyricsync=debug" } else { "lyricsync=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout carries lyric lines only
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cfg = Config::parse();
    init_logging(cfg.debug_log);

    let store = StateStore::new();
    let handle = store.handle();
    let pipeline = pool::Pipeline::new(
        store,
        ProgressReconciler::new(cfg.compensation()),
        cfg.lyric_options(),
    );
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    info!(url = %cfg.url, "starting");
    let listener = tokio::spawn(pool::listen(
        pipeline,
        WsConnector::new(cfg.url.clone()),
        shutdown_rx,
        cfg.clone(),
    ));

    let result = tokio::select! {
        result = ui::pipe::display_lyrics_pipe(handle) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    let _ = shutdown_tx.send(()).await;
    listener.await?;

    // Print error if any, for better diagnostics
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::parse_from(["lyricsync", "--url", "ws://example:1"]);
        assert_eq!(cfg.url, "ws://example:1");
        assert_eq!(cfg.compensation(), Duration::from_millis(140));
        assert_eq!(cfg.idle_timeout(), Some(Duration::from_secs(30)));
        let opts = cfg.lyric_options();
        assert!(opts.karaoke && opts.translation);
        assert_eq!(opts.last_line_ms, 5_000);
    }

    #[test]
    fn flags_override_defaults() {
        let cfg = Config::parse_from([
            "lyricsync",
            "--url",
            "ws://example:1",
            "--idle-timeout-secs",
            "0",
            "--no-karaoke",
            "--no-translation",
            "--backoff-min-ms",
            "100",
            "--backoff-max-ms",
            "400",
        ]);
        assert_eq!(cfg.idle_timeout(), None);
        let opts = cfg.lyric_options();
        assert!(!opts.karaoke && !opts.translation);
        let mut backoff = cfg.backoff();
        let delays: Vec<_> = (0..4).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 400]);
    }
}
