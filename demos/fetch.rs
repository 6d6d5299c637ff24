//! Example fetching a few files with one progress bar per download.
//!
//! Run with `RUST_LOG=trawl=debug` to see what the registry does.

use color_eyre::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing_subscriber::EnvFilter;
use trawl::{Callbacks, DownloadRequest, RegistryBuilder};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let registry = RegistryBuilder::new()
        .directory(PathBuf::from("downloads"))
        .build()?;

    // Fires once every background download below has ended, however it ended.
    let (done_tx, done_rx) = oneshot::channel();
    registry.set_background_completion_handler(move || {
        let _ = done_tx.send(());
    });

    let multi = MultiProgress::new();
    let style = ProgressStyle::default_bar()
        .template("{msg:<12} {bar:40.green/black} {percent:>3}%")?
        .progress_chars("━╾╴─");

    for i in 1..=5 {
        // httpbin serves 256KB of random bytes per seed.
        let url = format!("https://httpbin.org/bytes/256000?seed={}", i);
        let id = format!("sample-{}", i);

        let bar = multi.add(ProgressBar::new(1000));
        bar.set_style(style.clone());
        bar.set_message(id.clone());

        let progress = bar.clone();
        let eta = bar.clone();
        let complete = bar.clone();
        let failed = bar.clone();
        let callbacks = Callbacks::new()
            .on_progress(move |_, fraction| progress.set_position((fraction * 1000.0) as u64))
            .on_remaining_time(move |id, secs| eta.set_message(format!("{} {}s", id, secs)))
            .on_complete(move |id, _| complete.finish_with_message(format!("{} done", id)))
            .on_error(move |id, e| failed.abandon_with_message(format!("{} {}", id, e)))
            .on_cancel(|id| eprintln!("{} canceled", id));

        registry.request(
            DownloadRequest::new(url)
                .id(id)
                .file_name(format!("sample-{}.bin", i))
                .directory("samples")
                .background(true),
            callbacks,
        );
    }

    // Asking again for a running download only attaches another listener.
    registry.request(
        DownloadRequest::new("https://httpbin.org/bytes/256000?seed=1")
            .id("sample-1")
            .file_name("sample-1.bin")
            .directory("samples"),
        Callbacks::new().on_complete(|id, path| println!("{} saved to {:?}", id, path)),
    );

    done_rx.await?;
    println!("\nAll downloads ended.");

    Ok(())
}
