use anyhow::Result;
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;
use tracing::{error, info, warn};

/// Calls `on_change` whenever one of the watched template files changes
pub struct TemplateWatcher {
    _watcher: RecommendedWatcher,
}

impl TemplateWatcher {
    pub fn new<F>(paths: Vec<PathBuf>, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(tx, Config::default())?;

        for path in &paths {
            if path.exists() {
                watcher.watch(Path::new(path), RecursiveMode::NonRecursive)?;
                info!("Watching template: {}", path.display());
            } else {
                warn!("Template path does not exist, skipping: {}", path.display());
            }
        }

        std::thread::spawn(move || loop {
            match rx.recv() {
                Ok(Ok(event)) => {
                    let event: notify::Event = event;
                    if event.kind.is_access() {
                        continue;
                    }
                    // Editors write in several steps; let them settle
                    std::thread::sleep(Duration::from_millis(100));
                    while rx.try_recv().is_ok() {}
                    info!("Template change detected, re-rendering...");
                    on_change();
                }
                Ok(Err(e)) => error!("Watch error: {:?}", e),
                Err(_) => break,
            }
        });

        Ok(Self { _watcher: watcher })
    }
}
