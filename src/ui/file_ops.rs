//! Layout save and load.
//!
//! Dialogs run off the UI thread and report back over an mpsc channel, so the
//! frame loop never blocks on the file system. On the web build only loading
//! is wired up; browsers give no path to write back to.

use std::sync::mpsc::{channel, Receiver, Sender};

use eframe::egui;
use log::{error, info};

use crate::model::LayoutSnapshot;

use super::BentoApp;

/// Outcome of an async file operation, delivered over the channel.
pub(super) enum FileOperationResult {
    SaveCompleted(String),
    LoadCompleted(String, String),
    OperationFailed(String),
}

/// Channel plumbing and the queued operation flags.
pub(super) struct FileState {
    pub current_path: Option<String>,
    sender: Sender<FileOperationResult>,
    receiver: Receiver<FileOperationResult>,
    pending_save: bool,
    pending_load: bool,
}

impl FileState {
    pub(super) fn new() -> Self {
        let (sender, receiver) = channel();
        Self {
            current_path: None,
            sender,
            receiver,
            pending_save: false,
            pending_load: false,
        }
    }
}

impl BentoApp {
    /// Queues a save dialog for the next frame.
    pub(super) fn request_save(&mut self) {
        self.file.pending_save = true;
    }

    /// Queues a load dialog for the next frame.
    pub(super) fn request_load(&mut self) {
        self.file.pending_load = true;
    }

    /// Drains completed operations and launches queued ones. Called once per
    /// frame before any panel is drawn.
    pub(super) fn handle_pending_file_operations(&mut self, ctx: &egui::Context) {
        while let Ok(result) = self.file.receiver.try_recv() {
            match result {
                FileOperationResult::SaveCompleted(path) => {
                    info!("layout saved to {path}");
                    self.file.current_path = Some(path);
                }
                FileOperationResult::LoadCompleted(path, content) => {
                    match serde_json::from_str::<LayoutSnapshot>(&content) {
                        Ok(snapshot) => {
                            self.model.restore(&snapshot);
                            self.file.current_path = Some(path);
                            info!("layout loaded");
                        }
                        Err(e) => error!("failed to parse layout: {e}"),
                    }
                }
                FileOperationResult::OperationFailed(e) => error!("file operation failed: {e}"),
            }
        }

        if self.file.pending_save {
            self.file.pending_save = false;
            match serde_json::to_string_pretty(&self.model.snapshot()) {
                Ok(json) => spawn_save(ctx.clone(), self.file.sender.clone(), json),
                Err(e) => error!("failed to serialize layout: {e}"),
            }
        }

        if self.file.pending_load {
            self.file.pending_load = false;
            spawn_load(ctx.clone(), self.file.sender.clone());
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_save(ctx: egui::Context, sender: Sender<FileOperationResult>, json: String) {
    std::thread::spawn(move || {
        futures::executor::block_on(async move {
            if let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("JSON", &["json"])
                .set_file_name("layout.json")
                .save_file()
                .await
            {
                let path = handle.path().to_path_buf();
                let result = match std::fs::write(&path, json) {
                    Ok(()) => FileOperationResult::SaveCompleted(path.display().to_string()),
                    Err(e) => FileOperationResult::OperationFailed(format!(
                        "failed to save layout: {e}"
                    )),
                };
                let _ = sender.send(result);
            }
            ctx.request_repaint();
        });
    });
}

#[cfg(target_arch = "wasm32")]
fn spawn_save(_ctx: egui::Context, _sender: Sender<FileOperationResult>, _json: String) {
    log::warn!("saving layouts is not supported in the browser build");
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_load(ctx: egui::Context, sender: Sender<FileOperationResult>) {
    std::thread::spawn(move || {
        futures::executor::block_on(async move {
            if let Some(handle) = rfd::AsyncFileDialog::new()
                .add_filter("JSON", &["json"])
                .pick_file()
                .await
            {
                let path = handle.path().to_path_buf();
                let result = match std::fs::read_to_string(&path) {
                    Ok(json) => {
                        FileOperationResult::LoadCompleted(path.display().to_string(), json)
                    }
                    Err(e) => FileOperationResult::OperationFailed(format!(
                        "failed to read layout: {e}"
                    )),
                };
                let _ = sender.send(result);
            }
            ctx.request_repaint();
        });
    });
}

#[cfg(target_arch = "wasm32")]
fn spawn_load(ctx: egui::Context, sender: Sender<FileOperationResult>) {
    wasm_bindgen_futures::spawn_local(async move {
        if let Some(handle) = rfd::AsyncFileDialog::new()
            .add_filter("JSON", &["json"])
            .pick_file()
            .await
        {
            let name = handle.file_name();
            match String::from_utf8(handle.read().await) {
                Ok(json) => {
                    let _ = sender.send(FileOperationResult::LoadCompleted(name, json));
                }
                Err(e) => {
                    let _ = sender.send(FileOperationResult::OperationFailed(format!(
                        "layout file is not UTF-8: {e}"
                    )));
                }
            }
        }
        ctx.request_repaint();
    });
}
