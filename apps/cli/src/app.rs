//! Upload run: wires the engine to the HTTP transport and follows it until
//! every file settled.

use std::path::PathBuf;
use std::sync::Arc;

use dropload_engine::{
    FileMeta, ParamsError, UploadEngine, UploadEvent, UploadHooks, UploadParams, UploadStatus,
};
use dropload_http::HttpTransport;
use tracing::{debug, info, warn};

use crate::config::{Config, UploadTarget};
use crate::files::load_candidate;

/// Resolves every file to the configured target.
pub struct TargetHooks {
    target: UploadTarget,
}

impl TargetHooks {
    pub fn new(target: UploadTarget) -> Self {
        Self { target }
    }
}

impl UploadHooks for TargetHooks {
    fn upload_params(&self, file: &FileMeta) -> Result<UploadParams, ParamsError> {
        if self.target.url.is_empty() {
            return Err(ParamsError::MissingUrl);
        }
        let url = self
            .target
            .url
            .replace("{name}", &file.name)
            .replace("{id}", &file.id.to_string());

        let mut params = UploadParams::new(url).with_method(self.target.method);
        params.headers = self.target.headers.clone();
        params.fields = self.target.fields.clone();
        Ok(params)
    }
}

/// Outcome of a run.
#[derive(Debug, Default)]
pub struct Summary {
    pub done: usize,
    pub failed: Vec<(String, UploadStatus)>,
    pub rejected: Vec<(String, String)>,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.rejected.is_empty()
    }
}

/// Uploads `paths` and waits until each file reached a final status.
pub async fn run(config: Config, paths: Vec<PathBuf>) -> anyhow::Result<Summary> {
    config.validate()?;

    let candidates = paths
        .iter()
        .map(|p| load_candidate(p))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let transport = Arc::new(HttpTransport::new()?);
    let hooks = Arc::new(TargetHooks::new(config.upload.clone()));
    let mut engine = UploadEngine::new(config.engine.clone(), hooks, transport);
    let mut events = engine
        .take_events()
        .ok_or_else(|| anyhow::anyhow!("engine events already taken"))?;

    let report = engine.add_files(candidates);
    let mut summary = Summary::default();
    for entry in engine.rejected_files() {
        let reasons = entry
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        warn!(name = entry.file.name(), status = %entry.status, %reasons, "file rejected");
        summary.rejected.push((entry.file.name().to_string(), reasons));
    }
    if report.accepted.is_empty() {
        return Ok(summary);
    }
    if !engine.config().auto_upload {
        engine.upload_all();
    }

    while !settled(&engine) {
        tokio::select! {
            event = events.recv() => match event {
                Some(UploadEvent::StatusChanged { id, status }) => {
                    let name = engine.file(id).map(|f| f.meta.name).unwrap_or_default();
                    info!(file = %id, %name, %status, "status changed");
                }
                Some(UploadEvent::Progress { id, progress, estimated }) => {
                    debug!(file = %id, progress, estimated, "progress");
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, aborting uploads");
                for id in &report.accepted {
                    engine.cancel(*id);
                }
                break;
            }
        }
    }

    for file in engine.files() {
        if file.status() == UploadStatus::Done {
            summary.done += 1;
        } else {
            summary.failed.push((file.meta.name.clone(), file.status()));
        }
    }
    engine.shutdown();
    Ok(summary)
}

fn settled(engine: &UploadEngine) -> bool {
    engine
        .files()
        .iter()
        .all(|f| f.status().is_finished() || f.status().is_rejection())
}
