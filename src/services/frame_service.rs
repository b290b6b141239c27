use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;

use crate::error::AppResult;

/// Messages posted to the page hosting the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HostMessage {
    #[serde(rename = "setIframeHeight")]
    SetIframeHeight { height: u32 },
}

pub trait HostBridge: Send + Sync {
    fn post_message(&self, message: &HostMessage) -> AppResult<()>;
}

/// Bridge for runs with no host page: messages only go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogBridge;

impl HostBridge for LogBridge {
    fn post_message(&self, message: &HostMessage) -> AppResult<()> {
        log::debug!("host message: {}", serde_json::to_string(message)?);
        Ok(())
    }
}

/// Writes each message as one JSON line, e.g. to a pipe read by the host.
pub struct WriterBridge<W> {
    out: Mutex<W>,
}

impl<W: Write + Send> WriterBridge<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|e| e.into_inner())
    }
}

impl<W: Write + Send> HostBridge for WriterBridge<W> {
    fn post_message(&self, message: &HostMessage) -> AppResult<()> {
        let line = serde_json::to_string(message)?;
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// Keeps the host informed of the form's rendered height.
pub struct FrameReporter<B> {
    bridge: B,
}

impl<B: HostBridge> FrameReporter<B> {
    pub fn new(bridge: B) -> Self {
        Self { bridge }
    }

    pub fn on_mount(&self, height: u32) -> AppResult<()> {
        self.report(height)
    }

    pub fn on_resize(&self, height: u32) -> AppResult<()> {
        self.report(height)
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    fn report(&self, height: u32) -> AppResult<()> {
        self.bridge
            .post_message(&HostMessage::SetIframeHeight { height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_message_shape() {
        let json = serde_json::to_value(HostMessage::SetIframeHeight { height: 812 }).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "setIframeHeight", "height": 812 }));
    }

    #[test]
    fn test_reports_on_mount_and_every_resize() {
        let reporter = FrameReporter::new(WriterBridge::new(Vec::new()));
        reporter.on_mount(640).unwrap();
        reporter.on_resize(700).unwrap();
        reporter.on_resize(700).unwrap();

        let FrameReporter { bridge } = reporter;
        let written = String::from_utf8(bridge.into_inner()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#"{"type":"setIframeHeight","height":640}"#,
                r#"{"type":"setIframeHeight","height":700}"#,
                r#"{"type":"setIframeHeight","height":700}"#,
            ]
        );
    }
}
