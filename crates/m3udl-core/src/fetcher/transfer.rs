//! Easy2 handler streaming one response body into a staging file.
//! Checks the status before the first write and falls back to a full restart
//! when a range request was answered with the whole body.

use std::io;
use std::str;

use curl::easy::{Handler, WriteError};

use crate::control::AbortToken;
use crate::fetch_head::parse_http_status;
use crate::progress::{ProgressSink, TransferEvent};
use crate::storage::{ResumePlan, StagingFile};
use crate::task::TaskId;

use super::ProgressSampler;

pub(super) struct TransferHandler<'a> {
    task_id: TaskId,
    staging: Option<StagingFile>,
    plan: ResumePlan,
    sampler: ProgressSampler,
    sink: &'a dyn ProgressSink,
    abort: &'a AbortToken,
    response_headers: Vec<String>,
    /// None until the first body chunk; then whether the status was accepted.
    status_ok: Option<bool>,
    rejected_status: Option<u32>,
    cancelled: bool,
    io_error: Option<io::Error>,
}

impl<'a> TransferHandler<'a> {
    pub(super) fn new(
        task_id: TaskId,
        staging: StagingFile,
        plan: ResumePlan,
        sampler: ProgressSampler,
        sink: &'a dyn ProgressSink,
        abort: &'a AbortToken,
    ) -> Self {
        Self {
            task_id,
            staging: Some(staging),
            plan,
            sampler,
            sink,
            abort,
            response_headers: Vec::new(),
            status_ok: None,
            rejected_status: None,
            cancelled: false,
            io_error: None,
        }
    }

    pub(super) fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub(super) fn rejected_status(&self) -> Option<u32> {
        self.rejected_status
    }

    pub(super) fn take_io_error(&mut self) -> Option<io::Error> {
        self.io_error.take()
    }

    pub(super) fn saw_body(&self) -> bool {
        self.status_ok.is_some()
    }

    pub(super) fn sampler(&self) -> &ProgressSampler {
        &self.sampler
    }

    pub(super) fn take_staging(&mut self) -> Option<StagingFile> {
        self.staging.take()
    }

    /// Runs once, on the first body chunk.
    fn check_status(&mut self) -> bool {
        let status = parse_http_status(&self.response_headers).unwrap_or(0);
        if !(200..300).contains(&status) {
            tracing::debug!(task = self.task_id, status, "rejecting response body");
            self.rejected_status = Some(status);
            return false;
        }
        if let ResumePlan::Resume { offset } = self.plan {
            if status != 206 {
                tracing::warn!(
                    task = self.task_id,
                    offset,
                    status,
                    "server ignored range request, restarting from zero"
                );
                if let Some(staging) = self.staging.as_mut() {
                    if let Err(e) = staging.restart() {
                        self.io_error = Some(e);
                        return false;
                    }
                }
                self.plan = ResumePlan::Restart;
                self.sampler.restart();
            }
        }
        true
    }
}

impl Handler for TransferHandler<'_> {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                self.response_headers.clear();
            }
            if !line.is_empty() {
                self.response_headers.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        if self.abort.is_aborted() {
            self.cancelled = true;
            return Ok(0);
        }
        if self.status_ok.is_none() {
            let ok = self.check_status();
            self.status_ok = Some(ok);
        }
        if self.status_ok != Some(true) {
            return Ok(0);
        }
        let Some(staging) = self.staging.as_mut() else {
            return Ok(0);
        };
        if let Err(e) = staging.write_chunk(data) {
            self.io_error = Some(e);
            return Ok(0);
        }
        if let Some(sample) = self.sampler.record(data.len() as u64) {
            self.sink.report(self.task_id, TransferEvent::Progress(sample));
        }
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        if self.abort.is_aborted() {
            self.cancelled = true;
            return false;
        }
        true
    }
}
