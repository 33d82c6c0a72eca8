//! Metadata probing: remote size and byte-range support.
//!
//! Tries a HEAD request first. Servers that reject HEAD or omit
//! `Content-Length` get a GET whose body is abandoned as soon as the
//! headers have arrived. Both requests stop early once the abort token trips.

mod parse;

pub use parse::{parse_headers, parse_http_status};

use std::str;

use curl::easy::Easy;

use crate::control::AbortToken;
use crate::fetcher::FetchOptions;
use crate::retry::FetchError;

/// Key response headers for deciding between resume and restart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadResult {
    /// Status from the last `HTTP/` line (after redirects).
    pub status: Option<u32>,
    /// Total size in bytes, if `Content-Length` is present.
    pub content_length: Option<u64>,
    /// True if server sent `Accept-Ranges: bytes`.
    pub accept_ranges: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProbeMethod {
    Head,
    Get,
}

/// Probes `url` and returns the parsed metadata.
///
/// Blocks the current thread; call from `spawn_blocking` in async code.
/// Returns `FetchError::Cancelled` as soon as `abort` trips, without a fallback request.
pub fn probe(
    url: &str,
    options: &FetchOptions,
    abort: &AbortToken,
) -> Result<HeadResult, FetchError> {
    match request_headers(url, options, ProbeMethod::Head, abort) {
        Ok(head) if head.content_length.is_some() => Ok(head),
        Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
        Ok(head) => {
            tracing::debug!(url, "HEAD response has no length, retrying with GET");
            match request_headers(url, options, ProbeMethod::Get, abort) {
                Ok(get) => Ok(get),
                Err(FetchError::Cancelled) => Err(FetchError::Cancelled),
                Err(e) => {
                    tracing::debug!(url, error = %e, "GET probe failed, keeping HEAD result");
                    Ok(head)
                }
            }
        }
        Err(e) => {
            tracing::debug!(url, error = %e, "HEAD probe failed, falling back to GET");
            request_headers(url, options, ProbeMethod::Get, abort)
        }
    }
}

/// Remote size for a total-volume estimate; 0 when unknown or unreachable.
pub fn remote_size(url: &str, options: &FetchOptions) -> u64 {
    match probe(url, options, &AbortToken::new()) {
        Ok(head) => head.content_length.unwrap_or(0),
        Err(e) => {
            tracing::debug!(url, error = %e, "size probe failed");
            0
        }
    }
}

fn request_headers(
    url: &str,
    options: &FetchOptions,
    method: ProbeMethod,
    abort: &AbortToken,
) -> Result<HeadResult, FetchError> {
    if abort.is_aborted() {
        return Err(FetchError::Cancelled);
    }

    let mut lines: Vec<String> = Vec::new();

    let mut easy = Easy::new();
    easy.url(url)?;
    easy.nobody(method == ProbeMethod::Head)?;
    easy.follow_location(true)?;
    easy.connect_timeout(options.connect_timeout)?;
    easy.timeout(options.probe_timeout)?;
    // curl calls the progress callback about once a second even while no
    // bytes arrive, which lets an abort end a stalled probe.
    easy.progress(true)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let line = s.trim_end();
                if line.starts_with("HTTP/") {
                    lines.clear();
                }
                if !line.is_empty() {
                    lines.push(line.to_string());
                }
            }
            true
        })?;
        // Headers are all we need; refusing the first body chunk ends the GET.
        transfer.write_function(|_| Ok(0))?;
        transfer.progress_function(|_, _, _, _| !abort.is_aborted())?;
        transfer.perform()
    };

    if abort.is_aborted() {
        tracing::debug!(url, ?method, "probe interrupted");
        return Err(FetchError::Cancelled);
    }
    match performed {
        Ok(()) => {}
        Err(e) if method == ProbeMethod::Get && e.is_write_error() && !lines.is_empty() => {}
        Err(e) => return Err(e.into()),
    }

    let mut result = parse_headers(&lines);
    if result.status.is_none() {
        result.status = easy.response_code().ok().filter(|c| *c != 0);
    }
    match result.status {
        Some(code) if !(200..300).contains(&code) => Err(FetchError::Server(code)),
        _ => Ok(result),
    }
}
