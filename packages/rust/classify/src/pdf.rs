//! PDF text extraction via a cached sidecar and an optional OCR command.
//!
//! A PDF snapshot `<hash>.pdf` gets its extracted text at `<hash>.txt` in the
//! same day directory. When the sidecar is missing and an OCR command is
//! configured, it is invoked as `<command> <pdf> <txt>` with a hard timeout.
//! OCR output is best-effort evidence: failures leave the text empty and the
//! classifier proceeds on what it has.

use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use lexhound_shared::config::OcrConfig;
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct PdfText {
    pub text: String,
    /// True when OCR was attempted for this call, successful or not.
    pub ocr_ran: bool,
}

pub fn pdf_text(snapshot_path: &Path, ocr: &OcrConfig) -> PdfText {
    let sidecar = snapshot_path.with_extension("txt");
    if sidecar.exists() {
        return PdfText {
            text: std::fs::read_to_string(&sidecar).unwrap_or_default(),
            ocr_ran: false,
        };
    }
    let Some(command) = ocr.command.as_deref() else {
        debug!("no ocr command configured, treating pdf as text-free");
        return PdfText::default();
    };
    let succeeded = run_ocr(
        command,
        snapshot_path,
        &sidecar,
        Duration::from_secs(ocr.timeout_secs),
    );
    if succeeded && sidecar.exists() {
        PdfText {
            text: std::fs::read_to_string(&sidecar).unwrap_or_default(),
            ocr_ran: true,
        }
    } else {
        PdfText {
            text: String::new(),
            ocr_ran: true,
        }
    }
}

fn run_ocr(command: &str, pdf: &Path, sidecar: &Path, timeout: Duration) -> bool {
    let spawned = Command::new(command)
        .arg(pdf)
        .arg(sidecar)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    let mut child = match spawned {
        Ok(child) => child,
        Err(e) => {
            warn!(command, error = %e, "failed to launch ocr command");
            return false;
        }
    };
    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return status.success(),
            Ok(None) => {
                if Instant::now() >= deadline {
                    warn!(command, pdf = %pdf.display(), "ocr command timed out, killing");
                    let _ = child.kill();
                    let _ = child.wait();
                    return false;
                }
                std::thread::sleep(Duration::from_millis(200));
            }
            Err(e) => {
                warn!(command, error = %e, "failed to poll ocr command");
                let _ = child.kill();
                return false;
            }
        }
    }
}
