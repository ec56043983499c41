use std::{process::Stdio, time::Duration};

use async_trait::async_trait;
use tokio::{io::AsyncWriteExt, process::Command};

use crate::error::{AppError, Result};

#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>>;
}

/// Page options every invoice is rendered with.
pub const PDF_OPTIONS: [(&str, &str); 6] = [
    ("--page-size", "A4"),
    ("--margin-top", "0.0in"),
    ("--margin-right", "0.2in"),
    ("--margin-bottom", "0.0in"),
    ("--margin-left", "0.2in"),
    ("--minimum-font-size", "20"),
];

/// Runs `wkhtmltopdf`, feeding HTML on stdin and reading the PDF from stdout.
pub struct Wkhtmltopdf {
    program: String,
    timeout: Duration,
}

impl Wkhtmltopdf {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn args() -> Vec<&'static str> {
        let mut args: Vec<&str> = vec!["--quiet"];
        for (flag, value) in PDF_OPTIONS {
            args.push(flag);
            args.push(value);
        }
        args.extend(["-", "-"]);
        args
    }

    async fn run(&self, html: &str) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.program)
            .args(Self::args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::InternalError(format!("Failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(html.as_bytes())
                .await
                .map_err(|e| AppError::InternalError(format!("Failed to write HTML: {}", e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| AppError::InternalError(format!("PDF renderer failed: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("wkhtmltopdf exited with {}: {}", output.status, stderr);
            return Err(AppError::InternalError(format!(
                "PDF renderer exited with {}",
                output.status
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl DocumentRenderer for Wkhtmltopdf {
    async fn html_to_pdf(&self, html: &str) -> Result<Vec<u8>> {
        tokio::time::timeout(self.timeout, self.run(html))
            .await
            .map_err(|_| AppError::InternalError("PDF rendering timed out".to_string()))?
    }
}
