//! Contract → HTML → PDF.
//!
//! The HTML template is built here; PDF synthesis is delegated to an external
//! renderer process (wkhtmltopdf by default) behind the `DocumentRenderer` trait.
//! Every render is bounded by a timeout; on expiry the child process is killed
//! and the caller receives `RenderError::Timeout`.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::contracts::models::ContractDocument;

pub const PAGE_SIZE: &str = "Letter";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("renderer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("renderer timed out after {0:?}")]
    Timeout(Duration),

    #[error("renderer produced no PDF output")]
    EmptyOutput,
}

/// Carried in `AppState` as `Arc<dyn DocumentRenderer>`.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render_pdf(&self, html: &str) -> Result<Bytes, RenderError>;
}

/// Runs `<program> [prefix args] --quiet --page-size Letter <in.html> <out.pdf>`.
pub struct WkhtmltopdfRenderer {
    program: String,
    prefix_args: Vec<String>,
    timeout: Duration,
}

impl WkhtmltopdfRenderer {
    /// `command` may carry a wrapper, e.g. `xvfb-run -a wkhtmltopdf`.
    pub fn from_command_line(command: &str, timeout: Duration) -> Self {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts.next().unwrap_or_else(|| "wkhtmltopdf".to_string());
        Self {
            program,
            prefix_args: parts.collect(),
            timeout,
        }
    }

    async fn run(&self, input: &Path, output: &Path) -> Result<(), RenderError> {
        let child = Command::new(&self.program)
            .args(&self.prefix_args)
            .args(["--quiet", "--encoding", "utf-8", "--page-size", PAGE_SIZE])
            .arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))??;

        if !result.status.success() {
            return Err(RenderError::Failed {
                status: result.status.to_string(),
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentRenderer for WkhtmltopdfRenderer {
    async fn render_pdf(&self, html: &str) -> Result<Bytes, RenderError> {
        let workdir = tempfile::tempdir()?;
        let input = workdir.path().join("contract.html");
        let output = workdir.path().join("contract.pdf");

        tokio::fs::write(&input, html).await?;
        self.run(&input, &output).await?;

        let pdf = tokio::fs::read(&output).await?;
        if !pdf.starts_with(b"%PDF") {
            return Err(RenderError::EmptyOutput);
        }

        debug!("Rendered PDF: {} bytes", pdf.len());
        Ok(Bytes::from(pdf))
    }
}

/// Wraps contract prose in the printable HTML document.
pub fn contract_html(contract: &ContractDocument) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>Contract {id}</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 40px; }}
    h1 {{ color: #333; }}
    h2 {{ color: #555; margin-top: 20px; }}
    .signature {{ margin-top: 60px; }}
  </style>
</head>
<body>
{body}
  <div class="signature">
    <p>Signed ({provider}): ________________________</p>
    <p>Signed ({client}): ________________________</p>
    <p>Date: ________________________</p>
  </div>
</body>
</html>
"#,
        id = escape_html(&contract.id),
        body = prose_to_html(&contract.content),
        provider = escape_html(&contract.provider),
        client = escape_html(&contract.client),
    )
}

/// Converts drafted prose to HTML blocks.
/// `# ` lines become `<h1>`, `## `/`### ` lines `<h2>`; blank-line separated text becomes `<p>`.
fn prose_to_html(prose: &str) -> String {
    let mut html = String::new();
    let mut paragraph: Vec<String> = Vec::new();

    let flush = |paragraph: &mut Vec<String>, html: &mut String| {
        if !paragraph.is_empty() {
            html.push_str(&format!("  <p>{}</p>\n", paragraph.join("<br>\n")));
            paragraph.clear();
        }
    };

    for line in prose.lines().map(str::trim) {
        if line.is_empty() {
            flush(&mut paragraph, &mut html);
        } else if let Some(title) = line.strip_prefix("# ") {
            flush(&mut paragraph, &mut html);
            html.push_str(&format!("  <h1>{}</h1>\n", escape_html(title.trim())));
        } else if let Some(heading) = line
            .strip_prefix("### ")
            .or_else(|| line.strip_prefix("## "))
        {
            flush(&mut paragraph, &mut html);
            html.push_str(&format!("  <h2>{}</h2>\n", escape_html(heading.trim())));
        } else {
            paragraph.push(escape_html(line));
        }
    }
    flush(&mut paragraph, &mut html);

    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn contract(content: &str) -> ContractDocument {
        ContractDocument {
            id: "42".into(),
            content: content.into(),
            provider: "Ada <Studio>".into(),
            client: "Acme".into(),
            created: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;");
    }

    #[test]
    fn test_prose_to_html_headings_and_paragraphs() {
        let html = prose_to_html("# SERVICE AGREEMENT\n\n## 1. Services\nLine one\nLine two\n\nNext");
        assert!(html.contains("<h1>SERVICE AGREEMENT</h1>"));
        assert!(html.contains("<h2>1. Services</h2>"));
        assert!(html.contains("<p>Line one<br>\nLine two</p>"));
        assert!(html.contains("<p>Next</p>"));
    }

    #[test]
    fn test_contract_html_escapes_model_output() {
        let html = contract_html(&contract("<script>alert(1)</script>"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("Signed (Ada &lt;Studio&gt;)"));
        assert!(html.contains("font-family: Arial"));
    }

    #[test]
    fn test_from_command_line_splits_wrapper() {
        let r = WkhtmltopdfRenderer::from_command_line("xvfb-run -a wkhtmltopdf", Duration::from_secs(1));
        assert_eq!(r.program, "xvfb-run");
        assert_eq!(r.prefix_args, vec!["-a".to_string(), "wkhtmltopdf".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_binary_reports_io_error() {
        let r = WkhtmltopdfRenderer::from_command_line(
            "/nonexistent/clatract-renderer",
            Duration::from_secs(1),
        );
        let result = r.render_pdf("<p>x</p>").await;
        assert!(matches!(result, Err(RenderError::Io(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_times_out_instead_of_hanging() {
        let r = WkhtmltopdfRenderer {
            program: "sh".into(),
            prefix_args: vec!["-c".into(), "sleep 5".into(), "sh".into()],
            timeout: Duration::from_millis(200),
        };
        let started = std::time::Instant::now();
        let result = r.render_pdf("<p>x</p>").await;
        assert!(matches!(result, Err(RenderError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_reads_pdf_from_output_path() {
        let r = WkhtmltopdfRenderer {
            program: "sh".into(),
            prefix_args: vec![
                "-c".into(),
                r#"eval out=\${$#}; printf '%%PDF-1.4 fake' > "$out""#.into(),
                "sh".into(),
            ],
            timeout: Duration::from_secs(5),
        };
        let pdf = r.render_pdf("<p>x</p>").await.unwrap();
        assert!(pdf.starts_with(b"%PDF-1.4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_renderer_failure_surfaces_stderr() {
        let r = WkhtmltopdfRenderer {
            program: "sh".into(),
            prefix_args: vec!["-c".into(), "echo boom >&2; exit 3".into(), "sh".into()],
            timeout: Duration::from_secs(5),
        };
        match r.render_pdf("<p>x</p>").await {
            Err(RenderError::Failed { stderr, .. }) => assert_eq!(stderr, "boom"),
            other => panic!("expected Failed, got {other:?}"),
        }
    }
}
