//! GitHub Actions step outputs.
use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::format::Attachment;

/// Render the `attachments=<json>` output line.
pub fn attachments_line(attachments: &[Attachment]) -> Result<String> {
    let json = serde_json::to_string(attachments).context("failed to serialize attachments")?;
    Ok(format!("attachments={json}\n"))
}

/// Append the attachments output to the `GITHUB_OUTPUT` file.
pub async fn append_attachments(path: &Path, attachments: &[Attachment]) -> Result<()> {
    let line = attachments_line(attachments)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(line.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    file.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{Block, TextObject};
    use tempfile::tempdir;

    fn attachment(text: &str) -> Attachment {
        Attachment {
            color: "danger".into(),
            blocks: vec![Block::Section {
                text: TextObject::Mrkdwn { text: text.into() },
            }],
        }
    }

    #[test]
    fn line_is_single_line_json() {
        let line = attachments_line(&[attachment("a\nb")]).unwrap();
        assert!(line.starts_with("attachments=[{"));
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[tokio::test]
    async fn appends_without_truncating() {
        let td = tempdir().unwrap();
        let p = td.path().join("output");
        std::fs::write(&p, "existing=1\n").unwrap();
        append_attachments(&p, &[attachment("x")]).await.unwrap();
        let content = std::fs::read_to_string(&p).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("existing=1"));
        let json = lines.next().unwrap().strip_prefix("attachments=").unwrap();
        let v: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(v[0]["blocks"][0]["text"]["text"], "x");
    }
}
