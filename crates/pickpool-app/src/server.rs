// Line-delimited JSON server loop: one request per input line, one response
// per output line.

use anyhow::Context;
use pickpool_core::{EventLog, PickPool};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::info;

use crate::app::handle_line;

/// Counters reported when the input stream ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub handled: usize,
    pub failed: usize,
}

/// Serve requests from `reader` until EOF, writing each response to
/// `writer` and flushing after every line. Blank lines are skipped.
pub async fn serve<L, R, W>(pool: &PickPool<L>, reader: R, mut writer: W) -> anyhow::Result<ServeStats>
where
    L: EventLog,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = ServeStats::default();

    while let Some(line) = lines.next_line().await.context("failed to read request")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = handle_line(pool, line);
        stats.handled += 1;
        if !response.ok {
            stats.failed += 1;
        }

        let mut out = response.to_line();
        out.push('\n');
        writer
            .write_all(out.as_bytes())
            .await
            .context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
    }

    info!(
        "Input closed after {} requests ({} failed)",
        stats.handled, stats.failed
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pickpool_core::MemoryLog;

    async fn run(input: &str) -> (ServeStats, Vec<String>) {
        let pool = PickPool::new(MemoryLog::new());
        let mut output = Vec::new();
        let stats = serve(&pool, input.as_bytes(), &mut output).await.unwrap();
        let text = String::from_utf8(output).unwrap();
        (stats, text.lines().map(str::to_string).collect())
    }

    #[tokio::test]
    async fn one_response_per_request_line() {
        let (stats, lines) = run(
            "{\"op\":\"get_all_results\"}\n\n{\"op\":\"get_spreads\",\"week\":\"1\"}\n",
        )
        .await;
        assert_eq!(stats, ServeStats { handled: 2, failed: 0 });
        assert_eq!(lines, vec![r#"{"ok":true,"data":[]}"#, r#"{"ok":true,"data":[]}"#]);
    }

    #[tokio::test]
    async fn bad_lines_do_not_stop_the_loop() {
        let (stats, lines) = run("garbage\n{\"op\":\"get_all_results\"}\n").await;
        assert_eq!(stats, ServeStats { handled: 2, failed: 1 });
        assert!(lines[0].starts_with(r#"{"ok":false"#));
        assert!(lines[1].starts_with(r#"{"ok":true"#));
    }

    #[tokio::test]
    async fn empty_input_completes_normally() {
        let (stats, lines) = run("").await;
        assert_eq!(stats, ServeStats::default());
        assert!(lines.is_empty());
    }
}
