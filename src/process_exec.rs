use std::process::Stdio;

use tokio::{
    io::{self, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    process::Command,
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::ExecError;

/// Runs `tokens` and relays its stdout to ours.
pub async fn execute(tokens: &[String], cancel: &CancellationToken) -> Result<(), ExecError> {
    execute_to(tokens, io::stdout(), cancel).await.map(|_| ())
}

/// Runs `tokens[0]` with the remaining tokens as arguments.
///
/// stdout is relayed line by line into `sink` while the process runs and the
/// sink is handed back once everything has been written. stdin and stderr are
/// inherited from the caller.
pub async fn execute_to<W>(
    tokens: &[String],
    sink: W,
    cancel: &CancellationToken,
) -> Result<W, ExecError>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (program, args) = tokens.split_first().ok_or(ExecError::InvalidCommand)?;

    info!(command = %shell_words::join(tokens), "spawning snippet command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExecError::Spawn {
            program: program.clone(),
            source,
        })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("child stdout was not captured"))?;

    // Reader and writer are split by a channel so the pipe keeps draining
    // even when the sink is slow.
    let (tx, rx) = mpsc::unbounded_channel();
    let reader = tokio::spawn(read_lines(stdout, tx));
    let writer = tokio::spawn(write_lines(rx, sink));

    let status = tokio::select! {
        status = child.wait() => status,
        _ = cancel.cancelled() => {
            info!(program = %program, "cancelling snippet command");
            if let Err(e) = child.kill().await {
                warn!("failed to kill {program}: {e}");
            }
            reader.abort();
            writer.abort();
            return Err(ExecError::Cancelled);
        }
    };

    // A backgrounded grandchild can hold the pipe open past exit
    let (reader_abort, writer_abort) = (reader.abort_handle(), writer.abort_handle());
    let relayed = tokio::select! {
        relayed = join_relay(reader, writer) => relayed,
        _ = cancel.cancelled() => {
            info!(program = %program, "cancelling output relay");
            reader_abort.abort();
            writer_abort.abort();
            return Err(ExecError::Cancelled);
        }
    };
    let status = status?;
    debug!(program = %program, ?status, "snippet command exited");

    if !status.success() {
        return Err(ExecError::ProcessFailed {
            code: status.code(),
        });
    }

    Ok(relayed?)
}

// Reads the child's output one line at a time, keeping raw bytes
async fn read_lines<R>(pipe: R, tx: mpsc::UnboundedSender<Vec<u8>>) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(pipe);

    loop {
        let mut line = Vec::new();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        if tx.send(line).is_err() {
            // Writer is gone; its own error is reported on join
            return Ok(());
        }
    }
}

async fn write_lines<W>(mut rx: mpsc::UnboundedReceiver<Vec<u8>>, mut sink: W) -> io::Result<W>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        sink.write_all(&line).await?;
        sink.flush().await?;
    }
    Ok(sink)
}

async fn join_relay<W>(
    reader: JoinHandle<io::Result<()>>,
    writer: JoinHandle<io::Result<W>>,
) -> io::Result<W> {
    let read = reader.await.map_err(io::Error::other)?;
    let written = writer.await.map_err(io::Error::other)?;

    if let Err(e) = &read {
        warn!("failed to read command output: {e}");
    }
    let sink = written?;
    read?;
    Ok(sink)
}

#[cfg(all(test, unix))]
mod tests {
    use std::{
        pin::Pin,
        sync::{Arc, Mutex},
        task::{Context, Poll},
        time::{Duration, Instant},
    };

    use super::*;
    use crate::parse::tokenize;

    fn argv(cmd: &str) -> Vec<String> {
        tokenize(cmd, false)
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let err = execute(&[], &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ExecError::InvalidCommand));
    }

    #[tokio::test]
    async fn relays_stdout_in_order() {
        let out = execute_to(
            &argv(r#"sh -c "echo hi; echo there; printf tail""#),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hi\nthere\ntail");
    }

    #[tokio::test]
    async fn arguments_are_passed_verbatim() {
        let out = execute_to(
            &argv(r#"printf "%s|" "a b" 'c "d"' $HOME"#),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), r#"a b|c "d"|$HOME|"#);
    }

    #[tokio::test]
    async fn stderr_is_not_captured() {
        let out = execute_to(
            &argv(r#"sh -c "echo out; echo err >&2""#),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(out, b"out\n");
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let err = execute_to(&argv("false"), Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::ProcessFailed { code: Some(1) }));

        let err = execute_to(&argv("sh -c 'exit 7'"), Vec::new(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::ProcessFailed { code: Some(7) }));
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let err = execute_to(
            &argv("zei-definitely-not-a-program --flag"),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        match err {
            ExecError::Spawn { program, .. } => assert_eq!(program, "zei-definitely-not-a-program"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = execute_to(&argv("sleep 10"), Vec::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn cancellation_reaches_a_relay_held_open_by_a_grandchild() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = execute_to(&argv("sh -c 'sleep 4 & echo started'"), Vec::new(), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    // Sink that stamps each write with the time it arrived
    struct TimedSink {
        writes: Arc<Mutex<Vec<(Instant, Vec<u8>)>>>,
    }

    impl AsyncWrite for TimedSink {
        fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            self.writes.lock().unwrap().push((Instant::now(), buf.to_vec()));
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn output_arrives_while_the_command_runs() {
        let writes = Arc::new(Mutex::new(Vec::new()));
        let sink = TimedSink { writes: writes.clone() };

        execute_to(&argv("sh -c 'echo a; sleep 1; echo b'"), sink, &CancellationToken::new())
            .await
            .unwrap();
        let finished = Instant::now();

        let writes = writes.lock().unwrap();
        let (first_at, first) = writes.first().unwrap();
        assert_eq!(first, b"a\n");
        assert!(finished.duration_since(*first_at) >= Duration::from_millis(700));

        let all: Vec<u8> = writes.iter().flat_map(|(_, bytes)| bytes.clone()).collect();
        assert_eq!(all, b"a\nb\n");
    }

    #[tokio::test]
    async fn non_utf8_output_is_relayed_untouched() {
        let out = execute_to(
            &argv(r"printf 'ok\377\376\nend'"),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(out, b"ok\xff\xfe\nend");
    }

    #[tokio::test]
    async fn large_output_does_not_stall() {
        let out = execute_to(
            &argv("sh -c 'i=0; while [ $i -lt 20000 ]; do echo line-$i; i=$((i+1)); done'"),
            Vec::new(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 20000);
        assert_eq!(text.lines().last(), Some("line-19999"));
    }
}
