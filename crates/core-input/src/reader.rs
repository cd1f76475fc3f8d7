//! Blocking stdin reader.
//!
//! `read()` on stdin blocks indefinitely, so it runs on a dedicated OS thread
//! and hands byte chunks to the async side through a bounded channel. The
//! thread is detached: it exits on EOF, on a read error or once the receiving
//! side is gone, and is otherwise torn down with the process.

use std::io::{self, Read};
use std::thread;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, trace};

const READ_BUF_SIZE: usize = 1024;
const CHUNK_MAILBOX_CAP: usize = 16;

pub type Chunk = io::Result<Vec<u8>>;

/// Spawn the reader over the process's stdin.
pub fn spawn_stdin_reader() -> io::Result<Receiver<Chunk>> {
    let (tx, rx) = mpsc::channel(CHUNK_MAILBOX_CAP);
    thread::Builder::new()
        .name("stdin-reader".into())
        .spawn(move || read_loop(io::stdin().lock(), tx))?;
    Ok(rx)
}

/// Pump `src` into `tx` until EOF, an error, or the receiver is dropped.
pub fn read_loop<R: Read>(mut src: R, tx: Sender<Chunk>) {
    let mut buf = [0u8; READ_BUF_SIZE];
    loop {
        match src.read(&mut buf) {
            Ok(0) => {
                debug!(target: "input.thread", "stdin_eof");
                break;
            }
            Ok(n) => {
                trace!(target: "input.thread", bytes = n, "stdin_chunk");
                if tx.blocking_send(Ok(buf[..n].to_vec())).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
}
