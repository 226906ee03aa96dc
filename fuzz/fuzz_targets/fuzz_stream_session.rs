#![no_main]
use bucketfs::{
    ContentTypeTable, Locator, MemoryStore, OpenPolicy, StreamSession, Whence, WriteOptions,
};
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Debug, arbitrary::Arbitrary)]
enum SessionOp {
    Write(Vec<u8>),
    Read(u16),
    Seek(i32, u8),
    Truncate(u16),
    Flush,
    Reopen(u8),
}

const MODES: [&str; 8] = ["r", "r+", "w", "w+", "a", "a+", "x", "x+"];

// Committed content must always equal the buffer at the last successful flush
fuzz_target!(|ops: Vec<SessionOp>| {
    let store = MemoryStore::with_bucket("fuzz");
    let table = Arc::new(ContentTypeTable::empty());
    let open = |mode: &str| {
        StreamSession::open(
            Arc::new(store.clone()),
            Locator::new("fuzz", "object"),
            OpenPolicy::from_mode(mode).ok()?,
            WriteOptions::default(),
            table.clone(),
        )
        .ok()
    };

    let Some(mut session) = open("w+") else {
        return;
    };

    for op in ops.into_iter().take(64) {
        match op {
            SessionOp::Write(bytes) => {
                session.write(&bytes[..bytes.len().min(4096)]);
            }
            SessionOp::Read(n) => {
                let before = session.tell();
                let data = session.read(n as usize);
                assert!(data.len() <= n as usize);
                assert_eq!(session.tell(), before + data.len() as u64);
            }
            SessionOp::Seek(offset, w) => {
                let whence = match w % 3 {
                    0 => Whence::Set,
                    1 => Whence::Current,
                    _ => Whence::End,
                };
                let before = session.tell();
                if !session.seek(offset as i64, whence) {
                    assert_eq!(session.tell(), before);
                }
            }
            SessionOp::Truncate(size) => {
                session.truncate(size as u64);
            }
            SessionOp::Flush => {
                if session.flush().is_ok() && session.is_writable() {
                    assert!(!session.is_dirty());
                    let stored = store.object("fuzz", "object").map(|o| o.body.len() as u64);
                    assert_eq!(stored, Some(session.len()));
                }
            }
            SessionOp::Reopen(m) => {
                if session.close().is_err() {
                    return;
                }
                match open(MODES[m as usize % MODES.len()]) {
                    Some(next) => session = next,
                    None => return,
                }
            }
        }
    }

    let _ = session.close();
});
