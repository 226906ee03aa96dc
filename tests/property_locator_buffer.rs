//! Property-based tests for locator parsing and buffer cursor behaviour
//!
//! Uses proptest to check parser invariants and to compare the buffer against
//! a plain Vec model over random operation sequences

use bucketfs::{ByteBuffer, Locator, Whence};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum BufferOp {
    Write(Vec<u8>),
    Read(usize),
    Seek(i64, u8),
    Truncate(u64),
}

fn buffer_op() -> impl Strategy<Value = BufferOp> {
    prop_oneof![
        prop::collection::vec(any::<u8>(), 0..64).prop_map(BufferOp::Write),
        (0usize..128).prop_map(BufferOp::Read),
        (-256i64..256, 0u8..3).prop_map(|(off, w)| BufferOp::Seek(off, w)),
        (0u64..256).prop_map(BufferOp::Truncate),
    ]
}

proptest! {
    #[test]
    fn prop_key_never_starts_with_separator(
        bucket in "[a-z][a-z0-9.-]{0,20}",
        segments in prop::collection::vec("[A-Za-z0-9_.]{1,8}", 0..5),
        leading in 0usize..3,
        trailing in 0usize..3,
        dir in any::<bool>(),
    ) {
        let path = format!(
            "s3://{}/{}{}{}",
            bucket,
            "/".repeat(leading),
            segments.join("/"),
            "/".repeat(trailing)
        );
        let loc = Locator::parse(&path, "/", dir).unwrap();

        prop_assert_eq!(&loc.bucket, &bucket);
        prop_assert!(!loc.key.starts_with('/'), "key {:?} from {}", loc.key, path);
        if !dir {
            prop_assert!(!loc.key.ends_with('/'));
            prop_assert_eq!(loc.key, segments.join("/"));
        }
    }

    #[test]
    fn prop_marker_key_ends_with_one_separator(
        key in "[a-z]{1,8}(/[a-z]{1,8}){0,3}/{0,2}",
    ) {
        let marker = Locator::new("bucket", key.as_str()).marker_key("/");
        prop_assert!(marker.ends_with('/'));
        prop_assert!(!marker.ends_with("//"));
        prop_assert_eq!(marker.trim_end_matches('/'), key.trim_end_matches('/'));
    }

    #[test]
    fn prop_buffer_matches_vec_model(ops in prop::collection::vec(buffer_op(), 1..40)) {
        let mut buffer = ByteBuffer::new();
        let mut model: Vec<u8> = Vec::new();
        let mut pos: u64 = 0;

        for op in ops {
            match op {
                BufferOp::Write(bytes) if bytes.is_empty() => {
                    prop_assert_eq!(buffer.write(&bytes), 0);
                }
                BufferOp::Write(bytes) => {
                    let start = pos as usize;
                    if model.len() < start + bytes.len() {
                        model.resize(start + bytes.len(), 0);
                    }
                    model[start..start + bytes.len()].copy_from_slice(&bytes);
                    pos += bytes.len() as u64;
                    prop_assert_eq!(buffer.write(&bytes), bytes.len());
                }
                BufferOp::Read(n) => {
                    let start = (pos as usize).min(model.len());
                    let end = (start + n).min(model.len());
                    let expected = model[start..end].to_vec();
                    pos += expected.len() as u64;
                    prop_assert_eq!(buffer.read(n), expected);
                }
                BufferOp::Seek(offset, w) => {
                    let (whence, base) = match w {
                        0 => (Whence::Set, 0i64),
                        1 => (Whence::Current, pos as i64),
                        _ => (Whence::End, model.len() as i64),
                    };
                    let target = base + offset;
                    let ok = buffer.seek(offset, whence);
                    prop_assert_eq!(ok, target >= 0);
                    if ok {
                        pos = target as u64;
                    }
                }
                BufferOp::Truncate(size) => {
                    model.resize(size as usize, 0);
                    prop_assert!(buffer.truncate(size));
                }
            }

            prop_assert_eq!(buffer.position(), pos);
            prop_assert_eq!(buffer.as_slice(), model.as_slice());
            prop_assert_eq!(buffer.eof(), pos >= model.len() as u64);
        }
    }
}
