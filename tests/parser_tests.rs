use keytree_audit::aggregator::KeyTree;
use keytree_audit::parser::encodings::{listpack_entries, lzf_decompress, Entry};
use keytree_audit::parser::{decode, read_events, KeyEvent};
use keytree_audit::utils::error::{DecodeError, ParseError};
use pretty_assertions::assert_eq;

/// Length-prefixed RDB string (short form only)
fn rdb_str(bytes: &[u8]) -> Vec<u8> {
    assert!(bytes.len() < 64);
    let mut out = vec![bytes.len() as u8];
    out.extend_from_slice(bytes);
    out
}

/// Wrap a database body in header, SELECTDB 0, and EOF plus checksum
fn dump(body: &[u8]) -> Vec<u8> {
    let mut out = b"REDIS0011".to_vec();
    out.push(0xFA);
    out.extend(rdb_str(b"redis-ver"));
    out.extend(rdb_str(b"7.2.4"));
    out.extend([0xFE, 0x00, 0xFB, 0x02, 0x00]);
    out.extend_from_slice(body);
    out.push(0xFF);
    out.extend([0u8; 8]);
    out
}

fn key_value(value_type: u8, key: &str, value: &[u8]) -> Vec<u8> {
    let mut out = vec![value_type];
    out.extend(rdb_str(key.as_bytes()));
    out.extend_from_slice(value);
    out
}

fn decode_all(bytes: &[u8]) -> Vec<KeyEvent> {
    let mut events: Vec<KeyEvent> = Vec::new();
    decode(bytes, &mut events).unwrap();
    events
}

#[test]
fn test_decode_plain_collections() {
    let mut body = Vec::new();
    // list ["ab", "cde"]
    let mut list = vec![2];
    list.extend(rdb_str(b"ab"));
    list.extend(rdb_str(b"cde"));
    body.extend(key_value(1, "q:jobs", &list));
    // hash {f: vv}
    let mut hash = vec![1];
    hash.extend(rdb_str(b"f"));
    hash.extend(rdb_str(b"vv"));
    body.extend(key_value(4, "h:1", &hash));
    // set {x, yy}
    let mut set = vec![2];
    set.extend(rdb_str(b"x"));
    set.extend(rdb_str(b"yy"));
    body.extend(key_value(2, "s:1", &set));
    // zset2 {m: 1.0}
    let mut zset = vec![1];
    zset.extend(rdb_str(b"m"));
    zset.extend(1.0f64.to_le_bytes());
    body.extend(key_value(5, "z:1", &zset));

    let events = decode_all(&dump(&body));

    assert_eq!(
        events,
        vec![
            KeyEvent::observed("q:jobs"),
            KeyEvent::grew("q:jobs", 5),
            KeyEvent::observed("h:1"),
            KeyEvent::grew("h:1", 3),
            KeyEvent::observed("s:1"),
            KeyEvent::grew("s:1", 3),
            KeyEvent::observed("z:1"),
            KeyEvent::grew("z:1", 1),
        ]
    );
}

#[test]
fn test_decode_old_zset_scores() {
    // type 3: member then length-prefixed ASCII score, 253 = NaN marker
    let mut zset = vec![2];
    zset.extend(rdb_str(b"alice"));
    zset.extend(rdb_str(b"3.5"));
    zset.extend(rdb_str(b"bob"));
    zset.push(253);
    let events = decode_all(&dump(&key_value(3, "board", &zset)));
    assert_eq!(events[1], KeyEvent::grew("board", 8));
}

#[test]
fn test_decode_intset() {
    // encoding 2 bytes, 2 members: 10 and 1000
    let blob = [2, 0, 0, 0, 2, 0, 0, 0, 0x0A, 0x00, 0xE8, 0x03];
    let events = decode_all(&dump(&key_value(11, "ids", &rdb_str(&blob))));
    assert_eq!(events[1], KeyEvent::grew("ids", 6));
}

#[test]
fn test_decode_ziplist_list() {
    let blob = [
        0x14, 0, 0, 0, 0x0F, 0, 0, 0, 2, 0, // header
        0x00, 0x03, b'a', b'b', b'c', // "abc"
        0x05, 0xC0, 0x39, 0x30, // 12345
        0xFF,
    ];
    let events = decode_all(&dump(&key_value(10, "l", &rdb_str(&blob))));
    assert_eq!(events[1], KeyEvent::grew("l", 8));
}

#[test]
fn test_decode_listpack_zset_counts_members_only() {
    let blob = [
        0, 0, 0, 0, 4, 0, 0x82, b'a', b'b', 0x03, 0x01, 0x01, 0x81, b'c', 0x02, 0x02, 0x01,
        0xFF,
    ];
    let events = decode_all(&dump(&key_value(17, "rank", &rdb_str(&blob))));
    assert_eq!(events[1], KeyEvent::grew("rank", 3));
}

#[test]
fn test_decode_quicklist2() {
    let node = [0, 0, 0, 0, 3, 0, 0x81, b'f', 0x02, 0x07, 0x01, 0xDF, 0xFF, 0x02, 0xFF];
    assert_eq!(
        listpack_entries(&node).unwrap(),
        vec![Entry::Bytes(b"f"), Entry::Int(7), Entry::Int(-1)]
    );

    let mut value = vec![2];
    // packed node
    value.push(2);
    value.extend(rdb_str(&node));
    // plain node
    value.push(1);
    value.extend(rdb_str(b"big-element"));

    let events = decode_all(&dump(&key_value(18, "list:big", &value)));
    assert_eq!(events[1], KeyEvent::grew("list:big", 4 + 11));
}

#[test]
fn test_decode_lzf_string() {
    let compressed = [0x00, b'a', 0xE0, 0x00, 0x00];
    assert_eq!(lzf_decompress(&compressed, 10).unwrap(), b"aaaaaaaaaa".to_vec());

    let mut value = vec![0xC3, compressed.len() as u8, 10];
    value.extend_from_slice(&compressed);
    let events = decode_all(&dump(&key_value(0, "blob", &value)));
    assert_eq!(events, vec![KeyEvent::observed("blob"), KeyEvent::grew("blob", 10)]);
}

#[test]
fn test_decode_skips_expiry_and_eviction_metadata() {
    let mut body = vec![0xFC];
    body.extend(1_700_000_000_000u64.to_le_bytes());
    body.extend([0xF9, 0x05]);
    body.extend(key_value(0, "session:1", &rdb_str(b"token")));
    body.extend([0xFD, 0, 0, 0, 0]);
    body.extend([0xF8, 0x10]);
    body.extend(key_value(0, "session:2", &rdb_str(b"tok")));

    let mut tree = KeyTree::default();
    let summary = decode(&dump(&body)[..], &mut tree).unwrap();

    assert_eq!(summary.version, 11);
    assert_eq!(summary.databases, 1);
    assert_eq!(summary.keys, 2);
    assert_eq!(tree.total_keys(), 2);
    assert_eq!(tree.total_bytes(), 8);
    assert_eq!(tree.find("session:*").unwrap().size(), 8);
}

#[test]
fn test_decode_truncated_dump() {
    let full = dump(&key_value(0, "k", &rdb_str(b"value")));
    let cut = &full[..full.len() - 12];

    let mut events: Vec<KeyEvent> = Vec::new();
    let result = decode(cut, &mut events);
    assert!(matches!(result, Err(DecodeError::UnexpectedEof(_))));
}

#[test]
fn test_decode_rejects_module_aux() {
    let mut events: Vec<KeyEvent> = Vec::new();
    let result = decode(&dump(&[0xF7])[..], &mut events);
    assert!(matches!(result, Err(DecodeError::UnsupportedOpcode(0xF7))));
}

#[test]
fn test_read_events_into_tree() {
    let input = r#"{"event":"observed","key":"app:users:1"}
{"event":"grew","key":"app:users:1","bytes":50}

{"event":"observed","key":"app:users:2"}
{"event":"grew","key":"app:users:2","bytes":30}
"#;
    let mut tree = KeyTree::default();

    let read = read_events(input.as_bytes(), &mut tree).unwrap();

    assert_eq!(read, 4);
    assert_eq!(tree.total_keys(), 2);
    assert_eq!(tree.find("app:users").unwrap().size(), 80);
}

#[test]
fn test_read_events_bad_line() {
    let input = "{\"event\":\"observed\",\"key\":\"a\"}\n{\"event\":\"grew\",\"key\":\"a\"}\n";
    let mut events: Vec<KeyEvent> = Vec::new();

    match read_events(input.as_bytes(), &mut events) {
        Err(ParseError::InvalidLine { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected InvalidLine, got {:?}", other),
    }
    assert_eq!(events.len(), 1);
}
