use a314_ctl::render_status;
use a314_wire::{ComArea, PacketType, Role};

/// Two processes attaching to the same shared-memory path see the same
/// ring occupancy through `render_status`, the same round trip
/// `a314-wire`'s own shmem test exercises.
#[test]
fn status_reflects_writes_from_the_other_side() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("demo-mailbox");

    let mut writer = ComArea::create_or_open(&path, Role::Local).unwrap();
    writer.outbound().append(PacketType::Data, 1, b"hello").unwrap();

    let reader = ComArea::create_or_open(&path, Role::Remote).unwrap();
    let rendered = render_status("demo-mailbox", reader.snapshot(), true);

    let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
    assert_eq!(parsed["mailbox"], "demo-mailbox");
    assert_eq!(parsed["a2r_used"], 8); // 3-byte header + 5-byte payload
    assert_eq!(parsed["r2a_used"], 0);
}
