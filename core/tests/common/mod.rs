//! Shared test harness: synthesizes demo byte streams in the canonical
//! wire encoding and parks them in temp files for the API entry points.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use demsaw_core::entity_state;
use demsaw_core::player_state;
use demsaw_core::Protocol;

// Wire opcodes, mirroring the reader's table.
const OP_GAMESTATE: u8 = 2;
const OP_CONFIG_STRING: u8 = 3;
const OP_BASELINE: u8 = 4;
const OP_SERVER_COMMAND: u8 = 5;
const OP_SNAPSHOT: u8 = 7;
const OP_EOF: u8 = 8;

/// End-of-entity-list marker inside snapshots.
const ENTITY_NONE: u16 = 1023;

/// A `(field index, value)` delta pair.
pub type Field = (u8, i32);

/// Player-state field pair by canonical name.
pub fn ps(protocol: Protocol, name: &str, value: i32) -> Field {
    (
        player_state::wire_index_of(protocol, name).expect("player field name"),
        value,
    )
}

/// Entity-state field pair by canonical name.
pub fn es(protocol: Protocol, name: &str, value: i32) -> Field {
    (
        entity_state::wire_index_of(protocol, name).expect("entity field name"),
        value,
    )
}

/// Float payload for a field pair.
pub fn f(value: f32) -> i32 {
    value.to_bits() as i32
}

/// One changed entity in a snapshot spec.
#[derive(Clone, Default)]
pub struct EntitySpec {
    pub number: u16,
    pub fields: Vec<Field>,
}

/// One snapshot message spec.
#[derive(Clone, Default)]
pub struct SnapSpec {
    pub server_time: i32,
    /// 0 decodes against the baseline; N references `sequence - N`
    pub delta_num: u8,
    pub player_fields: Vec<Field>,
    pub entities: Vec<EntitySpec>,
    pub removed: Vec<u16>,
}

/// Builds one recording, one framed message per call.
pub struct DemoWriter {
    pub protocol: Protocol,
    bytes: Vec<u8>,
    sequence: i32,
}

impl DemoWriter {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            bytes: Vec::new(),
            sequence: 0,
        }
    }

    /// Sequence number the next message will carry.
    pub fn next_sequence(&self) -> i32 {
        self.sequence + 1
    }

    fn frame(&mut self, body: Vec<u8>) {
        self.sequence += 1;
        self.bytes.extend_from_slice(&self.sequence.to_le_bytes());
        self.bytes
            .extend_from_slice(&(body.len() as u32).to_le_bytes());
        self.bytes.extend_from_slice(&body);
    }

    /// A gamestate message: config strings, baselines, the demo taker.
    pub fn gamestate(
        &mut self,
        command_sequence: i32,
        client_num: i32,
        config_strings: &[(u16, &str)],
        baselines: &[EntitySpec],
    ) {
        let mut body = body_with_ack();
        body.push(OP_GAMESTATE);
        body.extend_from_slice(&command_sequence.to_le_bytes());
        for (index, text) in config_strings {
            body.push(OP_CONFIG_STRING);
            body.extend_from_slice(&index.to_le_bytes());
            body.extend_from_slice(text.as_bytes());
            body.push(0);
        }
        for baseline in baselines {
            body.push(OP_BASELINE);
            body.extend_from_slice(&baseline.number.to_le_bytes());
            push_fields(&mut body, &baseline.fields);
        }
        body.push(OP_EOF);
        body.extend_from_slice(&client_num.to_le_bytes());
        body.extend_from_slice(&0i32.to_le_bytes()); // checksum feed
        body.push(OP_EOF);
        self.frame(body);
    }

    /// A message carrying reliable server commands.
    pub fn commands(&mut self, commands: &[(i32, &str)]) {
        let mut body = body_with_ack();
        for (sequence, text) in commands {
            body.push(OP_SERVER_COMMAND);
            body.extend_from_slice(&sequence.to_le_bytes());
            body.extend_from_slice(text.as_bytes());
            body.push(0);
        }
        body.push(OP_EOF);
        self.frame(body);
    }

    /// A snapshot message.
    pub fn snapshot(&mut self, spec: &SnapSpec) {
        let mut body = body_with_ack();
        body.push(OP_SNAPSHOT);
        body.extend_from_slice(&spec.server_time.to_le_bytes());
        body.push(spec.delta_num);
        body.push(0); // snap flags
        body.push(0); // areamask length
        push_fields(&mut body, &spec.player_fields);
        for entity in &spec.entities {
            body.extend_from_slice(&entity.number.to_le_bytes());
            body.push(0); // not removed
            push_fields(&mut body, &entity.fields);
        }
        for number in &spec.removed {
            body.extend_from_slice(&number.to_le_bytes());
            body.push(1); // removed
        }
        body.extend_from_slice(&ENTITY_NONE.to_le_bytes());
        body.push(OP_EOF);
        self.frame(body);
    }

    /// The raw bytes with the terminator record appended.
    pub fn finish(mut self) -> Vec<u8> {
        self.bytes.extend_from_slice(&(-1i32).to_le_bytes());
        self.bytes.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
        self.bytes
    }

    /// The raw bytes without a terminator (truncation scenarios).
    pub fn finish_unterminated(self) -> Vec<u8> {
        self.bytes
    }

    /// Write to a unique temp file with the right extension and return
    /// its path.
    pub fn into_temp_file(self, label: &str) -> PathBuf {
        write_temp_demo(self.protocol, label, &self.finish())
    }
}

fn body_with_ack() -> Vec<u8> {
    0i32.to_le_bytes().to_vec()
}

fn push_fields(body: &mut Vec<u8>, fields: &[Field]) {
    body.push(fields.len() as u8);
    for (index, value) in fields {
        body.push(*index);
        body.extend_from_slice(&value.to_le_bytes());
    }
}

/// Park raw demo bytes in a unique temp file.
pub fn write_temp_demo(protocol: Protocol, label: &str, bytes: &[u8]) -> PathBuf {
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "demsaw_test_{}_{label}_{unique}.{}",
        std::process::id(),
        protocol.extension()
    ));
    std::fs::write(&path, bytes).expect("write temp demo");
    path
}
