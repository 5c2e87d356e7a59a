//! Message decoder and delta reconstruction
//!
//! One [`Decoder`] consumes the framed messages of one recording. It owns
//! the config-string table, the entity baseline, the snapshot ring and
//! the reliable-command ring, and reports decoded events to an
//! [`EventSink`].
//!
//! Failure policy: a malformed snapshot is skipped (the frame is marked
//! invalid, a warning is queued, parsing continues); a malformed
//! gamestate is fatal for the recording.

use crate::config_strings::ConfigStringTable;
use crate::entity_state::EntityState;
use crate::error::{Error, Result};
use crate::normalizer::{ConfigStringId, EntityType, Normalizer};
use crate::player_state::PlayerState;
use crate::protocol::{GameMod, Protocol};
use crate::snapshot::{Snapshot, SnapshotRing};
use crate::tokenizer::CommandTokenizer;
use crate::wire::{FramedMessage, MsgReader, Opcode};
use crate::{ENTITY_NONE, MAX_AREAMASK_BYTES, MAX_ENTITIES, MAX_RELIABLE_COMMANDS};

/// Decoder state shared with plug-ins on every callback.
#[derive(Debug)]
pub struct ParserState {
    pub protocol: Protocol,
    pub game_mod: GameMod,
    pub normalizer: Normalizer,
    pub config_strings: ConfigStringTable,
    /// Count of gamestate messages seen, minus one; -1 before the first
    pub game_state_index: i32,
    /// Server time of the snapshot being processed
    pub server_time_ms: i32,
    /// Client number recorded in the current gamestate
    pub demo_taker_client_num: i32,
    /// Tokens of the command being dispatched
    pub tokenizer: CommandTokenizer,
}

impl ParserState {
    fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            game_mod: GameMod::identify(protocol, None),
            normalizer: Normalizer::new(protocol, GameMod::identify(protocol, None)),
            config_strings: ConfigStringTable::new(),
            game_state_index: -1,
            server_time_ms: 0,
            demo_taker_client_num: -1,
            tokenizer: CommandTokenizer::new(),
        }
    }
}

/// Gamestate callback payload
#[derive(Debug, Clone, Copy)]
pub struct GamestateEvent {
    pub game_state_index: i32,
    /// The demo taker's client number
    pub client_num: i32,
    /// File offset of the framed message carrying this gamestate
    pub file_offset: u64,
}

/// Server-command callback payload; tokens are in `ParserState::tokenizer`
#[derive(Debug, Clone, Copy)]
pub struct CommandEvent<'a> {
    pub sequence: i32,
    pub text: &'a str,
}

/// One entity changed by the current snapshot
#[derive(Debug, Clone, Copy)]
pub struct ChangedEntity {
    pub state: EntityState,
    /// Set when the entity carries an event instance not seen in the
    /// parent snapshot
    pub is_new_event: bool,
}

/// Snapshot callback payload
#[derive(Debug)]
pub struct SnapshotEvent<'a> {
    pub server_time_ms: i32,
    pub message_sequence: i32,
    pub player_state: &'a PlayerState,
    pub changed_entities: &'a [ChangedEntity],
    pub snapshot: &'a Snapshot,
}

/// Receiver for decoded events, invoked synchronously mid-decode.
pub trait EventSink {
    fn on_gamestate(&mut self, state: &ParserState, event: &GamestateEvent);
    fn on_snapshot(&mut self, state: &ParserState, event: &SnapshotEvent<'_>);
    fn on_command(&mut self, state: &ParserState, event: &CommandEvent<'_>);
}

#[derive(Debug, Clone)]
struct ReliableCommand {
    sequence: i32,
    text: String,
}

/// Per-recording message decoder.
#[derive(Debug)]
pub struct Decoder {
    state: ParserState,
    baseline: Box<[EntityState]>,
    baseline_set: Box<[bool]>,
    ring: SnapshotRing,
    commands: Vec<Option<ReliableCommand>>,
    /// Highest command sequence stored so far
    latest_command_sequence: i32,
    /// Commands at or below this sequence have been delivered
    executed_command_sequence: i32,
    message_sequence: i32,
    changed_scratch: Vec<ChangedEntity>,
    warnings: Vec<String>,
}

impl Decoder {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            state: ParserState::new(protocol),
            baseline: vec![EntityState::default(); MAX_ENTITIES].into_boxed_slice(),
            baseline_set: vec![false; MAX_ENTITIES].into_boxed_slice(),
            ring: SnapshotRing::new(),
            commands: vec![None; MAX_RELIABLE_COMMANDS],
            latest_command_sequence: -1,
            executed_command_sequence: -1,
            message_sequence: -1,
            changed_scratch: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Drain warnings queued since the last call (recoverable anomalies).
    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    /// Decode one framed message, reporting events to `sink`.
    pub fn parse_message(&mut self, framed: &FramedMessage<'_>, sink: &mut impl EventSink) -> Result<()> {
        self.message_sequence = framed.sequence;
        let mut msg = MsgReader::new(framed.body);
        let _reliable_ack = msg.read_i32()?;

        loop {
            let opcode = match msg.read_opcode() {
                Ok(op) => op,
                // A body may end exactly at an opcode boundary.
                Err(_) if msg.remaining() == 0 => break,
                Err(e) => return Err(e),
            };
            match opcode {
                Opcode::Eof => break,
                Opcode::Nop => {}
                Opcode::Gamestate => self.parse_gamestate(&mut msg, framed.offset, sink)?,
                Opcode::ServerCommand => self.parse_server_command(&mut msg)?,
                Opcode::Snapshot => self.parse_snapshot(&mut msg, sink)?,
                Opcode::Download | Opcode::Voip => msg.skip_blob()?,
                Opcode::Bad | Opcode::ConfigString | Opcode::Baseline | Opcode::Extension => {
                    return Err(Error::InvalidDemoFile(format!(
                        "unexpected opcode {opcode:?} at message top level"
                    )));
                }
            }
        }
        Ok(())
    }

    // --- gamestate -----------------------------------------------------------

    fn parse_gamestate(
        &mut self,
        msg: &mut MsgReader<'_>,
        file_offset: u64,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let server_command_sequence = msg.read_i32()?;

        self.state.config_strings.clear();
        self.baseline_set.fill(false);

        loop {
            match msg.read_opcode()? {
                Opcode::Eof => break,
                Opcode::ConfigString => {
                    let index = msg.read_u16()? as usize;
                    let text = msg.read_string()?;
                    self.state.config_strings.set(index, &text)?;
                }
                Opcode::Baseline => {
                    let number = msg.read_u16()?;
                    if number >= ENTITY_NONE {
                        return Err(Error::InvalidDemoFile(format!(
                            "baseline entity number {number} out of range"
                        )));
                    }
                    let slot = number as usize;
                    self.baseline[slot] = EntityState {
                        number,
                        ..EntityState::default()
                    };
                    self.baseline[slot].apply_delta(msg, self.state.protocol)?;
                    self.baseline_set[slot] = true;
                }
                other => {
                    return Err(Error::InvalidDemoFile(format!(
                        "unexpected opcode {other:?} inside gamestate"
                    )));
                }
            }
        }

        let client_num = msg.read_i32()?;
        let _checksum_feed = msg.read_i32()?;

        self.state.game_state_index += 1;
        self.state.demo_taker_client_num = client_num;
        self.ring.invalidate();
        self.latest_command_sequence = server_command_sequence;
        self.executed_command_sequence = server_command_sequence;
        self.commands.iter_mut().for_each(|slot| *slot = None);
        self.refresh_game_mod();

        let event = GamestateEvent {
            game_state_index: self.state.game_state_index,
            client_num,
            file_offset,
        };
        sink.on_gamestate(&self.state, &event);
        Ok(())
    }

    /// Re-identify the mod from the server info and rebuild the
    /// normalizer when the pair changed.
    fn refresh_game_mod(&mut self) {
        let server_info_index = self
            .state
            .normalizer
            .config_string_index(ConfigStringId::ServerInfo)
            .unwrap_or(0);
        let game_name = self
            .state
            .config_strings
            .parse_info_value(server_info_index, "gamename")
            .map(str::to_owned);
        let game_mod = GameMod::identify(self.state.protocol, game_name.as_deref());
        if game_mod != self.state.game_mod {
            self.state.game_mod = game_mod;
            self.state.normalizer = Normalizer::new(self.state.protocol, game_mod);
        }
    }

    // --- server commands -----------------------------------------------------

    fn parse_server_command(&mut self, msg: &mut MsgReader<'_>) -> Result<()> {
        let sequence = msg.read_i32()?;
        let text = msg.read_string()?;
        // Servers re-send undelivered commands; only the first copy counts.
        if sequence <= self.latest_command_sequence {
            return Ok(());
        }
        self.latest_command_sequence = sequence;
        let slot = (sequence as usize) % MAX_RELIABLE_COMMANDS;
        self.commands[slot] = Some(ReliableCommand { sequence, text });
        Ok(())
    }

    /// Deliver stored commands with sequence in
    /// `(executed, execute_up_to]`, in order, exactly once.
    fn deliver_commands(&mut self, execute_up_to: i32, sink: &mut impl EventSink) {
        while self.executed_command_sequence < execute_up_to {
            self.executed_command_sequence += 1;
            let sequence = self.executed_command_sequence;
            let slot = (sequence as usize) % MAX_RELIABLE_COMMANDS;
            let Some(command) = self.commands[slot].take() else {
                continue;
            };
            if command.sequence != sequence {
                // Overwritten before delivery; the ring lost it.
                self.warnings
                    .push(format!("server command {sequence} fell out of the ring"));
                self.commands[slot] = Some(command);
                continue;
            }

            self.state.tokenizer.tokenize(&command.text);
            self.apply_config_string_command();
            let event = CommandEvent {
                sequence,
                text: &command.text,
            };
            sink.on_command(&self.state, &event);
        }
    }

    /// Apply a `cs <index> "<value>"` command to the table before
    /// plug-ins observe the snapshot that admitted it.
    fn apply_config_string_command(&mut self) {
        let tokenizer = &self.state.tokenizer;
        if tokenizer.arg(0) != "cs" || tokenizer.arg_count() < 3 {
            return;
        }
        let Ok(index) = tokenizer.arg(1).parse::<usize>() else {
            self.warnings
                .push(format!("cs command with bad index {:?}", tokenizer.arg(1)));
            return;
        };
        let value = tokenizer.arg(2).to_owned();
        if let Err(e) = self.state.config_strings.set(index, &value) {
            self.warnings.push(format!("cs command rejected: {e}"));
        }
    }

    // --- snapshots -----------------------------------------------------------

    fn parse_snapshot(&mut self, msg: &mut MsgReader<'_>, sink: &mut impl EventSink) -> Result<()> {
        let server_time_ms = msg.read_i32()?;
        let delta_num = msg.read_u8()?;
        let snap_flags = msg.read_u8()?;
        let areamask_len = msg.read_u8()? as usize;
        if areamask_len > MAX_AREAMASK_BYTES {
            return Err(Error::InvalidDemoFile(format!(
                "areamask of {areamask_len} bytes"
            )));
        }
        let areamask_bytes = msg.read_bytes(areamask_len)?;

        // Locate the parent frame. delta_num == 0 is a full frame decoded
        // against the gamestate baseline.
        let (mut snapshot, parent_missing) = if delta_num == 0 {
            (self.snapshot_from_baseline(), false)
        } else {
            let parent_sequence = self.message_sequence - delta_num as i32;
            match self.ring.get(parent_sequence) {
                Some(parent) => (parent.clone(), false),
                None => (self.snapshot_from_baseline(), true),
            }
        };

        snapshot.valid = !parent_missing;
        snapshot.message_sequence = self.message_sequence;
        snapshot.server_time_ms = server_time_ms;
        snapshot.snap_flags = snap_flags;
        snapshot.server_command_sequence = self.latest_command_sequence;
        snapshot.areamask = [0; MAX_AREAMASK_BYTES];
        snapshot.areamask[..areamask_len].copy_from_slice(areamask_bytes);

        // The wire content must be consumed even when the frame is
        // doomed, so later messages stay aligned.
        let decode = self.decode_snapshot_content(msg, &mut snapshot);
        if let Err(e) = decode {
            self.warnings
                .push(format!("snapshot {} dropped: {e}", self.message_sequence));
            // Alignment inside this body is gone; the next framed
            // message realigns the stream.
            msg.skip_to_end();
            snapshot.valid = false;
            self.ring.insert(snapshot);
            return Ok(());
        }
        if parent_missing {
            self.warnings.push(format!(
                "snapshot {} dropped: parent {} left the ring",
                self.message_sequence,
                self.message_sequence - delta_num as i32
            ));
            self.ring.insert(snapshot);
            return Ok(());
        }

        // Commands admitted by this frame run on its time axis, before
        // the snapshot callback itself.
        self.state.server_time_ms = server_time_ms;
        self.deliver_commands(snapshot.server_command_sequence, sink);

        let changed = std::mem::take(&mut self.changed_scratch);
        let event = SnapshotEvent {
            server_time_ms,
            message_sequence: self.message_sequence,
            player_state: &snapshot.player_state,
            changed_entities: &changed,
            snapshot: &snapshot,
        };
        sink.on_snapshot(&self.state, &event);
        self.changed_scratch = changed;
        self.ring.insert(snapshot);
        Ok(())
    }

    /// A frame seeded from the gamestate baseline (full, non-delta).
    fn snapshot_from_baseline(&self) -> Snapshot {
        let mut snapshot = Snapshot::default();
        for slot in 0..MAX_ENTITIES {
            if self.baseline_set[slot] {
                *snapshot.entity_mut(slot) = self.baseline[slot];
                snapshot.set_active(slot, true);
            }
        }
        snapshot
    }

    /// Read the player-state delta and the changed-entity list into
    /// `snapshot`, filling `changed_scratch`.
    fn decode_snapshot_content(
        &mut self,
        msg: &mut MsgReader<'_>,
        snapshot: &mut Snapshot,
    ) -> Result<()> {
        self.changed_scratch.clear();
        snapshot
            .player_state
            .apply_delta(msg, self.state.protocol)?;

        loop {
            let number = msg.read_u16()?;
            if number == ENTITY_NONE {
                break;
            }
            if number as usize >= MAX_ENTITIES {
                return Err(Error::InvalidDemoFile(format!(
                    "entity number {number} out of range"
                )));
            }
            let slot = number as usize;
            let removed = msg.read_u8()? != 0;
            if removed {
                snapshot.set_active(slot, false);
                continue;
            }

            let previous = snapshot
                .is_active(slot)
                .then(|| *snapshot.entity_mut(slot));
            // Delta base: the parent's entity when it was active, the
            // gamestate baseline otherwise.
            let mut entity = match previous {
                Some(prev) => prev,
                None if self.baseline_set[slot] => self.baseline[slot],
                None => EntityState {
                    number,
                    ..EntityState::default()
                },
            };
            entity.number = number;
            entity.apply_delta(msg, self.state.protocol)?;

            let is_new_event = self.is_new_event(previous.as_ref(), &entity);
            *snapshot.entity_mut(slot) = entity;
            snapshot.set_active(slot, true);
            self.changed_scratch.push(ChangedEntity {
                state: entity,
                is_new_event,
            });
        }
        Ok(())
    }

    /// An event is new when the entity just appeared carrying one, or
    /// when its event value (instance bits included) changed.
    fn is_new_event(&self, previous: Option<&EntityState>, current: &EntityState) -> bool {
        let is_event_entity = matches!(
            self.state.normalizer.entity_type(current.entity_type),
            Some(EntityType::Event(_))
        );
        if is_event_entity {
            return match previous {
                None => true,
                Some(prev) => prev.entity_type != current.entity_type,
            };
        }
        if current.event_id() == 0 {
            return false;
        }
        match previous {
            None => true,
            Some(prev) => prev.event != current.event,
        }
    }
}
