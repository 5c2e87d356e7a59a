//! Demo splitter
//!
//! Splits a recording into one output file per gamestate segment. Each
//! segment is copied byte for byte from the gamestate message that opens
//! it through the last message before the next one, then closed with a
//! terminator record, so every output is a standalone recording. A
//! single-segment file produces no output.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::api::ParseArg;
use crate::context::Context;
use crate::decoder::{
    CommandEvent, Decoder, EventSink, GamestateEvent, ParserState, SnapshotEvent,
};
use crate::error::{Error, Result};
use crate::protocol::Protocol;
use crate::wire::{FramedReader, TERMINATOR_BYTE_COUNT, TERMINATOR_SEQUENCE};

/// Records where each gamestate segment starts.
struct SegmentSink {
    offsets: Vec<u64>,
}

impl EventSink for SegmentSink {
    fn on_gamestate(&mut self, _: &ParserState, event: &GamestateEvent) {
        self.offsets.push(event.file_offset);
    }
    fn on_snapshot(&mut self, _: &ParserState, _: &SnapshotEvent<'_>) {}
    fn on_command(&mut self, _: &ParserState, _: &CommandEvent<'_>) {}
}

/// Split `path` into per-segment files next to it (or into the
/// configured output folder). Returns the number of files written; zero
/// when the recording holds a single segment.
pub fn split_demo_file(context: &mut Context, arg: &ParseArg<'_>, path: &Path) -> Result<u32> {
    let protocol = Protocol::from_path(path)?;

    let mut buffer = context.scratch.acquire();
    let result = split_inner(arg, path, protocol, &mut buffer);
    context.scratch.release(buffer);
    context.poisoned = result.is_err();
    result
}

fn split_inner(
    arg: &ParseArg<'_>,
    path: &Path,
    protocol: Protocol,
    buffer: &mut Vec<u8>,
) -> Result<u32> {
    crate::api::read_demo_bytes(path, buffer)?;

    // One decode pass to find the segment boundaries and the end of the
    // last complete message.
    let mut decoder = Decoder::new(protocol);
    let mut sink = SegmentSink {
        offsets: Vec::new(),
    };
    let mut reader = FramedReader::new(buffer);
    let mut data_end = 0u64;
    while let Some(message) = reader.next_message()? {
        decoder.parse_message(&message, &mut sink)?;
        data_end = message.end_offset;
    }

    if sink.offsets.len() < 2 {
        return Ok(0);
    }

    let mut written = 0u32;
    for (index, &start) in sink.offsets.iter().enumerate() {
        let end = sink
            .offsets
            .get(index + 1)
            .copied()
            .unwrap_or(data_end);
        let output_path = segment_path(arg, path, index as u32 + 1)?;
        write_segment(&output_path, &buffer[start as usize..end as usize])?;
        written += 1;
    }
    Ok(written)
}

/// `<stem>_<n>.<ext>` next to the input, or inside the output folder.
fn segment_path(arg: &ParseArg<'_>, input: &Path, index: u32) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or(Error::InvalidArgument("input path has no file name"))?;
    let extension = input
        .extension()
        .and_then(|e| e.to_str())
        .ok_or(Error::InvalidArgument("input path has no extension"))?;
    let file_name = format!("{stem}_{index}.{extension}");
    let folder = arg
        .output_folder
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    Ok(folder.join(file_name))
}

fn write_segment(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(Error::UnwritableFile)?;
    file.write_all(bytes).map_err(Error::UnwritableFile)?;
    file.write_all(&TERMINATOR_SEQUENCE.to_le_bytes())
        .map_err(Error::UnwritableFile)?;
    file.write_all(&TERMINATOR_BYTE_COUNT.to_le_bytes())
        .map_err(Error::UnwritableFile)?;
    Ok(())
}
