//! Public parsing API
//!
//! Argument structs, validators, the single-file parse entry points and
//! the multi-file driver. Validation happens before any file is opened;
//! a rejected configuration never touches the filesystem.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::context::Context;
use crate::cut_section::CutSection;
use crate::decoder::Decoder;
use crate::error::{Error, MessageSeverity, Result};
use crate::plugin::PluginKind;
use crate::plugins::cut_pattern::CutByPatternPlugin;
use crate::protocol::Protocol;
use crate::wire::FramedReader;

pub use crate::plugins::cut::chat::{ChatOperator, ChatRule, CutByChatArg};
pub use crate::plugins::cut::flag_capture::CutByFlagCaptureArg;
pub use crate::plugins::cut::flick_rail::CutByFlickRailArg;
pub use crate::plugins::cut::frag::CutByFragArg;
pub use crate::plugins::cut::mid_air::CutByMidAirArg;
pub use crate::plugins::cut::multi_rail::CutByMultiRailArg;
pub use crate::plugins::cut_pattern::{CutByPatternArg, PatternArg, PlayerSelection};

/// Message callback: severity plus one line of text. Multi-file parsing
/// invokes this from any worker thread; implementations must be
/// internally synchronized (hence `Sync`).
pub type MessageCallback = dyn Fn(MessageSeverity, &str) + Send + Sync;

/// Progress callback in `[0, 1]`. Same threading contract as
/// [`MessageCallback`].
pub type ProgressCallback = dyn Fn(f32) + Send + Sync;

/// Per-parse configuration
#[derive(Default, Clone, Copy)]
pub struct ParseArg<'a> {
    /// Extraction plug-ins to run
    pub plugins: &'a [PluginKind],
    /// Where output files go; next to the input when absent
    pub output_folder: Option<&'a Path>,
    pub message_callback: Option<&'a MessageCallback>,
    pub progress_callback: Option<&'a ProgressCallback>,
    /// Polled between snapshots; set to cancel
    pub stop: Option<&'a AtomicBool>,
}

/// Multi-file driver configuration
#[derive(Clone, Copy)]
pub struct MultiParseArg<'a> {
    pub file_paths: &'a [PathBuf],
    pub max_thread_count: u32,
}

// =============================================================================
// Validation
// =============================================================================

fn validate_parse_arg(arg: &ParseArg<'_>) -> Result<()> {
    if let Some(folder) = arg.output_folder {
        if !folder.is_dir() {
            return Err(Error::InvalidArgument(
                "output folder does not exist or is not a directory",
            ));
        }
    }
    Ok(())
}

fn validate_chat(arg: &CutByChatArg) -> Result<()> {
    if arg.rules.is_empty() {
        return Err(Error::InvalidArgument("chat: no rules"));
    }
    if arg.rules.iter().any(|rule| rule.pattern.is_empty()) {
        return Err(Error::InvalidArgument("chat: rule with an empty pattern"));
    }
    Ok(())
}

fn validate_frag(arg: &CutByFragArg) -> Result<()> {
    if arg.time_between_frags_sec == 0 {
        return Err(Error::InvalidArgument("frag: time between frags is zero"));
    }
    if arg.min_frag_count < 2 {
        return Err(Error::InvalidArgument("frag: minimum count below 2"));
    }
    if arg.allowed_means_of_deaths.is_empty() {
        return Err(Error::InvalidArgument("frag: empty mean-of-death mask"));
    }
    Ok(())
}

fn validate_mid_air(arg: &CutByMidAirArg) -> Result<()> {
    if arg.allowed_weapons.is_empty() {
        return Err(Error::InvalidArgument("mid-air: empty weapon mask"));
    }
    Ok(())
}

fn validate_multi_rail(arg: &CutByMultiRailArg) -> Result<()> {
    if arg.min_kill_count < 2 {
        return Err(Error::InvalidArgument("multi-rail: minimum count below 2"));
    }
    Ok(())
}

fn validate_flag_capture(arg: &CutByFlagCaptureArg) -> Result<()> {
    if arg.max_carry_time_ms <= arg.min_carry_time_ms {
        return Err(Error::InvalidArgument(
            "flag capture: carry time bounds are inverted",
        ));
    }
    if !arg.allow_base_to_base && !arg.allow_missing_to_base {
        return Err(Error::InvalidArgument(
            "flag capture: every pickup origin is disallowed",
        ));
    }
    Ok(())
}

fn validate_flick_rail(arg: &CutByFlickRailArg) -> Result<()> {
    if arg.min_speed < 0.0 || arg.min_angle_delta < 0.0 {
        return Err(Error::InvalidArgument("flick rail: negative threshold"));
    }
    if !(2..=4).contains(&arg.min_speed_snapshot_count)
        || !(2..=4).contains(&arg.min_angle_delta_snapshot_count)
    {
        return Err(Error::InvalidArgument(
            "flick rail: snapshot counts must be in [2, 4]",
        ));
    }
    Ok(())
}

/// Validate a whole cut-by-pattern configuration.
pub fn validate_cut_by_pattern(arg: &CutByPatternArg) -> Result<()> {
    if arg.patterns.is_empty() {
        return Err(Error::InvalidArgument("cut: no patterns"));
    }
    if arg.start_offset_sec == 0 || arg.end_offset_sec == 0 {
        return Err(Error::InvalidArgument("cut: zero context offset"));
    }
    for pattern in &arg.patterns {
        match pattern {
            PatternArg::Chat(a) => validate_chat(a)?,
            PatternArg::Frag(a) => validate_frag(a)?,
            PatternArg::MidAir(a) => validate_mid_air(a)?,
            PatternArg::MultiRail(a) => validate_multi_rail(a)?,
            PatternArg::FlagCapture(a) => validate_flag_capture(a)?,
            PatternArg::FlickRail(a) => validate_flick_rail(a)?,
        }
    }
    Ok(())
}

// =============================================================================
// Single-file parsing
// =============================================================================

fn emit_message(arg: &ParseArg<'_>, severity: MessageSeverity, text: &str) {
    if let Some(callback) = arg.message_callback {
        callback(severity, text);
    }
}

/// Parse one recording, running the context's registered plug-ins.
///
/// Plug-in outputs are retrieved from the context afterwards and stay
/// valid until the next parse call on it.
pub fn parse_demo_file(context: &mut Context, arg: &ParseArg<'_>, path: &Path) -> Result<()> {
    validate_parse_arg(arg)?;
    for kind in arg.plugins {
        context.register_plugin(*kind);
    }
    parse_prepared(context, arg, path)
}

/// Parse with the context's plug-ins as they stand (no registration).
fn parse_prepared(context: &mut Context, arg: &ParseArg<'_>, path: &Path) -> Result<()> {
    context.poisoned = false;
    let result = parse_inner(context, arg, path);
    if let Err(error) = &result {
        context.poisoned = !matches!(error, Error::OperationCanceled);
        emit_message(arg, MessageSeverity::Error, &format!("{}: {error}", path.display()));
    }
    result
}

fn parse_inner(context: &mut Context, arg: &ParseArg<'_>, path: &Path) -> Result<()> {
    let protocol = Protocol::from_path(path)?;

    let mut buffer = context.scratch.acquire();
    let read = read_demo_bytes(path, &mut buffer);
    if let Err(error) = read {
        context.scratch.release(buffer);
        return Err(error);
    }

    context.plugins.reset();
    let mut decoder = Decoder::new(protocol);
    let total = buffer.len().max(1) as f32;
    let mut result = Ok(());

    let mut reader = FramedReader::new(&buffer);
    loop {
        let message = match reader.next_message() {
            Ok(Some(message)) => message,
            Ok(None) => break,
            Err(error) => {
                result = Err(error);
                break;
            }
        };
        if let Err(error) = decoder.parse_message(&message, &mut context.plugins) {
            result = Err(error);
            break;
        }
        for warning in decoder.take_warnings() {
            emit_message(arg, MessageSeverity::Warning, &warning);
        }
        if let Some(callback) = arg.progress_callback {
            callback(message.end_offset as f32 / total);
        }
        // Cancellation is best-effort and never mid-snapshot: the flag
        // is sampled only at message boundaries.
        if arg.stop.is_some_and(|stop| stop.load(Ordering::Relaxed)) {
            result = Err(Error::OperationCanceled);
            break;
        }
    }

    if result.is_ok() {
        context.plugins.finish(decoder.state());
    }
    context.decoder = Some(decoder);
    context.scratch.release(buffer);
    result
}

pub(crate) fn read_demo_bytes(path: &Path, buffer: &mut Vec<u8>) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(Error::UnreadableDemoFile)?;
    if !metadata.is_file() {
        return Err(Error::UnreadableDemoFile(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a regular file",
        )));
    }
    let mut file = File::open(path).map_err(Error::UnreadableDemoFile)?;
    file.read_to_end(buffer).map_err(Error::UnreadableDemoFile)?;
    Ok(())
}

/// Run the cut-by-pattern plug-in over one recording and return the
/// merged cut sections.
pub fn cut_demo_file(
    context: &mut Context,
    arg: &ParseArg<'_>,
    cut_arg: &CutByPatternArg,
    path: &Path,
) -> Result<Vec<CutSection>> {
    validate_parse_arg(arg)?;
    validate_cut_by_pattern(cut_arg)?;

    for kind in arg.plugins {
        context.register_plugin(*kind);
    }
    context
        .plugins
        .register_cut_by_pattern(CutByPatternPlugin::new(cut_arg));
    parse_prepared(context, arg, path)?;
    Ok(context.cut_sections().to_vec())
}

// =============================================================================
// Multi-file driver
// =============================================================================

/// Parse a batch of recordings across worker threads.
///
/// Each worker owns one context; files are assigned largest-first to the
/// least-loaded worker by byte count. Returns one result per input file,
/// in input order; files never started report [`Error::Unprocessed`].
/// With one thread the per-file outputs are byte-identical to any
/// multi-threaded run.
pub fn parse_demo_files(
    contexts: &mut [Context],
    arg: &ParseArg<'_>,
    multi: &MultiParseArg<'_>,
) -> Result<Vec<Result<()>>> {
    if multi.file_paths.is_empty() {
        return Err(Error::InvalidArgument("no input files"));
    }
    if contexts.is_empty() {
        return Err(Error::InvalidArgument("no contexts"));
    }
    validate_parse_arg(arg)?;

    let file_count = multi.file_paths.len();
    let thread_count = (multi.max_thread_count.max(1) as usize)
        .min(contexts.len())
        .min(file_count);

    // Largest file to the least-loaded worker.
    let sizes: Vec<u64> = multi
        .file_paths
        .iter()
        .map(|path| std::fs::metadata(path).map(|m| m.len()).unwrap_or(0))
        .collect();
    let mut order: Vec<usize> = (0..file_count).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(sizes[i]));

    let mut assignments: Vec<Vec<usize>> = vec![Vec::new(); thread_count];
    let mut loads = vec![0u64; thread_count];
    for index in order {
        let worker = loads
            .iter()
            .enumerate()
            .min_by_key(|&(_, load)| *load)
            .map(|(w, _)| w)
            .unwrap_or(0);
        assignments[worker].push(index);
        loads[worker] += sizes[index];
    }

    let total_bytes: u64 = sizes.iter().sum::<u64>().max(1);
    let completed_bytes = AtomicU64::new(0);

    let mut worker_results: Vec<Vec<(usize, Result<()>)>> = Vec::new();
    let mut worker_panicked = false;
    std::thread::scope(|scope| {
        let mut handles = Vec::new();
        for (context, files) in contexts.iter_mut().zip(assignments.iter()) {
            let completed = &completed_bytes;
            let sizes = &sizes;
            let paths = multi.file_paths;
            handles.push(scope.spawn(move || {
                let mut results = Vec::with_capacity(files.len());
                let mut canceled = false;
                for &index in files {
                    if canceled || arg.stop.is_some_and(|s| s.load(Ordering::Relaxed)) {
                        canceled = true;
                        results.push((index, Err(Error::Unprocessed)));
                        continue;
                    }
                    // Worker-local parse; per-file progress is folded
                    // into the batch aggregate below.
                    let file_arg = ParseArg {
                        progress_callback: None,
                        ..*arg
                    };
                    let result = parse_prepared(context, &file_arg, &paths[index]);
                    canceled = matches!(result, Err(Error::OperationCanceled));
                    results.push((index, result));

                    let done = completed.fetch_add(sizes[index], Ordering::Relaxed)
                        + sizes[index];
                    if let Some(callback) = arg.progress_callback {
                        callback(done as f32 / total_bytes as f32);
                    }
                }
                results
            }));
        }
        for handle in handles {
            match handle.join() {
                Ok(results) => worker_results.push(results),
                Err(_) => worker_panicked = true,
            }
        }
    });
    if worker_panicked {
        return Err(Error::OperationFailed("a parse worker panicked".into()));
    }

    let mut results: Vec<Result<()>> = (0..file_count).map(|_| Err(Error::Unprocessed)).collect();
    for (index, result) in worker_results.into_iter().flatten() {
        results[index] = result;
    }
    Ok(results)
}
