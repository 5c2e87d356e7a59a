//! Multi-file driver: batching, per-file error codes, cancellation,
//! and single- versus multi-thread determinism.

mod common;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use common::{es, ps, DemoWriter, EntitySpec, SnapSpec};
use demsaw_core::{
    parse_demo_file, parse_demo_files, Context, Error, MultiParseArg, ParseArg, PluginKind,
    Protocol,
};

const P: Protocol = Protocol::Dm68;

fn demo_with_kills(label: &str, kills: &[(i32, i32)]) -> PathBuf {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 0, &[(0, r"\gamename\baseq3")], &[]);
    let entities = kills
        .iter()
        .enumerate()
        .map(|(offset, &(attacker, target))| EntitySpec {
            number: 100 + offset as u16,
            fields: vec![
                es(P, "entity_type", 13 + 60),
                es(P, "other_entity_num", target),
                es(P, "other_entity_num2", attacker),
                es(P, "event_parm", 10),
            ],
        })
        .collect();
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        player_fields: vec![ps(P, "client_num", 0)],
        entities,
        ..SnapSpec::default()
    });
    writer.into_temp_file(label)
}

fn obituary_pairs(context: &Context) -> Vec<(i32, i32)> {
    context
        .obituaries()
        .iter()
        .map(|r| (r.attacker_index, r.target_index))
        .collect()
}

#[test]
fn batch_reports_per_file_results() {
    let good = demo_with_kills("batch_good", &[(3, 7)]);
    let missing = PathBuf::from("/nonexistent/missing.dm_68");
    let files = [good, missing];

    let mut contexts = vec![Context::new(), Context::new()];
    let results = parse_demo_files(
        &mut contexts,
        &ParseArg::default(),
        &MultiParseArg {
            file_paths: &files,
            max_thread_count: 2,
        },
    )
    .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::UnreadableDemoFile(_))));
}

#[test]
fn single_threaded_run_matches_parallel_run_per_file() {
    let files: Vec<PathBuf> = (0..4)
        .map(|i| demo_with_kills(&format!("det_{i}"), &[(i, i + 8), (i + 1, i + 9)]))
        .collect();
    let arg = ParseArg {
        plugins: &[PluginKind::Obituaries],
        ..ParseArg::default()
    };

    // Reference: every file parsed alone.
    let per_file: Vec<Vec<(i32, i32)>> = files
        .iter()
        .map(|path| {
            let mut context = Context::new();
            parse_demo_file(&mut context, &arg, path).unwrap();
            obituary_pairs(&context)
        })
        .collect();

    for thread_count in [1u32, 4] {
        let mut contexts: Vec<Context> = (0..thread_count).map(|_| Context::new()).collect();
        let results = parse_demo_files(
            &mut contexts,
            &arg,
            &MultiParseArg {
                file_paths: &files,
                max_thread_count: thread_count,
            },
        )
        .unwrap();
        assert!(results.iter().all(Result::is_ok));
    }

    // Re-parsing any file reproduces its reference output exactly.
    for (path, expected) in files.iter().zip(&per_file) {
        let mut context = Context::new();
        parse_demo_file(&mut context, &arg, path).unwrap();
        assert_eq!(&obituary_pairs(&context), expected);
    }
}

#[test]
fn preset_stop_flag_cancels_the_batch() {
    let files = [
        demo_with_kills("cancel_a", &[(1, 2)]),
        demo_with_kills("cancel_b", &[(3, 4)]),
    ];
    let stop = AtomicBool::new(false);
    stop.store(true, Ordering::Relaxed);

    let arg = ParseArg {
        stop: Some(&stop),
        ..ParseArg::default()
    };
    let mut contexts = vec![Context::new()];
    let results = parse_demo_files(
        &mut contexts,
        &arg,
        &MultiParseArg {
            file_paths: &files,
            max_thread_count: 1,
        },
    )
    .unwrap();

    // Best-effort: every file either canceled mid-parse or never started.
    assert!(results.iter().all(|result| matches!(
        result,
        Err(Error::OperationCanceled) | Err(Error::Unprocessed)
    )));
}
