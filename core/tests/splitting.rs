//! Splitter behavior: one standalone output per gamestate segment.

mod common;

use common::{es, ps, DemoWriter, EntitySpec, SnapSpec};
use demsaw_core::{parse_demo_file, split_demo_file, Context, ParseArg, PluginKind, Protocol};

const P: Protocol = Protocol::Dm68;

fn snap(server_time: i32, delta_num: u8) -> SnapSpec {
    SnapSpec {
        server_time,
        delta_num,
        player_fields: vec![ps(P, "client_num", 0)],
        ..SnapSpec::default()
    }
}

fn obituary(number: u16, attacker: i32, target: i32) -> EntitySpec {
    EntitySpec {
        number,
        fields: vec![
            es(P, "entity_type", 13 + 60),
            es(P, "other_entity_num", target),
            es(P, "other_entity_num2", attacker),
            es(P, "event_parm", 10),
        ],
    }
}

#[test]
fn two_segments_become_two_standalone_demos() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 0, &[(0, r"\gamename\baseq3")], &[]);
    let mut first = snap(10_000, 0);
    first.entities.push(obituary(100, 3, 7));
    writer.snapshot(&first);

    writer.gamestate(0, 0, &[(0, r"\gamename\baseq3")], &[]);
    let mut second = snap(50_000, 0);
    second.entities.push(obituary(100, 4, 8));
    writer.snapshot(&second);
    let path = writer.into_temp_file("split2");

    let mut context = Context::new();
    let written = split_demo_file(&mut context, &ParseArg::default(), &path).unwrap();
    assert_eq!(written, 2);

    // Each output parses on its own and carries exactly its segment.
    let stem = path.file_stem().unwrap().to_str().unwrap();
    let folder = path.parent().unwrap();
    for (index, expected_attacker) in [(1u32, 3), (2u32, 4)] {
        let part = folder.join(format!("{stem}_{index}.{}", P.extension()));
        let mut part_context = Context::new();
        let arg = ParseArg {
            plugins: &[PluginKind::Obituaries],
            ..ParseArg::default()
        };
        parse_demo_file(&mut part_context, &arg, &part).unwrap();
        let records = part_context.obituaries();
        assert_eq!(records.len(), 1, "segment {index}");
        assert_eq!(records[0].attacker_index, expected_attacker);
        assert_eq!(records[0].game_state_index, 0);
    }
}

#[test]
fn single_segment_writes_nothing() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 0, &[(0, r"\gamename\baseq3")], &[]);
    writer.snapshot(&snap(10_000, 0));
    let path = writer.into_temp_file("split1");

    let mut context = Context::new();
    let written = split_demo_file(&mut context, &ParseArg::default(), &path).unwrap();
    assert_eq!(written, 0);
}
