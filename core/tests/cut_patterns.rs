//! End-to-end cut-by-pattern scenarios over synthesized recordings.

mod common;

use common::{es, ps, DemoWriter, EntitySpec, SnapSpec};
use demsaw_core::normalizer::{MeanOfDeathMask, WeaponMask};
use demsaw_core::{
    cut_demo_file, ChatOperator, ChatRule, Context, CutByChatArg, CutByFragArg, CutByMidAirArg,
    CutByPatternArg, ParseArg, PatternArg, PlayerSelection, Protocol,
};

const P: Protocol = Protocol::Dm68;

/// dm68 freestanding-event entity type for an obituary.
const ET_EVENT_OBITUARY: i32 = 13 + 60;
const MOD_RAILGUN: i32 = 10;
const MOD_ROCKET: i32 = 6;

fn obituary(number: u16, attacker: i32, target: i32, mean_of_death: i32) -> EntitySpec {
    EntitySpec {
        number,
        fields: vec![
            es(P, "entity_type", ET_EVENT_OBITUARY),
            es(P, "other_entity_num", target),
            es(P, "other_entity_num2", attacker),
            es(P, "event_parm", mean_of_death),
        ],
    }
}

fn pattern_arg(player: PlayerSelection, patterns: Vec<PatternArg>) -> CutByPatternArg {
    CutByPatternArg {
        start_offset_sec: 5,
        end_offset_sec: 10,
        player,
        patterns,
    }
}

fn chat_contains(pattern: &str) -> PatternArg {
    PatternArg::Chat(CutByChatArg {
        rules: vec![ChatRule {
            pattern: pattern.to_owned(),
            operator: ChatOperator::Contains,
            case_sensitive: false,
            ignore_color_codes: false,
        }],
    })
}

fn frag_arg(min_count: u32, gap_sec: u32) -> PatternArg {
    PatternArg::Frag(CutByFragArg {
        min_frag_count: min_count,
        time_between_frags_sec: gap_sec,
        allowed_means_of_deaths: MeanOfDeathMask::ALL,
        allow_any_player: false,
    })
}

#[test]
fn chat_line_produces_offset_window() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 2, &[(0, r"\gamename\baseq3")], &[]);
    writer.commands(&[(1, r#"chat "hello world""#)]);
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        player_fields: vec![ps(P, "client_num", 2)],
        ..SnapSpec::default()
    });
    let path = writer.into_temp_file("chat");

    let mut context = Context::new();
    let cuts = cut_demo_file(
        &mut context,
        &ParseArg::default(),
        &pattern_arg(PlayerSelection::DemoTaker, vec![chat_contains("hello")]),
        &path,
    )
    .unwrap();

    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].game_state_index, 0);
    assert_eq!(cuts[0].start_time_ms, 5_000);
    assert_eq!(cuts[0].end_time_ms, 20_000);
    assert_eq!(cuts[0].very_short_desc, "chat");
}

#[test]
fn frag_chain_at_exact_boundaries_emits_one_cut() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 5, &[(0, r"\gamename\baseq3")], &[]);
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(100, 5, 7, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    // Exactly the configured gap later: still the same chain.
    writer.snapshot(&SnapSpec {
        server_time: 15_000,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(101, 5, 8, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    let path = writer.into_temp_file("frag");

    let mut context = Context::new();
    let cuts = cut_demo_file(
        &mut context,
        &ParseArg::default(),
        &pattern_arg(PlayerSelection::DemoTaker, vec![frag_arg(2, 5)]),
        &path,
    )
    .unwrap();

    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].start_time_ms, 10_000 - 5_000);
    assert_eq!(cuts[0].end_time_ms, 15_000 + 10_000);
    assert_eq!(cuts[0].very_short_desc, "frag");
}

#[test]
fn frag_chain_broken_by_gap_needs_full_count_again() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 5, &[(0, r"\gamename\baseq3")], &[]);
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(100, 5, 7, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    // One millisecond past the gap: the chain restarts at length one.
    writer.snapshot(&SnapSpec {
        server_time: 15_001,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(101, 5, 8, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    let path = writer.into_temp_file("frag_gap");

    let mut context = Context::new();
    let cuts = cut_demo_file(
        &mut context,
        &ParseArg::default(),
        &pattern_arg(PlayerSelection::DemoTaker, vec![frag_arg(2, 5)]),
        &path,
    )
    .unwrap();
    assert!(cuts.is_empty());
}

#[test]
fn tracked_player_resolved_from_colored_name() {
    let mut writer = DemoWriter::new(P);
    // dm68 player slots start at config string 544; client 3 lives at 547.
    writer.gamestate(
        0,
        0,
        &[(0, r"\gamename\baseq3"), (547, r"\n\^1A^2lice\t\1")],
        &[],
    );
    writer.snapshot(&SnapSpec {
        server_time: 9_000,
        player_fields: vec![ps(P, "client_num", 0)],
        entities: vec![
            obituary(100, 3, 9, MOD_RAILGUN),
            obituary(101, 4, 10, MOD_RAILGUN),
        ],
        ..SnapSpec::default()
    });
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 0)],
        entities: vec![obituary(102, 3, 11, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    let path = writer.into_temp_file("by_name");

    let mut context = Context::new();
    let cuts = cut_demo_file(
        &mut context,
        &ParseArg::default(),
        &pattern_arg(
            PlayerSelection::Name("alice".into()),
            vec![frag_arg(2, 60)],
        ),
        &path,
    )
    .unwrap();

    // Only client 3's two kills chain; client 4's kill is ignored.
    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].start_time_ms, 9_000 - 5_000);
    assert_eq!(cuts[0].end_time_ms, 10_000 + 10_000);
}

#[test]
fn overlapping_cuts_from_different_analyzers_merge() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 5, &[(0, r"\gamename\baseq3")], &[]);
    writer.commands(&[(1, r#"chat "nice shot""#)]);
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(100, 5, 7, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    writer.snapshot(&SnapSpec {
        server_time: 12_000,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(101, 5, 8, MOD_RAILGUN)],
        ..SnapSpec::default()
    });
    let path = writer.into_temp_file("merge");

    let mut context = Context::new();
    let cuts = cut_demo_file(
        &mut context,
        &ParseArg::default(),
        &pattern_arg(
            PlayerSelection::DemoTaker,
            vec![chat_contains("nice"), frag_arg(2, 60)],
        ),
        &path,
    )
    .unwrap();

    // chat: [5000, 20000]; frag: [5000, 22000] -> one merged range that
    // keeps the first analyzer's description.
    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].start_time_ms, 5_000);
    assert_eq!(cuts[0].end_time_ms, 22_000);
    assert_eq!(cuts[0].very_short_desc, "chat");
}

#[test]
fn mid_air_rocket_kill_on_airborne_victim() {
    let mut writer = DemoWriter::new(P);
    writer.gamestate(0, 5, &[(0, r"\gamename\baseq3")], &[]);
    // Victim (client 7, entity 7) on the ground at z = 100.
    writer.snapshot(&SnapSpec {
        server_time: 10_000,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![EntitySpec {
            number: 7,
            fields: vec![
                es(P, "entity_type", 1), // player
                es(P, "client_num", 7),
                es(P, "ground_entity_num", 0),
                es(P, "origin_z", common::f(100.0)),
            ],
        }],
        ..SnapSpec::default()
    });
    // Leaves the ground.
    writer.snapshot(&SnapSpec {
        server_time: 10_300,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![EntitySpec {
            number: 7,
            fields: vec![
                es(P, "ground_entity_num", 1023),
                es(P, "origin_x", common::f(50.0)),
                es(P, "origin_z", common::f(150.0)),
            ],
        }],
        ..SnapSpec::default()
    });
    // Still climbing, well away from the takeoff point.
    writer.snapshot(&SnapSpec {
        server_time: 10_700,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![EntitySpec {
            number: 7,
            fields: vec![
                es(P, "origin_x", common::f(300.0)),
                es(P, "origin_z", common::f(260.0)),
            ],
        }],
        ..SnapSpec::default()
    });
    // The kill lands mid-flight.
    writer.snapshot(&SnapSpec {
        server_time: 11_000,
        delta_num: 1,
        player_fields: vec![ps(P, "client_num", 5)],
        entities: vec![obituary(100, 5, 7, MOD_ROCKET)],
        ..SnapSpec::default()
    });
    let path = writer.into_temp_file("midair");

    let mut context = Context::new();
    let cuts = cut_demo_file(
        &mut context,
        &ParseArg::default(),
        &pattern_arg(
            PlayerSelection::DemoTaker,
            vec![PatternArg::MidAir(CutByMidAirArg {
                allowed_weapons: WeaponMask::ROCKET_LAUNCHER,
                min_air_time_ms: 300,
                min_distance: 100.0,
            })],
        ),
        &path,
    )
    .unwrap();

    assert_eq!(cuts.len(), 1);
    assert_eq!(cuts[0].very_short_desc, "midair");
    assert_eq!(cuts[0].start_time_ms, 11_000 - 5_000);
    assert_eq!(cuts[0].end_time_ms, 11_000 + 10_000);
}
