//! Flick-rail pattern analyzer
//!
//! Cuts railgun shots fired at the end of a fast view swing. The last
//! few snapshots of the tracked player's view angles are kept; a shot
//! qualifies when the recent angular deltas and angular speeds clear the
//! configured thresholds.

use crate::cut_section::CutSection;
use crate::decoder::{GamestateEvent, ParserState, SnapshotEvent};
use crate::normalizer::{EntityEvent, EntityType, Weapon};
use crate::plugins::cut::CutBuffer;
use crate::plugins::cut_pattern::AnalyzerContext;

/// Flick-rail analyzer configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CutByFlickRailArg {
    /// Minimum angular speed, degrees per second
    pub min_speed: f32,
    /// Snapshots over which the speed threshold must hold (2 to 4)
    pub min_speed_snapshot_count: u32,
    /// Minimum single-snapshot angle change, degrees
    pub min_angle_delta: f32,
    /// Snapshots inspected for the angle-delta threshold (2 to 4)
    pub min_angle_delta_snapshot_count: u32,
}

/// One view-angle sample
#[derive(Debug, Clone, Copy)]
struct Sample {
    time_ms: i32,
    /// Pitch and yaw; roll never matters for aim
    angles: [f32; 2],
}

const SAMPLE_CAPACITY: usize = 4;

pub struct FlickRailAnalyzer {
    arg: CutByFlickRailArg,
    /// Most recent last
    samples: Vec<Sample>,
    last_tracked: Option<i32>,
    cuts: CutBuffer,
}

impl FlickRailAnalyzer {
    pub fn new(arg: CutByFlickRailArg) -> Self {
        Self {
            arg,
            samples: Vec::with_capacity(SAMPLE_CAPACITY),
            last_tracked: None,
            cuts: CutBuffer::default(),
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_tracked = None;
        self.cuts.clear();
    }

    pub fn on_gamestate(
        &mut self,
        _ctx: &AnalyzerContext,
        _state: &ParserState,
        _event: &GamestateEvent,
    ) {
        self.samples.clear();
    }

    pub fn on_snapshot(
        &mut self,
        ctx: &AnalyzerContext,
        state: &ParserState,
        event: &SnapshotEvent<'_>,
    ) {
        if ctx.tracked_player != self.last_tracked {
            self.samples.clear();
            self.last_tracked = ctx.tracked_player;
        }
        let Some(tracked) = ctx.tracked_player else {
            return;
        };

        self.sample_view_angles(state, event, tracked);

        for changed in event.changed_entities {
            if !changed.is_new_event || changed.state.client_num != tracked {
                continue;
            }
            if state.normalizer.entity_event(&changed.state) != Some(EntityEvent::FireWeapon) {
                continue;
            }
            if state.normalizer.weapon(changed.state.weapon) != Some(Weapon::Railgun) {
                continue;
            }
            if self.swing_qualifies() {
                self.cuts.push(CutSection {
                    game_state_index: state.game_state_index.max(0) as u32,
                    start_time_ms: event.server_time_ms - ctx.start_offset_ms,
                    end_time_ms: event.server_time_ms + ctx.end_offset_ms,
                    very_short_desc: "flick",
                });
            }
        }
    }

    /// Record this snapshot's view angles for the tracked player: the
    /// follower's player state when it is them, their player entity
    /// otherwise.
    fn sample_view_angles(&mut self, state: &ParserState, event: &SnapshotEvent<'_>, tracked: i32) {
        let angles = if event.player_state.client_num == tracked {
            let a = event.player_state.view_angles;
            Some([a[0], a[1]])
        } else {
            event.changed_entities.iter().find_map(|changed| {
                let entity = &changed.state;
                let is_player = matches!(
                    state.normalizer.entity_type(entity.entity_type),
                    Some(EntityType::Player)
                );
                (is_player && entity.client_num == tracked)
                    .then(|| [entity.angles[0], entity.angles[1]])
            })
        };
        let Some(angles) = angles else {
            return;
        };
        if self.samples.len() == SAMPLE_CAPACITY {
            self.samples.remove(0);
        }
        self.samples.push(Sample {
            time_ms: event.server_time_ms,
            angles,
        });
    }

    /// Check the recent swing against both thresholds.
    fn swing_qualifies(&self) -> bool {
        let delta_samples = self.arg.min_angle_delta_snapshot_count as usize;
        let speed_samples = self.arg.min_speed_snapshot_count as usize;
        if self.samples.len() < delta_samples.max(speed_samples) {
            return false;
        }

        let deltas: Vec<(f32, i32)> = self
            .samples
            .windows(2)
            .map(|pair| {
                (
                    angle_distance(pair[0].angles, pair[1].angles),
                    pair[1].time_ms - pair[0].time_ms,
                )
            })
            .collect();

        let recent = |count: usize| &deltas[deltas.len() - (count - 1)..];

        let max_delta = recent(delta_samples)
            .iter()
            .map(|&(d, _)| d)
            .fold(0.0f32, f32::max);
        if max_delta < self.arg.min_angle_delta {
            return false;
        }

        recent(speed_samples).iter().all(|&(delta, dt_ms)| {
            dt_ms > 0 && delta * 1000.0 / dt_ms as f32 >= self.arg.min_speed
        })
    }

    pub fn finish(&mut self) {
        self.cuts.finish();
    }

    pub fn cut_sections(&self) -> &[CutSection] {
        self.cuts.sections()
    }
}

/// Wrap-aware angular distance between two (pitch, yaw) pairs.
fn angle_distance(a: [f32; 2], b: [f32; 2]) -> f32 {
    let dp = wrap_degrees(b[0] - a[0]);
    let dy = wrap_degrees(b[1] - a[1]);
    (dp * dp + dy * dy).sqrt()
}

fn wrap_degrees(angle: f32) -> f32 {
    let mut a = angle % 360.0;
    if a > 180.0 {
        a -= 360.0;
    } else if a < -180.0 {
        a += 360.0;
    }
    a
}
