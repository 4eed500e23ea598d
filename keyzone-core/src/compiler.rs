//! The grid compiler: flattens preset + zones + alias table into a
//! `CompiledContext`. Deterministic and pure given its inputs — compiling
//! the same snapshot twice yields structurally identical grids.
//!
//! Published via atomic pointer swap: `CompiledContextHandle` gives readers
//! a reader-never-blocks-producer handoff via a reference-counted pointer
//! swap. Old snapshots stay valid for as long as a reader holds their `Arc`
//! clone, which a lock-free triple buffer would not guarantee once its
//! ring wrapped around.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use keyzone_types::grid::{AudioGrid, CompiledContext, StrumConfig, VisualGrid, VisualState};
use keyzone_types::ids::{pseudo_codes, AliasHash, KeyCode, LayerId, LAYER_COUNT};
use keyzone_types::mapping::{Action, Mapping, NoteAction, ReleaseBehavior};
use keyzone_types::preset::Preset;
use keyzone_types::zone::{PlayMode, ReleaseMode};

use crate::alias_table::AliasTable;
use crate::zone::ZoneRuntime;

#[derive(Clone)]
pub struct CompiledContextHandle(Arc<RwLock<Arc<CompiledContext>>>);

impl CompiledContextHandle {
    pub fn new(initial: CompiledContext) -> Self {
        Self(Arc::new(RwLock::new(Arc::new(initial))))
    }

    /// Clone the current snapshot's `Arc`. Cheap; the dispatcher calls this
    /// once per event and works against the local clone for the duration.
    pub fn load(&self) -> Arc<CompiledContext> {
        self.0.read().expect("compiled context lock poisoned").clone()
    }

    /// Swap in a freshly compiled context. Readers already holding a clone
    /// of the previous `Arc` keep it alive until they drop it.
    pub fn publish(&self, new_ctx: CompiledContext) {
        *self.0.write().expect("compiled context lock poisoned") = Arc::new(new_ctx);
    }
}

const MODIFIER_PAIRS: &[(KeyCode, KeyCode, KeyCode)] = &[
    (
        pseudo_codes::SHIFT_GENERIC,
        pseudo_codes::SHIFT_LEFT,
        pseudo_codes::SHIFT_RIGHT,
    ),
    (
        pseudo_codes::CONTROL_GENERIC,
        pseudo_codes::CONTROL_LEFT,
        pseudo_codes::CONTROL_RIGHT,
    ),
    (
        pseudo_codes::ALT_GENERIC,
        pseudo_codes::ALT_LEFT,
        pseudo_codes::ALT_RIGHT,
    ),
];

fn modifier_pair(key: KeyCode) -> Option<(KeyCode, KeyCode)> {
    MODIFIER_PAIRS
        .iter()
        .find(|(generic, _, _)| *generic == key)
        .map(|(_, l, r)| (*l, *r))
}

fn dim_color(color: u32) -> u32 {
    (color & 0x00FF_FFFF) | (0x4C << 24)
}

struct IncomingWrite {
    key: KeyCode,
    action: Action,
    chord_index: i32,
    strum: Option<StrumConfig>,
    release_delay_ms: u32,
    color: u32,
    label: String,
    source_name: String,
}

/// Write policy. A second write to an already-touched key this pass
/// becomes Conflict; the audio slot keeps its first writer (visual alone
/// flags the collision). Zones are processed first, then mappings, so a
/// mapping on a zone-covered key yields Conflict.
fn write_slot(audio: &mut AudioGrid, visual: &mut VisualGrid, touched: &mut HashSet<KeyCode>, w: IncomingWrite) {
    if touched.contains(&w.key) {
        let slot = visual.get_mut(w.key);
        slot.state = VisualState::Conflict;
        slot.color = 0xFFFF_0000;
        slot.label = format!("{} (!)", w.label);
        slot.source_name = w.source_name;
        return;
    }

    let prior_non_empty = visual
        .get(w.key)
        .map(|s| s.state != VisualState::Empty)
        .unwrap_or(false);

    let audio_slot = audio.get_mut(w.key);
    audio_slot.active = true;
    audio_slot.action = Some(w.action);
    audio_slot.chord_index = w.chord_index;
    audio_slot.strum = w.strum;
    audio_slot.release_delay_ms = w.release_delay_ms;

    let visual_slot = visual.get_mut(w.key);
    visual_slot.color = w.color;
    visual_slot.label = w.label;
    visual_slot.source_name = w.source_name;
    visual_slot.state = if prior_non_empty {
        VisualState::Override
    } else {
        VisualState::Active
    };

    touched.insert(w.key);
}

fn is_generic_modifier(key: KeyCode) -> bool {
    MODIFIER_PAIRS.iter().any(|(generic, _, _)| *generic == key)
}

fn release_behavior_for_zone(release_mode: ReleaseMode) -> ReleaseBehavior {
    match release_mode {
        ReleaseMode::Sustain => ReleaseBehavior::SustainUntilRetrigger,
        ReleaseMode::Normal { .. } => ReleaseBehavior::SendNoteOff,
    }
}

/// How long `handle_key_up` should delay this zone's NoteOff, per
/// `ReleaseMode::Normal`'s `delay_release_on` flag. `Sustain` zones don't
/// use a fixed delay; they ride the global pedal.
fn release_delay_for_zone(release_mode: ReleaseMode) -> u32 {
    match release_mode {
        ReleaseMode::Normal {
            delay_release_on: true,
            release_duration_ms,
            ..
        } => release_duration_ms,
        ReleaseMode::Normal { delay_release_on: false, .. } | ReleaseMode::Sustain => 0,
    }
}

/// Bake a zone's play mode into the compiled slot so the dispatcher never
/// has to re-walk zones to decide Direct vs. Strum.
fn strum_config_for_zone(zone: &keyzone_types::zone::Zone) -> Option<StrumConfig> {
    match zone.play_mode {
        PlayMode::Direct => None,
        PlayMode::Strum {
            strum_speed_ms,
            strum_pattern,
            strum_timing_variation_on,
            strum_timing_variation_ms,
            ..
        } => Some(StrumConfig {
            speed_ms: strum_speed_ms,
            pattern: strum_pattern,
            humanize_ms: if strum_timing_variation_on { strum_timing_variation_ms } else { 0 },
            allow_sustain: !zone.ignore_global_sustain,
        }),
    }
}

fn apply_zone_writes(
    audio: &mut AudioGrid,
    visual: &mut VisualGrid,
    chord_pool: &mut Vec<keyzone_types::grid::ChordVoicing>,
    layer: LayerId,
    alias: AliasHash,
    zones: &[ZoneRuntime],
    touched: &mut HashSet<KeyCode>,
) {
    for zr in zones
        .iter()
        .filter(|z| z.zone.layer_id == layer && z.zone.target_alias_hash == alias)
    {
        for &key in &zr.zone.input_key_codes {
            let Some(notes) = zr.get_notes_for_key(key, 0, 0) else {
                continue;
            };
            if notes.is_empty() {
                continue;
            }
            let root_pitch = notes[0].pitch;
            let chord_index = if notes.len() > 1 {
                chord_pool.push(notes.clone());
                (chord_pool.len() - 1) as i32
            } else {
                -1
            };
            let action = Action::Note(NoteAction {
                channel: zr.zone.midi_channel,
                midi_note: root_pitch.clamp(0, 127) as u8,
                velocity: zr.zone.base_velocity,
                velocity_random: zr.zone.velocity_random,
                release_behavior: release_behavior_for_zone(zr.zone.release_mode),
                follow_transpose: !zr.zone.ignore_global_transpose,
                allow_sustain: !zr.zone.ignore_global_sustain,
            });
            write_slot(
                audio,
                visual,
                touched,
                IncomingWrite {
                    key,
                    action,
                    chord_index,
                    strum: strum_config_for_zone(&zr.zone),
                    release_delay_ms: release_delay_for_zone(zr.zone.release_mode),
                    color: zr.zone.color,
                    label: zr.zone.name.clone(),
                    source_name: zr.zone.name.clone(),
                },
            );
        }
    }
}

fn mapping_label(mapping: &Mapping) -> String {
    match mapping.action {
        Action::Note(n) => format!("Note {}", n.midi_note),
        Action::Expression(e) => format!("{:?}", e.adsr_target),
        Action::Command(c) => format!("{:?}", c),
    }
}

fn mapping_color(mapping: &Mapping) -> u32 {
    match mapping.action {
        Action::Note(_) => 0xFF5599FF,
        Action::Expression(_) => 0xFF33CCCC,
        Action::Command(_) => 0xFFFFCC33,
    }
}

fn write_mapping(
    audio: &mut AudioGrid,
    visual: &mut VisualGrid,
    touched: &mut HashSet<KeyCode>,
    mapping: &Mapping,
) {
    write_slot(
        audio,
        visual,
        touched,
        IncomingWrite {
            key: mapping.input_key,
            action: mapping.action,
            chord_index: -1,
            strum: None,
            release_delay_ms: 0,
            color: mapping_color(mapping),
            label: mapping_label(mapping),
            source_name: "mapping".to_string(),
        },
    );
}

/// Apply one layer's manual mappings for one alias: specific mappings
/// write first, generic modifiers write and then replicate to their
/// left/right specific keys if those are untouched.
fn apply_mapping_pass(
    audio: &mut AudioGrid,
    visual: &mut VisualGrid,
    preset: &Preset,
    layer: LayerId,
    alias: AliasHash,
    touched: &mut HashSet<KeyCode>,
) {
    let Some(layer_def) = preset.layers.get(layer as usize) else {
        return;
    };

    let mut generic_mods = Vec::new();
    for mapping in layer_def.mappings.iter().filter(|m| m.enabled) {
        let mapping_alias = if mapping.targets_any_device() {
            AliasHash::ANY
        } else {
            AliasHash::of(&mapping.input_alias)
        };
        if mapping_alias != alias {
            continue;
        }
        if is_generic_modifier(mapping.input_key) {
            generic_mods.push(mapping);
            continue;
        }
        write_mapping(audio, visual, touched, mapping);
    }

    for mapping in generic_mods {
        write_mapping(audio, visual, touched, mapping);
        if let Some((left, right)) = modifier_pair(mapping.input_key) {
            for specific_key in [left, right] {
                if touched.contains(&specific_key) {
                    continue;
                }
                write_slot(
                    audio,
                    visual,
                    touched,
                    IncomingWrite {
                        key: specific_key,
                        action: mapping.action,
                        chord_index: -1,
                        strum: None,
                        release_delay_ms: 0,
                        color: mapping_color(mapping),
                        label: mapping_label(mapping),
                        source_name: "mapping (replicated)".to_string(),
                    },
                );
            }
        }
    }
}

fn inherit_layer(audio_grids: &mut [AudioGrid], visual_grids: &mut [VisualGrid], layer: usize) {
    let prev_audio = audio_grids[layer - 1].clone();
    let mut visual = visual_grids[layer - 1].clone();
    visual.for_each_mut(|_, slot| {
        if slot.state != VisualState::Empty {
            slot.state = VisualState::Inherited;
            slot.color = dim_color(slot.color);
        }
    });
    audio_grids[layer] = prev_audio;
    visual_grids[layer] = visual;
}

fn initialize_device_grid(ctx: &CompiledContext, layer: usize) -> (AudioGrid, VisualGrid) {
    let audio = ctx.global_audio_grids[layer].clone();
    let mut visual = ctx.global_visual_grids[layer].clone();
    visual.for_each_mut(|_, slot| {
        if slot.state != VisualState::Empty {
            slot.state = VisualState::Inherited;
            slot.color = dim_color(slot.color);
        }
    });
    (audio, visual)
}

/// Build a fresh `CompiledContext` from the current preset, zones, and
/// alias table. Pure and deterministic: the same inputs always produce a
/// structurally identical output.
pub fn compile(preset: &Preset, zones: &[ZoneRuntime], alias_table: &AliasTable) -> CompiledContext {
    let mut ctx = CompiledContext::empty(LAYER_COUNT);

    // Pass 1: global stack (alias 0).
    for layer in 0..LAYER_COUNT {
        if layer > 0 {
            inherit_layer(&mut ctx.global_audio_grids, &mut ctx.global_visual_grids, layer);
        }
        let mut touched = HashSet::new();
        {
            let CompiledContext {
                global_audio_grids,
                global_visual_grids,
                chord_pool,
                ..
            } = &mut ctx;
            apply_zone_writes(
                &mut global_audio_grids[layer],
                &mut global_visual_grids[layer],
                chord_pool,
                layer as LayerId,
                AliasHash::ANY,
                zones,
                &mut touched,
            );
            apply_mapping_pass(
                &mut global_audio_grids[layer],
                &mut global_visual_grids[layer],
                preset,
                layer as LayerId,
                AliasHash::ANY,
                &mut touched,
            );
        }
    }

    // Pass 2: device stack, one per known alias.
    let known_aliases: Vec<AliasHash> = alias_table
        .table()
        .aliases
        .iter()
        .map(|a| AliasHash::of(&a.name))
        .collect();

    for alias in known_aliases {
        let mut device_audio = Vec::with_capacity(LAYER_COUNT);
        let mut device_visual = Vec::with_capacity(LAYER_COUNT);

        for layer in 0..LAYER_COUNT {
            let (mut audio, mut visual) = initialize_device_grid(&ctx, layer);
            for layer_idx in 0..=layer {
                let mut touched = HashSet::new();
                apply_zone_writes(
                    &mut audio,
                    &mut visual,
                    &mut ctx.chord_pool,
                    layer_idx as LayerId,
                    alias,
                    zones,
                    &mut touched,
                );
                apply_mapping_pass(
                    &mut audio,
                    &mut visual,
                    preset,
                    layer_idx as LayerId,
                    alias,
                    &mut touched,
                );
            }
            device_audio.push(audio);
            device_visual.push(visual);
        }

        ctx.device_audio_grids.insert(alias, device_audio);
        ctx.device_visual_grids.insert(alias, device_visual);
    }

    ctx
}
