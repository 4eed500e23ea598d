//! End-to-end scenarios driving the real dispatcher through a compiled
//! grid: strum timing, and grid inheritance/conflict coloring.

use keyzone_core::alias_table::AliasTable;
use keyzone_core::compiler::{compile, CompiledContextHandle};
use keyzone_core::dispatcher::Dispatcher;
use keyzone_core::layout::KeyboardLayout;
use keyzone_core::midi::MidiOutputPort;
use keyzone_core::scale_library::ScaleLibrary;
use keyzone_core::zone::ZoneRuntime;
use keyzone_types::chord::ChordType;
use keyzone_types::grid::VisualState;
use keyzone_types::ids::{AliasHash, KeyCode};
use keyzone_types::mapping::{Action, Mapping, NoteAction};
use keyzone_types::preset::Preset;
use keyzone_types::zone::{PlayMode, StrumPattern, Zone};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Recorded {
    NoteOn(u8, u8, u8),
    NoteOff(u8, u8),
}

#[derive(Default)]
struct RecordingPort {
    sent: Vec<Recorded>,
}

impl MidiOutputPort for RecordingPort {
    fn send_note_on(&mut self, channel: u8, note: u8, velocity_0_1: f32) {
        let vel = (velocity_0_1.clamp(0.0, 1.0) * 127.0).round() as u8;
        self.sent.push(Recorded::NoteOn(channel, note, vel));
    }
    fn send_note_off(&mut self, channel: u8, note: u8) {
        self.sent.push(Recorded::NoteOff(channel, note));
    }
    fn send_cc(&mut self, _channel: u8, _cc: u8, _value: u8) {}
    fn send_pitch_bend(&mut self, _channel: u8, _value_0_16383: u16) {}
    fn send_program_change(&mut self, _channel: u8, _program: u8) {}
}

/// S4. A strummed triad zone on {Q}: root C4, major scale, down-stroke at
/// 50ms/note. Pressing Q at t=0 should voice C4/E4/G4 across three ticks,
/// each landing no earlier than `t0 + i*speed`.
#[test]
fn strum_emits_triad_in_down_stroke_order_on_schedule() {
    let mut zone = Zone::new("Strum", 0);
    zone.input_key_codes = vec!['Q' as KeyCode];
    zone.root_note = 60;
    zone.scale_name = "Major".to_string();
    zone.chord_type = ChordType::Triad;
    zone.midi_channel = 1;
    zone.base_velocity = 100;
    zone.play_mode = PlayMode::Strum {
        strum_speed_ms: 50,
        strum_pattern: StrumPattern::Down,
        strum_ghost_notes: false,
        strum_timing_variation_on: false,
        strum_timing_variation_ms: 0,
    };

    let mut zr = ZoneRuntime::new(zone);
    let scales = ScaleLibrary::with_factory_defaults();
    let layout = KeyboardLayout::qwerty();
    zr.rebuild_cache(&scales, &layout, 60, "Major");

    let preset = Preset::new();
    let aliases = AliasTable::new();
    let ctx = compile(&preset, std::slice::from_ref(&zr), &aliases);
    let mut dispatcher = Dispatcher::new(CompiledContextHandle::new(ctx));
    let mut port = RecordingPort::default();

    dispatcher.handle_key_down(&mut port, 1, AliasHash::ANY, 'Q' as KeyCode, 0);
    assert!(port.sent.is_empty(), "strum notes queue, they don't fire immediately");

    dispatcher.tick(&mut port, 0);
    assert_eq!(port.sent, vec![Recorded::NoteOn(1, 60, 100)]);

    dispatcher.tick(&mut port, 50);
    assert_eq!(port.sent[1], Recorded::NoteOn(1, 64, 100));

    dispatcher.tick(&mut port, 100);
    assert_eq!(port.sent[2], Recorded::NoteOn(1, 67, 100));
}

/// S6. Layer 0: mapping Q->Note and a zone both covering Q (conflict).
/// Layer 1: mapping W->Note only. Layer-1's Q slot should read Inherited
/// (dimmed) from layer 0's Active color, layer-0's Q stays Conflict, and
/// layer-1's W is a fresh Active slot.
#[test]
fn grid_inheritance_and_conflict_match_visual_states() {
    let mut preset = Preset::new();
    preset.layers[0].mappings.push(Mapping::new(
        'Q' as KeyCode,
        0,
        Action::Note(NoteAction { midi_note: 60, ..NoteAction::default() }),
    ));
    preset.layers[1].mappings.push(Mapping::new(
        'W' as KeyCode,
        1,
        Action::Note(NoteAction { midi_note: 62, ..NoteAction::default() }),
    ));

    let mut zone = Zone::new("Z1", 0);
    zone.input_key_codes = vec!['Q' as KeyCode];
    let mut zr = ZoneRuntime::new(zone);
    let scales = ScaleLibrary::with_factory_defaults();
    let layout = KeyboardLayout::qwerty();
    zr.rebuild_cache(&scales, &layout, 60, "Major");

    let aliases = AliasTable::new();
    let ctx = compile(&preset, std::slice::from_ref(&zr), &aliases);

    let layer0_q = ctx.global_visual_grids[0].get('Q' as KeyCode).unwrap();
    assert_eq!(layer0_q.state, VisualState::Conflict);

    let layer1_q = ctx.global_visual_grids[1].get('Q' as KeyCode).unwrap();
    assert_eq!(layer1_q.state, VisualState::Inherited);

    let layer1_w = ctx.global_visual_grids[1].get('W' as KeyCode).unwrap();
    assert_eq!(layer1_w.state, VisualState::Active);
}
