//! Input dispatcher: the synchronous hot path run by the raw-input
//! thread. Resolves a key event against the compiled grid and fans it out
//! to the voice manager, envelope engine, or strum scheduler — never
//! blocks, never touches the preset or zone caches directly.

use keyzone_types::grid::AudioSlot;
use keyzone_types::ids::{AliasHash, DeviceHandle, InputId, KeyCode, LayerId};
use keyzone_types::mapping::{Action, Command, PanicMode, TransposeOp};
use keyzone_types::runtime::{GlobalPerformanceState, LayerActivationState};

use crate::compiler::CompiledContextHandle;
use crate::envelope_engine::EnvelopeEngine;
use crate::midi::MidiOutputPort;
use crate::strum_scheduler::StrumScheduler;
use crate::voice_manager::VoiceManager;

/// Something the dispatcher can't do itself and hands back to its caller.
/// Root/scale/degree changes restructure every zone's cached notes, which
/// only the coordinator holding the `Preset`/`ZoneRuntime`s can rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchEffect {
    None,
    RequestRecompile,
}

fn randomize_velocity(base: u8, random_range: u8) -> u8 {
    if random_range == 0 {
        return base;
    }
    let span = random_range as i32;
    let jitter = rand::random::<i32>().rem_euclid(2 * span + 1) - span;
    (base as i32 + jitter).clamp(1, 127) as u8
}

fn clamp_transpose(value: i32) -> i32 {
    value.clamp(-48, 48)
}

pub struct Dispatcher {
    compiled: CompiledContextHandle,
    pub studio_mode: bool,
    pub layer_state: LayerActivationState,
    pub global_state: GlobalPerformanceState,
    pub voice_manager: VoiceManager,
    pub envelope_engine: EnvelopeEngine,
    pub strum_scheduler: StrumScheduler,
}

impl Dispatcher {
    pub fn new(compiled: CompiledContextHandle) -> Self {
        Self {
            compiled,
            studio_mode: false,
            layer_state: LayerActivationState::new(),
            global_state: GlobalPerformanceState::default(),
            voice_manager: VoiceManager::new(),
            envelope_engine: EnvelopeEngine::new(),
            strum_scheduler: StrumScheduler::new(),
        }
    }

    fn effective_alias(&self, device_alias: AliasHash) -> AliasHash {
        if self.studio_mode {
            device_alias
        } else {
            AliasHash::ANY
        }
    }

    fn read_slot(&self, device_alias: AliasHash, key_code: KeyCode) -> Option<AudioSlot> {
        let ctx = self.compiled.load();
        let alias = self.effective_alias(device_alias);
        let layer = self.layer_state.highest_active();
        ctx.audio_grid(alias, layer)
            .and_then(|grid| grid.get(key_code))
            .filter(|slot| slot.active)
            .cloned()
    }

    /// Key-down path.
    pub fn handle_key_down(
        &mut self,
        port: &mut dyn MidiOutputPort,
        device_handle: DeviceHandle,
        device_alias: AliasHash,
        key_code: KeyCode,
        now_ms: u64,
    ) -> DispatchEffect {
        let Some(slot) = self.read_slot(device_alias, key_code) else {
            return DispatchEffect::None;
        };
        let source = InputId::new(device_handle, key_code);

        match slot.action {
            Some(Action::Command(cmd)) => self.apply_command_press(port, cmd),
            Some(Action::Note(note)) => {
                let chord = if slot.chord_index >= 0 {
                    self.compiled.load().chord_pool.get(slot.chord_index as usize).cloned()
                } else {
                    None
                };
                let transpose = if note.follow_transpose {
                    self.global_state.transpose_semitones
                } else {
                    0
                };

                match (chord, slot.strum) {
                    (Some(notes), Some(strum)) => {
                        let pitches: Vec<i32> = notes.iter().map(|n| n.pitch + transpose).collect();
                        let velocities: Vec<u8> = notes
                            .iter()
                            .map(|n| {
                                let v = randomize_velocity(note.velocity, note.velocity_random);
                                if n.is_ghost {
                                    (v as f32 * 0.6) as u8
                                } else {
                                    v
                                }
                            })
                            .collect();
                        self.strum_scheduler.trigger_strum(
                            &pitches,
                            &velocities,
                            note.channel,
                            source,
                            strum.speed_ms,
                            strum.allow_sustain,
                            strum.pattern,
                            strum.humanize_ms,
                            now_ms,
                        );
                    }
                    (Some(notes), None) => {
                        let triples: Vec<(i32, u8, bool)> = notes
                            .iter()
                            .map(|n| {
                                let v = randomize_velocity(note.velocity, note.velocity_random);
                                let v = if n.is_ghost { (v as f32 * 0.6) as u8 } else { v };
                                (n.pitch + transpose, v, n.is_ghost)
                            })
                            .collect();
                        self.voice_manager
                            .note_on_chord(port, source, &triples, note.channel, note.allow_sustain);
                    }
                    (None, _) => {
                        let pitch = note.midi_note as i32 + transpose;
                        let velocity = randomize_velocity(note.velocity, note.velocity_random);
                        self.voice_manager.note_on(
                            port,
                            source,
                            note.channel,
                            pitch,
                            velocity as f32 / 127.0,
                            note.allow_sustain,
                        );
                    }
                }
                DispatchEffect::None
            }
            Some(Action::Expression(action)) => {
                self.envelope_engine.trigger_envelope(port, source, action.channel, &action, action.data2);
                DispatchEffect::None
            }
            None => DispatchEffect::None,
        }
    }

    /// Key-up path.
    pub fn handle_key_up(
        &mut self,
        port: &mut dyn MidiOutputPort,
        device_handle: DeviceHandle,
        device_alias: AliasHash,
        key_code: KeyCode,
        now_ms: u64,
    ) -> DispatchEffect {
        let Some(slot) = self.read_slot(device_alias, key_code) else {
            return DispatchEffect::None;
        };
        let source = InputId::new(device_handle, key_code);

        match slot.action {
            Some(Action::Command(cmd)) => self.apply_command_release(port, cmd),
            Some(Action::Note(note)) => {
                use keyzone_types::mapping::ReleaseBehavior;
                match note.release_behavior {
                    ReleaseBehavior::SendNoteOff => {
                        if let Some(strum) = slot.strum {
                            self.strum_scheduler.mark_source_released(
                                source,
                                now_ms,
                                slot.release_delay_ms,
                                strum.allow_sustain,
                            );
                        }
                        self.voice_manager
                            .handle_key_up(port, now_ms, source, slot.release_delay_ms, false);
                    }
                    // Holds regardless of the global pedal/latch state;
                    // released on the pedal/latch falling edge or a panic.
                    ReleaseBehavior::SustainUntilRetrigger => self.voice_manager.force_sustain(source),
                    ReleaseBehavior::AlwaysLatch => self.voice_manager.force_latch(source),
                }
                DispatchEffect::None
            }
            Some(Action::Expression(_)) => {
                self.envelope_engine.release_envelope(source);
                DispatchEffect::None
            }
            None => DispatchEffect::None,
        }
    }

    /// Drive the envelope engine, strum scheduler, and pending-release
    /// queue. Call once per engine tick at whatever resolution the caller's
    /// timers run at: envelope 200 Hz, strum ~1 kHz, release 1 ms.
    pub fn tick(&mut self, port: &mut dyn MidiOutputPort, now_ms: u64) {
        self.envelope_engine.tick(port);
        self.strum_scheduler.tick(now_ms, port, &mut self.voice_manager);
        self.voice_manager.tick_pending_releases(port, now_ms);
    }

    fn apply_command_press(&mut self, port: &mut dyn MidiOutputPort, cmd: Command) -> DispatchEffect {
        match cmd {
            Command::SustainMomentary => {
                self.voice_manager.set_sustain(port, true);
                self.global_state.sustain_on = true;
            }
            Command::SustainToggle => {
                let next = !self.global_state.sustain_on;
                self.global_state.sustain_on = next;
                self.voice_manager.set_sustain(port, next);
            }
            Command::SustainInverse => {
                self.voice_manager.set_sustain(port, false);
                self.global_state.sustain_on = false;
            }
            Command::LatchToggle => {
                let next = !self.global_state.latch_on;
                self.global_state.latch_on = next;
                self.voice_manager.set_latch(port, next, true);
            }
            Command::Panic(mode) => match mode {
                PanicMode::All => self.voice_manager.panic(port),
                PanicMode::LatchedOnly => self.voice_manager.panic_latch(port),
                PanicMode::ChordsOnly => self.strum_scheduler.cancel_all(),
            },
            Command::PanicLatch => self.voice_manager.panic_latch(port),
            Command::Transpose(op) => {
                self.global_state.transpose_semitones = clamp_transpose(match op {
                    TransposeOp::PlusOne => self.global_state.transpose_semitones + 1,
                    TransposeOp::MinusOne => self.global_state.transpose_semitones - 1,
                    TransposeOp::PlusOctave => self.global_state.transpose_semitones + 12,
                    TransposeOp::MinusOctave => self.global_state.transpose_semitones - 12,
                    TransposeOp::Set(semitones) => semitones,
                });
            }
            Command::GlobalPitchDownLegacy => {
                self.global_state.transpose_semitones = clamp_transpose(self.global_state.transpose_semitones - 1);
            }
            Command::GlobalModeUp => {
                self.global_state.degree_transpose += 1;
                return DispatchEffect::RequestRecompile;
            }
            Command::GlobalModeDown => {
                self.global_state.degree_transpose -= 1;
                return DispatchEffect::RequestRecompile;
            }
            Command::LayerMomentary(layer) => self.adjust_hold_refcount(layer, 1),
            Command::LayerToggle(layer) => {
                let i = layer as usize;
                self.layer_state.toggled_on[i] = !self.layer_state.toggled_on[i];
            }
            Command::LayerSolo(layer) => {
                self.layer_state = LayerActivationState::new();
                self.layer_state.toggled_on[layer as usize] = true;
            }
            Command::SetGlobalRoot(root) => {
                self.global_state.global_root = root;
                return DispatchEffect::RequestRecompile;
            }
            Command::SetGlobalScale(index) => {
                self.global_state.global_scale_index = index;
                return DispatchEffect::RequestRecompile;
            }
            Command::ToggleUseGlobalRoot => {
                self.global_state.use_global_root = !self.global_state.use_global_root;
                return DispatchEffect::RequestRecompile;
            }
            Command::ToggleUseGlobalScale => {
                self.global_state.use_global_scale = !self.global_state.use_global_scale;
                return DispatchEffect::RequestRecompile;
            }
            Command::NudgeGlobalRootOctave(direction) => {
                let delta = if direction >= 0 { 12 } else { -12 };
                self.global_state.global_root = (self.global_state.global_root as i32 + delta).clamp(0, 127) as u8;
                return DispatchEffect::RequestRecompile;
            }
        }
        DispatchEffect::None
    }

    fn apply_command_release(&mut self, port: &mut dyn MidiOutputPort, cmd: Command) -> DispatchEffect {
        match cmd {
            Command::SustainMomentary => {
                self.voice_manager.set_sustain(port, false);
                self.global_state.sustain_on = false;
            }
            Command::SustainInverse => {
                self.voice_manager.set_sustain(port, true);
                self.global_state.sustain_on = true;
            }
            Command::LayerMomentary(layer) => self.adjust_hold_refcount(layer, -1),
            _ => {}
        }
        DispatchEffect::None
    }

    fn adjust_hold_refcount(&mut self, layer: LayerId, delta: i32) {
        let i = layer as usize;
        let current = self.layer_state.hold_refcount[i] as i32;
        self.layer_state.hold_refcount[i] = (current + delta).max(0) as u32;
    }
}
