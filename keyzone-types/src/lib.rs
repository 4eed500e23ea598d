//! # keyzone-types
//!
//! Shared type definitions for the keyzone performance-controller engine:
//! the preset data model (layers, zones, mappings, device aliases), the
//! compiled lookup grids the dispatcher reads from, and the runtime shapes
//! (voices, envelopes, pending strums) the real-time engines pass around.
//!
//! `keyzone-types` holds data only. The algorithms that build and consume
//! it — the grid compiler, chord generator, voice manager, envelope and
//! strum engines — live in `keyzone-core`.
//!
//! ```rust,ignore
//! use keyzone_types::preset::Preset;
//! use keyzone_types::zone::Zone;
//!
//! let mut preset = Preset::new();
//! let zone = Zone::new("Lead", 0);
//! // zones live alongside layers in keyzone-core::preset::PresetStore
//! ```

pub mod alias;
pub mod chord;
pub mod grid;
pub mod ids;
pub mod mapping;
pub mod music;
pub mod preset;
pub mod runtime;
pub mod zone;

pub use alias::{DeviceAlias, DeviceAliasTable};
pub use chord::{ChordNote, ChordType, Instrument, Voicing};
pub use grid::{AudioGrid, AudioSlot, CompiledContext, VisualGrid, VisualSlot, VisualState};
pub use ids::{AliasHash, DeviceHandle, InputId, KeyCode, LayerId, LAYER_COUNT};
pub use mapping::{Action, Command, Mapping};
pub use music::Scale;
pub use preset::{Layer, Preset};
pub use runtime::{ActiveEnvelope, GlobalPerformanceState, LayerActivationState, Voice};
pub use zone::Zone;
