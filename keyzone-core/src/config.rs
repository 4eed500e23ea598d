//! Runtime-tunable defaults: engine tick rates, default pitch-bend range,
//! ghost-note velocity scale, and autosave cadence. Embedded `config.toml`
//! plus an optional user override, merged field-by-field exactly as the
//! original app's settings loader does.

use std::path::PathBuf;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    performance: PerformanceConfig,
    #[serde(default)]
    session: SessionConfig,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    envelope_tick_ms: Option<u32>,
    strum_tick_ms: Option<u32>,
    delay_midi_drain_ms: Option<u32>,
    release_expiry_tick_ms: Option<u32>,
}

#[derive(Deserialize, Default)]
struct PerformanceConfig {
    default_pitch_bend_range_semitones: Option<u8>,
    default_ghost_velocity_scale: Option<f32>,
}

#[derive(Deserialize, Default)]
struct SessionConfig {
    autosave_enabled: Option<bool>,
    autosave_debounce_ms: Option<u64>,
}

pub struct Config {
    engine: EngineConfig,
    performance: PerformanceConfig,
    session: SessionConfig,
}

impl Config {
    pub fn load() -> Self {
        let mut base: ConfigFile = toml::from_str(DEFAULT_CONFIG).expect("failed to parse embedded config.toml");

        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => match toml::from_str::<ConfigFile>(&contents) {
                        Ok(user) => {
                            merge_engine(&mut base.engine, user.engine);
                            merge_performance(&mut base.performance, user.performance);
                            merge_session(&mut base.session, user.session);
                        }
                        Err(e) => log::warn!(target: "config", "ignoring malformed config {}: {}", path.display(), e),
                    },
                    Err(e) => log::warn!(target: "config", "could not read config {}: {}", path.display(), e),
                }
            }
        }

        Config {
            engine: base.engine,
            performance: base.performance,
            session: base.session,
        }
    }

    pub fn envelope_tick_ms(&self) -> u32 {
        self.engine.envelope_tick_ms.unwrap_or(crate::envelope_engine::TICK_MS)
    }

    pub fn strum_tick_ms(&self) -> u32 {
        self.engine.strum_tick_ms.unwrap_or(1)
    }

    pub fn delay_midi_drain_ms(&self) -> u32 {
        self.engine.delay_midi_drain_ms.unwrap_or(50)
    }

    pub fn release_expiry_tick_ms(&self) -> u32 {
        self.engine.release_expiry_tick_ms.unwrap_or(1)
    }

    pub fn default_pitch_bend_range_semitones(&self) -> u8 {
        self.performance.default_pitch_bend_range_semitones.unwrap_or(2)
    }

    pub fn default_ghost_velocity_scale(&self) -> f32 {
        self.performance.default_ghost_velocity_scale.unwrap_or(0.6)
    }

    pub fn autosave_enabled(&self) -> bool {
        self.session.autosave_enabled.unwrap_or(true)
    }

    /// Quiescent-period before an autosave flush, clamped to 0.5..60 s.
    pub fn autosave_debounce_ms(&self) -> u64 {
        self.session.autosave_debounce_ms.unwrap_or(2_000).clamp(500, 60_000)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keyzone").join("config.toml"))
}

fn merge_engine(base: &mut EngineConfig, user: EngineConfig) {
    if user.envelope_tick_ms.is_some() {
        base.envelope_tick_ms = user.envelope_tick_ms;
    }
    if user.strum_tick_ms.is_some() {
        base.strum_tick_ms = user.strum_tick_ms;
    }
    if user.delay_midi_drain_ms.is_some() {
        base.delay_midi_drain_ms = user.delay_midi_drain_ms;
    }
    if user.release_expiry_tick_ms.is_some() {
        base.release_expiry_tick_ms = user.release_expiry_tick_ms;
    }
}

fn merge_performance(base: &mut PerformanceConfig, user: PerformanceConfig) {
    if user.default_pitch_bend_range_semitones.is_some() {
        base.default_pitch_bend_range_semitones = user.default_pitch_bend_range_semitones;
    }
    if user.default_ghost_velocity_scale.is_some() {
        base.default_ghost_velocity_scale = user.default_ghost_velocity_scale;
    }
}

fn merge_session(base: &mut SessionConfig, user: SessionConfig) {
    if user.autosave_enabled.is_some() {
        base.autosave_enabled = user.autosave_enabled;
    }
    if user.autosave_debounce_ms.is_some() {
        base.autosave_debounce_ms = user.autosave_debounce_ms;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_embedded_defaults() {
        let config = Config::load();
        assert_eq!(config.envelope_tick_ms(), 5);
        assert_eq!(config.strum_tick_ms(), 1);
        assert_eq!(config.default_pitch_bend_range_semitones(), 2);
        assert!(config.autosave_enabled());
        assert_eq!(config.autosave_debounce_ms(), 2_000);
    }

    #[test]
    fn autosave_debounce_is_clamped() {
        let mut session = SessionConfig::default();
        session.autosave_debounce_ms = Some(1);
        let config = Config {
            engine: EngineConfig::default(),
            performance: PerformanceConfig::default(),
            session,
        };
        assert_eq!(config.autosave_debounce_ms(), 500);
    }
}
