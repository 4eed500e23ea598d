//! Error types for the non-real-time management surface (scale/alias
//! create-rename-delete, MIDI port setup). The hot dispatch path never
//! returns an error — invalid input there is clamped or silently dropped:
//! fall back, don't fail.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyzoneError {
    #[error("alias name \"{0}\" is reserved")]
    ReservedAliasName(String),
    #[error("an alias named \"{0}\" already exists")]
    DuplicateAliasName(String),
    #[error("no alias named \"{0}\"")]
    UnknownAlias(String),
    #[error("a scale named \"{0}\" already exists")]
    DuplicateScaleName(String),
    #[error("cannot modify factory scale \"{0}\"")]
    FactoryScaleImmutable(String),
    #[error("midi output error: {0}")]
    MidiPort(String),
}

pub type Result<T> = std::result::Result<T, KeyzoneError>;
