use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("No audio output device available")]
    NoOutputDevice,

    #[error("Unsupported output sample format: {0}")]
    UnsupportedSampleFormat(String),

    #[error("Failed to query output config: {0}")]
    Config(String),

    #[error("Failed to build output stream: {0}")]
    BuildStream(String),

    #[error("Failed to start output stream: {0}")]
    PlayStream(String),
}

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("No MIDI input device found")]
    DeviceNotFound,

    #[error("Failed to create MIDI input: {0}")]
    Init(String),

    #[error("Failed to connect to {port}: {message}")]
    Connect { port: String, message: String },
}

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Unsupported MIDI file format: {0}")]
    UnsupportedFileFormat(String),

    #[error("Cannot encode {0} in a MIDI file")]
    OutOfRange(String),

    #[error("Failed to write MIDI file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, PartialEq)]
pub enum GenerationError {
    #[error("{name} must be within {min}..={max}, got {value}")]
    InvalidParameterRange {
        name: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    #[error("Note generation exceeded {budget_ms}ms after {ideas_done} idea(s)")]
    GenerationTimeout { budget_ms: u64, ideas_done: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}
