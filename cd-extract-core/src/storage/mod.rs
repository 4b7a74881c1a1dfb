pub mod metadata;
pub mod wav_format;
pub mod wav_writer;
