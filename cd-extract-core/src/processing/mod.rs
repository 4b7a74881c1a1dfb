pub mod pcm;
pub mod verifying_reader;
