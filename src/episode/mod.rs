mod download;
mod filename;

pub use download::download_episode;
pub use filename::{audio_extension, guid_suffix, local_file_name};
