pub mod compress_upload;
pub mod compressor;
pub mod storage;
pub mod temp_files;
