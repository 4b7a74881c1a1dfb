pub mod cd_drive;
pub mod rip_delegate;
pub mod sector_reader;
