pub mod doctor;
pub mod init;
pub mod play;
pub mod schema;
