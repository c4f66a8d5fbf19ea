pub mod harness;
pub mod hash;
pub mod init;
pub mod serve;
pub mod verify;
