pub mod init;
pub mod run;
pub mod test_connection;
