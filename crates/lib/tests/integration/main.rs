mod backup_tests;
mod common;
mod files_tests;
mod source_tests;
