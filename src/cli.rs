/// Command line host: argument mode and interactive menu
pub mod cli_main;
