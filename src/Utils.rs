/// Loading of atomic mass overrides and formula lists from text files with
/// section headers
pub mod load_from_file;
